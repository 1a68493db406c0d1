//! Client-side lifecycle phases and the callbacks attached to them.
//!
//! A pagelet moves through `INIT → LOADCSS → HTML → LOADJS → DONE` on the
//! client, each of its resources through `INIT → LOAD → DONE`. Callbacks are
//! run by the browser runtime when the owner enters the phase.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::DomainError;
use super::types::Subject;

pub trait Phase: Copy + Ord + fmt::Debug + Serialize + 'static {
    /// Every phase in client execution order.
    const ALL: &'static [Self];
    /// Name of the owner kind, used in error messages.
    const OWNER: &'static str;

    fn as_str(self) -> &'static str;

    fn parse(name: &str) -> Result<Self, DomainError> {
        let trimmed = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::invalid_phase(trimmed, Self::OWNER))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageletPhase {
    Init,
    LoadCss,
    Html,
    LoadJs,
    Done,
}

impl Phase for PageletPhase {
    const ALL: &'static [Self] = &[
        PageletPhase::Init,
        PageletPhase::LoadCss,
        PageletPhase::Html,
        PageletPhase::LoadJs,
        PageletPhase::Done,
    ];
    const OWNER: &'static str = "pagelet";

    fn as_str(self) -> &'static str {
        match self {
            PageletPhase::Init => "INIT",
            PageletPhase::LoadCss => "LOADCSS",
            PageletPhase::Html => "HTML",
            PageletPhase::LoadJs => "LOADJS",
            PageletPhase::Done => "DONE",
        }
    }
}

impl FromStr for PageletPhase {
    type Err = DomainError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::parse(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourcePhase {
    Init,
    Load,
    Done,
}

impl Phase for ResourcePhase {
    const ALL: &'static [Self] = &[ResourcePhase::Init, ResourcePhase::Load, ResourcePhase::Done];
    const OWNER: &'static str = "resource";

    fn as_str(self) -> &'static str {
        match self {
            ResourcePhase::Init => "INIT",
            ResourcePhase::Load => "LOAD",
            ResourcePhase::Done => "DONE",
        }
    }
}

impl FromStr for ResourcePhase {
    type Err = DomainError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::parse(name)
    }
}

/// Structured "phase reached" notice; the client runtime decides how to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PhaseDiagnostic {
    pub subject: Subject,
    pub id: String,
    pub phase: &'static str,
}

/// One entry of a phase callback list.
///
/// Scripts serialize as bare strings, diagnostics as objects, so the runtime
/// can tell them apart without a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PhaseCallback {
    Script(String),
    Diagnostic(PhaseDiagnostic),
}

impl PhaseCallback {
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, PhaseCallback::Diagnostic(_))
    }
}

/// Phase-keyed callback lists. Every phase is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhaseCallbacks<P: Phase> {
    entries: BTreeMap<P, Vec<PhaseCallback>>,
}

impl<P: Phase> PhaseCallbacks<P> {
    pub fn new() -> Self {
        Self {
            entries: P::ALL.iter().map(|phase| (*phase, Vec::new())).collect(),
        }
    }

    pub fn push(&mut self, phase: P, callback: PhaseCallback) {
        self.entries.entry(phase).or_default().push(callback);
    }

    pub fn get(&self, phase: P) -> &[PhaseCallback] {
        self.entries.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (P, &[PhaseCallback])> {
        self.entries
            .iter()
            .map(|(phase, callbacks)| (*phase, callbacks.as_slice()))
    }

    /// True when every phase carries at least one diagnostic entry.
    pub fn has_diagnostics_for_all_phases(&self) -> bool {
        P::ALL
            .iter()
            .all(|phase| self.get(*phase).iter().any(PhaseCallback::is_diagnostic))
    }
}

impl<P: Phase> Default for PhaseCallbacks<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_parse_case_insensitively() {
        assert_eq!("loadcss".parse::<PageletPhase>(), Ok(PageletPhase::LoadCss));
        assert_eq!(" DONE ".parse::<ResourcePhase>(), Ok(ResourcePhase::Done));
    }

    #[test]
    fn unknown_phase_names_are_rejected_per_owner() {
        assert_eq!(
            "LOAD".parse::<PageletPhase>(),
            Err(DomainError::invalid_phase("LOAD", "pagelet"))
        );
        assert_eq!(
            "HTML".parse::<ResourcePhase>(),
            Err(DomainError::invalid_phase("HTML", "resource"))
        );
    }

    #[test]
    fn callbacks_serialize_every_phase_in_client_order() {
        let mut callbacks = PhaseCallbacks::<PageletPhase>::new();
        callbacks.push(PageletPhase::Html, PhaseCallback::Script("a()".into()));
        callbacks.push(
            PageletPhase::Done,
            PhaseCallback::Diagnostic(PhaseDiagnostic {
                subject: Subject::Pagelet,
                id: "p".into(),
                phase: "DONE",
            }),
        );

        let json = serde_json::to_string(&callbacks).unwrap();
        assert_eq!(
            json,
            r#"{"INIT":[],"LOADCSS":[],"HTML":["a()"],"LOADJS":[],"DONE":[{"SUBJECT":"PAGELET","ID":"p","PHASE":"DONE"}]}"#
        );
    }

    #[test]
    fn callbacks_keep_insertion_order_within_a_phase() {
        let mut callbacks = PhaseCallbacks::<ResourcePhase>::new();
        callbacks.push(ResourcePhase::Load, PhaseCallback::Script("first()".into()));
        callbacks.push(ResourcePhase::Load, PhaseCallback::Script("second()".into()));

        assert_eq!(
            callbacks.get(ResourcePhase::Load),
            &[
                PhaseCallback::Script("first()".into()),
                PhaseCallback::Script("second()".into())
            ]
        );
        assert!(!callbacks.has_diagnostics_for_all_phases());
    }
}
