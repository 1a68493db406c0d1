//! Instrumentation strategy embedded in pagelets and resources.
//!
//! The factory picks the strategy once per object from a process-wide switch.
//! `Noop` does nothing; `Diagnostics` reports lifecycle events to the log.

use tracing::debug;

use super::types::{PageletId, ResourceId, ResourceKind};

const TARGET: &str = "pagepipe::instrumentation";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Instrumentation {
    #[default]
    Noop,
    Diagnostics,
}

impl Instrumentation {
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Instrumentation::Diagnostics
        } else {
            Instrumentation::Noop
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Instrumentation::Diagnostics)
    }

    pub(crate) fn pagelet_created(self, id: &PageletId, priority: i32) {
        if self.is_active() {
            debug!(target: TARGET, pagelet = %id, priority, "pagelet created");
        }
    }

    pub(crate) fn resource_created(self, id: &ResourceId, kind: ResourceKind, source: &str) {
        if self.is_active() {
            debug!(target: TARGET, resource = %id, kind = %kind, source, "resource created");
        }
    }

    pub(crate) fn resource_attached(self, pagelet: &PageletId, resource: &ResourceId, kind: ResourceKind) {
        if self.is_active() {
            debug!(
                target: TARGET,
                pagelet = %pagelet,
                resource = %resource,
                kind = %kind,
                "resource attached"
            );
        }
    }

    pub(crate) fn callback_attached(self, owner: &str, phase: &'static str) {
        if self.is_active() {
            debug!(target: TARGET, owner, phase, "phase callback attached");
        }
    }

    pub(crate) fn wire_built(self, pagelet: &PageletId, is_last: bool) {
        if self.is_active() {
            debug!(target: TARGET, pagelet = %pagelet, is_last, "wire structure built");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_selects_strategy() {
        assert_eq!(Instrumentation::from_flag(true), Instrumentation::Diagnostics);
        assert_eq!(Instrumentation::from_flag(false), Instrumentation::Noop);
        assert!(!Instrumentation::default().is_active());
    }
}
