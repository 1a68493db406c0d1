//! External assets (stylesheets, scripts) owned by a single pagelet.

use super::error::DomainError;
use super::instrumentation::Instrumentation;
use super::markup::escape_attribute;
use super::phase::{Phase, PhaseCallback, PhaseCallbacks, PhaseDiagnostic, ResourcePhase};
use super::types::{ResourceId, ResourceKind, Subject};
use super::wire::ResourceWire;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    id: ResourceId,
    kind: ResourceKind,
    source: String,
    callbacks: PhaseCallbacks<ResourcePhase>,
    instrumentation: Instrumentation,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        kind: ResourceKind,
        source: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let id = ResourceId::new(id)?;
        let source = source.into();
        if source.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "resource.source",
                "must not be empty",
            ));
        }

        Ok(Self {
            id,
            kind,
            source,
            callbacks: PhaseCallbacks::new(),
            instrumentation: Instrumentation::Noop,
        })
    }

    pub fn stylesheet(id: impl Into<String>, href: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(id, ResourceKind::Stylesheet, href)
    }

    pub fn javascript(id: impl Into<String>, src: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(id, ResourceKind::Javascript, src)
    }

    pub fn with_instrumentation(mut self, instrumentation: Instrumentation) -> Self {
        self.instrumentation = instrumentation;
        instrumentation.resource_created(&self.id, self.kind, &self.source);
        self
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn phase_callbacks(&self) -> &PhaseCallbacks<ResourcePhase> {
        &self.callbacks
    }

    pub fn attach_phase_callback(&mut self, phase: ResourcePhase, snippet: impl Into<String>) {
        self.instrumentation
            .callback_attached(self.id.as_str(), phase.as_str());
        self.callbacks
            .push(phase, PhaseCallback::Script(snippet.into()));
    }

    /// Attach a callback by phase name, rejecting names outside `INIT|LOAD|DONE`.
    pub fn attach_phase_callback_named(
        &mut self,
        phase: &str,
        snippet: impl Into<String>,
    ) -> Result<(), DomainError> {
        let phase = ResourcePhase::parse(phase)?;
        self.attach_phase_callback(phase, snippet);
        Ok(())
    }

    pub(crate) fn inject_phase_diagnostics(&mut self) {
        let subject = Subject::from(self.kind);
        for phase in ResourcePhase::ALL {
            self.callbacks.push(
                *phase,
                PhaseCallback::Diagnostic(PhaseDiagnostic {
                    subject,
                    id: self.id.to_string(),
                    phase: phase.as_str(),
                }),
            );
        }
    }

    pub fn wire(&self) -> ResourceWire<'_> {
        ResourceWire {
            id: &self.id,
            source: &self.source,
            phase_callbacks: &self.callbacks,
        }
    }

    /// Plain asset tag used when pipelining is disabled.
    pub fn html_tag(&self) -> String {
        let source = escape_attribute(&self.source);
        match self.kind {
            ResourceKind::Stylesheet => format!(r#"<link rel="stylesheet" href="{source}" />"#),
            ResourceKind::Javascript => format!(r#"<script src="{source}"></script>"#),
        }
    }
}
