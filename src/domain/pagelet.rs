//! Independently renderable page fragments.

use super::error::DomainError;
use super::instrumentation::Instrumentation;
use super::markup::normalize_for_comment;
use super::phase::{PageletPhase, Phase, PhaseCallback, PhaseCallbacks, PhaseDiagnostic};
use super::resource::Resource;
use super::types::{PageletId, Priority, ResourceKind, Subject};
use super::wire::{PageletWire, ResourcesWire};

const DEFAULT_TAG_NAME: &str = "div";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagelet {
    id: PageletId,
    priority: Priority,
    tag_name: String,
    markup: String,
    stylesheets: Vec<Resource>,
    javascripts: Vec<Resource>,
    inline_scripts: Vec<String>,
    callbacks: PhaseCallbacks<PageletPhase>,
    instrumentation: Instrumentation,
    diagnostics_injected: bool,
}

impl Pagelet {
    pub fn new(id: impl Into<String>, priority: Priority) -> Result<Self, DomainError> {
        Ok(Self::with_id(PageletId::new(id)?, priority))
    }

    pub fn with_id(id: PageletId, priority: Priority) -> Self {
        Self {
            id,
            priority,
            tag_name: DEFAULT_TAG_NAME.to_string(),
            markup: String::new(),
            stylesheets: Vec::new(),
            javascripts: Vec::new(),
            inline_scripts: Vec::new(),
            callbacks: PhaseCallbacks::new(),
            instrumentation: Instrumentation::Noop,
            diagnostics_injected: false,
        }
    }

    pub fn with_instrumentation(mut self, instrumentation: Instrumentation) -> Self {
        self.instrumentation = instrumentation;
        instrumentation.pagelet_created(&self.id, self.priority.get());
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    /// Element name used for the in-document placeholder.
    pub fn with_tag_name(mut self, tag_name: impl Into<String>) -> Result<Self, DomainError> {
        let tag_name = tag_name.into();
        if tag_name.is_empty() || !tag_name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
            return Err(DomainError::invalid_argument(
                "pagelet.tag_name",
                format!("`{tag_name}` is not a valid element name"),
            ));
        }
        self.tag_name = tag_name;
        Ok(self)
    }

    pub fn id(&self) -> &PageletId {
        &self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn instrumentation(&self) -> Instrumentation {
        self.instrumentation
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn resources(&self, kind: ResourceKind) -> &[Resource] {
        match kind {
            ResourceKind::Stylesheet => &self.stylesheets,
            ResourceKind::Javascript => &self.javascripts,
        }
    }

    pub fn inline_scripts(&self) -> &[String] {
        &self.inline_scripts
    }

    pub fn phase_callbacks(&self) -> &PhaseCallbacks<PageletPhase> {
        &self.callbacks
    }

    /// Append a resource to the bucket of its kind, keeping insertion order.
    pub fn attach_resource(&mut self, resource: Resource) {
        self.instrumentation
            .resource_attached(&self.id, resource.id(), resource.kind());
        match resource.kind() {
            ResourceKind::Stylesheet => self.stylesheets.push(resource),
            ResourceKind::Javascript => self.javascripts.push(resource),
        }
    }

    pub fn attach_inline_script(&mut self, snippet: impl Into<String>) {
        self.inline_scripts.push(snippet.into());
    }

    pub fn attach_phase_callback(&mut self, phase: PageletPhase, snippet: impl Into<String>) {
        self.instrumentation
            .callback_attached(self.id.as_str(), phase.as_str());
        self.callbacks
            .push(phase, PhaseCallback::Script(snippet.into()));
    }

    pub fn attach_phase_callback_named(
        &mut self,
        phase: &str,
        snippet: impl Into<String>,
    ) -> Result<(), DomainError> {
        let phase = PageletPhase::parse(phase)?;
        self.attach_phase_callback(phase, snippet);
        Ok(())
    }

    /// Add a diagnostic entry to every phase of the pagelet and its resources.
    ///
    /// Runs at most once per pagelet so a retried render does not duplicate
    /// entries.
    pub fn inject_phase_diagnostics(&mut self) {
        if self.diagnostics_injected {
            return;
        }
        for phase in PageletPhase::ALL {
            self.callbacks.push(
                *phase,
                PhaseCallback::Diagnostic(PhaseDiagnostic {
                    subject: Subject::Pagelet,
                    id: self.id.to_string(),
                    phase: phase.as_str(),
                }),
            );
        }
        self.stylesheets
            .iter_mut()
            .chain(self.javascripts.iter_mut())
            .for_each(Resource::inject_phase_diagnostics);
        self.diagnostics_injected = true;
    }

    pub fn wire(&self, is_last: bool) -> PageletWire<'_> {
        self.instrumentation.wire_built(&self.id, is_last);
        PageletWire {
            id: &self.id,
            priority: self.priority,
            resources: ResourcesWire {
                stylesheet: self.stylesheets.iter().map(Resource::wire).collect(),
                javascript: self.javascripts.iter().map(Resource::wire).collect(),
            },
            inline_scripts: &self.inline_scripts,
            phase_callbacks: &self.callbacks,
            is_last,
        }
    }

    /// Markup ready for embedding inside the hidden comment block.
    pub fn render_markup(&self) -> String {
        normalize_for_comment(&self.markup)
    }

    /// In-document anchor for this pagelet.
    ///
    /// Pipelined pages get an empty element that the client runtime fills on
    /// arrival; static pages get the markup inline.
    pub fn placeholder(&self, pipelining: bool) -> String {
        let body = if pipelining { "" } else { self.markup.as_str() };
        format!(
            r#"<{tag} id="{id}">{body}</{tag}>"#,
            tag = self.tag_name,
            id = self.id
        )
    }
}
