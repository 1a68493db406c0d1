//! Construction entry points for pagelets and resources.
//!
//! A single process-wide instrumentation switch decides which strategy every
//! created object carries. It is independent of the scheduler's debug mode,
//! though callers usually keep the two in sync.

use crate::domain::{
    DomainError, Instrumentation, Pagelet, PageletId, Priority, Resource, ResourceKind,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageletFactory {
    instrumentation: Instrumentation,
}

impl PageletFactory {
    pub fn new(instrumented: bool) -> Self {
        Self {
            instrumentation: Instrumentation::from_flag(instrumented),
        }
    }

    pub fn instrumentation(&self) -> Instrumentation {
        self.instrumentation
    }

    /// Create a pagelet; a missing id is generated, a missing priority is `NORMAL`.
    pub fn create_pagelet(
        &self,
        id: Option<&str>,
        priority: Option<Priority>,
    ) -> Result<Pagelet, DomainError> {
        let id = match id {
            Some(id) => PageletId::new(id)?,
            None => PageletId::generate(),
        };
        Ok(Pagelet::with_id(id, priority.unwrap_or_default())
            .with_instrumentation(self.instrumentation))
    }

    pub fn create_stylesheet(&self, id: &str, href: &str) -> Result<Resource, DomainError> {
        self.create_resource(id, ResourceKind::Stylesheet, href)
    }

    pub fn create_javascript(&self, id: &str, src: &str) -> Result<Resource, DomainError> {
        self.create_resource(id, ResourceKind::Javascript, src)
    }

    pub fn create_resource(
        &self,
        id: &str,
        kind: ResourceKind,
        source: &str,
    ) -> Result<Resource, DomainError> {
        Ok(Resource::new(id, kind, source)?.with_instrumentation(self.instrumentation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrumentation_flag_selects_variant() {
        let plain = PageletFactory::new(false);
        let instrumented = PageletFactory::new(true);

        let pagelet = plain.create_pagelet(Some("a"), None).unwrap();
        assert_eq!(pagelet.instrumentation(), Instrumentation::Noop);

        let pagelet = instrumented.create_pagelet(Some("a"), None).unwrap();
        assert_eq!(pagelet.instrumentation(), Instrumentation::Diagnostics);
    }

    #[test]
    fn missing_id_and_priority_fall_back_to_defaults() {
        let factory = PageletFactory::default();
        let first = factory.create_pagelet(None, None).unwrap();
        let second = factory.create_pagelet(None, Some(Priority::HIGH)).unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.priority(), Priority::NORMAL);
        assert_eq!(second.priority(), Priority::HIGH);
    }

    #[test]
    fn resources_are_created_with_their_kind() {
        let factory = PageletFactory::new(true);
        let css = factory.create_stylesheet("theme", "/theme.css").unwrap();
        let js = factory.create_javascript("app", "/app.js").unwrap();

        assert_eq!(css.kind(), ResourceKind::Stylesheet);
        assert_eq!(js.kind(), ResourceKind::Javascript);
        assert!(factory.create_stylesheet("bad id", "/x.css").is_err());
    }
}
