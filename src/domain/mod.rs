//! Domain layer: pagelets, their resources, and the client-side phase protocol.

pub mod error;
pub mod instrumentation;
pub mod markup;
pub mod pagelet;
pub mod phase;
pub mod resource;
pub mod types;
pub mod wire;

pub use error::DomainError;
pub use instrumentation::Instrumentation;
pub use pagelet::Pagelet;
pub use phase::{PageletPhase, Phase, PhaseCallback, PhaseCallbacks, PhaseDiagnostic, ResourcePhase};
pub use resource::Resource;
pub use types::{PageletId, Priority, ResourceId, ResourceKind, Subject};
pub use wire::{PageletWire, ResourceWire, ResourcesWire};
