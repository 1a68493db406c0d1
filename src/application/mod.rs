//! Application layer: the pagelet scheduler and the seams it drives.

pub mod delay;
pub mod demo;
pub mod emission;
pub mod error;
pub mod factory;
pub mod scheduler;
pub mod transport;

pub use delay::{DebugJitter, Delay, NoDelay, TokioDelay};
pub use factory::PageletFactory;
pub use scheduler::{RenderError, RenderSummary, Scheduler, SchedulerOptions};
pub use transport::{Transport, TransportError};
