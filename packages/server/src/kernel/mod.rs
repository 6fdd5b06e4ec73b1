//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use deps::{HubSpotAdapter, ServerDeps};
pub use test_dependencies::{InMemoryTicketStore, RecordedUpdate, TestDependencies, TicketFixture};
pub use traits::*;
