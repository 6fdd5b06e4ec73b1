pub mod actions;
pub mod effects;
pub mod errors;
pub mod models;
pub mod webhook;

// Re-export entry points
pub use actions::{
    reconcile_backlog, resolve_ticket, BacklogOptions, BacklogReport, Resolution,
    TicketChangedEvent,
};

// Re-export engine
pub use effects::{find_original, mark_as_duplicate, matches, CorpusConstraint};

pub use errors::DedupError;
pub use models::{MatchFields, MatchKey, Ticket};
