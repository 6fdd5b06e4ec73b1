//! Ticket resolver entry points - one per mode, both driving the shared engine.

pub mod reconcile_backlog;
pub mod resolve_ticket;

pub use reconcile_backlog::{
    open_ticket_pages, open_tickets_search, reconcile_backlog, BacklogOptions, BacklogReport,
    TicketPage,
};
pub use resolve_ticket::{resolve_ticket, Resolution, TicketChangedEvent};
