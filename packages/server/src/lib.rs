// Duplicate Ticket Resolver - Server Core
//
// Detects support tickets that repeat an earlier open ticket (same brand,
// request type and requester email) and flags them for merging in HubSpot.
// The same decision engine runs per webhook event and over the whole backlog.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
