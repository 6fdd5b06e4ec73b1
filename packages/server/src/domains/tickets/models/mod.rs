pub mod properties;
pub mod ticket;

pub use ticket::{parse_timestamp, MatchFields, MatchKey, Ticket};
