// Business domains
pub mod tickets;
