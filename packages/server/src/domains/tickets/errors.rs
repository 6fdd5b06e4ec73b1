use thiserror::Error;

/// Failures of the duplicate resolver.
///
/// "No duplicate found" is not an error; it is `Resolution::Original`.
#[derive(Debug, Error)]
pub enum DedupError {
    /// Ticket id or a match field is missing. Raised before any CRM call.
    #[error("insufficient ticket data (missing: {})", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// The CRM rejected a search or update. Never retried here.
    #[error("CRM request failed: {0:#}")]
    Upstream(anyhow::Error),
}

impl DedupError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DedupError::Validation { .. })
    }
}
