//! Reactive resolver - one ticket-changed event at a time.
//!
//! Holds no state between calls, so concurrent events for different tickets
//! are independent. Two events racing on the same ticket both write the same
//! markers; the CRM keeps the last one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::domains::tickets::effects::{find_original, mark_as_duplicate, CorpusConstraint};
use crate::domains::tickets::errors::DedupError;
use crate::domains::tickets::models::{MatchFields, Ticket};
use crate::kernel::ServerDeps;

/// Identifying data carried by a ticket-changed event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketChangedEvent {
    pub ticket_id: Option<String>,
    /// Creation date of the ticket, when the workflow sends it. Without it only
    /// the window bounds the search, so an update to an old ticket could be
    /// linked to a newer one.
    pub created_at: Option<DateTime<Utc>>,
    pub fields: MatchFields,
}

/// Outcome of resolving one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    /// No earlier open ticket matched; nothing was written.
    Original,
    /// The ticket was flagged as a duplicate of `canonical_id`.
    Duplicate { canonical_id: String },
}

/// Check one ticket against the recent window and flag it if it is a duplicate.
pub async fn resolve_ticket(
    event: &TicketChangedEvent,
    now: DateTime<Utc>,
    deps: &ServerDeps,
) -> Result<Resolution, DedupError> {
    let policy = deps.policy.as_ref();

    let ticket_id = event.ticket_id.as_deref().filter(|id| !id.is_empty());
    let mut missing = event.fields.missing(policy);
    if ticket_id.is_none() {
        missing.insert(0, "hs_ticket_id");
    }
    let Some(ticket_id) = ticket_id.filter(|_| missing.is_empty()) else {
        return Err(DedupError::Validation { missing });
    };

    let subject = Ticket {
        id: ticket_id.to_string(),
        created_at: event.created_at,
        pipeline_stage: None,
        fields: event.fields.clone(),
    };

    let constraint = CorpusConstraint::reactive(now, subject.created_at, policy);
    match find_original(&subject, constraint, deps).await? {
        Some(original) => {
            info!(
                ticket_id = %subject.id,
                canonical_id = %original.id,
                "Duplicate found"
            );
            mark_as_duplicate(&subject.id, &original.id, deps).await?;
            Ok(Resolution::Duplicate {
                canonical_id: original.id,
            })
        }
        None => {
            info!(ticket_id = %subject.id, "No duplicate found, ticket is original");
            Ok(Resolution::Original)
        }
    }
}
