//! Duplicate decision engine shared by the reactive and backlog resolvers.
//!
//! `find_original` searches the CRM for the earliest open ticket with the same
//! match key, restricted by a mode-specific corpus constraint.
//! `mark_as_duplicate` writes the merge markers on the losing ticket.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hubspot_client::{Filter, FilterGroup, FilterOperator, SearchRequest, Sort};
use tracing::{debug, info, warn};

use super::matching::matches;
use crate::config::DedupPolicy;
use crate::domains::tickets::errors::DedupError;
use crate::domains::tickets::models::{properties, MatchKey, Ticket};
use crate::kernel::ServerDeps;

/// Candidates fetched per search. The CRM's equality filter is looser than
/// byte equality, so near-misses may sort ahead of the true original.
pub const CANDIDATE_BATCH: u32 = 10;

/// Which tickets are eligible as originals, besides the match key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusConstraint {
    /// Reactive mode: created at or after the instant (start of the window).
    CreatedSince(DateTime<Utc>),
    /// Backlog mode: created strictly before the subject.
    CreatedBefore(DateTime<Utc>),
    /// Reactive mode when the subject's creation date is known: inside the
    /// window and strictly older than the subject.
    CreatedBetween {
        since: DateTime<Utc>,
        before: DateTime<Utc>,
    },
}

impl CorpusConstraint {
    /// Window ending at `now` and reaching back `policy.reactive_window_days`.
    ///
    /// With a known `subject_created_at` the window is also capped at the
    /// subject, so an update to an old ticket never links it to a newer one.
    pub fn reactive(
        now: DateTime<Utc>,
        subject_created_at: Option<DateTime<Utc>>,
        policy: &DedupPolicy,
    ) -> Self {
        let since = now - policy.reactive_window();
        match subject_created_at {
            Some(before) => CorpusConstraint::CreatedBetween { since, before },
            None => CorpusConstraint::CreatedSince(since),
        }
    }

    pub fn filters(&self) -> Vec<Filter> {
        let created = |operator, at: &DateTime<Utc>| {
            Filter::new(
                properties::CREATE_DATE,
                operator,
                at.timestamp_millis().to_string(),
            )
        };
        match self {
            CorpusConstraint::CreatedSince(at) => vec![created(FilterOperator::Gte, at)],
            CorpusConstraint::CreatedBefore(at) => vec![created(FilterOperator::Lt, at)],
            CorpusConstraint::CreatedBetween { since, before } => vec![
                created(FilterOperator::Gte, since),
                created(FilterOperator::Lt, before),
            ],
        }
    }

    /// Local re-check of a candidate. Unknown creation dates are never admitted.
    pub fn admits(&self, candidate: &Ticket) -> bool {
        let Some(created) = candidate.created_at else {
            return false;
        };
        match self {
            CorpusConstraint::CreatedSince(at) => created >= *at,
            CorpusConstraint::CreatedBefore(at) => created < *at,
            CorpusConstraint::CreatedBetween { since, before } => {
                created >= *since && created < *before
            }
        }
    }
}

/// Search for the earliest open ticket sharing `key`, other than `subject_id`.
pub fn candidate_search(
    subject_id: &str,
    key: &MatchKey,
    constraint: CorpusConstraint,
    policy: &DedupPolicy,
) -> SearchRequest {
    let mut filters = vec![Filter::neq(properties::OBJECT_ID, subject_id)];
    filters.extend(key.filters());
    filters.push(Filter::neq(
        properties::PIPELINE_STAGE,
        &policy.resolved_stage_id,
    ));
    filters.extend(constraint.filters());

    SearchRequest {
        filter_groups: vec![FilterGroup { filters }],
        sorts: vec![Sort::ascending(properties::CREATE_DATE)],
        properties: properties::TICKET_PROPERTIES
            .iter()
            .map(|p| p.to_string())
            .collect(),
        limit: CANDIDATE_BATCH,
        after: None,
    }
}

/// Find the canonical ticket `subject` duplicates, if any.
///
/// Returns `Ok(None)` when the subject is itself the original. The search
/// index is eventually consistent, so each hit is re-checked with [`matches`]
/// and the constraint before it is trusted; the first one that passes wins.
pub async fn find_original(
    subject: &Ticket,
    constraint: CorpusConstraint,
    deps: &ServerDeps,
) -> Result<Option<Ticket>, DedupError> {
    let policy = deps.policy.as_ref();
    let key = subject
        .match_key(policy)
        .ok_or_else(|| DedupError::Validation {
            missing: subject.fields.missing(policy),
        })?;

    let request = candidate_search(&subject.id, &key, constraint, policy);
    let response = deps
        .tickets
        .search(&request)
        .await
        .map_err(DedupError::Upstream)?;

    let original = response
        .results
        .iter()
        .map(Ticket::from_crm)
        .find(|candidate| {
            let admitted = matches(subject, candidate, policy) && constraint.admits(candidate);
            if !admitted {
                warn!(
                    ticket_id = %subject.id,
                    candidate_id = %candidate.id,
                    "CRM search returned a candidate that does not match, skipping it"
                );
            }
            admitted
        });

    if original.is_none() {
        debug!(
            ticket_id = %subject.id,
            candidates = response.results.len(),
            "No open ticket with the same match fields"
        );
    }
    Ok(original)
}

/// Flag `duplicate_id` as ready to merge into `canonical_id`.
///
/// Only the duplicate is written. Repeating the call leaves the same state.
pub async fn mark_as_duplicate(
    duplicate_id: &str,
    canonical_id: &str,
    deps: &ServerDeps,
) -> Result<(), DedupError> {
    let policy = deps.policy.as_ref();

    let mut update = HashMap::new();
    update.insert(
        policy.status_property.clone(),
        policy.ready_to_merge_status.clone(),
    );
    update.insert(policy.link_property.clone(), policy.ticket_link(canonical_id));

    deps.tickets
        .update_properties(duplicate_id, &update)
        .await
        .map_err(DedupError::Upstream)?;

    info!(
        ticket_id = %duplicate_id,
        canonical_id = %canonical_id,
        "Ticket marked as duplicate"
    );
    Ok(())
}
