//! Matching predicate - when two tickets describe the same issue.
//!
//! Pure function of the two tickets and the policy. The time window and the
//! older-than rule are not part of it: they depend on the resolver mode and are
//! applied as corpus constraints before the predicate runs (see `engine`).

use crate::config::DedupPolicy;
use crate::domains::tickets::models::Ticket;

/// True if `candidate` may absorb `subject` as its duplicate.
///
/// Requires exact, case-sensitive equality of every match field, an open
/// candidate and distinct ids. Callers filter out tickets with incomplete
/// match fields first; if one slips through it never matches.
pub fn matches(subject: &Ticket, candidate: &Ticket, policy: &DedupPolicy) -> bool {
    if subject.id == candidate.id || candidate.is_resolved(policy) {
        return false;
    }

    match (subject.match_key(policy), candidate.match_key(policy)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
