//! Backlog reconciler - replays the duplicate decision over every open ticket.
//!
//! Each ticket is only ever linked to a strictly older original, so the walk
//! converges: for a fixed corpus every run picks the same canonical ticket and
//! writes the same markers. An interrupted run can be restarted from the first
//! page, or resumed from the last reported cursor.
//!
//! Stale markers from earlier runs are never cleared, only overwritten when a
//! true original is found.

use futures::{pin_mut, Stream, StreamExt};
use hubspot_client::{Filter, FilterGroup, SearchRequest, Sort};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::domains::tickets::effects::{find_original, mark_as_duplicate, CorpusConstraint};
use crate::domains::tickets::errors::DedupError;
use crate::domains::tickets::models::{properties, Ticket};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default)]
pub struct BacklogOptions {
    /// Resume paging from this cursor instead of the first page.
    pub start_after: Option<String>,
    /// Run every search but write nothing.
    pub dry_run: bool,
}

/// Totals of one backlog run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BacklogReport {
    pub scanned: usize,
    pub skipped_incomplete: usize,
    pub duplicates_found: usize,
    pub originals: usize,
    pub failed: usize,
    /// Cursor of the next unprocessed page, `None` once the walk is complete.
    pub last_cursor: Option<String>,
}

/// One page of open tickets and the cursor to the next one.
#[derive(Debug, Clone)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub next_after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TicketOutcome {
    Skipped,
    Original,
    Duplicate { canonical_id: String },
}

/// Open tickets of the support pipeline, newest first.
pub fn open_tickets_search(deps: &ServerDeps, after: Option<String>) -> SearchRequest {
    let policy = deps.policy.as_ref();
    SearchRequest {
        filter_groups: vec![FilterGroup {
            filters: vec![
                Filter::eq(properties::PIPELINE, &policy.support_pipeline_id),
                Filter::neq(properties::PIPELINE_STAGE, &policy.resolved_stage_id),
            ],
        }],
        sorts: vec![Sort::descending(properties::CREATE_DATE)],
        properties: properties::TICKET_PROPERTIES
            .iter()
            .map(|p| p.to_string())
            .collect(),
        limit: policy.page_size,
        after,
    }
}

/// Lazily page through the open-ticket corpus.
///
/// Ends when the CRM stops returning a cursor. Waits `policy.pacing` before
/// each follow-up page. A failed fetch ends the stream with that error.
pub fn open_ticket_pages(
    deps: ServerDeps,
    start_after: Option<String>,
) -> impl Stream<Item = Result<TicketPage, DedupError>> {
    async_stream::try_stream! {
        let mut after = start_after;
        loop {
            let request = open_tickets_search(&deps, after.clone());
            let response = deps
                .tickets
                .search(&request)
                .await
                .map_err(DedupError::Upstream)?;

            let next_after = response.next_after().map(str::to_string);
            yield TicketPage {
                tickets: response.results.iter().map(Ticket::from_crm).collect(),
                next_after: next_after.clone(),
            };

            match next_after {
                Some(cursor) => {
                    after = Some(cursor);
                    tokio::time::sleep(deps.policy.pacing).await;
                }
                None => break,
            }
        }
    }
}

/// Walk every open ticket and link each duplicate to its oldest original.
///
/// Per-ticket failures are logged and counted; the walk moves on. Only a
/// failed page fetch aborts the run.
pub async fn reconcile_backlog(
    options: BacklogOptions,
    deps: &ServerDeps,
) -> Result<BacklogReport, DedupError> {
    info!(
        start_after = ?options.start_after,
        dry_run = options.dry_run,
        pipeline = %deps.policy.support_pipeline_id,
        "Starting backlog reconciliation"
    );

    let mut report = BacklogReport {
        last_cursor: options.start_after.clone(),
        ..Default::default()
    };

    let pages = open_ticket_pages(deps.clone(), options.start_after.clone());
    pin_mut!(pages);

    while let Some(page) = pages.next().await {
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                error!(
                    error = %e,
                    last_cursor = ?report.last_cursor,
                    "Failed to fetch open tickets, aborting backlog run"
                );
                return Err(e);
            }
        };
        info!(count = page.tickets.len(), "Fetched page of open tickets");

        for ticket in &page.tickets {
            report.scanned += 1;
            debug!(ticket_id = %ticket.id, scanned = report.scanned, "Re-checking ticket");

            match reconcile_ticket(ticket, options.dry_run, deps).await {
                Ok(TicketOutcome::Skipped) => {
                    report.skipped_incomplete += 1;
                    continue;
                }
                Ok(TicketOutcome::Original) => report.originals += 1,
                Ok(TicketOutcome::Duplicate { canonical_id }) => {
                    report.duplicates_found += 1;
                    info!(
                        ticket_id = %ticket.id,
                        canonical_id = %canonical_id,
                        dry_run = options.dry_run,
                        "Backlog ticket is a duplicate"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!(ticket_id = %ticket.id, error = %e, "Failed to reconcile ticket");
                }
            }

            tokio::time::sleep(deps.policy.pacing).await;
        }

        report.last_cursor = page.next_after;
    }

    info!(
        scanned = report.scanned,
        skipped_incomplete = report.skipped_incomplete,
        duplicates_found = report.duplicates_found,
        originals = report.originals,
        failed = report.failed,
        "Backlog reconciliation complete"
    );

    Ok(report)
}

async fn reconcile_ticket(
    ticket: &Ticket,
    dry_run: bool,
    deps: &ServerDeps,
) -> Result<TicketOutcome, DedupError> {
    let policy = deps.policy.as_ref();

    let Some(created_at) = ticket.created_at else {
        debug!(ticket_id = %ticket.id, "Skipping ticket without a creation date");
        return Ok(TicketOutcome::Skipped);
    };
    if ticket.match_key(policy).is_none() {
        debug!(
            ticket_id = %ticket.id,
            missing = ?ticket.fields.missing(policy),
            "Skipping ticket with incomplete match fields"
        );
        return Ok(TicketOutcome::Skipped);
    }

    match find_original(ticket, CorpusConstraint::CreatedBefore(created_at), deps).await? {
        Some(original) => {
            if !dry_run {
                mark_as_duplicate(&ticket.id, &original.id, deps).await?;
            }
            Ok(TicketOutcome::Duplicate {
                canonical_id: original.id,
            })
        }
        None => Ok(TicketOutcome::Original),
    }
}
