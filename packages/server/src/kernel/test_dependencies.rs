// TestDependencies - in-memory CRM for testing
//
// Provides a ticket store that evaluates the same filter language as the
// HubSpot search endpoint, so the resolvers can be exercised end to end
// without network access.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubspot_client::{
    CrmObject, Filter, FilterOperator, HubSpotError, NextPage, Paging, SearchRequest,
    SearchResponse, SortDirection,
};

use super::{BaseTicketStore, ServerDeps};
use crate::config::DedupPolicy;
use crate::domains::tickets::models::properties;

// =============================================================================
// In-memory Ticket Store
// =============================================================================

/// A property patch captured from `update_properties`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub ticket_id: String,
    pub properties: HashMap<String, String>,
}

pub struct InMemoryTicketStore {
    tickets: Mutex<Vec<CrmObject>>,
    searches: Mutex<Vec<SearchRequest>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    search_failure: Mutex<Option<u16>>,
    failing_subjects: Mutex<HashSet<String>>,
    failing_updates: Mutex<HashSet<String>>,
}

impl Default for InMemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self {
            tickets: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            search_failure: Mutex::new(None),
            failing_subjects: Mutex::new(HashSet::new()),
            failing_updates: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_ticket(self, ticket: CrmObject) -> Self {
        self.insert(ticket);
        self
    }

    pub fn insert(&self, ticket: CrmObject) {
        self.tickets.lock().unwrap().push(ticket);
    }

    /// Make every search fail with the given HTTP status
    pub fn fail_searches(&self, status: u16) {
        *self.search_failure.lock().unwrap() = Some(status);
    }

    /// Make candidate searches on behalf of one ticket fail with a 500
    pub fn fail_searches_for(&self, ticket_id: &str) {
        self.failing_subjects
            .lock()
            .unwrap()
            .insert(ticket_id.to_string());
    }

    /// Make updates to one ticket fail with a 500
    pub fn fail_updates_for(&self, ticket_id: &str) {
        self.failing_updates
            .lock()
            .unwrap()
            .insert(ticket_id.to_string());
    }

    /// Current state of a stored ticket
    pub fn ticket(&self, ticket_id: &str) -> Option<CrmObject> {
        self.tickets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == ticket_id)
            .cloned()
    }

    /// Current value of one property on a stored ticket
    pub fn property(&self, ticket_id: &str, name: &str) -> Option<String> {
        self.ticket(ticket_id)
            .and_then(|t| t.property(name).map(str::to_string))
    }

    /// All search requests received, in order
    pub fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().unwrap().clone()
    }

    /// All successful property patches, in order
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }

    /// Number of calls made against the store (searches + updates)
    pub fn call_count(&self) -> usize {
        self.searches.lock().unwrap().len() + self.updates.lock().unwrap().len()
    }

    fn subject_of(request: &SearchRequest) -> Option<&str> {
        request
            .filter_groups
            .iter()
            .flat_map(|g| g.filters.iter())
            .find(|f| f.property_name == properties::OBJECT_ID && f.operator == FilterOperator::Neq)
            .map(|f| f.value.as_str())
    }
}

fn api_error(status: u16, message: impl Into<String>) -> anyhow::Error {
    HubSpotError::Api {
        status,
        message: message.into(),
    }
    .into()
}

fn value_of<'a>(ticket: &'a CrmObject, property: &str) -> Option<&'a str> {
    if property == properties::OBJECT_ID {
        Some(ticket.id.as_str())
    } else {
        ticket.property(property)
    }
}

/// Epoch millis from either a numeric string or an RFC 3339 timestamp.
fn as_millis(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().or_else(|| {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|d| d.timestamp_millis())
    })
}

fn compare_values(a: &str, b: &str) -> Ordering {
    match (as_millis(a), as_millis(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn satisfies(ticket: &CrmObject, filter: &Filter) -> bool {
    let value = value_of(ticket, &filter.property_name);
    match filter.operator {
        FilterOperator::Eq => value == Some(filter.value.as_str()),
        FilterOperator::Neq => value != Some(filter.value.as_str()),
        op => value.is_some_and(|v| {
            let ord = compare_values(v, &filter.value);
            match op {
                FilterOperator::Lt => ord == Ordering::Less,
                FilterOperator::Lte => ord != Ordering::Greater,
                FilterOperator::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }
        }),
    }
}

#[async_trait]
impl BaseTicketStore for InMemoryTicketStore {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.searches.lock().unwrap().push(request.clone());

        if let Some(status) = *self.search_failure.lock().unwrap() {
            return Err(api_error(status, "search unavailable"));
        }
        if let Some(subject) = Self::subject_of(request) {
            if self.failing_subjects.lock().unwrap().contains(subject) {
                return Err(api_error(500, format!("search failed for {}", subject)));
            }
        }

        let mut hits: Vec<CrmObject> = self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                request.filter_groups.is_empty()
                    || request
                        .filter_groups
                        .iter()
                        .any(|g| g.filters.iter().all(|f| satisfies(t, f)))
            })
            .cloned()
            .collect();

        if let Some(sort) = request.sorts.first() {
            hits.sort_by(|a, b| {
                let ord = match (
                    value_of(a, &sort.property_name),
                    value_of(b, &sort.property_name),
                ) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let total = hits.len();
        let offset = request
            .after
            .as_deref()
            .and_then(|a| a.parse::<usize>().ok())
            .unwrap_or(0)
            .min(total);
        let end = (offset + request.limit as usize).min(total);
        let paging = (end < total).then(|| Paging {
            next: Some(NextPage {
                after: end.to_string(),
            }),
        });

        Ok(SearchResponse {
            total: total as u64,
            results: hits[offset..end].to_vec(),
            paging,
        })
    }

    async fn get(&self, ticket_id: &str, _properties: &[&str]) -> Result<CrmObject> {
        self.ticket(ticket_id)
            .ok_or_else(|| api_error(404, format!("ticket {} not found", ticket_id)))
    }

    async fn update_properties(
        &self,
        ticket_id: &str,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        if self.failing_updates.lock().unwrap().contains(ticket_id) {
            return Err(api_error(500, format!("update failed for {}", ticket_id)));
        }

        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| api_error(404, format!("ticket {} not found", ticket_id)))?;
        for (name, value) in properties {
            ticket.properties.insert(name.clone(), Some(value.clone()));
        }

        self.updates.lock().unwrap().push(RecordedUpdate {
            ticket_id: ticket_id.to_string(),
            properties: properties.clone(),
        });
        Ok(())
    }
}

// =============================================================================
// Ticket fixtures
// =============================================================================

/// Builder for CRM ticket records used in tests.
///
/// Tickets start open, in the default support pipeline, with no match fields.
pub struct TicketFixture {
    object: CrmObject,
}

impl TicketFixture {
    pub fn new(id: &str, created_at: DateTime<Utc>) -> Self {
        let policy = DedupPolicy::default();
        let object = CrmObject {
            id: id.to_string(),
            ..Default::default()
        };
        Self { object }
            .property(properties::CREATE_DATE, Some(created_at.to_rfc3339().as_str()))
            .property(properties::PIPELINE, Some(policy.support_pipeline_id.as_str()))
            .property(properties::PIPELINE_STAGE, Some("1"))
    }

    pub fn property(mut self, name: &str, value: Option<&str>) -> Self {
        self.object
            .properties
            .insert(name.to_string(), value.map(str::to_string));
        self
    }

    pub fn matching(self, brand: &str, request_type: &str, requester_email: &str) -> Self {
        self.property(properties::BRAND, Some(brand))
            .property(properties::REQUEST_TYPE, Some(request_type))
            .property(properties::REQUESTER_EMAIL, Some(requester_email))
    }

    pub fn stage(self, stage_id: &str) -> Self {
        self.property(properties::PIPELINE_STAGE, Some(stage_id))
    }

    pub fn resolved(self) -> Self {
        let stage = DedupPolicy::default().resolved_stage_id;
        self.stage(&stage)
    }

    pub fn build(self) -> CrmObject {
        self.object
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub struct TestDependencies {
    pub tickets: Arc<InMemoryTicketStore>,
    pub policy: DedupPolicy,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    /// Fresh store, default policy, portal `12345`, no pacing delay.
    pub fn new() -> Self {
        Self {
            tickets: Arc::new(InMemoryTicketStore::new()),
            policy: DedupPolicy {
                portal_id: "12345".to_string(),
                pacing: Duration::ZERO,
                ..Default::default()
            },
        }
    }

    pub fn with_ticket(self, ticket: CrmObject) -> Self {
        self.tickets.insert(ticket);
        self
    }

    pub fn with_policy(mut self, policy: DedupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Convert into ServerDeps backed by the in-memory store
    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(self.tickets.clone(), self.policy.clone())
    }
}
