//! Decision engine tests below the HTTP layer.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use hubspot_client::{CrmObject, FilterOperator, SearchRequest, SearchResponse};
use server_core::domains::tickets::{
    find_original, mark_as_duplicate, resolve_ticket, CorpusConstraint, DedupError, MatchFields,
    Resolution, Ticket, TicketChangedEvent,
};
use server_core::kernel::{BaseTicketStore, ServerDeps, TestDependencies, TicketFixture};

use crate::common::{days_ago, open_ticket, TestHarness, BRAND, EMAIL, REQUEST_TYPE};

/// Store whose search index is out of date: it answers every search with
/// the same canned records regardless of filters.
struct StaleIndexStore {
    results: Vec<CrmObject>,
    updates: Mutex<Vec<String>>,
}

#[async_trait]
impl BaseTicketStore for StaleIndexStore {
    async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse> {
        Ok(SearchResponse {
            total: self.results.len() as u64,
            results: self.results.clone(),
            paging: None,
        })
    }

    async fn get(&self, ticket_id: &str, _properties: &[&str]) -> Result<CrmObject> {
        anyhow::bail!("ticket {} not found", ticket_id)
    }

    async fn update_properties(
        &self,
        ticket_id: &str,
        _properties: &HashMap<String, String>,
    ) -> Result<()> {
        self.updates.lock().unwrap().push(ticket_id.to_string());
        Ok(())
    }
}

/// Store whose equality filters ignore ASCII case, like a lenient CRM search.
/// Honours the requested limit and sorts oldest first.
struct CaseInsensitiveStore {
    tickets: Vec<CrmObject>,
}

#[async_trait]
impl BaseTicketStore for CaseInsensitiveStore {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut hits: Vec<CrmObject> = self
            .tickets
            .iter()
            .filter(|t| {
                request.filter_groups[0].filters.iter().all(|f| {
                    let value = if f.property_name == "hs_object_id" {
                        Some(t.id.as_str())
                    } else {
                        t.property(&f.property_name)
                    };
                    match f.operator {
                        FilterOperator::Eq => {
                            value.is_some_and(|v| v.eq_ignore_ascii_case(&f.value))
                        }
                        FilterOperator::Neq => value != Some(f.value.as_str()),
                        _ => true,
                    }
                })
            })
            .cloned()
            .collect();
        hits.sort_by_key(|t| Ticket::from_crm(t).created_at);
        hits.truncate(request.limit as usize);

        Ok(SearchResponse {
            total: hits.len() as u64,
            results: hits,
            paging: None,
        })
    }

    async fn get(&self, ticket_id: &str, _properties: &[&str]) -> Result<CrmObject> {
        anyhow::bail!("ticket {} not found", ticket_id)
    }

    async fn update_properties(
        &self,
        _ticket_id: &str,
        _properties: &HashMap<String, String>,
    ) -> Result<()> {
        Ok(())
    }
}

fn subject(id: &str) -> Ticket {
    Ticket {
        id: id.to_string(),
        created_at: Some(Utc::now()),
        pipeline_stage: None,
        fields: MatchFields {
            brand: Some(BRAND.into()),
            request_type: Some(REQUEST_TYPE.into()),
            requester_email: Some(EMAIL.into()),
            sub_reason: None,
        },
    }
}

fn event(id: &str) -> TicketChangedEvent {
    TicketChangedEvent {
        ticket_id: Some(id.to_string()),
        created_at: None,
        fields: subject(id).fields,
    }
}

#[tokio::test]
async fn stale_search_results_are_rechecked() {
    let moved_on = TicketFixture::new("T1", days_ago(2))
        .matching(BRAND, REQUEST_TYPE, "someone-else@x.com")
        .build();
    let closed_since = TicketFixture::new("T1", days_ago(2))
        .matching(BRAND, REQUEST_TYPE, EMAIL)
        .resolved()
        .build();

    for stale in [moved_on, closed_since] {
        let store = Arc::new(StaleIndexStore {
            results: vec![stale],
            updates: Mutex::new(Vec::new()),
        });
        let deps = ServerDeps::new(store.clone(), TestDependencies::new().policy);

        let found = find_original(
            &subject("T2"),
            CorpusConstraint::reactive(Utc::now(), None, &deps.policy),
            &deps,
        )
        .await
        .unwrap();

        assert_eq!(found, None);
    }
}

#[tokio::test]
async fn exact_original_behind_a_case_variant_is_found() {
    let case_variant = TicketFixture::new("T0", days_ago(5))
        .matching(BRAND, REQUEST_TYPE, "E@x.com")
        .build();
    let store = Arc::new(CaseInsensitiveStore {
        tickets: vec![case_variant, open_ticket("T1", days_ago(3))],
    });
    let deps = ServerDeps::new(store, TestDependencies::new().policy);

    let found = find_original(
        &subject("T2"),
        CorpusConstraint::reactive(Utc::now(), None, &deps.policy),
        &deps,
    )
    .await
    .unwrap();

    assert_eq!(found.map(|t| t.id), Some("T1".to_string()));
}

#[tokio::test]
async fn search_returning_the_subject_itself_is_ignored() {
    let store = Arc::new(StaleIndexStore {
        results: vec![open_ticket("T2", days_ago(1))],
        updates: Mutex::new(Vec::new()),
    });
    let deps = ServerDeps::new(store.clone(), TestDependencies::new().policy);

    let resolution = resolve_ticket(&event("T2"), Utc::now(), &deps).await.unwrap();

    assert_eq!(resolution, Resolution::Original);
    assert!(store.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn candidate_outside_constraint_is_ignored() {
    let store = Arc::new(StaleIndexStore {
        results: vec![open_ticket("T1", days_ago(40))],
        updates: Mutex::new(Vec::new()),
    });
    let deps = ServerDeps::new(store, TestDependencies::new().policy);

    let found = find_original(
        &subject("T2"),
        CorpusConstraint::reactive(Utc::now(), None, &deps.policy),
        &deps,
    )
    .await
    .unwrap();

    assert_eq!(found, None);
}

#[tokio::test]
async fn window_boundary_is_inclusive() {
    let now = Utc::now();
    let harness = TestHarness::new()
        .with_ticket(open_ticket("T1", now - Duration::days(30)))
        .with_ticket(open_ticket("T2", now));

    let resolution = resolve_ticket(&event("T2"), now, &harness.server_deps())
        .await
        .unwrap();

    assert_eq!(
        resolution,
        Resolution::Duplicate {
            canonical_id: "T1".into()
        }
    );
}

#[tokio::test]
async fn just_outside_window_is_original() {
    let now = Utc::now();
    let harness = TestHarness::new()
        .with_ticket(open_ticket("T1", now - Duration::days(30) - Duration::seconds(1)))
        .with_ticket(open_ticket("T2", now));

    let resolution = resolve_ticket(&event("T2"), now, &harness.server_deps())
        .await
        .unwrap();

    assert_eq!(resolution, Resolution::Original);
}

#[tokio::test]
async fn known_creation_date_excludes_newer_matches() {
    let now = Utc::now();
    let harness = TestHarness::new()
        .with_ticket(open_ticket("T1", days_ago(5)))
        .with_ticket(open_ticket("T2", days_ago(2)));

    let mut update_of_older = event("T1");
    update_of_older.created_at = Some(now - Duration::days(5));

    let resolution = resolve_ticket(&update_of_older, now, &harness.server_deps())
        .await
        .unwrap();

    assert_eq!(resolution, Resolution::Original);
    assert_eq!(harness.markers("T2"), (None, None));
    assert!(harness.store().updates().is_empty());
}

#[tokio::test]
async fn validation_lists_every_missing_field() {
    let harness = TestHarness::new();
    let incomplete = TicketChangedEvent {
        ticket_id: None,
        created_at: None,
        fields: MatchFields {
            brand: Some(BRAND.into()),
            ..Default::default()
        },
    };

    let err = resolve_ticket(&incomplete, Utc::now(), &harness.server_deps())
        .await
        .unwrap_err();

    match err {
        DedupError::Validation { missing } => assert_eq!(
            missing,
            vec!["hs_ticket_id", "rc__tipo_de_solicitacao", "e_mail_do_aluno"]
        ),
        other => panic!("expected validation error, got {}", other),
    }
    assert_eq!(harness.store().call_count(), 0);
}

#[tokio::test]
async fn mark_as_duplicate_is_idempotent() {
    let harness = TestHarness::new()
        .with_ticket(open_ticket("T1", days_ago(2)))
        .with_ticket(open_ticket("T2", days_ago(1)));
    let deps = harness.server_deps();

    mark_as_duplicate("T2", "T1", &deps).await.unwrap();
    let first = harness.markers("T2");
    mark_as_duplicate("T2", "T1", &deps).await.unwrap();

    assert_eq!(harness.markers("T2"), first);
    assert_eq!(harness.markers("T1"), (None, None));

    let updates = harness.store().updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0], updates[1]);
    assert_eq!(updates[0].ticket_id, "T2");
    assert_eq!(updates[0].properties.len(), 2);
}

#[tokio::test]
async fn sub_reason_flag_tightens_matching() {
    let with_reason = |id: &str, age: i64, reason: &str| {
        TicketFixture::new(id, days_ago(age))
            .matching(BRAND, REQUEST_TYPE, EMAIL)
            .property("submotivo_do_contato", Some(reason))
            .build()
    };
    let mut deps = TestDependencies::new()
        .with_ticket(with_reason("T1", 2, "Boleto"))
        .with_ticket(with_reason("T2", 1, "Matrícula"));
    deps.policy.match_sub_reason = true;
    let harness = TestHarness::from_deps(deps);

    let mut strict_event = event("T3");
    strict_event.fields.sub_reason = Some("Matrícula".into());

    let resolution = resolve_ticket(&strict_event, Utc::now(), &harness.server_deps())
        .await
        .unwrap();
    assert_eq!(
        resolution,
        Resolution::Duplicate {
            canonical_id: "T2".into()
        }
    );

    // Without a sub-reason the event is incomplete under this policy
    let err = resolve_ticket(&event("T4"), Utc::now(), &harness.server_deps())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}
