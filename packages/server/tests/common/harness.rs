//! Test harness wiring the in-memory CRM into the real router and resolvers.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use hubspot_client::CrmObject;
use serde_json::Value;
use server_core::kernel::{InMemoryTicketStore, ServerDeps, TestDependencies};
use server_core::server::build_app;
use tower::util::ServiceExt; // for `oneshot` method

pub struct TestHarness {
    pub deps: TestDependencies,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            deps: TestDependencies::new(),
        }
    }

    pub fn from_deps(deps: TestDependencies) -> Self {
        Self { deps }
    }

    pub fn with_ticket(self, ticket: CrmObject) -> Self {
        Self {
            deps: self.deps.with_ticket(ticket),
        }
    }

    pub fn store(&self) -> &InMemoryTicketStore {
        &self.deps.tickets
    }

    pub fn server_deps(&self) -> ServerDeps {
        self.deps.server_deps()
    }

    pub fn app(&self) -> Router {
        build_app(self.server_deps())
    }

    /// POST a raw body to `/webhook` and return status plus parsed JSON.
    pub async fn post_webhook_raw(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();

        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let json = serde_json::from_slice(&bytes).expect("Should parse JSON");
        (status, json)
    }

    pub async fn post_webhook(&self, payload: &Value) -> (StatusCode, Value) {
        self.post_webhook_raw(payload.to_string()).await
    }

    /// Duplicate markers currently stored on a ticket: (status, link).
    pub fn markers(&self, ticket_id: &str) -> (Option<String>, Option<String>) {
        let policy = &self.deps.policy;
        (
            self.store().property(ticket_id, &policy.status_property),
            self.store().property(ticket_id, &policy.link_property),
        )
    }

    pub fn link_to(&self, ticket_id: &str) -> String {
        self.deps.policy.ticket_link(ticket_id)
    }
}
