//! Server dependencies for the duplicate resolver (using traits for testability)
//!
//! Both the webhook handler and the backlog CLI receive a `ServerDeps`; the CRM
//! is only reachable through the `BaseTicketStore` trait object it carries.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use hubspot_client::{CrmObject, HubSpotClient, SearchRequest, SearchResponse};

use crate::config::{Config, DedupPolicy};
use crate::kernel::BaseTicketStore;

// =============================================================================
// HubSpotClient Adapter (implements BaseTicketStore trait)
// =============================================================================

/// Wrapper around HubSpotClient that implements BaseTicketStore trait
pub struct HubSpotAdapter(pub Arc<HubSpotClient>);

impl HubSpotAdapter {
    pub fn new(client: Arc<HubSpotClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseTicketStore for HubSpotAdapter {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        Ok(self.0.search_tickets(request).await?)
    }

    async fn get(&self, ticket_id: &str, properties: &[&str]) -> Result<CrmObject> {
        Ok(self.0.get_ticket(ticket_id, properties).await?)
    }

    async fn update_properties(
        &self,
        ticket_id: &str,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        self.0.update_ticket(ticket_id, properties).await?;
        Ok(())
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Dependencies shared by the reactive and backlog resolvers
#[derive(Clone)]
pub struct ServerDeps {
    pub tickets: Arc<dyn BaseTicketStore>,
    pub policy: Arc<DedupPolicy>,
}

impl ServerDeps {
    pub fn new(tickets: Arc<dyn BaseTicketStore>, policy: DedupPolicy) -> Self {
        Self {
            tickets,
            policy: Arc::new(policy),
        }
    }

    /// Wire the real HubSpot client from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let client = HubSpotClient::new(config.hubspot_api_key.clone())
            .with_base_url(config.hubspot_api_base_url.clone());
        Self::new(
            Arc::new(HubSpotAdapter::new(Arc::new(client))),
            config.policy.clone(),
        )
    }
}
