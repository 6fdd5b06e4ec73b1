// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Duplicate detection lives in domains::tickets and talks to the CRM through these.
//
// Naming convention: Base* for trait names (e.g., BaseTicketStore)

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use hubspot_client::{CrmObject, SearchRequest, SearchResponse};

// =============================================================================
// Ticket Store Trait (Infrastructure - CRM ticket objects)
// =============================================================================

#[async_trait]
pub trait BaseTicketStore: Send + Sync {
    /// Run one page of a filtered ticket search
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// Read a single ticket with the requested properties
    async fn get(&self, ticket_id: &str, properties: &[&str]) -> Result<CrmObject>;

    /// Overwrite the given properties on a ticket (last write wins)
    async fn update_properties(
        &self,
        ticket_id: &str,
        properties: &HashMap<String, String>,
    ) -> Result<()>;
}
