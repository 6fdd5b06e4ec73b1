//! Pure HubSpot CRM REST API client.
//!
//! A minimal client for the CRM v3 objects API, scoped to tickets. Supports
//! filtered search with cursor paging, reading a single ticket, and patching
//! ticket properties. Non-2xx responses fail fast with [`HubSpotError::Api`];
//! nothing is retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use hubspot_client::{Filter, FilterGroup, HubSpotClient, SearchRequest, Sort};
//!
//! let client = HubSpotClient::new("private-app-token".into());
//!
//! let page = client
//!     .search_tickets(&SearchRequest {
//!         filter_groups: vec![FilterGroup {
//!             filters: vec![Filter::eq("hs_pipeline", "732696496")],
//!         }],
//!         sorts: vec![Sort::descending("createdate")],
//!         limit: 100,
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{HubSpotError, Result};
pub use types::{
    CrmObject, Filter, FilterGroup, FilterOperator, NextPage, Paging, SearchRequest,
    SearchResponse, Sort, SortDirection,
};

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use types::UpdateRequest;

const BASE_URL: &str = "https://api.hubapi.com";

#[derive(Clone)]
pub struct HubSpotClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl HubSpotClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API host (sandbox, proxy).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Search tickets. One page per call; follow `next_after()` for more.
    pub async fn search_tickets(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = format!("{}/crm/v3/objects/tickets/search", self.base_url);
        tracing::debug!(limit = request.limit, after = ?request.after, "Searching tickets");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        Self::parse(resp).await
    }

    /// Fetch one ticket with the given properties.
    pub async fn get_ticket(&self, ticket_id: &str, properties: &[&str]) -> Result<CrmObject> {
        let url = format!("{}/crm/v3/objects/tickets/{}", self.base_url, ticket_id);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("properties", properties.join(","))])
            .send()
            .await?;

        Self::parse(resp).await
    }

    /// Overwrite the given properties on a ticket. Other properties are untouched.
    pub async fn update_ticket(
        &self,
        ticket_id: &str,
        properties: &HashMap<String, String>,
    ) -> Result<CrmObject> {
        let url = format!("{}/crm/v3/objects/tickets/{}", self.base_url, ticket_id);
        tracing::debug!(ticket_id, "Updating ticket properties");

        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&UpdateRequest { properties })
            .send()
            .await?;

        Self::parse(resp).await
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HubSpotError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| HubSpotError::Parse(e.to_string()))
    }
}
