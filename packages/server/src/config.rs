use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub hubspot_api_key: String,
    pub hubspot_api_base_url: String,
    pub policy: DedupPolicy,
}

/// Business rules of the duplicate-ticket matcher.
///
/// Everything the engine needs to know about the CRM account lives here so
/// that decision code never reaches for process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupPolicy {
    /// HubSpot portal (account) id, used in deep links.
    pub portal_id: String,
    /// Base of the ticket deep link, e.g. `https://app.hubspot.com/contacts`.
    pub app_base_url: String,
    /// Pipeline whose open tickets the backlog walk enumerates.
    pub support_pipeline_id: String,
    /// Stage id meaning resolved/closed. Tickets here never absorb duplicates.
    pub resolved_stage_id: String,
    /// How far back the reactive resolver looks for an original.
    pub reactive_window_days: i64,
    /// Whether `submotivo_do_contato` must also be equal.
    pub match_sub_reason: bool,
    pub status_property: String,
    pub link_property: String,
    pub ready_to_merge_status: String,
    /// Backlog page size (the CRM caps this at 100).
    pub page_size: u32,
    /// Delay between backlog page fetches and between per-ticket checks.
    pub pacing: Duration,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            portal_id: String::new(),
            app_base_url: "https://app.hubspot.com/contacts".to_string(),
            support_pipeline_id: "732696496".to_string(),
            resolved_stage_id: "1067263045".to_string(),
            reactive_window_days: 30,
            match_sub_reason: false,
            status_property: "status_da_duplicata".to_string(),
            link_property: "link_para_o_ticket_original".to_string(),
            ready_to_merge_status: "Pronto para mesclar".to_string(),
            page_size: 100,
            pacing: Duration::from_millis(500),
        }
    }
}

impl DedupPolicy {
    /// Deep link to a ticket in the CRM UI.
    pub fn ticket_link(&self, ticket_id: &str) -> String {
        format!(
            "{}/{}/ticket/{}",
            self.app_base_url.trim_end_matches('/'),
            self.portal_id,
            ticket_id
        )
    }

    pub fn reactive_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.reactive_window_days)
    }

    /// Reject values the CRM or the date arithmetic cannot take.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.reactive_window_days) {
            anyhow::bail!(
                "DEDUP_REACTIVE_WINDOW_DAYS must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS,
                self.reactive_window_days
            );
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            anyhow::bail!(
                "DEDUP_PAGE_SIZE must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.page_size
            );
        }
        Ok(())
    }
}

/// Ten years.
const MAX_WINDOW_DAYS: i64 = 3650;
/// Search page cap of the CRM API.
const MAX_PAGE_SIZE: u32 = 100;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mut policy = DedupPolicy {
            portal_id: env::var("HUBSPOT_PORTAL_ID").context("HUBSPOT_PORTAL_ID must be set")?,
            ..Default::default()
        };
        if let Ok(url) = env::var("HUBSPOT_APP_BASE_URL") {
            policy.app_base_url = url;
        }
        if let Ok(id) = env::var("DEDUP_SUPPORT_PIPELINE_ID") {
            policy.support_pipeline_id = id;
        }
        if let Ok(id) = env::var("DEDUP_RESOLVED_STAGE_ID") {
            policy.resolved_stage_id = id;
        }
        if let Ok(days) = env::var("DEDUP_REACTIVE_WINDOW_DAYS") {
            policy.reactive_window_days = days
                .parse()
                .context("DEDUP_REACTIVE_WINDOW_DAYS must be a whole number of days")?;
        }
        policy.match_sub_reason = parse_flag(env::var("DEDUP_MATCH_SUB_REASON").ok().as_deref())
            .context("DEDUP_MATCH_SUB_REASON must be true or false")?;
        if let Ok(size) = env::var("DEDUP_PAGE_SIZE") {
            policy.page_size = size.parse().context("DEDUP_PAGE_SIZE must be a valid number")?;
        }
        if let Ok(ms) = env::var("DEDUP_PACING_MS") {
            policy.pacing = Duration::from_millis(
                ms.parse().context("DEDUP_PACING_MS must be a valid number")?,
            );
        }

        policy.validate()?;

        if policy.portal_id.trim().is_empty() {
            anyhow::bail!("HUBSPOT_PORTAL_ID must not be empty");
        }

        let hubspot_api_key =
            env::var("HUBSPOT_API_KEY").context("HUBSPOT_API_KEY must be set")?;
        if hubspot_api_key.trim().is_empty() {
            anyhow::bail!("HUBSPOT_API_KEY must not be empty");
        }

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            hubspot_api_key,
            hubspot_api_base_url: env::var("HUBSPOT_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.hubapi.com".to_string()),
            policy,
        })
    }
}

fn parse_flag(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(other) => anyhow::bail!("unrecognised flag value {:?}", other),
    }
}
