//! Ticket-changed webhook handler.
//!
//! Receives `{hs_ticket_id, rc__marca, rc__tipo_de_solicitacao, e_mail_do_aluno}`
//! from a CRM workflow and runs the reactive resolver. An optional `createdate`
//! (RFC 3339 or epoch millis) restricts originals to older tickets. Every outcome is
//! answered with a JSON body:
//! - `200 {"status":"sucesso"}` whether or not a duplicate was found
//! - `400 {"status":"erro","mensagem":...}` for an empty or incomplete payload
//! - `500 {"status":"erro","mensagem":...}` for CRM failures

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::actions::{resolve_ticket, Resolution, TicketChangedEvent};
use super::errors::DedupError;
use super::models::{parse_timestamp, MatchFields};
use crate::kernel::ServerDeps;

/// State shared with the webhook handler.
#[derive(Clone)]
pub struct WebhookState {
    pub deps: ServerDeps,
}

/// Ticket-changed payload sent by the CRM workflow.
#[derive(Debug, Default, Deserialize)]
pub struct TicketWebhookPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub hs_ticket_id: Option<String>,
    #[serde(rename = "rc__marca", default, deserialize_with = "lenient_string")]
    pub brand: Option<String>,
    #[serde(
        rename = "rc__tipo_de_solicitacao",
        default,
        deserialize_with = "lenient_string"
    )]
    pub request_type: Option<String>,
    #[serde(rename = "e_mail_do_aluno", default, deserialize_with = "lenient_string")]
    pub requester_email: Option<String>,
    #[serde(
        rename = "submotivo_do_contato",
        default,
        deserialize_with = "lenient_string"
    )]
    pub sub_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub createdate: Option<String>,
}

impl From<TicketWebhookPayload> for TicketChangedEvent {
    fn from(payload: TicketWebhookPayload) -> Self {
        TicketChangedEvent {
            ticket_id: payload.hs_ticket_id,
            created_at: payload.createdate.as_deref().and_then(parse_timestamp),
            fields: MatchFields {
                brand: payload.brand,
                request_type: payload.request_type,
                requester_email: payload.requester_email,
                sub_reason: payload.sub_reason,
            },
        }
    }
}

/// Workflow tools send ids as numbers or strings; accept both.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensagem: Option<String>,
}

impl WebhookResponse {
    fn success() -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "sucesso",
                mensagem: None,
            }),
        )
    }

    fn error(status: StatusCode, mensagem: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                status: "erro",
                mensagem: Some(mensagem.into()),
            }),
        )
    }
}

/// Build the axum router for the ticket webhook.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(handle_ticket_webhook))
        .with_state(state)
}

/// Parse the raw body. `None` for an empty body, invalid JSON, or anything
/// other than a non-empty JSON object.
pub fn parse_payload(body: &[u8]) -> Option<TicketWebhookPayload> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match &value {
        Value::Object(map) if !map.is_empty() => serde_json::from_value(value).ok(),
        _ => None,
    }
}

async fn handle_ticket_webhook(
    State(state): State<WebhookState>,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    tracing::info!(bytes = body.len(), "Ticket webhook received");

    let Some(payload) = parse_payload(&body) else {
        tracing::warn!("Rejecting webhook with empty payload");
        return WebhookResponse::error(StatusCode::BAD_REQUEST, "Payload vazio");
    };
    tracing::debug!(payload = ?payload, "Webhook payload");

    let event = TicketChangedEvent::from(payload);
    match resolve_ticket(&event, Utc::now(), &state.deps).await {
        Ok(Resolution::Duplicate { canonical_id }) => {
            tracing::info!(
                ticket_id = ?event.ticket_id,
                canonical_id = %canonical_id,
                "Webhook ticket flagged as duplicate"
            );
            WebhookResponse::success()
        }
        Ok(Resolution::Original) => WebhookResponse::success(),
        Err(DedupError::Validation { missing }) => {
            tracing::warn!(?missing, "Rejecting webhook with insufficient data");
            WebhookResponse::error(StatusCode::BAD_REQUEST, "Dados insuficientes")
        }
        Err(e) => {
            tracing::error!(
                ticket_id = ?event.ticket_id,
                error = %e,
                "Unexpected failure resolving ticket"
            );
            WebhookResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
