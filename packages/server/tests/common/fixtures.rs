//! Ticket fixtures shared by the integration tests.

use chrono::{DateTime, Duration, Utc};
use hubspot_client::CrmObject;
use serde_json::{json, Value};
use server_core::kernel::TicketFixture;

pub const BRAND: &str = "A";
pub const REQUEST_TYPE: &str = "X";
pub const EMAIL: &str = "e@x.com";

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Open support ticket with the standard match fields.
pub fn open_ticket(id: &str, created_at: DateTime<Utc>) -> CrmObject {
    TicketFixture::new(id, created_at)
        .matching(BRAND, REQUEST_TYPE, EMAIL)
        .build()
}

/// Webhook body for a ticket carrying the standard match fields.
pub fn webhook_payload(ticket_id: &str) -> Value {
    json!({
        "hs_ticket_id": ticket_id,
        "rc__marca": BRAND,
        "rc__tipo_de_solicitacao": REQUEST_TYPE,
        "e_mail_do_aluno": EMAIL,
    })
}
