use chrono::{DateTime, TimeZone, Utc};
use hubspot_client::{CrmObject, Filter};

use super::properties;
use crate::config::DedupPolicy;

/// Ticket as seen by the duplicate resolver.
///
/// Only the fields needed to decide duplication are kept. `created_at` is
/// `None` when the ticket came from a webhook event (the payload does not
/// carry it) or the CRM returned an unparseable date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub pipeline_stage: Option<String>,
    pub fields: MatchFields,
}

/// Raw identifying attributes, any of which may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFields {
    pub brand: Option<String>,
    pub request_type: Option<String>,
    pub requester_email: Option<String>,
    pub sub_reason: Option<String>,
}

/// Fully populated match fields. Two tickets are the same issue only if
/// their keys are equal, byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub brand: String,
    pub request_type: String,
    pub requester_email: String,
    /// Present only when the policy matches on sub-reason.
    pub sub_reason: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl MatchFields {
    /// Complete key under `policy`, or `None` if any required field is missing or empty.
    pub fn key(&self, policy: &DedupPolicy) -> Option<MatchKey> {
        let sub_reason = if policy.match_sub_reason {
            Some(present(&self.sub_reason)?.to_string())
        } else {
            None
        };

        Some(MatchKey {
            brand: present(&self.brand)?.to_string(),
            request_type: present(&self.request_type)?.to_string(),
            requester_email: present(&self.requester_email)?.to_string(),
            sub_reason,
        })
    }

    /// Property names of the required fields that are missing or empty.
    pub fn missing(&self, policy: &DedupPolicy) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if present(&self.brand).is_none() {
            missing.push(properties::BRAND);
        }
        if present(&self.request_type).is_none() {
            missing.push(properties::REQUEST_TYPE);
        }
        if policy.match_sub_reason && present(&self.sub_reason).is_none() {
            missing.push(properties::SUB_REASON);
        }
        if present(&self.requester_email).is_none() {
            missing.push(properties::REQUESTER_EMAIL);
        }
        missing
    }
}

impl MatchKey {
    /// Equality filters selecting tickets with this key.
    pub fn filters(&self) -> Vec<Filter> {
        let mut filters = vec![
            Filter::eq(properties::BRAND, &self.brand),
            Filter::eq(properties::REQUEST_TYPE, &self.request_type),
        ];
        if let Some(sub_reason) = &self.sub_reason {
            filters.push(Filter::eq(properties::SUB_REASON, sub_reason));
        }
        filters.push(Filter::eq(properties::REQUESTER_EMAIL, &self.requester_email));
        filters
    }
}

impl Ticket {
    pub fn from_crm(object: &CrmObject) -> Self {
        let text = |name: &str| object.property(name).map(str::to_string);

        Self {
            id: object.id.clone(),
            created_at: object
                .property(properties::CREATE_DATE)
                .or(object.created_at.as_deref())
                .and_then(parse_timestamp),
            pipeline_stage: text(properties::PIPELINE_STAGE),
            fields: MatchFields {
                brand: text(properties::BRAND),
                request_type: text(properties::REQUEST_TYPE),
                requester_email: text(properties::REQUESTER_EMAIL),
                sub_reason: text(properties::SUB_REASON),
            },
        }
    }

    pub fn match_key(&self, policy: &DedupPolicy) -> Option<MatchKey> {
        self.fields.key(policy)
    }

    pub fn is_resolved(&self, policy: &DedupPolicy) -> bool {
        self.pipeline_stage.as_deref() == Some(policy.resolved_stage_id.as_str())
    }
}

/// Parse a CRM date: RFC 3339 (`2024-05-01T12:00:00.000Z`) or epoch millis.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fields(brand: &str, request_type: &str, email: &str) -> MatchFields {
        MatchFields {
            brand: Some(brand.into()),
            request_type: Some(request_type.into()),
            requester_email: Some(email.into()),
            sub_reason: None,
        }
    }

    #[test]
    fn key_requires_every_match_field() {
        let policy = DedupPolicy::default();
        assert!(fields("A", "X", "e@x.com").key(&policy).is_some());

        let mut blank_email = fields("A", "X", "");
        assert_eq!(blank_email.key(&policy), None);
        assert_eq!(blank_email.missing(&policy), vec![properties::REQUESTER_EMAIL]);

        blank_email.brand = None;
        assert_eq!(
            blank_email.missing(&policy),
            vec![properties::BRAND, properties::REQUESTER_EMAIL]
        );
    }

    #[test]
    fn sub_reason_only_required_when_policy_includes_it() {
        let relaxed = DedupPolicy::default();
        let strict = DedupPolicy {
            match_sub_reason: true,
            ..Default::default()
        };
        let f = fields("A", "X", "e@x.com");

        assert_eq!(f.key(&relaxed).unwrap().sub_reason, None);
        assert_eq!(f.key(&strict), None);
        assert_eq!(f.missing(&strict), vec![properties::SUB_REASON]);

        let with_reason = MatchFields {
            sub_reason: Some("Boleto".into()),
            ..f
        };
        let key = with_reason.key(&strict).unwrap();
        assert_eq!(key.sub_reason.as_deref(), Some("Boleto"));
        assert_eq!(key.filters().len(), 4);
        assert_eq!(with_reason.key(&relaxed).unwrap().filters().len(), 3);
    }

    #[test]
    fn from_crm_reads_hubspot_properties() {
        let mut props = HashMap::new();
        props.insert("createdate".to_string(), Some("2024-05-01T12:00:00.000Z".to_string()));
        props.insert("hs_pipeline_stage".to_string(), Some("1067263045".to_string()));
        props.insert("rc__marca".to_string(), Some("A".to_string()));
        props.insert("e_mail_do_aluno".to_string(), None);
        let object = CrmObject {
            id: "77".into(),
            properties: props,
            ..Default::default()
        };

        let ticket = Ticket::from_crm(&object);
        assert_eq!(ticket.id, "77");
        assert_eq!(
            ticket.created_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert!(ticket.is_resolved(&DedupPolicy::default()));
        assert_eq!(ticket.fields.brand.as_deref(), Some("A"));
        assert_eq!(ticket.fields.requester_email, None);
    }

    #[test]
    fn parses_epoch_millis() {
        assert_eq!(
            parse_timestamp("1714564800000"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
