//! Internal names of the HubSpot ticket properties the resolver reads and writes.

pub const OBJECT_ID: &str = "hs_object_id";
pub const CREATE_DATE: &str = "createdate";
pub const PIPELINE: &str = "hs_pipeline";
pub const PIPELINE_STAGE: &str = "hs_pipeline_stage";
pub const SUBJECT: &str = "subject";

// Match fields
pub const BRAND: &str = "rc__marca";
pub const REQUEST_TYPE: &str = "rc__tipo_de_solicitacao";
pub const REQUESTER_EMAIL: &str = "e_mail_do_aluno";
pub const SUB_REASON: &str = "submotivo_do_contato";

/// Properties requested on every search so results can be re-checked locally.
pub const TICKET_PROPERTIES: &[&str] = &[
    CREATE_DATE,
    PIPELINE,
    PIPELINE_STAGE,
    BRAND,
    REQUEST_TYPE,
    REQUESTER_EMAIL,
    SUB_REASON,
];

/// Properties shown by the diagnostics command.
pub const INSPECT_PROPERTIES: &[&str] = &[
    SUBJECT,
    PIPELINE_STAGE,
    BRAND,
    REQUEST_TYPE,
    SUB_REASON,
    REQUESTER_EMAIL,
];
