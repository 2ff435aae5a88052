//! # Forms Core
//!
//! Schema interpretation and validation engine for clinical encounter forms.
//!
//! This crate contains the engine only:
//! - Loading form definitions and looking them up by category/discipline
//! - Reducing a form to the questions tagged for a workflow intent
//! - Validating field values, with an explicit "unspecified" override
//! - Tracking per-field state across focus, blur, override toggles and background enrichment
//! - Assembling a report-only submission and shaping it into an encounter payload
//!
//! **No transport or rendering concerns**: how values are persisted and how fields are drawn
//! belong to the host (see the `forms-cli` crate for a minimal host).

pub mod assembler;
pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod field;
pub mod handler;
pub mod intent;
pub mod schema;
pub mod session;
pub mod store;
pub mod validation;

pub use assembler::{assemble, EncounterPayload, ObsPayload, Submission};
pub use config::FormsConfig;
pub use enrichment::{enrich_questions, EnrichmentSource, EnrichmentTicket};
pub use error::{FormsError, FormsResult, SchemaError};
pub use field::{FieldState, FieldView, FormSession, Validity};
pub use handler::{ObsHandler, PassThroughHandler, SubmissionHandler};
pub use intent::filter_form_by_intent;
pub use schema::{Answer, Capabilities, FieldKind, FormSchema, Page, Question, Section};
pub use session::{
    CommitObserver, EncounterIdentity, LivenessToken, NoopObserver, SessionContext, SessionMode,
};
pub use store::{FormKey, SchemaStore};
pub use validation::{
    validate, FieldValidator, MandatoryFieldValidator, SubmissionRecord, ValidationError,
    ValidationErrorCode,
};

// Boundary primitives are part of this crate's public API.
pub use forms_types::{is_empty_value, FieldValue, IdError, QuestionId};
