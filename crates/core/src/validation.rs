//! Field validation.
//!
//! Validation failures are data attached to a question's submission record; they never abort
//! rendering and are never raised as Rust errors.

use crate::constants::{FIELD_REQUIRED_CODE, FIELD_REQUIRED_MESSAGE};
use crate::schema::Question;
use forms_types::{is_empty_value, FieldValue};
use serde::{Deserialize, Serialize};

/// Closed set of validation failure kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationErrorCode {
    #[serde(rename = "field.required")]
    FieldRequired,
}

impl ValidationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FieldRequired => FIELD_REQUIRED_CODE,
        }
    }
}

impl std::fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub err_code: ValidationErrorCode,
    pub err_message: String,
}

impl ValidationError {
    pub fn field_required() -> Self {
        Self {
            err_code: ValidationErrorCode::FieldRequired,
            err_message: FIELD_REQUIRED_MESSAGE.to_string(),
        }
    }
}

/// Durable per-question memo of the validation outcome and unspecified status.
///
/// Invariant: `errors` is `None` or empty whenever `specified` is true.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// The question was explicitly marked as intentionally left blank.
    pub specified: bool,
    pub errors: Option<Vec<ValidationError>>,
}

impl SubmissionRecord {
    pub fn unspecified() -> Self {
        Self {
            specified: true,
            errors: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.specified && self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// Validates a candidate value for a question.
pub trait FieldValidator {
    /// Returns the ordered list of failures; empty means valid.
    fn validate(
        &self,
        question: &Question,
        submission: Option<&SubmissionRecord>,
        value: Option<&FieldValue>,
    ) -> Vec<ValidationError>;
}

/// The mandatory-field rule.
///
/// Every validatable question is treated as mandatory. The question's own `required` flag is
/// not consulted.
#[derive(Clone, Copy, Debug, Default)]
pub struct MandatoryFieldValidator;

impl FieldValidator for MandatoryFieldValidator {
    fn validate(
        &self,
        question: &Question,
        submission: Option<&SubmissionRecord>,
        value: Option<&FieldValue>,
    ) -> Vec<ValidationError> {
        if submission.is_some_and(|s| s.specified) {
            return Vec::new();
        }
        if !question.is_validatable() {
            return Vec::new();
        }
        if is_empty_value(value) {
            return vec![ValidationError::field_required()];
        }
        Vec::new()
    }
}

/// Validate with the default rule set.
pub fn validate(
    question: &Question,
    submission: Option<&SubmissionRecord>,
    value: Option<&FieldValue>,
) -> Vec<ValidationError> {
    MandatoryFieldValidator.validate(question, submission, value)
}
