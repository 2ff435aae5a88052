use forms_types::QuestionId;

/// Errors raised while reading or interpreting a form definition.
///
/// These are fatal to the step that hit them (loading or filtering); nothing is partially
/// applied.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("no form was supplied")]
    MissingForm,
    #[error("form id cannot be empty")]
    EmptyFormId,
    #[error("question id {question_id} appears more than once in form {form_id}")]
    DuplicateQuestionId {
        form_id: String,
        question_id: QuestionId,
    },
    #[error("translation error: {0}")]
    Translation(String),
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FormsError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no form registered for {category}/{discipline}")]
    FormNotFound {
        category: String,
        discipline: String,
    },
    #[error("failed to read form file: {0}")]
    FormRead(std::io::Error),
    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionId),
    #[error("session is read-only (view mode)")]
    ReadOnlySession,
    #[error("question {question_id}: cannot handle {event} while {from}")]
    InvalidTransition {
        question_id: QuestionId,
        from: &'static str,
        event: &'static str,
    },
    #[error("question {0} cannot be marked unspecified")]
    NotUnspecifiable(QuestionId),
    #[error("session has been torn down")]
    SessionTornDown,
    #[error("enrichment lookup failed: {0}")]
    Enrichment(String),
}

pub type FormsResult<T> = std::result::Result<T, FormsError>;
