//! Constants used throughout the forms core crate.

/// Directory searched for form definitions when no explicit directory is configured.
pub const FORMS_DIR_NAME: &str = "forms";

/// File extensions recognised as form definitions by the schema store.
pub const YAML_EXTENSIONS: [&str; 2] = ["yaml", "yml"];
pub const JSON_EXTENSION: &str = "json";

/// Error code reported when a mandatory field is left empty.
pub const FIELD_REQUIRED_CODE: &str = "field.required";

/// Message reported alongside [`FIELD_REQUIRED_CODE`].
pub const FIELD_REQUIRED_MESSAGE: &str = "Field is mandatory";

/// Encounter type stamped on payloads when the form does not declare one.
pub const DEFAULT_ENCOUNTER_TYPE: &str = "unspecified";
