//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the store and
//! sessions, so nothing reads process-wide environment variables while a form is in use.

use crate::constants::FORMS_DIR_NAME;
use crate::error::{FormsError, FormsResult};
use crate::session::SessionMode;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct FormsConfig {
    forms_dir: PathBuf,
    default_mode: SessionMode,
}

impl FormsConfig {
    pub fn new(forms_dir: PathBuf, default_mode: SessionMode) -> FormsResult<Self> {
        if !forms_dir.is_dir() {
            return Err(FormsError::InvalidInput(format!(
                "forms directory does not exist: {}",
                forms_dir.display()
            )));
        }

        Ok(Self {
            forms_dir,
            default_mode,
        })
    }

    pub fn forms_dir(&self) -> &Path {
        &self.forms_dir
    }

    pub fn default_mode(&self) -> SessionMode {
        self.default_mode
    }
}

/// Resolve the forms directory without reading environment variables.
///
/// If `override_dir` is provided, it must be an existing directory. Otherwise this searches for
/// `forms/` relative to the current working directory and then walks up from
/// `CARGO_MANIFEST_DIR`.
pub fn resolve_forms_dir(override_dir: Option<PathBuf>) -> FormsResult<PathBuf> {
    if let Some(dir) = override_dir {
        if dir.is_dir() {
            return Ok(dir);
        }
        return Err(FormsError::InvalidInput(format!(
            "FORMS_DIR override is not a directory: {}",
            dir.display()
        )));
    }

    let cwd_relative = PathBuf::from(FORMS_DIR_NAME);
    if cwd_relative.is_dir() {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(FORMS_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }

    Err(FormsError::InvalidInput(
        "could not locate a forms/ directory".into(),
    ))
}

/// Parse the default session mode from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `enter`.
pub fn session_mode_from_env_value(value: Option<String>) -> FormsResult<SessionMode> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<SessionMode>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}
