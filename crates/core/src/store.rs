//! Schema store.
//!
//! Holds loaded form definitions keyed by category and discipline (for example `hiv/hts`).
//! Lookup only: forms are immutable once inserted and are handed out as shared `Arc`s.
//!
//! On disk a store is a directory of `<category>/<discipline>.{yaml,yml,json}` files.

use crate::constants::{JSON_EXTENSION, YAML_EXTENSIONS};
use crate::error::{FormsError, FormsResult};
use crate::schema::FormSchema;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormKey {
    pub category: String,
    pub discipline: String,
}

impl FormKey {
    pub fn new(category: impl Into<String>, discipline: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            discipline: discipline.into(),
        }
    }
}

impl std::fmt::Display for FormKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.discipline)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SchemaStore {
    forms: BTreeMap<FormKey, Arc<FormSchema>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every form found under `dir`.
    ///
    /// Files with other extensions are skipped with a warning. A file that fails to parse, or
    /// two files for the same key, fail the whole load.
    pub fn load_dir(dir: &Path) -> FormsResult<Self> {
        let mut store = Self::new();

        for category in fs::read_dir(dir).map_err(FormsError::FormRead)? {
            let category = category.map_err(FormsError::FormRead)?;
            let category_path = category.path();
            if !category_path.is_dir() {
                tracing::warn!("skipping file outside a category: {}", category_path.display());
                continue;
            }
            let Some(category_name) = category_path.file_name().and_then(|s| s.to_str()) else {
                tracing::warn!("skipping non-UTF-8 category: {}", category_path.display());
                continue;
            };

            for entry in fs::read_dir(&category_path).map_err(FormsError::FormRead)? {
                let path = entry.map_err(FormsError::FormRead)?.path();
                if !path.is_file() {
                    tracing::warn!("skipping nested directory: {}", path.display());
                    continue;
                }

                let extension = path
                    .extension()
                    .and_then(|s| s.to_str())
                    .map(str::to_ascii_lowercase);
                let is_yaml = extension
                    .as_deref()
                    .is_some_and(|ext| YAML_EXTENSIONS.contains(&ext));
                let is_json = extension.as_deref() == Some(JSON_EXTENSION);
                if !is_yaml && !is_json {
                    tracing::warn!("skipping non-form file: {}", path.display());
                    continue;
                }

                let Some(discipline) = path.file_stem().and_then(|s| s.to_str()) else {
                    tracing::warn!("skipping non-UTF-8 form file: {}", path.display());
                    continue;
                };

                let contents = fs::read_to_string(&path).map_err(FormsError::FormRead)?;
                let form = if is_yaml {
                    FormSchema::parse_yaml(&contents)?
                } else {
                    FormSchema::parse_json(&contents)?
                };

                let key = FormKey::new(category_name, discipline);
                if store.forms.contains_key(&key) {
                    return Err(FormsError::InvalidInput(format!(
                        "more than one form file for {key}"
                    )));
                }
                store.forms.insert(key, Arc::new(form));
            }
        }

        tracing::info!("loaded {} form(s) from {}", store.len(), dir.display());
        Ok(store)
    }

    /// Register a form, replacing any previous form under the same key.
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        discipline: impl Into<String>,
        form: FormSchema,
    ) -> FormsResult<Arc<FormSchema>> {
        form.check_well_formed()?;
        let form = Arc::new(form);
        self.forms
            .insert(FormKey::new(category, discipline), Arc::clone(&form));
        Ok(form)
    }

    pub fn get(&self, category: &str, discipline: &str) -> FormsResult<Arc<FormSchema>> {
        self.forms
            .get(&FormKey::new(category, discipline))
            .cloned()
            .ok_or_else(|| FormsError::FormNotFound {
                category: category.to_string(),
                discipline: discipline.to_string(),
            })
    }

    pub fn keys(&self) -> impl Iterator<Item = &FormKey> {
        self.forms.keys()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}
