//! Boundary primitives shared by the form engine crates.
//!
//! These types carry guarantees at construction time so that the engine never has to
//! re-check them: identifiers are non-empty and whitespace-free, and field values are a closed
//! set of shapes rather than arbitrary JSON.

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating a [`QuestionId`].
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("question id cannot be empty")]
    Empty,
    #[error("question id must not contain whitespace: {0:?}")]
    ContainsWhitespace(String),
}

/// Identifier of a question, unique within a form.
///
/// Question ids double as keys in value maps handed to the backend, so they are kept
/// free of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdError> {
        let raw = input.as_ref();
        if raw.is_empty() {
            return Err(IdError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(IdError::ContainsWhitespace(raw.to_owned()));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QuestionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for QuestionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for QuestionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        QuestionId::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A value held by a form field.
///
/// Absence is modelled by the surrounding `Option`, never by a variant of this enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    /// Multi-answer fields (checkbox groups) hold the selected answers in order.
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Returns true when a candidate value counts as empty for the mandatory-field rule.
///
/// A value is empty when it is absent, a string that is blank after trimming, or an empty
/// list. Numbers and booleans are never empty, including `0` and `false`.
pub fn is_empty_value(value: Option<&FieldValue>) -> bool {
    match value {
        None => true,
        Some(FieldValue::Text(s)) => s.trim().is_empty(),
        Some(FieldValue::List(items)) => items.is_empty(),
        Some(FieldValue::Number(_)) | Some(FieldValue::Boolean(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_rejects_whitespace_and_empty() {
        assert!(QuestionId::new("hivTestResult").is_ok());
        assert!(matches!(QuestionId::new(""), Err(IdError::Empty)));
        assert!(matches!(
            QuestionId::new("hiv test"),
            Err(IdError::ContainsWhitespace(_))
        ));
    }

    #[test]
    fn question_id_deserialise_enforces_rules() {
        let id: QuestionId = serde_json::from_str("\"q1\"").expect("valid id");
        assert_eq!(id.as_str(), "q1");
        assert!(serde_json::from_str::<QuestionId>("\"\"").is_err());
    }

    #[test]
    fn field_value_deserialises_untagged_shapes() {
        let v: FieldValue = serde_json::from_str("\"Positive\"").unwrap();
        assert_eq!(v, FieldValue::text("Positive"));
        let v: FieldValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(v, FieldValue::Number(12.5));
        let v: FieldValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, FieldValue::Boolean(true));
        let v: FieldValue = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert_eq!(v, FieldValue::List(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn emptiness_rule() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&FieldValue::text(""))));
        assert!(is_empty_value(Some(&FieldValue::text(" \t\n"))));
        assert!(is_empty_value(Some(&FieldValue::List(vec![]))));

        assert!(!is_empty_value(Some(&FieldValue::text(" x "))));
        assert!(!is_empty_value(Some(&FieldValue::Number(0.0))));
        assert!(!is_empty_value(Some(&FieldValue::Boolean(false))));
        assert!(!is_empty_value(Some(&FieldValue::List(vec![String::new()]))));
    }
}
