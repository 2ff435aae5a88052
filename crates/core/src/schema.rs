//! Form schema data model and wire translation.
//!
//! This module provides both domain-level types for a form definition and the wire model used
//! for on-disk YAML/JSON form documents.
//!
//! Responsibilities:
//! - Define the immutable domain tree: form → pages → sections → questions
//! - Define a strict wire model for serialisation/deserialisation
//! - Translate between the two, enforcing question-id uniqueness at load time
//!
//! Notes:
//! - A question's rendering is a closed tagged union (`FieldKind`); behaviour that depends on
//!   the question is read from its explicit `Capabilities`, never probed from loose properties.
//! - Per-render state (values typed by a user, validation outcomes) is never stored here; see
//!   `crate::field`.

use crate::error::SchemaError;
use forms_types::{FieldValue, QuestionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// ============================================================================
// Public domain-level types
// ============================================================================

/// A form definition, immutable once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct FormSchema {
    pub id: String,

    /// Backend encounter type stamped on submissions built from this form.
    pub encounter_type: Option<String>,

    pub pages: Vec<Page>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub label: String,
    pub sections: Vec<Section>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub label: String,
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub label: String,
    pub kind: FieldKind,

    /// Backend concept the answer is recorded against, if any.
    pub concept: Option<String>,

    /// Intents this question applies to. Empty means it applies to every intent.
    pub intents: BTreeSet<String>,

    /// Declared required flag. Validation does not currently consult it; every validatable
    /// question is treated as mandatory unless marked unspecified.
    pub required: bool,

    pub capabilities: Capabilities,

    /// Schema-supplied initial value.
    pub value: Option<FieldValue>,
}

/// Fixed capability set of a question.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The question holds a value that the field validator applies to.
    pub validatable: bool,
    /// The question offers the "unspecified" override.
    pub unspecifiable: bool,
    /// The question is excluded from rendering and from submissions.
    pub hidden: bool,
}

/// Rendering of a question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Number,
    Date,
    Toggle,
    Radio { answers: Vec<Answer> },
    Select { answers: Vec<Answer> },
    Checkbox { answers: Vec<Answer> },
    /// Display-only content (headings, guidance). Holds no value.
    Markdown,
}

impl FieldKind {
    /// Answers offered by answer-bearing renderings.
    pub fn answers(&self) -> &[Answer] {
        match self {
            Self::Radio { answers } | Self::Select { answers } | Self::Checkbox { answers } => {
                answers
            }
            _ => &[],
        }
    }

    fn rendering(&self) -> Rendering {
        match self {
            Self::Text => Rendering::Text,
            Self::TextArea => Rendering::Textarea,
            Self::Number => Rendering::Number,
            Self::Date => Rendering::Date,
            Self::Toggle => Rendering::Toggle,
            Self::Radio { .. } => Rendering::Radio,
            Self::Select { .. } => Rendering::Select,
            Self::Checkbox { .. } => Rendering::Checkbox,
            Self::Markdown => Rendering::Markdown,
        }
    }
}

/// A coded answer option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Answer {
    pub concept: String,
    pub label: String,
}

impl Question {
    pub fn is_hidden(&self) -> bool {
        self.capabilities.hidden
    }

    pub fn is_unspecifiable(&self) -> bool {
        self.capabilities.unspecifiable
    }

    pub fn is_validatable(&self) -> bool {
        self.capabilities.validatable
    }

    /// Whether the question is retained when a form is filtered by `intent`.
    pub fn applies_to(&self, intent: &str) -> bool {
        self.intents.is_empty() || self.intents.contains(intent)
    }
}

impl FormSchema {
    /// Parse a form from YAML text.
    ///
    /// Uses `serde_path_to_error` so a schema mismatch names the failing field
    /// (e.g. `pages[0].sections[1].questions[2].questionOptions.rendering`).
    pub fn parse_yaml(yaml_text: &str) -> Result<Self, SchemaError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire = serde_path_to_error::deserialize::<_, FormWire>(deserializer)
            .map_err(|err| mismatch(err.path().to_string(), err.into_inner()))?;
        wire_to_domain(wire)
    }

    /// Parse a form from JSON text.
    pub fn parse_json(json_text: &str) -> Result<Self, SchemaError> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wire = serde_path_to_error::deserialize::<_, FormWire>(&mut deserializer)
            .map_err(|err| mismatch(err.path().to_string(), err.into_inner()))?;
        wire_to_domain(wire)
    }

    /// Render the form as YAML text in wire format.
    pub fn render_yaml(&self) -> Result<String, SchemaError> {
        Ok(serde_yaml::to_string(&domain_to_wire(self))?)
    }

    /// Render the form as pretty JSON text in wire format.
    pub fn render_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(&domain_to_wire(self))?)
    }

    /// All questions in document order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.pages
            .iter()
            .flat_map(|page| page.sections.iter())
            .flat_map(|section| section.questions.iter())
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions().find(|q| &q.id == id)
    }

    /// Check structural invariants that loading guarantees.
    ///
    /// Forms built in code bypass the loader, so the intent filter re-checks before
    /// producing a view.
    pub fn check_well_formed(&self) -> Result<(), SchemaError> {
        if self.id.trim().is_empty() {
            return Err(SchemaError::EmptyFormId);
        }

        let mut seen = HashSet::new();
        for question in self.questions() {
            if !seen.insert(&question.id) {
                return Err(SchemaError::DuplicateQuestionId {
                    form_id: self.id.clone(),
                    question_id: question.id.clone(),
                });
            }
        }
        Ok(())
    }
}

fn mismatch(path: String, source: impl std::fmt::Display) -> SchemaError {
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    SchemaError::Translation(format!("Form schema mismatch at {path}: {source}"))
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FormWire {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encounter_type: Option<String>,
    pages: Vec<PageWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct PageWire {
    label: String,
    #[serde(default)]
    sections: Vec<SectionWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct SectionWire {
    label: String,
    #[serde(default)]
    questions: Vec<QuestionWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct QuestionWire {
    id: String,
    label: String,
    #[serde(rename = "type")]
    question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    intents: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    unspecified: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<FieldValue>,
    question_options: QuestionOptionsWire,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum QuestionType {
    /// Captures an observation value.
    Obs,
    /// Display-only control.
    Control,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct QuestionOptionsWire {
    rendering: Rendering,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    concept: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    answers: Vec<Answer>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum Rendering {
    Text,
    Textarea,
    Number,
    Date,
    Toggle,
    Radio,
    Select,
    Checkbox,
    Markdown,
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: FormWire) -> Result<FormSchema, SchemaError> {
    let mut pages = Vec::with_capacity(wire.pages.len());
    for page in wire.pages {
        let mut sections = Vec::with_capacity(page.sections.len());
        for section in page.sections {
            let questions = section
                .questions
                .into_iter()
                .map(question_to_domain)
                .collect::<Result<Vec<_>, _>>()?;
            sections.push(Section {
                label: section.label,
                questions,
            });
        }
        pages.push(Page {
            label: page.label,
            sections,
        });
    }

    let form = FormSchema {
        id: wire.id,
        encounter_type: wire.encounter_type,
        pages,
    };
    form.check_well_formed()?;
    Ok(form)
}

fn question_to_domain(wire: QuestionWire) -> Result<Question, SchemaError> {
    let id = QuestionId::new(&wire.id)
        .map_err(|e| SchemaError::Translation(format!("Invalid question id: {e}")))?;

    let QuestionOptionsWire {
        rendering,
        concept,
        answers,
    } = wire.question_options;

    let kind = match (wire.question_type, rendering) {
        (QuestionType::Control, Rendering::Markdown) => FieldKind::Markdown,
        (QuestionType::Control, other) => {
            return Err(SchemaError::Translation(format!(
                "Question {id}: control questions must use markdown rendering, got {other:?}"
            )));
        }
        (QuestionType::Obs, Rendering::Markdown) => {
            return Err(SchemaError::Translation(format!(
                "Question {id}: markdown rendering is only valid for control questions"
            )));
        }
        (QuestionType::Obs, Rendering::Radio | Rendering::Select | Rendering::Checkbox)
            if answers.is_empty() =>
        {
            return Err(SchemaError::Translation(format!(
                "Question {id}: {rendering:?} rendering requires at least one answer"
            )));
        }
        (QuestionType::Obs, Rendering::Radio) => FieldKind::Radio { answers },
        (QuestionType::Obs, Rendering::Select) => FieldKind::Select { answers },
        (QuestionType::Obs, Rendering::Checkbox) => FieldKind::Checkbox { answers },
        (QuestionType::Obs, Rendering::Text) => FieldKind::Text,
        (QuestionType::Obs, Rendering::Textarea) => FieldKind::TextArea,
        (QuestionType::Obs, Rendering::Number) => FieldKind::Number,
        (QuestionType::Obs, Rendering::Date) => FieldKind::Date,
        (QuestionType::Obs, Rendering::Toggle) => FieldKind::Toggle,
    };

    let intents = wire
        .intents
        .into_iter()
        .map(|intent| intent.trim().to_string())
        .filter(|intent| !intent.is_empty())
        .collect();

    Ok(Question {
        capabilities: Capabilities {
            validatable: wire.question_type == QuestionType::Obs,
            unspecifiable: wire.unspecified,
            hidden: wire.hidden,
        },
        id,
        label: wire.label,
        kind,
        concept,
        intents,
        required: wire.required,
        value: wire.value,
    })
}

fn domain_to_wire(form: &FormSchema) -> FormWire {
    FormWire {
        id: form.id.clone(),
        encounter_type: form.encounter_type.clone(),
        pages: form
            .pages
            .iter()
            .map(|page| PageWire {
                label: page.label.clone(),
                sections: page
                    .sections
                    .iter()
                    .map(|section| SectionWire {
                        label: section.label.clone(),
                        questions: section.questions.iter().map(question_to_wire).collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn question_to_wire(question: &Question) -> QuestionWire {
    let question_type = if question.capabilities.validatable {
        QuestionType::Obs
    } else {
        QuestionType::Control
    };
    QuestionWire {
        id: question.id.to_string(),
        label: question.label.clone(),
        question_type,
        intents: question.intents.iter().cloned().collect(),
        required: question.required,
        unspecified: question.capabilities.unspecifiable,
        hidden: question.capabilities.hidden,
        value: question.value.clone(),
        question_options: QuestionOptionsWire {
            rendering: question.kind.rendering(),
            concept: question.concept.clone(),
            answers: question.kind.answers().to_vec(),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"id: hts
encounterType: "30b849bd-c4f4-4254-a033-fe9cf01001d8"
pages:
  - label: Pre-test
    sections:
      - label: Counselling
        questions:
          - id: counsellingProvided
            label: Pre-test counselling provided?
            type: obs
            intents: [HTS_PRETEST]
            required: true
            unspecified: true
            questionOptions:
              rendering: radio
              concept: "1065AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
              answers:
                - concept: "1065AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
                  label: "Yes"
                - concept: "1066AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
                  label: "No"
          - id: guidance
            label: Guidance
            type: control
            questionOptions:
              rendering: markdown
          - id: remarks
            label: Remarks
            type: obs
            hidden: true
            value: "none"
            questionOptions:
              rendering: textarea
"#;

    #[test]
    fn parses_sample_yaml() {
        let form = FormSchema::parse_yaml(SAMPLE).expect("parse yaml");
        assert_eq!(form.id, "hts");
        assert_eq!(form.questions().count(), 3);

        let counselling = form
            .question(&QuestionId::new("counsellingProvided").unwrap())
            .expect("question present");
        assert_eq!(counselling.kind.answers().len(), 2);
        assert!(counselling.is_unspecifiable());
        assert!(counselling.is_validatable());
        assert!(counselling.intents.contains("HTS_PRETEST"));

        let guidance = form
            .question(&QuestionId::new("guidance").unwrap())
            .expect("question present");
        assert_eq!(guidance.kind, FieldKind::Markdown);
        assert!(!guidance.is_validatable());

        let remarks = form
            .question(&QuestionId::new("remarks").unwrap())
            .expect("question present");
        assert!(remarks.is_hidden());
        assert_eq!(remarks.value, Some(FieldValue::text("none")));
    }

    #[test]
    fn yaml_render_reparses_to_same_form() {
        let form = FormSchema::parse_yaml(SAMPLE).expect("parse yaml");
        let rendered = form.render_yaml().expect("render yaml");
        let reparsed = FormSchema::parse_yaml(&rendered).expect("reparse yaml");
        assert_eq!(form, reparsed);
    }

    #[test]
    fn parses_json_documents() {
        let json = r#"{
            "id": "covid",
            "pages": [{"label": "P", "sections": [{"label": "S", "questions": [
                {"id": "temp", "label": "Temperature", "type": "obs",
                 "questionOptions": {"rendering": "number", "concept": "5088"}}
            ]}]}]
        }"#;
        let form = FormSchema::parse_json(json).expect("parse json");
        assert_eq!(form.questions().next().unwrap().kind, FieldKind::Number);
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let yaml = r#"id: dup
pages:
  - label: P
    sections:
      - label: A
        questions:
          - { id: q1, label: One, type: obs, questionOptions: { rendering: text } }
      - label: B
        questions:
          - { id: q1, label: Again, type: obs, questionOptions: { rendering: text } }
"#;
        let err = FormSchema::parse_yaml(yaml).expect_err("should reject duplicate id");
        match err {
            SchemaError::DuplicateQuestionId { form_id, question_id } => {
                assert_eq!(form_id, "dup");
                assert_eq!(question_id.as_str(), "q1");
            }
            other => panic!("expected DuplicateQuestionId, got {other:?}"),
        }
    }

    #[test]
    fn mismatch_reports_failing_path() {
        let yaml = r#"id: bad
pages:
  - label: P
    sections:
      - label: S
        questions:
          - { id: q1, label: One, type: obs, questionOptions: { rendering: slider } }
"#;
        let err = FormSchema::parse_yaml(yaml).expect_err("should reject unknown rendering");
        match err {
            SchemaError::Translation(msg) => assert!(msg.contains("rendering"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let yaml = r#"id: bad
pages: []
unexpected_key: true
"#;
        let err = FormSchema::parse_yaml(yaml).expect_err("should reject unknown key");
        match err {
            SchemaError::Translation(msg) => assert!(msg.contains("unexpected_key"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn answer_renderings_require_answers() {
        let yaml = r#"id: bad
pages:
  - label: P
    sections:
      - label: S
        questions:
          - { id: q1, label: One, type: obs, questionOptions: { rendering: select } }
"#;
        let err = FormSchema::parse_yaml(yaml).expect_err("should reject answerless select");
        assert!(matches!(err, SchemaError::Translation(msg) if msg.contains("answer")));
    }

    #[test]
    fn blank_intents_are_ignored() {
        let yaml = r#"id: f
pages:
  - label: P
    sections:
      - label: S
        questions:
          - { id: q1, label: One, type: obs, intents: ["", "  "], questionOptions: { rendering: text } }
"#;
        let form = FormSchema::parse_yaml(yaml).expect("parse yaml");
        assert!(form.questions().next().unwrap().intents.is_empty());
    }

    #[test]
    fn check_well_formed_rejects_empty_form_id() {
        let mut form = test_support::single_section_form(vec![]);
        form.id = "  ".into();
        assert!(matches!(
            form.check_well_formed(),
            Err(SchemaError::EmptyFormId)
        ));
    }
}
