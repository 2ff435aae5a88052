//! Value mapping applied when a field commits.
//!
//! A handler turns the raw value a user entered into the value written back onto the
//! question. Handlers see the encounter identity by reference and never mutate session state.

use crate::schema::{FieldKind, Question};
use crate::session::EncounterIdentity;
use forms_types::FieldValue;

pub trait SubmissionHandler {
    fn handle_field_submission(
        &self,
        question: &Question,
        value: Option<FieldValue>,
        encounter: &EncounterIdentity,
    ) -> Option<FieldValue>;
}

/// Commits the raw value unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThroughHandler;

impl SubmissionHandler for PassThroughHandler {
    fn handle_field_submission(
        &self,
        _question: &Question,
        value: Option<FieldValue>,
        _encounter: &EncounterIdentity,
    ) -> Option<FieldValue> {
        value
    }
}

/// Shapes values for observation storage.
///
/// Free text is trimmed. For answer-bearing questions an answer entered by its label is
/// replaced with the answer's concept code; values that already are codes, or match nothing,
/// pass through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObsHandler;

impl SubmissionHandler for ObsHandler {
    fn handle_field_submission(
        &self,
        question: &Question,
        value: Option<FieldValue>,
        _encounter: &EncounterIdentity,
    ) -> Option<FieldValue> {
        let value = value?;
        let answers = question.kind.answers();

        let to_concept = |raw: String| -> String {
            answers
                .iter()
                .find(|a| a.label.eq_ignore_ascii_case(raw.trim()))
                .map(|a| a.concept.clone())
                .unwrap_or(raw)
        };

        Some(match (&question.kind, value) {
            (FieldKind::Text | FieldKind::TextArea, FieldValue::Text(s)) => {
                FieldValue::Text(s.trim().to_string())
            }
            (FieldKind::Radio { .. } | FieldKind::Select { .. }, FieldValue::Text(s)) => {
                FieldValue::Text(to_concept(s))
            }
            (FieldKind::Checkbox { .. }, FieldValue::List(items)) => {
                FieldValue::List(items.into_iter().map(to_concept).collect())
            }
            (_, other) => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_support::text_question;
    use crate::schema::Answer;
    use uuid::Uuid;

    fn encounter() -> EncounterIdentity {
        EncounterIdentity::new_encounter(Uuid::new_v4())
    }

    fn yes_no() -> Vec<Answer> {
        vec![
            Answer {
                concept: "1065".into(),
                label: "Yes".into(),
            },
            Answer {
                concept: "1066".into(),
                label: "No".into(),
            },
        ]
    }

    #[test]
    fn pass_through_keeps_value() {
        let q = text_question("q", &[]);
        let v = Some(FieldValue::text("  raw  "));
        assert_eq!(
            PassThroughHandler.handle_field_submission(&q, v.clone(), &encounter()),
            v
        );
    }

    #[test]
    fn obs_handler_trims_text() {
        let q = text_question("q", &[]);
        let out = ObsHandler.handle_field_submission(&q, Some(FieldValue::text(" a ")), &encounter());
        assert_eq!(out, Some(FieldValue::text("a")));
    }

    #[test]
    fn obs_handler_maps_answer_labels_to_concepts() {
        let mut q = text_question("q", &[]);
        q.kind = FieldKind::Radio { answers: yes_no() };
        let out = ObsHandler.handle_field_submission(&q, Some(FieldValue::text("yes")), &encounter());
        assert_eq!(out, Some(FieldValue::text("1065")));

        let out = ObsHandler.handle_field_submission(&q, Some(FieldValue::text("1066")), &encounter());
        assert_eq!(out, Some(FieldValue::text("1066")));
    }

    #[test]
    fn obs_handler_maps_checkbox_lists() {
        let mut q = text_question("q", &[]);
        q.kind = FieldKind::Checkbox { answers: yes_no() };
        let out = ObsHandler.handle_field_submission(
            &q,
            Some(FieldValue::List(vec!["No".into(), "other".into()])),
            &encounter(),
        );
        assert_eq!(out, Some(FieldValue::List(vec!["1066".into(), "other".into()])));
    }

    #[test]
    fn obs_handler_keeps_absent_values_absent() {
        let q = text_question("q", &[]);
        assert_eq!(ObsHandler.handle_field_submission(&q, None, &encounter()), None);
    }
}
