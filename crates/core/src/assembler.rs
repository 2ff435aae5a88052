//! Submission assembly.
//!
//! Walks the visible questions of a mounted form and compiles their committed values into a
//! value map plus an error map. Assembly is report-only: outstanding validation errors are
//! surfaced next to the values and the host decides whether to block persistence.

use crate::constants::DEFAULT_ENCOUNTER_TYPE;
use crate::field::FormSession;
use crate::schema::FormSchema;
use crate::session::{EncounterIdentity, SessionMode};
use crate::validation::ValidationError;
use chrono::{DateTime, Utc};
use forms_types::{FieldValue, QuestionId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub form_id: String,
    pub mode: SessionMode,

    /// Committed value per visible question; `None` when unspecified or never answered.
    pub values: BTreeMap<QuestionId, Option<FieldValue>>,

    /// Questions explicitly marked as intentionally left blank.
    pub unspecified: BTreeSet<QuestionId>,

    /// Last-known validation errors of visible, specified questions. Only non-empty lists are
    /// present.
    pub errors: BTreeMap<QuestionId, Vec<ValidationError>>,
}

impl Submission {
    /// Whether the submission carries errors the host may want to block on.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Compile the current state of `session` into a [`Submission`].
///
/// Hidden questions and display-only content are skipped. No validation is run here; in
/// `view` mode the result simply mirrors last-known values.
pub fn assemble(session: &FormSession) -> Submission {
    let mut values = BTreeMap::new();
    let mut unspecified = BTreeSet::new();
    let mut errors = BTreeMap::new();

    for field in session.fields() {
        let question = field.question;
        if question.is_hidden() || !question.is_validatable() {
            continue;
        }

        if field.is_unspecified() {
            unspecified.insert(question.id.clone());
            values.insert(question.id.clone(), None);
            continue;
        }

        values.insert(question.id.clone(), field.value.cloned());
        if !field.errors().is_empty() {
            errors.insert(question.id.clone(), field.errors().to_vec());
        }
    }

    tracing::debug!(
        form = %session.form().id,
        mode = %session.mode(),
        values = values.len(),
        unspecified = unspecified.len(),
        errors = errors.len(),
        "assembled submission"
    );

    Submission {
        form_id: session.form().id.clone(),
        mode: session.mode(),
        values,
        unspecified,
        errors,
    }
}

/// Encounter document in the shape the clinical records backend accepts.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub patient: Uuid,
    pub encounter_type: String,
    pub encounter_datetime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Uuid>,
    pub form: String,
    pub obs: Vec<ObsPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObsPayload {
    pub concept: String,
    pub value: FieldValue,
}

impl EncounterPayload {
    /// Shape `submission` for the backend.
    ///
    /// Only questions with a concept and a value produce observations; multi-answer values
    /// become one observation per selected answer.
    ///
    /// Values are the last committed ones. A question whose latest blur failed validation keeps
    /// its earlier committed value here while `submission.errors` reports the failure; callers
    /// that must not persist such values should check [`Submission::has_errors`] first.
    pub fn build(
        form: &FormSchema,
        submission: &Submission,
        encounter: &EncounterIdentity,
    ) -> Self {
        let mut obs = Vec::new();
        for question in form.questions() {
            let Some(concept) = question.concept.as_ref() else {
                continue;
            };
            let Some(Some(value)) = submission.values.get(&question.id) else {
                continue;
            };
            match value {
                FieldValue::List(items) => obs.extend(items.iter().map(|item| ObsPayload {
                    concept: concept.clone(),
                    value: FieldValue::Text(item.clone()),
                })),
                other => obs.push(ObsPayload {
                    concept: concept.clone(),
                    value: other.clone(),
                }),
            }
        }

        Self {
            uuid: encounter.encounter_uuid,
            patient: encounter.patient_uuid,
            encounter_type: form
                .encounter_type
                .clone()
                .unwrap_or_else(|| DEFAULT_ENCOUNTER_TYPE.to_string()),
            encounter_datetime: encounter.encounter_datetime,
            location: encounter.location_uuid,
            form: form.id.clone(),
            obs,
        }
    }
}
