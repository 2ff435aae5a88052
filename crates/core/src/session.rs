//! Session context for a single form render.
//!
//! One `SessionContext` exists per render: it is created when the form mounts and torn down
//! when it unmounts. It carries the session mode, the encounter identity and the commit
//! observer shared by every field. Only the field state machine (`crate::field`) notifies the
//! observer; everything else reads.

use crate::error::{FormsError, FormsResult};
use chrono::{DateTime, Utc};
use forms_types::{FieldValue, QuestionId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// New encounter data entry.
    #[default]
    Enter,
    /// Amending an existing encounter.
    Edit,
    /// Read-only display of last-known values.
    View,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Edit => "edit",
            Self::View => "view",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::View)
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionMode {
    type Err = FormsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enter" => Ok(Self::Enter),
            "edit" => Ok(Self::Edit),
            "view" => Ok(Self::View),
            other => Err(FormsError::InvalidInput(format!(
                "Invalid session mode: {other}"
            ))),
        }
    }
}

/// Who and what the form is being filled in for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncounterIdentity {
    pub patient_uuid: Uuid,

    /// Existing encounter being edited or viewed; `None` for a new encounter.
    pub encounter_uuid: Option<Uuid>,

    pub location_uuid: Option<Uuid>,

    pub encounter_datetime: DateTime<Utc>,
}

impl EncounterIdentity {
    /// Identity for a new encounter starting now.
    pub fn new_encounter(patient_uuid: Uuid) -> Self {
        Self {
            patient_uuid,
            encounter_uuid: None,
            location_uuid: None,
            encounter_datetime: Utc::now(),
        }
    }
}

/// Receives every committed value.
///
/// The host decides what, if anything, to do with a notification (for example re-rendering a
/// derived row).
pub trait CommitObserver {
    fn on_commit(&mut self, question_id: &QuestionId, value: Option<&FieldValue>);
}

impl<F> CommitObserver for F
where
    F: FnMut(&QuestionId, Option<&FieldValue>),
{
    fn on_commit(&mut self, question_id: &QuestionId, value: Option<&FieldValue>) {
        self(question_id, value)
    }
}

/// Observer that ignores commits.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl CommitObserver for NoopObserver {
    fn on_commit(&mut self, _question_id: &QuestionId, _value: Option<&FieldValue>) {}
}

/// Captured at the start of asynchronous work; reports whether the issuing session is still
/// mounted when the work completes.
#[derive(Clone, Debug)]
pub struct LivenessToken(Weak<()>);

impl LivenessToken {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

pub struct SessionContext {
    mode: SessionMode,
    encounter: EncounterIdentity,
    observer: Box<dyn CommitObserver>,
    life: Option<Arc<()>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("mode", &self.mode)
            .field("encounter", &self.encounter)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new(
        mode: SessionMode,
        encounter: EncounterIdentity,
        observer: impl CommitObserver + 'static,
    ) -> Self {
        Self {
            mode,
            encounter,
            observer: Box::new(observer),
            life: Some(Arc::new(())),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn encounter(&self) -> &EncounterIdentity {
        &self.encounter
    }

    pub fn is_alive(&self) -> bool {
        self.life.is_some()
    }

    /// Token for asynchronous work issued against this session.
    pub fn liveness(&self) -> FormsResult<LivenessToken> {
        self.life
            .as_ref()
            .map(|life| LivenessToken(Arc::downgrade(life)))
            .ok_or(FormsError::SessionTornDown)
    }

    /// Whether `token` was issued by this session and the session is still mounted.
    pub fn accepts(&self, token: &LivenessToken) -> bool {
        match &self.life {
            Some(life) => token.is_alive() && Weak::ptr_eq(&token.0, &Arc::downgrade(life)),
            None => false,
        }
    }

    /// Unmount the session. Outstanding tokens stop reporting alive.
    pub fn teardown(&mut self) {
        if self.life.take().is_some() {
            tracing::debug!(patient = %self.encounter.patient_uuid, "session torn down");
        }
    }

    pub(crate) fn notify_commit(&mut self, question_id: &QuestionId, value: Option<&FieldValue>) {
        self.observer.on_commit(question_id, value);
    }
}
