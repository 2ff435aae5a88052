//! Field submission state machine.
//!
//! `FormSession` owns the authoritative per-question state for one form render: the value the
//! user is typing, the last committed value and the submission record. It is the only writer of
//! that state and the only caller of the session's commit observer.
//!
//! Per question the edit cycle is
//! `Pristine → Editing → Blurred(Valid | Invalid) → Committed`, re-entering `Editing` on the
//! next focus. `Unspecified` overlays any of these while the override is on and is only left by
//! turning the override off.

use crate::error::{FormsError, FormsResult};
use crate::handler::{PassThroughHandler, SubmissionHandler};
use crate::schema::{FormSchema, Question};
use crate::session::{SessionContext, SessionMode};
use crate::validation::{FieldValidator, MandatoryFieldValidator, SubmissionRecord, ValidationError};
use forms_types::{FieldValue, QuestionId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldState {
    Pristine,
    Editing,
    Blurred(Validity),
    Committed,
    Unspecified,
}

impl FieldState {
    fn name(&self) -> &'static str {
        match self {
            Self::Pristine => "pristine",
            Self::Editing => "editing",
            Self::Blurred(Validity::Valid) => "blurred (valid)",
            Self::Blurred(Validity::Invalid) => "blurred (invalid)",
            Self::Committed => "committed",
            Self::Unspecified => "unspecified",
        }
    }
}

#[derive(Clone, Debug)]
struct FieldSlot {
    /// Position in the edit cycle. Never `Unspecified`; that is read from the record.
    phase: FieldState,
    raw: Option<FieldValue>,
    committed: Option<FieldValue>,
    /// Raw value captured on focus.
    snapshot: Option<FieldValue>,
    submission: Option<SubmissionRecord>,
}

impl FieldSlot {
    fn new(initial: Option<FieldValue>) -> Self {
        Self {
            phase: FieldState::Pristine,
            raw: initial.clone(),
            committed: initial,
            snapshot: None,
            submission: None,
        }
    }

    fn is_unspecified(&self) -> bool {
        self.submission.as_ref().is_some_and(|s| s.specified)
    }

    fn state(&self) -> FieldState {
        if self.is_unspecified() {
            FieldState::Unspecified
        } else {
            self.phase
        }
    }
}

/// Read model of one question for a rendering layer.
#[derive(Clone, Copy, Debug)]
pub struct FieldView<'a> {
    pub question: &'a Question,
    pub state: FieldState,
    /// Value currently shown in the input.
    pub raw: Option<&'a FieldValue>,
    /// Last committed value; `None` when unspecified or never set.
    pub value: Option<&'a FieldValue>,
    pub submission: Option<&'a SubmissionRecord>,
}

impl FieldView<'_> {
    pub fn errors(&self) -> &[ValidationError] {
        self.submission
            .and_then(|s| s.errors.as_deref())
            .unwrap_or(&[])
    }

    pub fn is_unspecified(&self) -> bool {
        self.state == FieldState::Unspecified
    }
}

pub struct FormSession {
    form: Arc<FormSchema>,
    context: SessionContext,
    handler: Box<dyn SubmissionHandler>,
    validator: Box<dyn FieldValidator>,
    slots: HashMap<QuestionId, FieldSlot>,
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("form", &self.form.id)
            .field("context", &self.context)
            .field("fields", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl FormSession {
    /// Mount a form render.
    ///
    /// `form` is normally the output of the intent filter. Each question starts `Pristine` with
    /// its schema-supplied value.
    pub fn new(form: impl Into<Arc<FormSchema>>, context: SessionContext) -> FormsResult<Self> {
        let form = form.into();
        form.check_well_formed()?;

        let slots = form
            .questions()
            .map(|q| (q.id.clone(), FieldSlot::new(q.value.clone())))
            .collect();

        Ok(Self {
            form,
            context,
            handler: Box::new(PassThroughHandler),
            validator: Box::new(MandatoryFieldValidator),
            slots,
        })
    }

    pub fn with_handler(mut self, handler: impl SubmissionHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }

    pub fn with_validator(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn form(&self) -> &FormSchema {
        &self.form
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn mode(&self) -> SessionMode {
        self.context.mode()
    }

    /// Unmount. Later events fail with `SessionTornDown` and pending enrichments are dropped.
    pub fn teardown(&mut self) {
        self.context.teardown();
    }

    pub fn field(&self, id: &QuestionId) -> FormsResult<FieldView<'_>> {
        let question = self.question(id)?;
        let slot = self.slot(id)?;
        Ok(view_of(question, slot))
    }

    /// All fields in document order.
    pub fn fields(&self) -> impl Iterator<Item = FieldView<'_>> {
        self.form
            .questions()
            .filter_map(move |q| self.slots.get(&q.id).map(|slot| view_of(q, slot)))
    }

    /// Seed a question with an existing value without committing it.
    ///
    /// Used to load a saved encounter for `edit` or `view`. Allowed in every mode.
    pub fn prefill(&mut self, id: &QuestionId, value: Option<FieldValue>) -> FormsResult<()> {
        self.ensure_alive()?;
        let slot = self.slot_mut(id)?;
        slot.raw = value.clone();
        slot.committed = value;
        Ok(())
    }

    /// Focus: snapshot the current raw value and start editing.
    pub fn focus(&mut self, id: &QuestionId) -> FormsResult<()> {
        self.ensure_writable()?;
        let slot = self.slot_mut(id)?;
        if slot.phase == FieldState::Editing {
            return Err(invalid_transition(id, slot, "focus"));
        }
        slot.snapshot = slot.raw.clone();
        slot.phase = FieldState::Editing;
        Ok(())
    }

    /// Replace the raw value while editing.
    pub fn input(&mut self, id: &QuestionId, value: Option<FieldValue>) -> FormsResult<()> {
        self.ensure_writable()?;
        let slot = self.slot_mut(id)?;
        if slot.phase != FieldState::Editing {
            return Err(invalid_transition(id, slot, "input"));
        }
        slot.raw = value;
        Ok(())
    }

    /// Blur: validate the raw value and commit it when valid and changed since focus.
    ///
    /// Returns the state the field settles in.
    pub fn blur(&mut self, id: &QuestionId) -> FormsResult<FieldState> {
        self.ensure_writable()?;
        let question = self.form.question(id).ok_or_else(|| unknown(id))?;

        let slot = self.slots.get_mut(id).ok_or_else(|| unknown(id))?;
        if slot.phase != FieldState::Editing {
            return Err(invalid_transition(id, slot, "blur"));
        }

        let errors = self
            .validator
            .validate(question, slot.submission.as_ref(), slot.raw.as_ref());
        let snapshot = slot.snapshot.take();
        let record = slot.submission.get_or_insert_with(SubmissionRecord::default);

        if record.specified {
            slot.phase = FieldState::Blurred(Validity::Valid);
            return Ok(FieldState::Unspecified);
        }

        if !errors.is_empty() {
            tracing::debug!(question = %id, errors = errors.len(), "field failed validation");
            record.errors = Some(errors);
            slot.phase = FieldState::Blurred(Validity::Invalid);
            return Ok(slot.phase);
        }
        record.errors = Some(Vec::new());

        if slot.raw == snapshot {
            slot.phase = FieldState::Blurred(Validity::Valid);
            return Ok(slot.phase);
        }

        commit_raw(self.handler.as_ref(), &mut self.context, question, slot);
        Ok(FieldState::Committed)
    }

    /// Turn the unspecified override on or off.
    ///
    /// On: the value is cleared, errors are dropped, the record becomes
    /// `{ specified: true, errors: None }` and the observer is told `(id, None)`.
    /// Off: the current raw value is re-validated and, when valid, committed. The value held
    /// before the override was turned on is not restored.
    pub fn set_unspecified(&mut self, id: &QuestionId, unspecified: bool) -> FormsResult<()> {
        self.ensure_writable()?;
        let question = self.form.question(id).ok_or_else(|| unknown(id))?;
        if !question.is_unspecifiable() {
            return Err(FormsError::NotUnspecifiable(id.clone()));
        }

        let slot = self.slots.get_mut(id).ok_or_else(|| unknown(id))?;
        if slot.is_unspecified() == unspecified {
            return Ok(());
        }

        if unspecified {
            slot.raw = None;
            slot.committed = None;
            slot.submission = Some(SubmissionRecord::unspecified());
            tracing::debug!(question = %id, "marked unspecified");
            self.context.notify_commit(id, None);
            return Ok(());
        }

        let record = slot.submission.get_or_insert_with(SubmissionRecord::default);
        record.specified = false;
        let errors = self
            .validator
            .validate(question, Some(&*record), slot.raw.as_ref());
        let validity = if errors.is_empty() {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        record.errors = Some(errors);
        tracing::debug!(question = %id, ?validity, "unspecified cleared");

        // The override cleared `committed`, so anything typed since then is still pending.
        if slot.phase == FieldState::Editing {
            slot.snapshot = None;
        } else if validity == Validity::Valid && slot.raw.is_some() {
            commit_raw(self.handler.as_ref(), &mut self.context, question, slot);
        } else {
            slot.phase = FieldState::Blurred(validity);
        }
        Ok(())
    }

    /// Write a derived value directly, bypassing the edit cycle and the validator.
    ///
    /// Returns false when the question is unspecified; the override is never left
    /// automatically.
    pub(crate) fn commit_out_of_band(
        &mut self,
        id: &QuestionId,
        value: Option<FieldValue>,
    ) -> FormsResult<bool> {
        self.ensure_alive()?;
        let slot = self.slots.get_mut(id).ok_or_else(|| unknown(id))?;
        if slot.is_unspecified() {
            tracing::debug!(question = %id, "ignoring derived value for unspecified field");
            return Ok(false);
        }

        slot.raw = value.clone();
        slot.committed = value;
        if slot.phase == FieldState::Editing {
            slot.snapshot = slot.raw.clone();
        } else {
            slot.phase = FieldState::Committed;
        }
        if let Some(record) = slot.submission.as_mut() {
            record.errors = Some(Vec::new());
        }
        tracing::debug!(question = %id, "derived value committed");
        self.context.notify_commit(id, slot.committed.as_ref());
        Ok(true)
    }

    pub(crate) fn context_accepts(&self, token: &crate::session::LivenessToken) -> bool {
        self.context.accepts(token)
    }

    fn question(&self, id: &QuestionId) -> FormsResult<&Question> {
        self.form.question(id).ok_or_else(|| unknown(id))
    }

    fn slot(&self, id: &QuestionId) -> FormsResult<&FieldSlot> {
        self.slots.get(id).ok_or_else(|| unknown(id))
    }

    fn slot_mut(&mut self, id: &QuestionId) -> FormsResult<&mut FieldSlot> {
        self.slots.get_mut(id).ok_or_else(|| unknown(id))
    }

    fn ensure_alive(&self) -> FormsResult<()> {
        if self.context.is_alive() {
            Ok(())
        } else {
            Err(FormsError::SessionTornDown)
        }
    }

    fn ensure_writable(&self) -> FormsResult<()> {
        self.ensure_alive()?;
        if self.mode().is_read_only() {
            return Err(FormsError::ReadOnlySession);
        }
        Ok(())
    }
}

fn view_of<'a>(question: &'a Question, slot: &'a FieldSlot) -> FieldView<'a> {
    FieldView {
        question,
        state: slot.state(),
        raw: slot.raw.as_ref(),
        value: slot.committed.as_ref(),
        submission: slot.submission.as_ref(),
    }
}

/// Map the raw value through the handler, store it as committed and notify the observer with
/// the raw value the user entered.
fn commit_raw(
    handler: &dyn SubmissionHandler,
    context: &mut SessionContext,
    question: &Question,
    slot: &mut FieldSlot,
) {
    slot.committed =
        handler.handle_field_submission(question, slot.raw.clone(), context.encounter());
    slot.phase = FieldState::Committed;
    tracing::debug!(question = %question.id, "field committed");
    context.notify_commit(&question.id, slot.raw.as_ref());
}

fn unknown(id: &QuestionId) -> FormsError {
    FormsError::UnknownQuestion(id.clone())
}

fn invalid_transition(id: &QuestionId, slot: &FieldSlot, event: &'static str) -> FormsError {
    FormsError::InvalidTransition {
        question_id: id.clone(),
        from: slot.state().name(),
        event,
    }
}
