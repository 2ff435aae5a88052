use forms_core::config::resolve_forms_dir;
use forms_core::{
    assemble, enrich_questions, filter_form_by_intent, validate, EncounterIdentity,
    EnrichmentSource, FieldState, FieldValue, FormSchema, FormSession, FormsResult, NoopObserver,
    Question, QuestionId, SchemaStore, SessionContext, SessionMode, SubmissionRecord,
    ValidationError, ValidationErrorCode,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

const INTENT_FORM: &str = r#"
id: intent-demo
pages:
  - label: Only page
    sections:
      - label: Only section
        questions:
          - id: q1
            label: Question one
            type: obs
            intents: [A]
            unspecified: true
            questionOptions:
              rendering: text
              concept: c1
"#;

fn qid(s: &str) -> QuestionId {
    QuestionId::new(s).unwrap()
}

fn patient() -> EncounterIdentity {
    EncounterIdentity::new_encounter(Uuid::new_v4())
}

fn hts_form() -> Arc<FormSchema> {
    let dir = resolve_forms_dir(None).expect("forms directory");
    let store = SchemaStore::load_dir(&dir).expect("forms load");
    store.get("hiv", "hts").expect("hts form")
}

fn mount(form: FormSchema) -> FormSession {
    let context = SessionContext::new(SessionMode::Enter, patient(), NoopObserver);
    FormSession::new(form, context).expect("mount")
}

fn enter(session: &mut FormSession, id: &QuestionId, value: FieldValue) -> FieldState {
    session.focus(id).unwrap();
    session.input(id, Some(value)).unwrap();
    session.blur(id).unwrap()
}

#[test]
fn intent_match_keeps_question_and_blank_value_is_required() {
    let form = FormSchema::parse_yaml(INTENT_FORM).unwrap();
    let filtered = filter_form_by_intent(Some("A"), Some(&form)).unwrap();
    let question = filtered.question(&qid("q1")).expect("q1 kept");

    let errors = validate(question, None, Some(&FieldValue::text("")));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].err_code, ValidationErrorCode::FieldRequired);
    assert_eq!(errors[0].err_message, "Field is mandatory");
}

#[test]
fn intent_mismatch_removes_question_and_empty_section() {
    let form = FormSchema::parse_yaml(INTENT_FORM).unwrap();
    let filtered = filter_form_by_intent(Some("B"), Some(&form)).unwrap();
    assert!(filtered.question(&qid("q1")).is_none());
    assert!(filtered.pages.is_empty());
}

#[test]
fn unspecified_blank_field_submits_null_without_errors() {
    let form = FormSchema::parse_yaml(INTENT_FORM).unwrap();
    let question = form.question(&qid("q1")).unwrap();
    assert!(validate(
        question,
        Some(&SubmissionRecord::unspecified()),
        Some(&FieldValue::text(""))
    )
    .is_empty());

    let mut session = mount(form.clone());
    let q1 = qid("q1");
    session.set_unspecified(&q1, true).unwrap();
    assert_eq!(enter(&mut session, &q1, FieldValue::text("")), FieldState::Unspecified);

    let submission = assemble(&session);
    assert_eq!(submission.values.get(&q1), Some(&None));
    assert!(submission.unspecified.contains(&q1));
    assert!(!submission.has_errors());
}

struct FinalResult;

impl EnrichmentSource for FinalResult {
    async fn lookup(
        &self,
        _encounter: &EncounterIdentity,
        question: &Question,
    ) -> FormsResult<Option<FieldValue>> {
        tokio::task::yield_now().await;
        Ok((question.id.as_str() == "finalHivResult").then(|| FieldValue::text("Positive")))
    }
}

#[tokio::test]
async fn enriched_value_is_submitted_without_errors() {
    let form = hts_form();
    let filtered = filter_form_by_intent(Some("HIV_TEST"), Some(form.as_ref()))
        .unwrap()
        .into_owned();
    let mut session = mount(filtered);
    let result = qid("finalHivResult");

    let committed = enrich_questions(&mut session, &FinalResult, &[result.clone()])
        .await
        .unwrap();
    assert_eq!(committed, 1);

    let submission = assemble(&session);
    assert_eq!(
        submission.values.get(&result),
        Some(&Some(FieldValue::text("Positive")))
    );
    assert!(!submission.errors.contains_key(&result));
}

#[test]
fn committing_the_same_value_twice_is_idempotent() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let context = SessionContext::new(
        SessionMode::Enter,
        patient(),
        move |id: &QuestionId, value: Option<&FieldValue>| {
            sink.borrow_mut().push((id.to_string(), value.cloned()));
        },
    );
    let mut session = FormSession::new(hts_form(), context).unwrap();
    let notes = qid("postTestNotes");

    assert_eq!(enter(&mut session, &notes, FieldValue::text("Referred")), FieldState::Committed);
    let first = assemble(&session);

    enter(&mut session, &notes, FieldValue::text("Referred"));
    let second = assemble(&session);
    assert_eq!(first, second);
    assert_eq!(
        *seen.borrow(),
        vec![("postTestNotes".to_string(), Some(FieldValue::text("Referred")))]
    );
}

#[test]
fn toggling_unspecified_off_matches_fresh_validation() {
    let mut session = mount(hts_form().as_ref().clone());
    let pop = qid("popType");

    enter(&mut session, &pop, FieldValue::text(""));
    session.set_unspecified(&pop, true).unwrap();
    session.set_unspecified(&pop, false).unwrap();

    let field = session.field(&pop).unwrap();
    let fresh = validate(field.question, None, field.raw);
    assert_eq!(field.errors(), fresh.as_slice());
    assert_eq!(fresh, vec![ValidationError::field_required()]);
    assert!(!field.is_unspecified());
}

#[test]
fn observer_sees_commits_and_overrides_in_order() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let context = SessionContext::new(
        SessionMode::Enter,
        patient(),
        move |id: &QuestionId, value: Option<&FieldValue>| {
            sink.borrow_mut().push((id.to_string(), value.cloned()));
        },
    );
    let mut session = FormSession::new(hts_form(), context).unwrap();
    let result = qid("finalHivResult");

    enter(&mut session, &result, FieldValue::text("Negative"));
    session.set_unspecified(&result, true).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            ("finalHivResult".to_string(), Some(FieldValue::text("Negative"))),
            ("finalHivResult".to_string(), None),
        ]
    );
}

#[test]
fn view_mode_is_read_only_but_renders_saved_values() {
    let context = SessionContext::new(SessionMode::View, patient(), NoopObserver);
    let mut session = FormSession::new(hts_form(), context).unwrap();
    let consent = qid("consentToTest");

    session
        .prefill(&consent, Some(FieldValue::text("Yes")))
        .unwrap();
    assert!(session.focus(&consent).is_err());

    let submission = assemble(&session);
    assert_eq!(
        submission.values.get(&consent),
        Some(&Some(FieldValue::text("Yes")))
    );
    assert!(!submission.has_errors());
}
