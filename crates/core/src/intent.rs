//! Intent-based form filtering.
//!
//! A clinical workflow step (pre-test counselling, testing, post-test counselling) selects the
//! subset of a shared form that applies to it by intent tag.

use crate::error::SchemaError;
use crate::schema::{FormSchema, Page, Section};
use std::borrow::Cow;

/// Reduce `form` to the questions tagged for `intent`.
///
/// - An absent or blank intent returns the form unchanged (borrowed).
/// - A question is kept when its intent set is empty or contains `intent`.
/// - Sections and pages left without questions are dropped.
///
/// The input is never mutated. A missing or malformed form fails with [`SchemaError`] before
/// any filtering happens.
pub fn filter_form_by_intent<'a>(
    intent: Option<&str>,
    form: Option<&'a FormSchema>,
) -> Result<Cow<'a, FormSchema>, SchemaError> {
    let form = form.ok_or(SchemaError::MissingForm)?;
    form.check_well_formed()?;

    let intent = match intent.map(str::trim).filter(|i| !i.is_empty()) {
        Some(intent) => intent,
        None => return Ok(Cow::Borrowed(form)),
    };

    let pages: Vec<Page> = form
        .pages
        .iter()
        .filter_map(|page| {
            let sections: Vec<Section> = page
                .sections
                .iter()
                .filter_map(|section| {
                    let questions: Vec<_> = section
                        .questions
                        .iter()
                        .filter(|q| q.applies_to(intent))
                        .cloned()
                        .collect();
                    (!questions.is_empty()).then(|| Section {
                        label: section.label.clone(),
                        questions,
                    })
                })
                .collect();
            (!sections.is_empty()).then(|| Page {
                label: page.label.clone(),
                sections,
            })
        })
        .collect();

    tracing::debug!(
        form = %form.id,
        intent,
        kept = pages.iter().flat_map(|p| &p.sections).map(|s| s.questions.len()).sum::<usize>(),
        "filtered form by intent"
    );

    Ok(Cow::Owned(FormSchema {
        id: form.id.clone(),
        encounter_type: form.encounter_type.clone(),
        pages,
    }))
}
