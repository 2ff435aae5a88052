//! Asynchronous enrichment of fields with derived values.
//!
//! A background lookup (for example a patient's final HIV result) may complete after the
//! field has rendered. Its result is committed out of band: it skips the edit cycle and the
//! validator, because derived values are assumed valid at their source.
//!
//! Lookups cannot be cancelled. Each one carries an [`EnrichmentTicket`] holding the liveness
//! token of the session that issued it, and a completion arriving after that session was torn
//! down is discarded.

use crate::error::{FormsError, FormsResult};
use crate::field::FormSession;
use crate::schema::Question;
use crate::session::{EncounterIdentity, LivenessToken};
use forms_types::{FieldValue, QuestionId};
use futures::future::join_all;
use std::future::Future;

/// Source of derived field values.
pub trait EnrichmentSource {
    /// Look up the derived value for `question`. `Ok(None)` means nothing is known.
    fn lookup(
        &self,
        encounter: &EncounterIdentity,
        question: &Question,
    ) -> impl Future<Output = FormsResult<Option<FieldValue>>>;
}

/// Issued when a lookup starts; redeemed when it completes.
#[derive(Clone, Debug)]
pub struct EnrichmentTicket {
    question_id: QuestionId,
    token: LivenessToken,
}

impl EnrichmentTicket {
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    pub fn is_live(&self) -> bool {
        self.token.is_alive()
    }
}

impl FormSession {
    /// Capture a ticket for a lookup about to be issued for `id`.
    pub fn begin_enrichment(&self, id: &QuestionId) -> FormsResult<EnrichmentTicket> {
        if self.form().question(id).is_none() {
            return Err(FormsError::UnknownQuestion(id.clone()));
        }
        Ok(EnrichmentTicket {
            question_id: id.clone(),
            token: self.context().liveness()?,
        })
    }

    /// Commit a completed lookup into its question.
    ///
    /// Returns false, leaving all state untouched, when the issuing session has been torn down
    /// (or the ticket belongs to another session) or the question is unspecified.
    pub fn complete_enrichment(
        &mut self,
        ticket: EnrichmentTicket,
        value: Option<FieldValue>,
    ) -> FormsResult<bool> {
        if !self.context_accepts(&ticket.token) {
            tracing::warn!(
                question = %ticket.question_id,
                "discarding enrichment result for a session that is no longer mounted"
            );
            return Ok(false);
        }
        self.commit_out_of_band(&ticket.question_id, value)
    }
}

/// Look up derived values for `ids` concurrently and commit each into its own question.
///
/// Lookups are independent: a failed lookup is logged and skipped without affecting the others.
/// Returns the number of questions that received a value.
pub async fn enrich_questions<S>(
    session: &mut FormSession,
    source: &S,
    ids: &[QuestionId],
) -> FormsResult<usize>
where
    S: EnrichmentSource,
{
    let tickets = ids
        .iter()
        .map(|id| session.begin_enrichment(id))
        .collect::<FormsResult<Vec<_>>>()?;

    let results = {
        let session = &*session;
        let encounter = session.context().encounter();
        let lookups = tickets.iter().filter_map(|ticket| {
            session
                .form()
                .question(&ticket.question_id)
                .map(|question| source.lookup(encounter, question))
        });
        join_all(lookups).await
    };

    let mut committed = 0;
    for (ticket, result) in tickets.into_iter().zip(results) {
        match result {
            Ok(Some(value)) => {
                if session.complete_enrichment(ticket, Some(value))? {
                    committed += 1;
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(question = %ticket.question_id, "enrichment lookup failed: {err}");
            }
        }
    }
    Ok(committed)
}
