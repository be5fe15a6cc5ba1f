use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    ApplicantSnapshot, Application, ApplicationSource, ApplicationStatus, NewApplication,
};
use crate::config::PipelineConfig;
use crate::workflows::recruitment::domain::{
    normalize_email, Actor, ApplicationId, Candidate, CandidateId, PostingId,
};
use crate::workflows::recruitment::intake::{
    extract_fields, looks_like_email, CandidateDocument, DocumentTextExtractor, ExtractedFields,
};
use crate::workflows::recruitment::matching::match_score;
use crate::workflows::recruitment::notifications::{
    dispatch, NotificationEvent, Notifier, Recipient,
};
use crate::workflows::recruitment::policy::{Permissive, TransitionPolicy};
use crate::workflows::recruitment::postings::JobPosting;
use crate::workflows::recruitment::repository::{
    retry_on_stale, ApplicationRepository, CandidateRepository, PostingRepository,
    RepositoryError,
};
use crate::workflows::recruitment::{EntityKind, RecruitmentError};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CANDIDATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_candidate_id() -> CandidateId {
    let id = CANDIDATE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CandidateId(format!("cand-{id:06}"))
}

/// What an applicant sends: form fields plus an optional CV.
#[derive(Debug, Clone, Default)]
pub struct ApplicationSubmission {
    pub posting_id: PostingId,
    pub first_name: String,
    pub last_name: String,
    /// Falls back to the address found in the CV when blank.
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub source: ApplicationSource,
    pub declared_skills: Vec<String>,
    pub document: Option<CandidateDocument>,
}

/// Application counts per status and per source, plus how match scores spread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub counts: BTreeMap<ApplicationStatus, usize>,
    pub sources: BTreeMap<ApplicationSource, usize>,
    pub scores: ScoreDistribution,
    pub total: usize,
}

/// Match scores in five bands of 20 points; the top band also holds 100.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub bands: [usize; 5],
}

impl ScoreDistribution {
    pub const LABELS: [&'static str; 5] = ["0-20", "20-40", "40-60", "60-80", "80-100"];

    pub fn record(&mut self, score: u8) {
        let band = usize::from(score / 20).min(self.bands.len() - 1);
        self.bands[band] += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        Self::LABELS.into_iter().zip(self.bands.iter().copied())
    }
}

/// Service composing document intake, scoring, storage and notifications for applications.
pub struct ApplicationService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    extractor: DocumentTextExtractor,
    policy: Arc<dyn TransitionPolicy<ApplicationStatus>>,
}

impl<S, N> ApplicationService<S, N>
where
    S: PostingRepository + CandidateRepository + ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: &PipelineConfig) -> Self {
        Self {
            store,
            notifier,
            extractor: DocumentTextExtractor::from_config(config),
            policy: Arc::new(Permissive),
        }
    }

    /// Swap the transition guard. The default accepts every move.
    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: TransitionPolicy<ApplicationStatus> + 'static,
    {
        self.policy = Arc::new(policy);
        self
    }

    /// Register an application: read the CV, create or enrich the candidate, score them
    /// against the posting and bump its application counter.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<Application, RecruitmentError> {
        let posting = self
            .store
            .fetch_posting(&submission.posting_id)?
            .ok_or_else(|| {
                RecruitmentError::not_found(EntityKind::Posting, &submission.posting_id)
            })?;

        // Extract before any write: a rejected file must not leave a candidate behind.
        let fields = match &submission.document {
            Some(document) => extract_fields(&self.extractor.extract(document)?.text),
            None => ExtractedFields::default(),
        };

        let email = if submission.email.trim().is_empty() {
            fields.email.clone().unwrap_or_default()
        } else {
            submission.email.clone()
        };
        if !looks_like_email(&email) {
            return Err(RecruitmentError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }
        let email = normalize_email(&email);

        let candidate = self.resolve_candidate(&submission, &fields, &email, &posting)?;
        let now = Utc::now();
        let application = Application::submitted(
            NewApplication {
                id: next_application_id(),
                candidate_id: candidate.id.clone(),
                posting_id: posting.id.clone(),
                snapshot: ApplicantSnapshot {
                    candidate_name: candidate.display_name(),
                    candidate_email: candidate.email.clone(),
                    posting_title: posting.title.clone(),
                },
                match_score: match_score(&candidate.skills, &posting.required_skills),
                cover_letter: submission.cover_letter,
                source: submission.source,
                cv_file_name: submission.document.map(|document| document.file_name),
            },
            now,
        );

        let stored = match self.store.insert_application(application) {
            Err(RepositoryError::Conflict) => return Err(duplicate(&email, &posting)),
            other => other?,
        };
        let applications = match self.store.adjust_application_count(&posting.id, 1) {
            Ok(applications) => applications,
            Err(err) => {
                self.withdraw_insert(&stored);
                return Err(err.into());
            }
        };

        info!(
            application = %stored.id,
            candidate = %stored.candidate_id,
            posting = %stored.posting_id,
            score = stored.match_score,
            applications,
            "application submitted"
        );
        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::ApplicationReceived {
                application_id: stored.id.clone(),
                posting_id: stored.posting_id.clone(),
                posting_title: stored.snapshot.posting_title.clone(),
                recipient: recipient(&stored),
            },
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, RecruitmentError> {
        self.load(id)
    }

    /// Applications to one posting, oldest first.
    pub fn for_posting(&self, posting_id: &PostingId) -> Result<Vec<Application>, RecruitmentError> {
        let mut applications: Vec<Application> = self
            .store
            .all_applications()?
            .into_iter()
            .filter(|application| &application.posting_id == posting_id)
            .collect();
        applications.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(applications)
    }

    /// Move to `to`, appending a history entry authored by `actor`.
    pub fn change_status(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        to: ApplicationStatus,
        comment: Option<String>,
    ) -> Result<Application, RecruitmentError> {
        let mut previous = to;
        let updated = retry_on_stale("application", || {
            let mut application = self.load(id)?;
            previous = application.status();
            self.policy.check(previous, to)?;
            application.record_transition(to, actor, comment.clone(), Utc::now());
            Ok(self.store.update_application(application)?)
        })?;

        info!(
            application = %updated.id,
            from = ?previous,
            to = ?to,
            actor = %actor.id,
            "application status changed"
        );
        if to == ApplicationStatus::Accepted && previous != ApplicationStatus::Accepted {
            dispatch(
                self.notifier.as_ref(),
                NotificationEvent::ApplicationAccepted {
                    application_id: updated.id.clone(),
                    posting_id: updated.posting_id.clone(),
                    posting_title: updated.snapshot.posting_title.clone(),
                    recipient: recipient(&updated),
                },
            );
        }
        Ok(updated)
    }

    pub fn add_comment(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        text: &str,
        private: bool,
    ) -> Result<Application, RecruitmentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RecruitmentError::Validation("comment text is empty".to_string()));
        }

        retry_on_stale("application", || {
            let mut application = self.load(id)?;
            application.add_comment(actor, text.to_string(), private, Utc::now());
            Ok(self.store.update_application(application)?)
        })
    }

    /// Remove an application and give its slot back to the posting counter.
    pub fn delete(&self, id: &ApplicationId) -> Result<Application, RecruitmentError> {
        let removed = self.store.delete_application(id).map_err(|err| match err {
            RepositoryError::NotFound => RecruitmentError::not_found(EntityKind::Application, id),
            other => other.into(),
        })?;

        match self.store.adjust_application_count(&removed.posting_id, -1) {
            Ok(applications) => {
                info!(application = %removed.id, applications, "application deleted")
            }
            Err(RepositoryError::NotFound) => {
                debug!(posting = %removed.posting_id, "posting gone, counter left alone")
            }
            Err(err) => return Err(err.into()),
        }
        Ok(removed)
    }

    /// Count applications per status and source and band their scores, optionally for a
    /// single posting.
    pub fn status_breakdown(
        &self,
        posting_id: Option<&PostingId>,
    ) -> Result<StatusBreakdown, RecruitmentError> {
        let mut counts: BTreeMap<ApplicationStatus, usize> = ApplicationStatus::ALL
            .iter()
            .map(|status| (*status, 0))
            .collect();
        let mut sources: BTreeMap<ApplicationSource, usize> = ApplicationSource::ALL
            .iter()
            .map(|source| (*source, 0))
            .collect();
        let mut scores = ScoreDistribution::default();
        let mut total = 0;

        for application in self.store.all_applications()? {
            if posting_id.is_some_and(|posting| posting != &application.posting_id) {
                continue;
            }
            *counts.entry(application.status()).or_default() += 1;
            *sources.entry(application.source).or_default() += 1;
            scores.record(application.match_score);
            total += 1;
        }

        Ok(StatusBreakdown {
            counts,
            sources,
            scores,
            total,
        })
    }

    /// Undo an insert whose counter bump failed, so the count never lags the stored rows.
    fn withdraw_insert(&self, application: &Application) {
        match self.store.delete_application(&application.id) {
            Ok(_) => warn!(
                application = %application.id,
                posting = %application.posting_id,
                "application counter unavailable, submission rolled back"
            ),
            Err(err) => warn!(
                application = %application.id,
                error = %err,
                "application counter unavailable and rollback failed"
            ),
        }
    }

    fn load(&self, id: &ApplicationId) -> Result<Application, RecruitmentError> {
        self.store
            .fetch_application(id)?
            .ok_or_else(|| RecruitmentError::not_found(EntityKind::Application, id))
    }

    fn resolve_candidate(
        &self,
        submission: &ApplicationSubmission,
        fields: &ExtractedFields,
        email: &str,
        posting: &JobPosting,
    ) -> Result<Candidate, RecruitmentError> {
        let existing = match self.store.find_candidate_by_email(email)? {
            Some(candidate) => candidate,
            None => match self.store.insert_candidate(new_candidate(submission, fields, email)?) {
                Ok(candidate) => {
                    info!(
                        candidate = %candidate.id,
                        skills = candidate.skills.len(),
                        "candidate registered"
                    );
                    return Ok(candidate);
                }
                // Registered concurrently under the same address.
                Err(RepositoryError::Conflict) => self
                    .store
                    .find_candidate_by_email(email)?
                    .ok_or(RepositoryError::Conflict)?,
                Err(err) => return Err(err.into()),
            },
        };

        if self
            .store
            .find_active_application(&existing.id, &posting.id)?
            .is_some()
        {
            return Err(duplicate(email, posting));
        }

        self.enrich_candidate(&existing.id, submission, fields)
    }

    fn enrich_candidate(
        &self,
        id: &CandidateId,
        submission: &ApplicationSubmission,
        fields: &ExtractedFields,
    ) -> Result<Candidate, RecruitmentError> {
        retry_on_stale("candidate", || {
            let mut candidate = self
                .store
                .fetch_candidate(id)?
                .ok_or_else(|| RecruitmentError::not_found(EntityKind::Candidate, id))?;

            let added = candidate.merge_skills(
                submission
                    .declared_skills
                    .iter()
                    .chain(fields.skills.iter()),
            );
            if let Some(document) = &submission.document {
                candidate.cv_file_name = Some(document.file_name.clone());
            }
            if candidate.phone.is_none() {
                candidate.phone = submission.phone.clone().or_else(|| fields.phone.clone());
            }
            candidate.updated_at = Utc::now();

            let candidate = self.store.update_candidate(candidate)?;
            debug!(candidate = %candidate.id, added, "candidate profile enriched");
            Ok(candidate)
        })
    }
}

fn new_candidate(
    submission: &ApplicationSubmission,
    fields: &ExtractedFields,
    email: &str,
) -> Result<Candidate, RecruitmentError> {
    let (mut first_name, mut last_name) = (
        submission.first_name.trim().to_string(),
        submission.last_name.trim().to_string(),
    );
    if first_name.is_empty() && last_name.is_empty() {
        if let Some(name) = &fields.name {
            let mut parts = name.splitn(2, char::is_whitespace);
            first_name = parts.next().unwrap_or_default().to_string();
            last_name = parts.next().unwrap_or_default().trim().to_string();
        }
    }
    if first_name.is_empty() && last_name.is_empty() {
        return Err(RecruitmentError::Validation(
            "candidate name is required".to_string(),
        ));
    }

    let now = Utc::now();
    let mut candidate = Candidate {
        id: next_candidate_id(),
        first_name,
        last_name,
        email: email.to_string(),
        phone: submission.phone.clone().or_else(|| fields.phone.clone()),
        title: None,
        summary: None,
        skills: Vec::new(),
        cv_file_name: submission
            .document
            .as_ref()
            .map(|document| document.file_name.clone()),
        cv_url: None,
        created_at: now,
        updated_at: now,
        version: 0,
    };
    candidate.merge_skills(submission.declared_skills.iter().chain(fields.skills.iter()));
    Ok(candidate)
}

fn duplicate(email: &str, posting: &JobPosting) -> RecruitmentError {
    RecruitmentError::DuplicateApplication {
        candidate_email: email.to_string(),
        posting_id: posting.id.clone(),
    }
}

fn recipient(application: &Application) -> Recipient {
    Recipient {
        name: application.snapshot.candidate_name.clone(),
        email: application.snapshot.candidate_email.clone(),
    }
}
