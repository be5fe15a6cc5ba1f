//! Mutex-backed storage and a recording notifier, used by tests and the command-line demo.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::applications::Application;
use super::domain::{normalize_email, ApplicationId, Candidate, CandidateId, InterviewId, PostingId};
use super::interviews::Interview;
use super::notifications::{NotificationEvent, Notifier, NotifyError};
use super::postings::{JobPosting, PostingStatus};
use super::repository::{
    ApplicationRepository, CandidateRepository, InterviewRepository, PostingRepository,
    RepositoryError,
};

/// All four repositories in one process-local store. Each table has its own lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    postings: Mutex<HashMap<PostingId, JobPosting>>,
    candidates: Mutex<HashMap<CandidateId, Candidate>>,
    applications: Mutex<HashMap<ApplicationId, Application>>,
    interviews: Mutex<HashMap<InterviewId, Interview>>,
}

fn lock<T>(table: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    table
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
}

/// Compare-and-swap on the record version.
fn check_version(stored: u64, incoming: u64) -> Result<(), RepositoryError> {
    if stored == incoming {
        Ok(())
    } else {
        Err(RepositoryError::StaleVersion)
    }
}

impl PostingRepository for InMemoryStore {
    fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError> {
        let mut postings = lock(&self.postings)?;
        if postings.contains_key(&posting.id) {
            return Err(RepositoryError::Conflict);
        }
        postings.insert(posting.id.clone(), posting.clone());
        Ok(posting)
    }

    fn fetch_posting(&self, id: &PostingId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(lock(&self.postings)?.get(id).cloned())
    }

    fn update_posting(&self, mut posting: JobPosting) -> Result<JobPosting, RepositoryError> {
        let mut postings = lock(&self.postings)?;
        let stored = postings.get_mut(&posting.id).ok_or(RepositoryError::NotFound)?;
        check_version(stored.version, posting.version)?;

        posting.view_count = stored.view_count;
        posting.application_count = stored.application_count;
        posting.version += 1;
        *stored = posting.clone();
        Ok(posting)
    }

    fn published_postings(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(lock(&self.postings)?
            .values()
            .filter(|posting| posting.status == PostingStatus::Published)
            .cloned()
            .collect())
    }

    fn all_postings(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(lock(&self.postings)?.values().cloned().collect())
    }

    fn record_view(&self, id: &PostingId) -> Result<JobPosting, RepositoryError> {
        let mut postings = lock(&self.postings)?;
        let stored = postings.get_mut(id).ok_or(RepositoryError::NotFound)?;
        stored.view_count += 1;
        Ok(stored.clone())
    }

    fn adjust_application_count(
        &self,
        id: &PostingId,
        delta: i64,
    ) -> Result<u64, RepositoryError> {
        let mut postings = lock(&self.postings)?;
        let stored = postings.get_mut(id).ok_or(RepositoryError::NotFound)?;
        stored.application_count = if delta >= 0 {
            stored.application_count.saturating_add(delta.unsigned_abs())
        } else {
            stored.application_count.saturating_sub(delta.unsigned_abs())
        };
        Ok(stored.application_count)
    }
}

impl CandidateRepository for InMemoryStore {
    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError> {
        let mut candidates = lock(&self.candidates)?;
        let email = normalize_email(&candidate.email);
        let taken = candidates.contains_key(&candidate.id)
            || candidates
                .values()
                .any(|existing| normalize_email(&existing.email) == email);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        candidates.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Ok(lock(&self.candidates)?.get(id).cloned())
    }

    fn find_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, RepositoryError> {
        let email = normalize_email(email);
        Ok(lock(&self.candidates)?
            .values()
            .find(|candidate| normalize_email(&candidate.email) == email)
            .cloned())
    }

    fn update_candidate(&self, mut candidate: Candidate) -> Result<Candidate, RepositoryError> {
        let mut candidates = lock(&self.candidates)?;
        let stored = candidates
            .get_mut(&candidate.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(stored.version, candidate.version)?;

        candidate.version += 1;
        *stored = candidate.clone();
        Ok(candidate)
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut applications = lock(&self.applications)?;
        let blocked = applications.contains_key(&application.id)
            || applications.values().any(|existing| {
                existing.is_active()
                    && existing.candidate_id == application.candidate_id
                    && existing.posting_id == application.posting_id
            });
        if blocked {
            return Err(RepositoryError::Conflict);
        }
        applications.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(lock(&self.applications)?.get(id).cloned())
    }

    fn update_application(
        &self,
        mut application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut applications = lock(&self.applications)?;
        let stored = applications
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(stored.version, application.version)?;

        application.version += 1;
        *stored = application.clone();
        Ok(application)
    }

    fn delete_application(&self, id: &ApplicationId) -> Result<Application, RepositoryError> {
        lock(&self.applications)?
            .remove(id)
            .ok_or(RepositoryError::NotFound)
    }

    fn find_active_application(
        &self,
        candidate_id: &CandidateId,
        posting_id: &PostingId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(lock(&self.applications)?
            .values()
            .find(|application| {
                application.is_active()
                    && &application.candidate_id == candidate_id
                    && &application.posting_id == posting_id
            })
            .cloned())
    }

    fn all_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(lock(&self.applications)?.values().cloned().collect())
    }
}

impl InterviewRepository for InMemoryStore {
    fn insert_interview(&self, interview: Interview) -> Result<Interview, RepositoryError> {
        let mut interviews = lock(&self.interviews)?;
        if interviews.contains_key(&interview.id) {
            return Err(RepositoryError::Conflict);
        }
        interviews.insert(interview.id.clone(), interview.clone());
        Ok(interview)
    }

    fn fetch_interview(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Ok(lock(&self.interviews)?.get(id).cloned())
    }

    fn update_interview(&self, mut interview: Interview) -> Result<Interview, RepositoryError> {
        let mut interviews = lock(&self.interviews)?;
        let stored = interviews
            .get_mut(&interview.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(stored.version, interview.version)?;

        interview.version += 1;
        *stored = interview.clone();
        Ok(interview)
    }

    fn all_interviews(&self) -> Result<Vec<Interview>, RepositoryError> {
        Ok(lock(&self.interviews)?.values().cloned().collect())
    }
}

/// Keeps every emitted event in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn templates(&self) -> Vec<&'static str> {
        self.events().iter().map(NotificationEvent::template).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|_| NotifyError::Closed)?
            .push(event);
        Ok(())
    }
}
