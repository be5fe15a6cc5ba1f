use tracing::debug;

use super::applications::Application;
use super::domain::{ApplicationId, Candidate, CandidateId, InterviewId, PostingId};
use super::error::RecruitmentError;
use super::interviews::Interview;
use super::postings::JobPosting;

/// Storage for job postings.
///
/// Counters are owned by the store: `update_posting` never writes `view_count` or
/// `application_count`, and the two counter operations apply their change atomically so
/// concurrent requests cannot lose increments.
pub trait PostingRepository: Send + Sync {
    fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError>;
    fn fetch_posting(&self, id: &PostingId) -> Result<Option<JobPosting>, RepositoryError>;
    /// Fails with [`RepositoryError::StaleVersion`] when `posting.version` is behind the store.
    fn update_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError>;
    fn published_postings(&self) -> Result<Vec<JobPosting>, RepositoryError>;
    fn all_postings(&self) -> Result<Vec<JobPosting>, RepositoryError>;
    /// Increment the view counter by one and return the posting as stored afterwards.
    fn record_view(&self, id: &PostingId) -> Result<JobPosting, RepositoryError>;
    /// Apply `delta` to the application counter, flooring at zero. Returns the new count.
    fn adjust_application_count(&self, id: &PostingId, delta: i64)
        -> Result<u64, RepositoryError>;
}

/// Storage for candidates, unique by (normalised) email.
pub trait CandidateRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the email is already registered.
    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError>;
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError>;
    fn find_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, RepositoryError>;
    fn update_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError>;
}

/// Storage for applications.
pub trait ApplicationRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the candidate already holds a
    /// non-withdrawn application to the same posting.
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    fn update_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn delete_application(&self, id: &ApplicationId) -> Result<Application, RepositoryError>;
    fn find_active_application(
        &self,
        candidate_id: &CandidateId,
        posting_id: &PostingId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn all_applications(&self) -> Result<Vec<Application>, RepositoryError>;
}

/// Storage for interviews.
pub trait InterviewRepository: Send + Sync {
    fn insert_interview(&self, interview: Interview) -> Result<Interview, RepositoryError>;
    fn fetch_interview(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError>;
    fn update_interview(&self, interview: Interview) -> Result<Interview, RepositoryError>;
    fn all_interviews(&self) -> Result<Vec<Interview>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently")]
    StaleVersion,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub(crate) const MAX_WRITE_ATTEMPTS: usize = 5;

/// Run a read-modify-write cycle, starting over from a fresh read when the store reports
/// that another writer got there first.
pub(crate) fn retry_on_stale<T, F>(entity: &str, mut attempt: F) -> Result<T, RecruitmentError>
where
    F: FnMut() -> Result<T, RecruitmentError>,
{
    let mut tries = 1;
    loop {
        match attempt() {
            Err(RecruitmentError::Repository(RepositoryError::StaleVersion))
                if tries < MAX_WRITE_ATTEMPTS =>
            {
                debug!(entity, attempt = tries, "stale write, retrying from a fresh read");
                tries += 1;
            }
            other => return other,
        }
    }
}
