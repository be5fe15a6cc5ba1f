use std::io::{Cursor, Write};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::workflows::recruitment::applications::{ApplicationService, ApplicationSubmission};
use crate::workflows::recruitment::applications::Application;
use crate::workflows::recruitment::domain::{
    Actor, ActorRole, ApplicationId, Candidate, CandidateId, PostingId,
};
use crate::workflows::recruitment::intake::CandidateDocument;
use crate::workflows::recruitment::memory::{InMemoryStore, RecordingNotifier};
use crate::workflows::recruitment::notifications::{NotificationEvent, Notifier, NotifyError};
use crate::workflows::recruitment::postings::{JobPosting, PostingDraft, PostingService};
use crate::workflows::recruitment::repository::{
    ApplicationRepository, CandidateRepository, PostingRepository, RepositoryError,
};

pub(super) fn recruiter() -> Actor {
    Actor::new("recruiter-1", "Rita Recruiter", ActorRole::Recruiter)
}

pub(super) fn posting_draft() -> PostingDraft {
    PostingDraft {
        title: "Full-stack developer".to_string(),
        description: "Ship the careers site".to_string(),
        location: Some("Nantes".to_string()),
        required_skills: vec!["Java".to_string(), "React".to_string(), "MongoDB".to_string()],
        desired_skills: vec!["Docker".to_string()],
        ..PostingDraft::default()
    }
}

pub(super) fn published_posting(store: &Arc<InMemoryStore>) -> JobPosting {
    let postings = PostingService::new(store.clone(), &PipelineConfig::default());
    let actor = recruiter();
    let posting = postings
        .create(&actor, posting_draft())
        .expect("posting created");
    postings
        .publish(&actor, &posting.id)
        .expect("posting published")
}

pub(super) fn submission(posting_id: &PostingId) -> ApplicationSubmission {
    ApplicationSubmission {
        posting_id: posting_id.clone(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: "Jane.Doe@example.com".to_string(),
        phone: None,
        cover_letter: Some("I would love to join.".to_string()),
        declared_skills: vec!["Java".to_string(), "React".to_string()],
        ..ApplicationSubmission::default()
    }
}

pub(super) fn build_service() -> (
    ApplicationService<InMemoryStore, RecordingNotifier>,
    Arc<InMemoryStore>,
    Arc<RecordingNotifier>,
) {
    let store = Arc::new(InMemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = ApplicationService::new(store.clone(), notifier.clone(), &PipelineConfig::default());
    (service, store, notifier)
}

/// Word document whose body is one paragraph per line of `text`.
pub(super) fn cv_docx(text: &str) -> CandidateDocument {
    let paragraphs: String = text
        .lines()
        .map(|line| format!("<w:p><w:r><w:t xml:space=\"preserve\">{line}</w:t></w:r></w:p>"))
        .collect();
    let body = format!(
        "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{paragraphs}</w:body></w:document>"
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::FileOptions::default())
        .expect("start document part");
    writer.write_all(body.as_bytes()).expect("write document part");
    let bytes = writer.finish().expect("finish docx").into_inner();
    CandidateDocument::new("jane-doe.docx", bytes)
}

#[derive(Default)]
pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _event: NotificationEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// In-memory store whose application counter is offline; everything else works.
#[derive(Default)]
pub(super) struct CounterOutageStore {
    pub(super) inner: InMemoryStore,
}

impl PostingRepository for CounterOutageStore {
    fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError> {
        self.inner.insert_posting(posting)
    }
    fn fetch_posting(&self, id: &PostingId) -> Result<Option<JobPosting>, RepositoryError> {
        self.inner.fetch_posting(id)
    }
    fn update_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError> {
        self.inner.update_posting(posting)
    }
    fn published_postings(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        self.inner.published_postings()
    }
    fn all_postings(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        self.inner.all_postings()
    }
    fn record_view(&self, id: &PostingId) -> Result<JobPosting, RepositoryError> {
        self.inner.record_view(id)
    }
    fn adjust_application_count(&self, _: &PostingId, _: i64) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("counter shard offline".to_string()))
    }
}

impl CandidateRepository for CounterOutageStore {
    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError> {
        self.inner.insert_candidate(candidate)
    }
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        self.inner.fetch_candidate(id)
    }
    fn find_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, RepositoryError> {
        self.inner.find_candidate_by_email(email)
    }
    fn update_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError> {
        self.inner.update_candidate(candidate)
    }
}

impl ApplicationRepository for CounterOutageStore {
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }
    fn update_application(&self, application: Application)
        -> Result<Application, RepositoryError> {
        self.inner.update_application(application)
    }
    fn delete_application(&self, id: &ApplicationId) -> Result<Application, RepositoryError> {
        self.inner.delete_application(id)
    }
    fn find_active_application(
        &self,
        candidate_id: &CandidateId,
        posting_id: &PostingId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.find_active_application(candidate_id, posting_id)
    }
    fn all_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        self.inner.all_applications()
    }
}
