use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::info;

use super::domain::{JobPosting, PostingDraft, PostingStats, PostingStatus};
use crate::config::PipelineConfig;
use crate::workflows::recruitment::domain::{Actor, PostingId};
use crate::workflows::recruitment::repository::{retry_on_stale, PostingRepository, RepositoryError};
use crate::workflows::recruitment::{EntityKind, RecruitmentError};

static POSTING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_posting_identity(now: DateTime<Utc>) -> (PostingId, String) {
    let id = POSTING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    (
        PostingId(format!("post-{id:06}")),
        format!("REF-{}-{id:06}", now.year()),
    )
}

/// Owns posting state changes. Counters are left to the store.
pub struct PostingService<S> {
    store: Arc<S>,
    validity_months: u32,
}

impl<S> PostingService<S>
where
    S: PostingRepository + 'static,
{
    pub fn new(store: Arc<S>, config: &PipelineConfig) -> Self {
        Self {
            store,
            validity_months: config.posting_validity_months,
        }
    }

    /// Create a DRAFT posting owned by `actor`.
    pub fn create(&self, actor: &Actor, draft: PostingDraft) -> Result<JobPosting, RecruitmentError> {
        let now = Utc::now();
        let (id, reference) = next_posting_identity(now);
        let mut posting = JobPosting {
            id,
            reference,
            title: String::new(),
            description: String::new(),
            location: None,
            contract_type: Default::default(),
            department: None,
            experience_years: None,
            remote: false,
            required_skills: Vec::new(),
            desired_skills: Vec::new(),
            status: PostingStatus::Draft,
            created_by: actor.id.clone(),
            created_by_name: actor.display_name.clone(),
            view_count: 0,
            application_count: 0,
            published_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        posting.apply_draft(draft)?;

        let stored = self.store.insert_posting(posting)?;
        info!(posting = %stored.id, reference = %stored.reference, "posting drafted");
        Ok(stored)
    }

    /// Replace the editable content. Creator only.
    pub fn revise(
        &self,
        actor: &Actor,
        id: &PostingId,
        draft: PostingDraft,
    ) -> Result<JobPosting, RecruitmentError> {
        self.modify(id, Some((actor, "revise")), |posting| {
            posting.apply_draft(draft.clone())
        })
    }

    /// Read without counting a view.
    pub fn get(&self, id: &PostingId) -> Result<JobPosting, RecruitmentError> {
        self.load(id)
    }

    /// Single-posting fetch as seen by a visitor; counts one view.
    pub fn view(&self, id: &PostingId) -> Result<JobPosting, RecruitmentError> {
        self.store.record_view(id).map_err(|err| match err {
            RepositoryError::NotFound => RecruitmentError::not_found(EntityKind::Posting, id),
            other => other.into(),
        })
    }

    /// Postings a visitor may apply to right now. Listing does not count views.
    pub fn active(&self, now: DateTime<Utc>) -> Result<Vec<JobPosting>, RecruitmentError> {
        let mut postings: Vec<JobPosting> = self
            .store
            .published_postings()?
            .into_iter()
            .filter(|posting| posting.is_active(now))
            .collect();
        postings.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(postings)
    }

    pub fn publish(&self, actor: &Actor, id: &PostingId) -> Result<JobPosting, RecruitmentError> {
        self.publish_at(actor, id, Utc::now())
    }

    pub fn publish_at(
        &self,
        actor: &Actor,
        id: &PostingId,
        now: DateTime<Utc>,
    ) -> Result<JobPosting, RecruitmentError> {
        let validity_months = self.validity_months;
        let posting = self.modify(id, Some((actor, "publish")), |posting| {
            posting.publish(now, validity_months)
        })?;
        info!(posting = %posting.id, expires_at = ?posting.expires_at, "posting published");
        Ok(posting)
    }

    pub fn archive(&self, actor: &Actor, id: &PostingId) -> Result<JobPosting, RecruitmentError> {
        self.close(actor, id, "archive", PostingStatus::Archived)
    }

    pub fn mark_filled(&self, actor: &Actor, id: &PostingId) -> Result<JobPosting, RecruitmentError> {
        self.close(actor, id, "mark filled", PostingStatus::Filled)
    }

    /// Expire every published posting whose expiration has passed. Returns the ids closed.
    pub fn check_expired(&self, now: DateTime<Utc>) -> Result<Vec<PostingId>, RecruitmentError> {
        let mut expired = Vec::new();
        for candidate in self.store.published_postings()? {
            if !candidate.is_expired(now) {
                continue;
            }
            let posting = self.modify(&candidate.id, None, |posting| {
                if posting.is_expired(now) {
                    posting.status = PostingStatus::Expired;
                }
                Ok(())
            })?;
            if posting.status == PostingStatus::Expired {
                expired.push(posting.id);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "expired postings closed");
        }
        Ok(expired)
    }

    /// Number of postings in each status, zero for statuses nobody is in.
    pub fn count_by_status(&self) -> Result<BTreeMap<PostingStatus, usize>, RecruitmentError> {
        let mut counts: BTreeMap<PostingStatus, usize> =
            PostingStatus::ALL.iter().map(|status| (*status, 0)).collect();
        for posting in self.store.all_postings()? {
            *counts.entry(posting.status).or_default() += 1;
        }
        Ok(counts)
    }

    pub fn stats(&self, id: &PostingId, now: DateTime<Utc>) -> Result<PostingStats, RecruitmentError> {
        let posting = self.load(id)?;
        Ok(PostingStats::of(&posting, now))
    }

    fn close(
        &self,
        actor: &Actor,
        id: &PostingId,
        action: &'static str,
        status: PostingStatus,
    ) -> Result<JobPosting, RecruitmentError> {
        let posting = self.modify(id, Some((actor, action)), |posting| {
            posting.status = status;
            Ok(())
        })?;
        info!(posting = %posting.id, status = ?posting.status, "posting closed");
        Ok(posting)
    }

    fn load(&self, id: &PostingId) -> Result<JobPosting, RecruitmentError> {
        self.store
            .fetch_posting(id)?
            .ok_or_else(|| RecruitmentError::not_found(EntityKind::Posting, id))
    }

    fn modify<F>(
        &self,
        id: &PostingId,
        guard: Option<(&Actor, &'static str)>,
        mut change: F,
    ) -> Result<JobPosting, RecruitmentError>
    where
        F: FnMut(&mut JobPosting) -> Result<(), RecruitmentError>,
    {
        retry_on_stale("posting", || {
            let mut posting = self.load(id)?;
            if let Some((actor, action)) = guard {
                if posting.created_by != actor.id {
                    return Err(RecruitmentError::Authorization {
                        actor: actor.id.clone(),
                        action,
                        posting_id: posting.id,
                    });
                }
            }
            change(&mut posting)?;
            posting.updated_at = Utc::now();
            Ok(self.store.update_posting(posting)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::recruitment::domain::ActorRole;
    use crate::workflows::recruitment::memory::InMemoryStore;
    use crate::workflows::recruitment::postings::ContractType;
    use chrono::Duration;

    fn recruiter() -> Actor {
        Actor::new("recruiter-1", "Rita Recruiter", ActorRole::Recruiter)
    }

    fn draft() -> PostingDraft {
        PostingDraft {
            title: "Backend engineer".to_string(),
            description: "Own the applicant pipeline".to_string(),
            location: Some("Lyon".to_string()),
            contract_type: ContractType::Cdi,
            required_skills: vec!["Java".to_string(), "React".to_string(), "MongoDB".to_string()],
            desired_skills: vec!["Docker".to_string()],
            ..PostingDraft::default()
        }
    }

    fn service() -> (PostingService<InMemoryStore>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        (PostingService::new(store.clone(), &PipelineConfig::default()), store)
    }

    #[test]
    fn create_starts_in_draft_with_reference() {
        let (service, _) = service();
        let posting = service.create(&recruiter(), draft()).expect("draft created");

        assert_eq!(posting.status, PostingStatus::Draft);
        assert!(posting.reference.starts_with("REF-"));
        assert_eq!(posting.created_by_name, "Rita Recruiter");
        assert_eq!(posting.view_count, 0);
    }

    #[test]
    fn create_requires_required_skills() {
        let (service, _) = service();
        let mut draft = draft();
        draft.required_skills = vec!["  ".to_string()];

        assert!(matches!(
            service.create(&recruiter(), draft),
            Err(RecruitmentError::Validation(_))
        ));
    }

    #[test]
    fn only_the_creator_may_publish() {
        let (service, _) = service();
        let posting = service.create(&recruiter(), draft()).expect("draft created");
        let intruder = Actor::new("recruiter-2", "Other", ActorRole::Recruiter);

        match service.publish(&intruder, &posting.id) {
            Err(RecruitmentError::Authorization { action, .. }) => assert_eq!(action, "publish"),
            other => panic!("expected authorization error, got {other:?}"),
        }
        assert_eq!(
            service.get(&posting.id).expect("still there").status,
            PostingStatus::Draft
        );
    }

    #[test]
    fn republishing_resets_publication_but_keeps_expiration() {
        let (service, _) = service();
        let actor = recruiter();
        let posting = service.create(&actor, draft()).expect("draft created");

        let first_at = Utc::now() - Duration::days(10);
        let first = service
            .publish_at(&actor, &posting.id, first_at)
            .expect("first publish");
        let second_at = Utc::now();
        let second = service
            .publish_at(&actor, &posting.id, second_at)
            .expect("second publish");

        assert_eq!(second.status, PostingStatus::Published);
        assert_eq!(second.published_at, Some(second_at));
        assert_eq!(second.expires_at, first.expires_at);
    }

    #[test]
    fn views_count_single_fetches_only() {
        let (service, _) = service();
        let actor = recruiter();
        let posting = service.create(&actor, draft()).expect("draft created");
        service.publish(&actor, &posting.id).expect("published");

        service.view(&posting.id).expect("viewed");
        let viewed = service.view(&posting.id).expect("viewed again");
        service.active(Utc::now()).expect("listing");
        service.get(&posting.id).expect("internal read");

        assert_eq!(viewed.view_count, 2);
        assert_eq!(service.get(&posting.id).expect("read").view_count, 2);
    }

    #[test]
    fn viewing_unknown_posting_is_not_found() {
        let (service, _) = service();
        assert!(matches!(
            service.view(&PostingId::from("post-missing")),
            Err(RecruitmentError::NotFound { entity: EntityKind::Posting, .. })
        ));
    }

    #[test]
    fn expiry_sweep_closes_only_lapsed_published_postings() {
        let (service, _) = service();
        let actor = recruiter();
        let lapsed = service.create(&actor, draft()).expect("draft");
        let current = service.create(&actor, draft()).expect("draft");
        let untouched = service.create(&actor, draft()).expect("draft");

        let long_ago = Utc::now() - Duration::days(200);
        service.publish_at(&actor, &lapsed.id, long_ago).expect("published");
        service.publish(&actor, &current.id).expect("published");

        let closed = service.check_expired(Utc::now()).expect("sweep");

        assert_eq!(closed, vec![lapsed.id.clone()]);
        assert_eq!(service.get(&lapsed.id).expect("read").status, PostingStatus::Expired);
        assert_eq!(service.get(&current.id).expect("read").status, PostingStatus::Published);
        assert_eq!(service.get(&untouched.id).expect("read").status, PostingStatus::Draft);
        assert!(service.check_expired(Utc::now()).expect("second sweep").is_empty());
    }

    #[test]
    fn archive_and_fill_are_allowed_from_any_state() {
        let (service, _) = service();
        let actor = recruiter();
        let posting = service.create(&actor, draft()).expect("draft");

        let filled = service.mark_filled(&actor, &posting.id).expect("filled from draft");
        assert_eq!(filled.status, PostingStatus::Filled);
        let archived = service.archive(&actor, &posting.id).expect("archived");
        assert_eq!(archived.status, PostingStatus::Archived);
    }

    #[test]
    fn revise_keeps_counters_and_replaces_content() {
        let (service, store) = service();
        let actor = recruiter();
        let posting = service.create(&actor, draft()).expect("draft");
        store.record_view(&posting.id).expect("view");

        let mut changes = draft();
        changes.title = "Staff engineer".to_string();
        changes.required_skills = vec!["Rust".to_string()];
        let revised = service.revise(&actor, &posting.id, changes).expect("revised");

        assert_eq!(revised.title, "Staff engineer");
        assert_eq!(revised.required_skills, vec!["Rust"]);
        assert_eq!(revised.view_count, 1);
    }

    #[test]
    fn count_by_status_covers_every_status() {
        let (service, _) = service();
        let actor = recruiter();
        let published = service.create(&actor, draft()).expect("draft");
        service.publish(&actor, &published.id).expect("published");
        let archived = service.create(&actor, draft()).expect("draft");
        service.archive(&actor, &archived.id).expect("archived");
        service.create(&actor, draft()).expect("draft");

        let counts = service.count_by_status().expect("counts");
        assert_eq!(counts.len(), PostingStatus::ALL.len());
        assert_eq!(counts[&PostingStatus::Draft], 1);
        assert_eq!(counts[&PostingStatus::Published], 1);
        assert_eq!(counts[&PostingStatus::Archived], 1);
        assert_eq!(counts[&PostingStatus::Filled], 0);
    }

    struct OfflineStore;

    impl PostingRepository for OfflineStore {
        fn insert_posting(&self, _: JobPosting) -> Result<JobPosting, RepositoryError> {
            Err(offline())
        }
        fn fetch_posting(&self, _: &PostingId) -> Result<Option<JobPosting>, RepositoryError> {
            Err(offline())
        }
        fn update_posting(&self, _: JobPosting) -> Result<JobPosting, RepositoryError> {
            Err(offline())
        }
        fn published_postings(&self) -> Result<Vec<JobPosting>, RepositoryError> {
            Err(offline())
        }
        fn all_postings(&self) -> Result<Vec<JobPosting>, RepositoryError> {
            Err(offline())
        }
        fn record_view(&self, _: &PostingId) -> Result<JobPosting, RepositoryError> {
            Err(offline())
        }
        fn adjust_application_count(&self, _: &PostingId, _: i64) -> Result<u64, RepositoryError> {
            Err(offline())
        }
    }

    fn offline() -> RepositoryError {
        RepositoryError::Unavailable("database offline".to_string())
    }

    #[test]
    fn storage_outage_surfaces_as_repository_error() {
        let service = PostingService::new(Arc::new(OfflineStore), &PipelineConfig::default());

        let err = service
            .create(&recruiter(), draft())
            .expect_err("store is offline");
        assert!(matches!(
            err,
            RecruitmentError::Repository(RepositoryError::Unavailable(_))
        ));
        assert!(matches!(
            service.view(&PostingId("post-000001".to_string())),
            Err(RecruitmentError::Repository(RepositoryError::Unavailable(_)))
        ));
    }
}
