use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{
    Evaluation, Interview, InterviewPlan, InterviewStats, InterviewStatus, Recommendation,
};
use crate::workflows::recruitment::domain::{Actor, ActorId, ApplicationId, InterviewId};
use crate::workflows::recruitment::notifications::{
    dispatch, NotificationEvent, Notifier, Recipient,
};
use crate::workflows::recruitment::policy::{Permissive, TransitionPolicy};
use crate::workflows::recruitment::repository::{
    retry_on_stale, ApplicationRepository, InterviewRepository,
};
use crate::workflows::recruitment::{EntityKind, RecruitmentError};

static INTERVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_interview_id() -> InterviewId {
    let id = INTERVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InterviewId(format!("itv-{id:06}"))
}

/// Free-text notes; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct InterviewNotes {
    pub before: Option<String>,
    pub during: Option<String>,
    pub after: Option<String>,
}

pub struct InterviewService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    policy: Arc<dyn TransitionPolicy<InterviewStatus>>,
}

impl<S, N> InterviewService<S, N>
where
    S: ApplicationRepository + InterviewRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self {
            store,
            notifier,
            policy: Arc::new(Permissive),
        }
    }

    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: TransitionPolicy<InterviewStatus> + 'static,
    {
        self.policy = Arc::new(policy);
        self
    }

    /// Schedule an interview for an application and invite the candidate.
    pub fn schedule(
        &self,
        actor: &Actor,
        plan: InterviewPlan,
    ) -> Result<Interview, RecruitmentError> {
        let application = self
            .store
            .fetch_application(&plan.application_id)?
            .ok_or_else(|| {
                RecruitmentError::not_found(EntityKind::Application, &plan.application_id)
            })?;

        let interview = Interview::from_application(
            next_interview_id(),
            &application,
            plan,
            actor,
            Utc::now(),
        )?;
        let stored = self.store.insert_interview(interview)?;

        info!(
            interview = %stored.id,
            application = %stored.application_id,
            starts_at = %stored.starts_at(),
            "interview scheduled"
        );
        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::InterviewInvitation {
                interview_id: stored.id.clone(),
                application_id: stored.application_id.clone(),
                posting_title: stored.snapshot.posting_title.clone(),
                recipient: recipient(&stored),
                interview_type: stored.interview_type,
                starts_at: stored.starts_at(),
                duration_minutes: stored.duration_minutes(),
                location_mode: stored.location_mode,
                location: stored.location.clone(),
                video_link: stored.video_link().map(str::to_string),
            },
        );
        Ok(stored)
    }

    pub fn get(&self, id: &InterviewId) -> Result<Interview, RecruitmentError> {
        self.load(id)
    }

    /// Interviews of one application, earliest first.
    pub fn for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Interview>, RecruitmentError> {
        self.sorted(|interview| &interview.application_id == application_id)
    }

    pub fn for_interviewer(
        &self,
        interviewer: &ActorId,
    ) -> Result<Vec<Interview>, RecruitmentError> {
        self.sorted(|interview| {
            interview
                .interviewers
                .iter()
                .any(|member| &member.id == interviewer)
        })
    }

    /// Planned or confirmed interviews starting at or after `now`, earliest first.
    pub fn upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Interview>, RecruitmentError> {
        self.sorted(|interview| interview.is_upcoming(now))
    }

    pub fn change_status(
        &self,
        actor: &Actor,
        id: &InterviewId,
        to: InterviewStatus,
    ) -> Result<Interview, RecruitmentError> {
        let interview = self.modify(id, |interview| {
            self.policy.check(interview.status, to)?;
            interview.status = to;
            Ok(())
        })?;
        info!(
            interview = %interview.id,
            status = ?to,
            actor = %actor.id,
            "interview status changed"
        );
        Ok(interview)
    }

    /// Move the start and/or change the duration; the end time follows.
    pub fn reschedule(
        &self,
        id: &InterviewId,
        starts_at: Option<DateTime<Utc>>,
        duration_minutes: Option<u32>,
    ) -> Result<Interview, RecruitmentError> {
        let interview = self.modify(id, |interview| {
            interview.reschedule(starts_at, duration_minutes)
        })?;
        info!(
            interview = %interview.id,
            starts_at = %interview.starts_at(),
            ends_at = %interview.ends_at(),
            "interview rescheduled"
        );
        Ok(interview)
    }

    pub fn record_notes(
        &self,
        id: &InterviewId,
        notes: InterviewNotes,
    ) -> Result<Interview, RecruitmentError> {
        self.modify(id, |interview| {
            if let Some(before) = &notes.before {
                interview.notes_before = Some(before.clone());
            }
            if let Some(during) = &notes.during {
                interview.notes_during = Some(during.clone());
            }
            if let Some(after) = &notes.after {
                interview.notes_after = Some(after.clone());
            }
            Ok(())
        })
    }

    pub fn recommend(
        &self,
        id: &InterviewId,
        recommendation: Recommendation,
        reason: Option<String>,
    ) -> Result<Interview, RecruitmentError> {
        self.modify(id, |interview| {
            interview.recommendation = Some(recommendation);
            interview.recommendation_reason = reason.clone();
            Ok(())
        })
    }

    /// Append one criterion score and recompute the overall score from all of them.
    pub fn add_evaluation(
        &self,
        id: &InterviewId,
        evaluation: Evaluation,
    ) -> Result<Interview, RecruitmentError> {
        let interview = self.modify(id, |interview| {
            interview.add_evaluation(evaluation.clone())
        })?;
        info!(
            interview = %interview.id,
            evaluations = interview.evaluations().len(),
            overall = ?interview.overall_score(),
            "interview evaluated"
        );
        Ok(interview)
    }

    /// Remind candidates of interviews starting within 24 hours. Each interview is reminded
    /// once; cancelled ones are skipped. Returns the ids reminded by this run.
    pub fn send_due_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<InterviewId>, RecruitmentError> {
        let mut reminded = Vec::new();
        for due in self.store.all_interviews()? {
            if !reminder_due(&due, now) {
                continue;
            }

            let mut claimed = false;
            let interview = self.modify(&due.id, |interview| {
                claimed = reminder_due(interview, now);
                if claimed {
                    interview.reminder_sent = true;
                    interview.reminder_sent_at = Some(now);
                }
                Ok(())
            })?;
            if !claimed {
                continue;
            }

            dispatch(
                self.notifier.as_ref(),
                NotificationEvent::InterviewReminder {
                    interview_id: interview.id.clone(),
                    application_id: interview.application_id.clone(),
                    posting_title: interview.snapshot.posting_title.clone(),
                    recipient: recipient(&interview),
                    starts_at: interview.starts_at(),
                    location: interview.location.clone(),
                },
            );
            reminded.push(interview.id);
        }

        if !reminded.is_empty() {
            info!(count = reminded.len(), "interview reminders sent");
        }
        Ok(reminded)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> Result<InterviewStats, RecruitmentError> {
        let interviews = self.store.all_interviews()?;
        Ok(InterviewStats::collect(&interviews, now))
    }

    fn load(&self, id: &InterviewId) -> Result<Interview, RecruitmentError> {
        self.store
            .fetch_interview(id)?
            .ok_or_else(|| RecruitmentError::not_found(EntityKind::Interview, id))
    }

    fn sorted<F>(&self, keep: F) -> Result<Vec<Interview>, RecruitmentError>
    where
        F: Fn(&Interview) -> bool,
    {
        let mut interviews: Vec<Interview> = self
            .store
            .all_interviews()?
            .into_iter()
            .filter(|interview| keep(interview))
            .collect();
        interviews.sort_by_key(Interview::starts_at);
        Ok(interviews)
    }

    fn modify<F>(&self, id: &InterviewId, mut change: F) -> Result<Interview, RecruitmentError>
    where
        F: FnMut(&mut Interview) -> Result<(), RecruitmentError>,
    {
        retry_on_stale("interview", || {
            let mut interview = self.load(id)?;
            change(&mut interview)?;
            interview.updated_at = Utc::now();
            Ok(self.store.update_interview(interview)?)
        })
    }
}

fn reminder_due(interview: &Interview, now: DateTime<Utc>) -> bool {
    !interview.reminder_sent
        && interview.status.is_pending()
        && interview.is_within_next_24h(now)
}

fn recipient(interview: &Interview) -> Recipient {
    Recipient {
        name: interview.snapshot.candidate_name.clone(),
        email: interview.snapshot.candidate_email.clone(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::config::PipelineConfig;
    use crate::workflows::recruitment::applications::{
        ApplicationService, ApplicationStatus, ApplicationSubmission,
    };
    use crate::workflows::recruitment::domain::ActorRole;
    use crate::workflows::recruitment::interviews::{InterviewType, Interviewer, LocationMode};
    use crate::workflows::recruitment::memory::{InMemoryStore, RecordingNotifier};
    use crate::workflows::recruitment::policy::ForwardOnly;
    use crate::workflows::recruitment::postings::{PostingDraft, PostingService};

    struct Harness {
        interviews: InterviewService<InMemoryStore, RecordingNotifier>,
        applications: ApplicationService<InMemoryStore, RecordingNotifier>,
        store: Arc<InMemoryStore>,
        notifier: Arc<RecordingNotifier>,
        application_id: ApplicationId,
    }

    fn recruiter() -> Actor {
        Actor::new("recruiter-7", "Rita Recruiter", ActorRole::Recruiter)
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let config = PipelineConfig::default();
        let postings = PostingService::new(store.clone(), &config);
        let posting = postings
            .create(
                &recruiter(),
                PostingDraft {
                    title: "Platform engineer".to_string(),
                    description: "Run the cluster".to_string(),
                    required_skills: vec!["Kubernetes".to_string()],
                    ..PostingDraft::default()
                },
            )
            .expect("posting created");
        let applications = ApplicationService::new(store.clone(), notifier.clone(), &config);
        let application = applications
            .submit(ApplicationSubmission {
                posting_id: posting.id,
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane.doe@example.com".to_string(),
                declared_skills: vec!["Kubernetes".to_string()],
                ..ApplicationSubmission::default()
            })
            .expect("application submitted");

        Harness {
            interviews: InterviewService::new(store.clone(), notifier.clone()),
            applications,
            store,
            notifier,
            application_id: application.id,
        }
    }

    fn plan(application_id: &ApplicationId, starts_at: DateTime<Utc>) -> InterviewPlan {
        InterviewPlan {
            application_id: application_id.clone(),
            interview_type: InterviewType::Technical,
            starts_at,
            duration_minutes: None,
            title: None,
            description: None,
            location_mode: LocationMode::Video,
            location: Some("https://meet.example.com/abc".to_string()),
            room: None,
            interviewers: vec![Interviewer {
                id: ActorId::from("lead-1"),
                name: "Lee Lead".to_string(),
            }],
        }
    }

    #[test]
    fn schedule_snapshots_application_and_invites() {
        let h = harness();
        let start = Utc::now() + Duration::days(3);
        let interview = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, start))
            .expect("scheduled");

        assert_eq!(interview.status, InterviewStatus::Scheduled);
        assert_eq!(interview.duration_minutes(), 60);
        assert_eq!(interview.ends_at(), start + Duration::minutes(60));
        assert_eq!(interview.snapshot.candidate_name, "Jane Doe");
        assert_eq!(interview.snapshot.posting_title, "Platform engineer");
        assert_eq!(interview.title, "TECHNIQUE interview: Platform engineer");

        match h.notifier.events().last() {
            Some(NotificationEvent::InterviewInvitation { video_link, .. }) => {
                assert_eq!(video_link.as_deref(), Some("https://meet.example.com/abc"))
            }
            other => panic!("expected invitation, got {other:?}"),
        }
    }

    #[test]
    fn schedule_requires_existing_application() {
        let h = harness();
        let missing = ApplicationId::from("app-missing");
        assert!(matches!(
            h.interviews.schedule(&recruiter(), plan(&missing, Utc::now())),
            Err(RecruitmentError::NotFound { entity: EntityKind::Application, .. })
        ));
    }

    #[test]
    fn later_application_changes_do_not_reach_the_interview() {
        let h = harness();
        let interview = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, Utc::now()))
            .expect("scheduled");
        h.applications
            .change_status(&recruiter(), &h.application_id, ApplicationStatus::Rejected, None)
            .expect("rejected");

        let stored = h.interviews.get(&interview.id).expect("stored");
        assert_eq!(stored.snapshot, interview.snapshot);
        assert_eq!(stored.status, InterviewStatus::Scheduled);
    }

    #[test]
    fn reschedule_recomputes_end_and_rearms_reminder() {
        let h = harness();
        let now = Utc::now();
        let interview = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::hours(2)))
            .expect("scheduled");
        h.interviews.send_due_reminders(now).expect("sweep");

        let later = now + Duration::days(2);
        let moved = h
            .interviews
            .reschedule(&interview.id, Some(later), Some(90))
            .expect("rescheduled");

        assert_eq!(moved.ends_at(), later + Duration::minutes(90));
        assert!(!moved.reminder_sent);

        let shortened = h
            .interviews
            .reschedule(&interview.id, None, Some(30))
            .expect("shortened");
        assert_eq!(shortened.starts_at(), later);
        assert_eq!(shortened.ends_at(), later + Duration::minutes(30));
        assert!(h.interviews.reschedule(&interview.id, None, Some(0)).is_err());
    }

    #[test]
    fn aggregate_is_recomputed_after_each_evaluation() {
        let h = harness();
        let interview = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, Utc::now()))
            .expect("scheduled");

        let mut latest = None;
        for (criterion, score) in [("technical", 3), ("communication", 4), ("culture", 2)] {
            let updated = h
                .interviews
                .add_evaluation(
                    &interview.id,
                    Evaluation::new(criterion, score, None).expect("valid"),
                )
                .expect("evaluation stored");
            latest = updated.overall_score();
            if updated.evaluations().len() == 2 {
                assert_eq!(latest, Some(4));
            }
        }

        assert_eq!(latest, Some(3));
    }

    #[test]
    fn reminders_go_out_once_for_due_interviews() {
        let h = harness();
        let now = Utc::now();
        let soon = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::hours(5)))
            .expect("soon");
        h.interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::days(4)))
            .expect("later");
        let cancelled = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::hours(3)))
            .expect("cancelled");
        h.interviews
            .change_status(&recruiter(), &cancelled.id, InterviewStatus::Cancelled)
            .expect("cancel");

        let reminded = h.interviews.send_due_reminders(now).expect("sweep");
        assert_eq!(reminded, vec![soon.id.clone()]);
        assert!(h.interviews.send_due_reminders(now).expect("second sweep").is_empty());

        let reminders = h
            .notifier
            .templates()
            .into_iter()
            .filter(|template| *template == "interview-reminder")
            .count();
        assert_eq!(reminders, 1);
        assert!(h.interviews.get(&soon.id).expect("stored").reminder_sent);
    }

    #[test]
    fn default_policy_allows_backward_moves_and_forward_only_does_not() {
        let h = harness();
        let guarded =
            InterviewService::new(h.store.clone(), h.notifier.clone()).with_policy(ForwardOnly);
        let interview = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, Utc::now()))
            .expect("scheduled");

        h.interviews
            .change_status(&recruiter(), &interview.id, InterviewStatus::Completed)
            .expect("completed");
        h.interviews
            .change_status(&recruiter(), &interview.id, InterviewStatus::Scheduled)
            .expect("permissive reopen");

        guarded
            .change_status(&recruiter(), &interview.id, InterviewStatus::Completed)
            .expect("forward move");
        assert!(matches!(
            guarded.change_status(&recruiter(), &interview.id, InterviewStatus::Confirmed),
            Err(RecruitmentError::Validation(_))
        ));
        guarded
            .change_status(&recruiter(), &interview.id, InterviewStatus::Postponed)
            .expect("side exit");
    }

    #[test]
    fn stats_count_statuses_today_and_upcoming() {
        let h = harness();
        let now = Utc::now();
        h.interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::days(10)))
            .expect("future");
        let past = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now - Duration::days(10)))
            .expect("past");
        h.interviews
            .change_status(&recruiter(), &past.id, InterviewStatus::Completed)
            .expect("completed");

        let stats = h.interviews.stats(now).expect("stats");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.upcoming, 1);
        assert_eq!(stats.today, 0);
        assert_eq!(stats.counts[&InterviewStatus::Scheduled], 1);
        assert_eq!(stats.counts[&InterviewStatus::Completed], 1);
        assert_eq!(stats.counts[&InterviewStatus::Cancelled], 0);
    }

    #[test]
    fn only_pending_future_interviews_are_upcoming() {
        let h = harness();
        let now = Utc::now();
        let confirmed = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::days(2)))
            .expect("confirmed");
        h.interviews
            .change_status(&recruiter(), &confirmed.id, InterviewStatus::Confirmed)
            .expect("confirm");
        let starting_now = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now))
            .expect("starting now");
        for status in [InterviewStatus::Cancelled, InterviewStatus::Postponed] {
            let dropped = h
                .interviews
                .schedule(&recruiter(), plan(&h.application_id, now + Duration::days(3)))
                .expect("scheduled");
            h.interviews
                .change_status(&recruiter(), &dropped.id, status)
                .expect("status changed");
        }

        let upcoming: Vec<InterviewId> = h
            .interviews
            .upcoming(now)
            .expect("upcoming")
            .into_iter()
            .map(|interview| interview.id)
            .collect();
        assert_eq!(upcoming, vec![starting_now.id, confirmed.id]);
        assert_eq!(h.interviews.stats(now).expect("stats").upcoming, 2);
    }

    #[test]
    fn reminders_skip_interviews_no_longer_pending() {
        let h = harness();
        let now = Utc::now();
        for status in [
            InterviewStatus::Postponed,
            InterviewStatus::InProgress,
            InterviewStatus::Completed,
        ] {
            let interview = h
                .interviews
                .schedule(&recruiter(), plan(&h.application_id, now + Duration::hours(4)))
                .expect("scheduled");
            h.interviews
                .change_status(&recruiter(), &interview.id, status)
                .expect("status changed");
        }
        let confirmed = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::hours(6)))
            .expect("scheduled");
        h.interviews
            .change_status(&recruiter(), &confirmed.id, InterviewStatus::Confirmed)
            .expect("confirmed");

        let reminded = h.interviews.send_due_reminders(now).expect("sweep");
        assert_eq!(reminded, vec![confirmed.id]);
    }

    #[test]
    fn out_of_range_evaluations_are_rejected_on_add() {
        let h = harness();
        let interview = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, Utc::now()))
            .expect("scheduled");
        let inflated: Evaluation = serde_json::from_value(serde_json::json!({
            "criterion": "technical",
            "score": 200,
            "comment": null
        }))
        .expect("shape deserialises");
        let blank: Evaluation = serde_json::from_value(serde_json::json!({
            "criterion": "  ",
            "score": 3,
            "comment": null
        }))
        .expect("shape deserialises");

        for evaluation in [inflated, blank] {
            assert!(matches!(
                h.interviews.add_evaluation(&interview.id, evaluation),
                Err(RecruitmentError::Validation(_))
            ));
        }
        let stored = h.interviews.get(&interview.id).expect("stored");
        assert!(stored.evaluations().is_empty());
        assert_eq!(stored.overall_score(), None);
    }

    #[test]
    fn interviewer_agenda_lists_only_their_interviews() {
        let h = harness();
        let now = Utc::now();
        let mine = h
            .interviews
            .schedule(&recruiter(), plan(&h.application_id, now + Duration::days(1)))
            .expect("scheduled");
        let mut other = plan(&h.application_id, now + Duration::days(2));
        other.interviewers = vec![Interviewer {
            id: ActorId::from("hr-2"),
            name: "Hana HR".to_string(),
        }];
        h.interviews.schedule(&recruiter(), other).expect("scheduled");

        let agenda = h
            .interviews
            .for_interviewer(&ActorId::from("lead-1"))
            .expect("agenda");
        assert_eq!(agenda.len(), 1);
        assert_eq!(agenda[0].id, mine.id);
        assert!(h
            .interviews
            .for_interviewer(&ActorId::from("nobody"))
            .expect("agenda")
            .is_empty());
    }
}
