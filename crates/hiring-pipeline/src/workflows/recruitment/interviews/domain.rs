use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::super::applications::{ApplicantSnapshot, Application};
use super::super::domain::{Actor, ActorId, ApplicationId, CandidateId, InterviewId, PostingId};
use super::super::error::RecruitmentError;
use super::super::policy::{parse_token, Lifecycle};

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterviewStatus {
    #[serde(rename = "PLANIFIE")]
    Scheduled,
    #[serde(rename = "CONFIRME")]
    Confirmed,
    #[serde(rename = "EN_COURS")]
    InProgress,
    #[serde(rename = "TERMINE")]
    Completed,
    #[serde(rename = "EVALUE")]
    Evaluated,
    #[serde(rename = "ANNULE")]
    Cancelled,
    #[serde(rename = "REPORTE")]
    Postponed,
}

impl InterviewStatus {
    pub const ALL: [InterviewStatus; 7] = [
        InterviewStatus::Scheduled,
        InterviewStatus::Confirmed,
        InterviewStatus::InProgress,
        InterviewStatus::Completed,
        InterviewStatus::Evaluated,
        InterviewStatus::Cancelled,
        InterviewStatus::Postponed,
    ];

    const ALIASES: [(&'static str, InterviewStatus); 3] = [
        ("PLANNED", InterviewStatus::Scheduled),
        ("CANCELLED", InterviewStatus::Cancelled),
        ("POSTPONED", InterviewStatus::Postponed),
    ];

    /// Planned or confirmed: the interview is still expected to take place as booked.
    pub fn is_pending(self) -> bool {
        matches!(self, InterviewStatus::Scheduled | InterviewStatus::Confirmed)
    }
}

impl Lifecycle for InterviewStatus {
    fn token(self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "PLANIFIE",
            InterviewStatus::Confirmed => "CONFIRME",
            InterviewStatus::InProgress => "EN_COURS",
            InterviewStatus::Completed => "TERMINE",
            InterviewStatus::Evaluated => "EVALUE",
            InterviewStatus::Cancelled => "ANNULE",
            InterviewStatus::Postponed => "REPORTE",
        }
    }

    fn stage(self) -> Option<u8> {
        match self {
            InterviewStatus::Cancelled | InterviewStatus::Postponed => None,
            other => Some(other as u8),
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, InterviewStatus::Evaluated | InterviewStatus::Cancelled)
    }
}

impl FromStr for InterviewStatus {
    type Err = RecruitmentError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_token(raw, &Self::ALL, &Self::ALIASES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewType {
    #[serde(rename = "RH")]
    HumanResources,
    #[serde(rename = "TECHNIQUE")]
    Technical,
    #[serde(rename = "MANAGER")]
    Manager,
    #[serde(rename = "FINAL")]
    Final,
    #[serde(rename = "TEST_TECHNIQUE")]
    TechnicalTest,
    #[serde(rename = "ASSESSMENT_CENTER")]
    AssessmentCenter,
    #[serde(rename = "AUTRE")]
    Other,
}

impl InterviewType {
    pub fn token(self) -> &'static str {
        match self {
            InterviewType::HumanResources => "RH",
            InterviewType::Technical => "TECHNIQUE",
            InterviewType::Manager => "MANAGER",
            InterviewType::Final => "FINAL",
            InterviewType::TechnicalTest => "TEST_TECHNIQUE",
            InterviewType::AssessmentCenter => "ASSESSMENT_CENTER",
            InterviewType::Other => "AUTRE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationMode {
    #[default]
    #[serde(rename = "PRESENTIEL")]
    OnSite,
    #[serde(rename = "VISIO")]
    Video,
    #[serde(rename = "TELEPHONIQUE")]
    Phone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "FORTEMENT_RECOMMANDE")]
    StronglyRecommended,
    #[serde(rename = "RECOMMANDE")]
    Recommended,
    #[serde(rename = "MITIGE")]
    Mixed,
    #[serde(rename = "NON_RECOMMANDE")]
    NotRecommended,
    #[serde(rename = "A_REVOIR")]
    ToRevisit,
}

/// One criterion scored from 1 to 5. Only [`Evaluation::new`] builds one from loose values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    criterion: String,
    score: u8,
    comment: Option<String>,
}

impl Evaluation {
    pub fn new(
        criterion: impl Into<String>,
        score: u8,
        comment: Option<String>,
    ) -> Result<Self, RecruitmentError> {
        let evaluation = Self {
            criterion: criterion.into().trim().to_string(),
            score,
            comment,
        };
        evaluation.validate()?;
        Ok(evaluation)
    }

    pub fn criterion(&self) -> &str {
        &self.criterion
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Deserialised evaluations bypass `new`, so the bounds are checked again on add.
    fn validate(&self) -> Result<(), RecruitmentError> {
        if self.criterion.trim().is_empty() {
            return Err(RecruitmentError::Validation(
                "evaluation criterion is empty".to_string(),
            ));
        }
        if !(1..=5).contains(&self.score) {
            return Err(RecruitmentError::Validation(format!(
                "evaluation score {} is outside 1..=5",
                self.score
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interviewer {
    pub id: ActorId,
    pub name: String,
}

/// Request to schedule an interview for an application.
#[derive(Debug, Clone)]
pub struct InterviewPlan {
    pub application_id: ApplicationId,
    pub interview_type: InterviewType,
    pub starts_at: DateTime<Utc>,
    /// Defaults to [`DEFAULT_DURATION_MINUTES`].
    pub duration_minutes: Option<u32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location_mode: LocationMode,
    /// Address, phone bridge, or meeting link for video interviews.
    pub location: Option<String>,
    pub room: Option<String>,
    pub interviewers: Vec<Interviewer>,
}

/// An interview tied to one application.
///
/// The end time is derived from start and duration; both only change through
/// [`Interview::reschedule`]. The overall score is recomputed from the full evaluation list on
/// every addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub application_id: ApplicationId,
    pub candidate_id: CandidateId,
    pub posting_id: PostingId,
    pub snapshot: ApplicantSnapshot,
    pub title: String,
    pub description: Option<String>,
    pub interview_type: InterviewType,
    starts_at: DateTime<Utc>,
    duration_minutes: u32,
    ends_at: DateTime<Utc>,
    pub location_mode: LocationMode,
    pub location: Option<String>,
    pub room: Option<String>,
    pub interviewers: Vec<Interviewer>,
    pub created_by: ActorId,
    pub created_by_name: String,
    pub status: InterviewStatus,
    pub notes_before: Option<String>,
    pub notes_during: Option<String>,
    pub notes_after: Option<String>,
    evaluations: Vec<Evaluation>,
    overall_score: Option<u8>,
    pub recommendation: Option<Recommendation>,
    pub recommendation_reason: Option<String>,
    pub reminder_sent: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Interview {
    /// Build a PLANIFIE interview, copying candidate and posting fields from `application`.
    pub(crate) fn from_application(
        id: InterviewId,
        application: &Application,
        plan: InterviewPlan,
        creator: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Self, RecruitmentError> {
        let duration_minutes = plan.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        let ends_at = end_of(plan.starts_at, duration_minutes)?;
        let title = plan
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{} interview: {}",
                    plan.interview_type.token(),
                    application.snapshot.posting_title
                )
            });

        Ok(Self {
            id,
            application_id: application.id.clone(),
            candidate_id: application.candidate_id.clone(),
            posting_id: application.posting_id.clone(),
            snapshot: application.snapshot.clone(),
            title,
            description: plan.description,
            interview_type: plan.interview_type,
            starts_at: plan.starts_at,
            duration_minutes,
            ends_at,
            location_mode: plan.location_mode,
            location: plan.location,
            room: plan.room,
            interviewers: plan.interviewers,
            created_by: creator.id.clone(),
            created_by_name: creator.display_name.clone(),
            status: InterviewStatus::Scheduled,
            notes_before: None,
            notes_during: None,
            notes_after: None,
            evaluations: Vec::new(),
            overall_score: None,
            recommendation: None,
            recommendation_reason: None,
            reminder_sent: false,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    /// Mean of all evaluation scores, rounded half up.
    pub fn overall_score(&self) -> Option<u8> {
        self.overall_score
    }

    /// Video meeting link, when the interview is held by video.
    pub fn video_link(&self) -> Option<&str> {
        match self.location_mode {
            LocationMode::Video => self.location.as_deref(),
            _ => None,
        }
    }

    /// Move the start and/or change the duration. A moved start re-arms the reminder.
    pub(crate) fn reschedule(
        &mut self,
        starts_at: Option<DateTime<Utc>>,
        duration_minutes: Option<u32>,
    ) -> Result<(), RecruitmentError> {
        let new_start = starts_at.unwrap_or(self.starts_at);
        let new_duration = duration_minutes.unwrap_or(self.duration_minutes);
        self.ends_at = end_of(new_start, new_duration)?;

        if new_start != self.starts_at {
            self.reminder_sent = false;
            self.reminder_sent_at = None;
        }
        self.starts_at = new_start;
        self.duration_minutes = new_duration;
        Ok(())
    }

    pub(crate) fn add_evaluation(
        &mut self,
        evaluation: Evaluation,
    ) -> Result<(), RecruitmentError> {
        evaluation.validate()?;
        self.evaluations.push(evaluation);
        self.overall_score = rounded_mean(&self.evaluations);
        Ok(())
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.starts_at < now
    }

    /// Same UTC calendar day as `now`.
    pub fn is_today(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.date_naive() == now.date_naive()
    }

    pub fn is_within_next_24h(&self, now: DateTime<Utc>) -> bool {
        self.starts_at >= now && self.starts_at <= now + Duration::hours(24)
    }

    /// Still pending and starting at or after `now`.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status.is_pending() && self.starts_at >= now
    }

    /// Negative once the interview has started.
    pub fn minutes_until_start(&self, now: DateTime<Utc>) -> i64 {
        (self.starts_at - now).num_minutes()
    }
}

/// Per-status counts plus today's and upcoming interviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewStats {
    pub counts: BTreeMap<InterviewStatus, usize>,
    pub total: usize,
    pub today: usize,
    pub upcoming: usize,
}

impl InterviewStats {
    pub(crate) fn collect<'a, I>(interviews: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Interview>,
    {
        let mut stats = Self {
            counts: InterviewStatus::ALL.iter().map(|status| (*status, 0)).collect(),
            total: 0,
            today: 0,
            upcoming: 0,
        };
        for interview in interviews {
            *stats.counts.entry(interview.status).or_default() += 1;
            stats.total += 1;
            if interview.is_today(now) {
                stats.today += 1;
            }
            if interview.is_upcoming(now) {
                stats.upcoming += 1;
            }
        }
        stats
    }
}

fn end_of(starts_at: DateTime<Utc>, duration_minutes: u32) -> Result<DateTime<Utc>, RecruitmentError> {
    if duration_minutes == 0 {
        return Err(RecruitmentError::Validation(
            "interview duration must be positive".to_string(),
        ));
    }
    starts_at
        .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
        .ok_or_else(|| RecruitmentError::Validation("interview end out of range".to_string()))
}

/// Round-half-up mean of every score, in integer arithmetic.
fn rounded_mean(evaluations: &[Evaluation]) -> Option<u8> {
    if evaluations.is_empty() {
        return None;
    }
    let count = evaluations.len() as u64;
    let sum: u64 = evaluations.iter().map(|evaluation| u64::from(evaluation.score)).sum();
    Some(((2 * sum + count) / (2 * count)) as u8)
}
