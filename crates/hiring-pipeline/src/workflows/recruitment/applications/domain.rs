use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{Actor, ActorId, ApplicationId, CandidateId, PostingId};
use super::super::error::RecruitmentError;
use super::super::policy::{parse_token, Lifecycle};

/// Application status. Variants are declared in happy-path order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "NOUVEAU")]
    New,
    #[serde(rename = "EN_REVISION")]
    InReview,
    #[serde(rename = "PRESELECTIONNE")]
    Shortlisted,
    #[serde(rename = "ENTRETIEN_RH")]
    HrInterview,
    #[serde(rename = "TEST_TECHNIQUE")]
    TechnicalTest,
    #[serde(rename = "ENTRETIEN_FINAL")]
    FinalInterview,
    #[serde(rename = "OFFRE_ENVOYEE")]
    OfferSent,
    #[serde(rename = "ACCEPTE")]
    Accepted,
    #[serde(rename = "REFUSE")]
    Rejected,
    #[serde(rename = "RETIRE")]
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 10] = [
        ApplicationStatus::New,
        ApplicationStatus::InReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::HrInterview,
        ApplicationStatus::TechnicalTest,
        ApplicationStatus::FinalInterview,
        ApplicationStatus::OfferSent,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    const ALIASES: [(&'static str, ApplicationStatus); 4] = [
        ("ACCEPTED", ApplicationStatus::Accepted),
        ("REJECTED", ApplicationStatus::Rejected),
        ("WITHDRAWN", ApplicationStatus::Withdrawn),
        ("REFUSEE", ApplicationStatus::Rejected),
    ];
}

impl Lifecycle for ApplicationStatus {
    fn token(self) -> &'static str {
        match self {
            ApplicationStatus::New => "NOUVEAU",
            ApplicationStatus::InReview => "EN_REVISION",
            ApplicationStatus::Shortlisted => "PRESELECTIONNE",
            ApplicationStatus::HrInterview => "ENTRETIEN_RH",
            ApplicationStatus::TechnicalTest => "TEST_TECHNIQUE",
            ApplicationStatus::FinalInterview => "ENTRETIEN_FINAL",
            ApplicationStatus::OfferSent => "OFFRE_ENVOYEE",
            ApplicationStatus::Accepted => "ACCEPTE",
            ApplicationStatus::Rejected => "REFUSE",
            ApplicationStatus::Withdrawn => "RETIRE",
        }
    }

    fn stage(self) -> Option<u8> {
        match self {
            ApplicationStatus::Rejected | ApplicationStatus::Withdrawn => None,
            other => Some(other as u8),
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }
}

impl FromStr for ApplicationStatus {
    type Err = RecruitmentError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_token(raw, &Self::ALL, &Self::ALIASES)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationSource {
    #[default]
    SiteCarriere,
    Linkedin,
    Indeed,
    Cooptation,
    Spontanee,
    Autre,
}

impl ApplicationSource {
    pub const ALL: [ApplicationSource; 6] = [
        ApplicationSource::SiteCarriere,
        ApplicationSource::Linkedin,
        ApplicationSource::Indeed,
        ApplicationSource::Cooptation,
        ApplicationSource::Spontanee,
        ApplicationSource::Autre,
    ];
}

/// One appended status transition. `previous` is empty only for the submission entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub previous: Option<ApplicationStatus>,
    pub new: ApplicationStatus,
    pub author_id: ActorId,
    pub author_name: String,
    pub comment: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationComment {
    pub author_id: ActorId,
    pub author_name: String,
    pub text: String,
    /// Internal note, not meant for the candidate.
    pub private: bool,
    pub at: DateTime<Utc>,
}

/// Candidate and posting fields captured when the application was created. Never re-synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSnapshot {
    pub candidate_name: String,
    pub candidate_email: String,
    pub posting_title: String,
}

/// A candidate's application to one posting.
///
/// Status, history and comments are only reachable through methods so the last history
/// entry always carries the current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub candidate_id: CandidateId,
    pub posting_id: PostingId,
    pub snapshot: ApplicantSnapshot,
    pub match_score: u8,
    pub cover_letter: Option<String>,
    pub source: ApplicationSource,
    pub cv_file_name: Option<String>,
    status: ApplicationStatus,
    history: Vec<StatusChange>,
    comments: Vec<ApplicationComment>,
    pub submitted_at: DateTime<Utc>,
    pub last_action_at: DateTime<Utc>,
    pub version: u64,
}

/// Fields needed to open an application.
#[derive(Debug, Clone)]
pub(crate) struct NewApplication {
    pub id: ApplicationId,
    pub candidate_id: CandidateId,
    pub posting_id: PostingId,
    pub snapshot: ApplicantSnapshot,
    pub match_score: u8,
    pub cover_letter: Option<String>,
    pub source: ApplicationSource,
    pub cv_file_name: Option<String>,
}

impl Application {
    /// Open an application in NOUVEAU with its system-authored submission entry.
    pub(crate) fn submitted(fields: NewApplication, now: DateTime<Utc>) -> Self {
        let system = Actor::system();
        Self {
            id: fields.id,
            candidate_id: fields.candidate_id,
            posting_id: fields.posting_id,
            snapshot: fields.snapshot,
            match_score: fields.match_score,
            cover_letter: fields.cover_letter,
            source: fields.source,
            cv_file_name: fields.cv_file_name,
            status: ApplicationStatus::New,
            history: vec![StatusChange {
                previous: None,
                new: ApplicationStatus::New,
                author_id: system.id,
                author_name: system.display_name,
                comment: Some("submitted".to_string()),
                at: now,
            }],
            comments: Vec::new(),
            submitted_at: now,
            last_action_at: now,
            version: 0,
        }
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn comments(&self) -> &[ApplicationComment] {
        &self.comments
    }

    /// Whether this application blocks another one for the same candidate and posting.
    pub fn is_active(&self) -> bool {
        self.status != ApplicationStatus::Withdrawn
    }

    pub fn days_since_submission(&self, now: DateTime<Utc>) -> i64 {
        (now - self.submitted_at).num_days().max(0)
    }

    /// Set the status and append the matching history entry. Returns the previous status.
    pub(crate) fn record_transition(
        &mut self,
        to: ApplicationStatus,
        actor: &Actor,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> ApplicationStatus {
        let previous = self.status;
        self.history.push(StatusChange {
            previous: Some(previous),
            new: to,
            author_id: actor.id.clone(),
            author_name: actor.display_name.clone(),
            comment,
            at: now,
        });
        self.status = to;
        self.last_action_at = now;
        previous
    }

    pub(crate) fn add_comment(
        &mut self,
        actor: &Actor,
        text: String,
        private: bool,
        now: DateTime<Utc>,
    ) {
        self.comments.push(ApplicationComment {
            author_id: actor.id.clone(),
            author_name: actor.display_name.clone(),
            text,
            private,
            at: now,
        });
        self.last_action_at = now;
    }
}
