use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{ActorId, PostingId};
use super::super::error::RecruitmentError;
use super::super::policy::{parse_token, Lifecycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PostingStatus {
    #[serde(rename = "DRAFT")]
    Draft,
    #[serde(rename = "PUBLIEE", alias = "PUBLISHED")]
    Published,
    #[serde(rename = "EXPIREE", alias = "EXPIRED")]
    Expired,
    #[serde(rename = "POURVUE", alias = "FILLED")]
    Filled,
    #[serde(rename = "ARCHIVEE", alias = "ARCHIVED")]
    Archived,
}

impl PostingStatus {
    pub const ALL: [PostingStatus; 5] = [
        PostingStatus::Draft,
        PostingStatus::Published,
        PostingStatus::Expired,
        PostingStatus::Filled,
        PostingStatus::Archived,
    ];

    const ALIASES: [(&'static str, PostingStatus); 5] = [
        ("BROUILLON", PostingStatus::Draft),
        ("PUBLISHED", PostingStatus::Published),
        ("EXPIRED", PostingStatus::Expired),
        ("FILLED", PostingStatus::Filled),
        ("ARCHIVED", PostingStatus::Archived),
    ];
}

impl Lifecycle for PostingStatus {
    fn token(self) -> &'static str {
        match self {
            PostingStatus::Draft => "DRAFT",
            PostingStatus::Published => "PUBLIEE",
            PostingStatus::Expired => "EXPIREE",
            PostingStatus::Filled => "POURVUE",
            PostingStatus::Archived => "ARCHIVEE",
        }
    }

    fn stage(self) -> Option<u8> {
        match self {
            PostingStatus::Draft => Some(0),
            PostingStatus::Published => Some(1),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            PostingStatus::Expired | PostingStatus::Filled | PostingStatus::Archived
        )
    }
}

impl FromStr for PostingStatus {
    type Err = RecruitmentError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_token(raw, &Self::ALL, &Self::ALIASES)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    #[default]
    Cdi,
    Cdd,
    Stage,
    Alternance,
    Freelance,
    Interim,
}

/// Editable content of a posting, used on creation and revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingDraft {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub contract_type: ContractType,
    pub department: Option<String>,
    pub experience_years: Option<u8>,
    pub remote: bool,
    pub required_skills: Vec<String>,
    pub desired_skills: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: PostingId,
    pub reference: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub contract_type: ContractType,
    pub department: Option<String>,
    pub experience_years: Option<u8>,
    pub remote: bool,
    pub required_skills: Vec<String>,
    pub desired_skills: Vec<String>,
    pub status: PostingStatus,
    pub created_by: ActorId,
    pub created_by_name: String,
    /// Store-owned; incremented on single-posting fetches.
    pub view_count: u64,
    /// Store-owned; follows application creation and deletion.
    pub application_count: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl JobPosting {
    /// Published and not past its expiration.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == PostingStatus::Published
            && self.expires_at.map_or(true, |expires| expires > now)
    }

    /// Published but past its expiration; the expiry sweep will close it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == PostingStatus::Published
            && self.expires_at.is_some_and(|expires| expires < now)
    }

    pub(crate) fn apply_draft(&mut self, draft: PostingDraft) -> Result<(), RecruitmentError> {
        let required_skills = normalize_skills(draft.required_skills);
        if required_skills.is_empty() {
            return Err(RecruitmentError::Validation(
                "a posting needs at least one required skill".to_string(),
            ));
        }

        self.title = draft.title.trim().to_string();
        self.description = draft.description.trim().to_string();
        self.location = draft.location;
        self.contract_type = draft.contract_type;
        self.department = draft.department;
        self.experience_years = draft.experience_years;
        self.remote = draft.remote;
        self.required_skills = required_skills;
        self.desired_skills = normalize_skills(draft.desired_skills);
        if draft.expires_at.is_some() {
            self.expires_at = draft.expires_at;
        }
        Ok(())
    }

    /// Move to PUBLISHED. Re-publishing resets the publication time and keeps an existing
    /// expiration.
    pub(crate) fn publish(
        &mut self,
        now: DateTime<Utc>,
        validity_months: u32,
    ) -> Result<(), RecruitmentError> {
        if !matches!(self.status, PostingStatus::Draft | PostingStatus::Published) {
            return Err(RecruitmentError::Validation(format!(
                "posting '{}' cannot be published from {}",
                self.id,
                self.status.token()
            )));
        }
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(RecruitmentError::Validation(
                "title and description are required to publish".to_string(),
            ));
        }

        self.published_at = Some(now);
        if self.expires_at.is_none() {
            self.expires_at = Some(
                now.checked_add_months(Months::new(validity_months))
                    .ok_or_else(|| {
                        RecruitmentError::Validation("expiration out of range".to_string())
                    })?,
            );
        }
        self.status = PostingStatus::Published;
        Ok(())
    }
}

/// Counters and derived ratios for one posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingStats {
    pub view_count: u64,
    pub application_count: u64,
    /// Applications per hundred views, 0 without views.
    pub conversion_rate: f64,
    pub days_published: i64,
}

impl PostingStats {
    pub(crate) fn of(posting: &JobPosting, now: DateTime<Utc>) -> Self {
        let conversion_rate = if posting.view_count == 0 {
            0.0
        } else {
            posting.application_count as f64 / posting.view_count as f64 * 100.0
        };
        Self {
            view_count: posting.view_count,
            application_count: posting.application_count,
            conversion_rate,
            days_published: posting
                .published_at
                .map_or(0, |published| (now - published).num_days().max(0)),
        }
    }
}

/// Trim, drop blanks and case-insensitive duplicates, keep first spelling.
fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    skills
        .into_iter()
        .map(|skill| skill.trim().to_string())
        .filter(|skill| !skill.is_empty() && seen.insert(skill.to_lowercase()))
        .collect()
}
