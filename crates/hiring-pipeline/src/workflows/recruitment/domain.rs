use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for job postings.
    PostingId
);
identifier!(
    /// Identifier wrapper for candidates; the email is the natural key, this is the surrogate.
    CandidateId
);
identifier!(
    /// Identifier wrapper for submitted applications.
    ApplicationId
);
identifier!(
    /// Identifier wrapper for scheduled interviews.
    InterviewId
);
identifier!(
    /// Verified identity handed over by the authentication layer.
    ActorId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Admin,
    Recruiter,
    Interviewer,
    Candidate,
}

/// Authenticated caller performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub display_name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: ActorId(id.into()),
            display_name: display_name.into(),
            role,
        }
    }

    /// Author recorded on transitions the pipeline performs on its own.
    pub fn system() -> Self {
        Self::new("system", "System", ActorRole::Admin)
    }
}

/// A person who applied at least once. Never deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub skills: Vec<String>,
    pub cv_file_name: Option<String>,
    pub cv_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Candidate {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Case-insensitive union into the stored skill set, keeping first-seen spelling.
    /// Returns how many skills were new.
    pub fn merge_skills<I, S>(&mut self, skills: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known: BTreeSet<String> = self
            .skills
            .iter()
            .map(|skill| skill.trim().to_lowercase())
            .collect();

        let mut added = 0;
        for skill in skills {
            let skill = skill.as_ref().trim();
            if skill.is_empty() {
                continue;
            }
            if known.insert(skill.to_lowercase()) {
                self.skills.push(skill.to_string());
                added += 1;
            }
        }
        added
    }
}

/// Normalise an email for lookups: candidates are unique per address regardless of case.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
