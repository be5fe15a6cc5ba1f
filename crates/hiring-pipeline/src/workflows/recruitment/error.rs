use std::fmt;
use std::time::Duration;

use super::domain::{ActorId, PostingId};
use super::repository::RepositoryError;

/// Entity families the pipeline can fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Posting,
    Candidate,
    Application,
    Interview,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Posting => "posting",
            EntityKind::Candidate => "candidate",
            EntityKind::Application => "application",
            EntityKind::Interview => "interview",
        };
        f.write_str(label)
    }
}

/// Error raised by every pipeline operation. Status-code translation belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RecruitmentError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{candidate_email} already has an active application to posting '{posting_id}'")]
    DuplicateApplication {
        candidate_email: String,
        posting_id: PostingId,
    },
    #[error("unsupported document format '{detected}': expected PDF or Word (DOCX)")]
    UnsupportedFormat { detected: String },
    #[error("actor '{actor}' is not allowed to {action} posting '{posting_id}'")]
    Authorization {
        actor: ActorId,
        action: &'static str,
        posting_id: PostingId,
    },
    #[error("document text extraction failed: {0}")]
    Extraction(String),
    #[error("document text extraction exceeded {0:?}")]
    ExtractionTimeout(Duration),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RecruitmentError {
    pub(crate) fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
