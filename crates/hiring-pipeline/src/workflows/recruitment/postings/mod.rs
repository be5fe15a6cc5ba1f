//! Job posting lifecycle: DRAFT → PUBLISHED → {EXPIRED, FILLED, ARCHIVED}.

mod domain;
mod service;

pub use domain::{ContractType, JobPosting, PostingDraft, PostingStats, PostingStatus};
pub use service::PostingService;
