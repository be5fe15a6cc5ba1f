//! Applicant processing pipeline: document intake, skill matching and the posting,
//! application and interview lifecycles.
//!
//! Services are synchronous and request-scoped. Storage sits behind the traits in
//! [`repository`]; notifications are fire-and-forget through [`notifications::Notifier`].

pub mod applications;
pub mod domain;
mod error;
pub mod intake;
pub mod interviews;
pub mod matching;
pub mod memory;
pub mod notifications;
pub mod policy;
pub mod postings;
pub mod repository;

pub use applications::{ApplicationService, ApplicationStatus, ApplicationSubmission};
pub use domain::{Actor, ActorRole, Candidate};
pub use error::{EntityKind, RecruitmentError};
pub use interviews::{InterviewService, InterviewStatus};
pub use postings::{PostingService, PostingStatus};
pub use repository::RepositoryError;
