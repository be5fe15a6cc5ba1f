//! Application lifecycle: submission, status history, comments and counters.

mod domain;
mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantSnapshot, Application, ApplicationComment, ApplicationSource, ApplicationStatus,
    StatusChange,
};
#[cfg(test)]
pub(crate) use domain::NewApplication;
pub use service::{
    ApplicationService, ApplicationSubmission, ScoreDistribution, StatusBreakdown,
};
