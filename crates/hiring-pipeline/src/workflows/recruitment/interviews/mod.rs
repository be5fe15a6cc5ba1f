//! Interview scheduling, status tracking and evaluation aggregation.

mod domain;
mod service;

pub use domain::{
    Evaluation, Interview, InterviewPlan, InterviewStats, InterviewStatus, InterviewType,
    Interviewer, LocationMode, Recommendation, DEFAULT_DURATION_MINUTES,
};
pub use service::{InterviewNotes, InterviewService};
