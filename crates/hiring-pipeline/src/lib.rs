//! Applicant processing pipeline: document intake, skill matching, and the audited
//! lifecycles of job postings, applications, and interviews.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
