//! Candidate document intake: content sniffing, text extraction and heuristic field
//! recovery.

mod detect;
mod extract;
mod fields;
mod vocabulary;

use serde::{Deserialize, Serialize};

pub use detect::{sniff, MediaKind};
pub use extract::{DocumentTextExtractor, ExtractedDocument};
pub use fields::{
    extract_email, extract_fields, extract_name, extract_phone, extract_skills, looks_like_email,
    ExtractedFields,
};
pub use vocabulary::SKILL_VOCABULARY;

/// An uploaded CV. The advisory media type comes from the uploader and is never trusted over
/// the content itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub file_name: String,
    pub advisory_media_type: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl CandidateDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            advisory_media_type: None,
            bytes,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.advisory_media_type = Some(media_type.into());
        self
    }
}
