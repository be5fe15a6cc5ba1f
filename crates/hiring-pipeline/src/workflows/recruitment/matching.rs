//! Required-skill coverage scoring.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Score given when a posting lists no required skills.
pub const NEUTRAL_SCORE: u8 = 50;

/// Percentage of the required skills the candidate covers, rounded down. Extra candidate
/// skills and desired skills earn nothing.
pub fn match_score<C, R>(candidate: &[C], required: &[R]) -> u8
where
    C: AsRef<str>,
    R: AsRef<str>,
{
    let required = normalized(required);
    if required.is_empty() {
        return NEUTRAL_SCORE;
    }
    let candidate = normalized(candidate);
    if candidate.is_empty() {
        return 0;
    }

    let covered = required.intersection(&candidate).count();
    (covered * 100 / required.len()).min(100) as u8
}

/// Score with the detail behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub score: u8,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

pub fn assess<C, R>(candidate: &[C], required: &[R]) -> MatchReport
where
    C: AsRef<str>,
    R: AsRef<str>,
{
    let have = normalized(candidate);
    let (matched, missing): (Vec<String>, Vec<String>) = required
        .iter()
        .map(|skill| skill.as_ref().trim())
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .partition(|skill| have.contains(&skill.to_lowercase()));

    MatchReport {
        score: match_score(candidate, required),
        matched,
        missing,
    }
}

fn normalized<S: AsRef<str>>(skills: &[S]) -> BTreeSet<String> {
    skills
        .iter()
        .map(|skill| skill.as_ref().trim().to_lowercase())
        .filter(|skill| !skill.is_empty())
        .collect()
}
