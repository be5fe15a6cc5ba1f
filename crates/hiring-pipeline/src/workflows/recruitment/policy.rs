//! Pluggable guards for status changes.
//!
//! Applications and interviews accept any status after any other by default (including
//! backward moves); [`ForwardOnly`] is available for deployments that want the happy path
//! enforced.

use std::fmt;

use super::error::RecruitmentError;

/// Shape of a status lifecycle: an ordered happy path plus exit states.
pub trait Lifecycle: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Canonical uppercase token.
    fn token(self) -> &'static str;
    /// Position on the happy path, `None` for side exits.
    fn stage(self) -> Option<u8>;
    /// No further moves are expected once reached.
    fn is_terminal(self) -> bool;
}

/// Resolve a status token case-insensitively against the canonical tokens and the given
/// aliases; anything else is a validation failure.
pub(crate) fn parse_token<S: Lifecycle>(
    raw: &str,
    all: &[S],
    aliases: &[(&str, S)],
) -> Result<S, RecruitmentError> {
    let wanted = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
    all.iter()
        .copied()
        .find(|status| status.token() == wanted)
        .or_else(|| {
            aliases
                .iter()
                .find(|(alias, _)| *alias == wanted)
                .map(|(_, status)| *status)
        })
        .ok_or_else(|| RecruitmentError::Validation(format!("unknown status token '{raw}'")))
}

pub trait TransitionPolicy<S>: Send + Sync {
    fn check(&self, from: S, to: S) -> Result<(), RecruitmentError>;
}

/// Accepts every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Permissive;

impl<S> TransitionPolicy<S> for Permissive {
    fn check(&self, _from: S, _to: S) -> Result<(), RecruitmentError> {
        Ok(())
    }
}

/// Rejects backward moves along the happy path and any move out of a terminal state.
/// Side exits stay reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardOnly;

impl<S: Lifecycle> TransitionPolicy<S> for ForwardOnly {
    fn check(&self, from: S, to: S) -> Result<(), RecruitmentError> {
        let allowed = if from.is_terminal() {
            false
        } else {
            match (from.stage(), to.stage()) {
                (_, None) => true,
                (None, Some(_)) => true,
                (Some(current), Some(next)) => next >= current,
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(RecruitmentError::Validation(format!(
                "transition from {} to {} is not allowed",
                from.token(),
                to.token()
            )))
        }
    }
}
