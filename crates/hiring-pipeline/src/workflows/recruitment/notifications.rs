//! Outbound notification events. The pipeline emits a payload and moves on; rendering and
//! delivery belong to whoever implements [`Notifier`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{ApplicationId, InterviewId, PostingId};
use super::interviews::{InterviewType, LocationMode};

/// Who the message is about and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    ApplicationReceived {
        application_id: ApplicationId,
        posting_id: PostingId,
        posting_title: String,
        recipient: Recipient,
    },
    ApplicationAccepted {
        application_id: ApplicationId,
        posting_id: PostingId,
        posting_title: String,
        recipient: Recipient,
    },
    InterviewInvitation {
        interview_id: InterviewId,
        application_id: ApplicationId,
        posting_title: String,
        recipient: Recipient,
        interview_type: InterviewType,
        starts_at: DateTime<Utc>,
        duration_minutes: u32,
        location_mode: LocationMode,
        location: Option<String>,
        video_link: Option<String>,
    },
    InterviewReminder {
        interview_id: InterviewId,
        application_id: ApplicationId,
        posting_title: String,
        recipient: Recipient,
        starts_at: DateTime<Utc>,
        location: Option<String>,
    },
}

impl NotificationEvent {
    /// Template key the delivery side renders.
    pub fn template(&self) -> &'static str {
        match self {
            NotificationEvent::ApplicationReceived { .. } => "application-received",
            NotificationEvent::ApplicationAccepted { .. } => "application-accepted",
            NotificationEvent::InterviewInvitation { .. } => "interview-invitation",
            NotificationEvent::InterviewReminder { .. } => "interview-reminder",
        }
    }

    pub fn recipient(&self) -> &Recipient {
        match self {
            NotificationEvent::ApplicationReceived { recipient, .. }
            | NotificationEvent::ApplicationAccepted { recipient, .. }
            | NotificationEvent::InterviewInvitation { recipient, .. }
            | NotificationEvent::InterviewReminder { recipient, .. } => recipient,
        }
    }

    /// Id of the application or interview the event is about.
    pub fn entity_id(&self) -> &str {
        match self {
            NotificationEvent::ApplicationReceived { application_id, .. }
            | NotificationEvent::ApplicationAccepted { application_id, .. } => &application_id.0,
            NotificationEvent::InterviewInvitation { interview_id, .. }
            | NotificationEvent::InterviewReminder { interview_id, .. } => &interview_id.0,
        }
    }
}

/// Hand-off point to the notification subsystem (e-mail, queue, webhook...).
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification channel closed")]
    Closed,
}

/// Emit an event after a committed state change. Failures are logged and dropped so they
/// never undo the change that triggered them.
pub(crate) fn dispatch<N: Notifier + ?Sized>(notifier: &N, event: NotificationEvent) {
    let template = event.template();
    let entity = event.entity_id().to_string();
    match notifier.notify(event) {
        Ok(()) => debug!(template, entity = %entity, "notification emitted"),
        Err(err) => warn!(template, entity = %entity, error = %err, "notification dropped"),
    }
}
