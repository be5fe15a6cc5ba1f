use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use hiring_pipeline::workflows::recruitment::notifications::{
    NotificationEvent, Notifier, NotifyError,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::info;

/// Hands events to an async delivery worker. `notify` never blocks the calling service.
#[derive(Clone)]
pub(crate) struct ChannelNotifier {
    sender: UnboundedSender<NotificationEvent>,
}

impl ChannelNotifier {
    pub(crate) fn new() -> (Self, UnboundedReceiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        self.sender.send(event).map_err(|_| NotifyError::Closed)
    }
}

/// Drain the channel until every sender is gone, logging each delivery. Resolves to the
/// delivered events in order.
pub(crate) fn spawn_delivery_worker(
    mut receiver: UnboundedReceiver<NotificationEvent>,
) -> JoinHandle<Vec<NotificationEvent>> {
    tokio::spawn(async move {
        let mut delivered = Vec::new();
        while let Some(event) = receiver.recv().await {
            info!(
                template = event.template(),
                to = %event.recipient().email,
                entity = event.entity_id(),
                "notification delivered"
            );
            delivered.push(event);
        }
        delivered
    })
}

/// Comma-separated skill list, blanks dropped.
pub(crate) fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 3339, or `YYYY-MM-DD HH:MM` read as UTC.
pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|err| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD HH:MM ({err})"))
}
