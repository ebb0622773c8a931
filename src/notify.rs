//! Notification sink contract. The production implementation logs through
//! `log`, the same channel the teacher uses for every operational signal;
//! tests use a recording stub instead of wiring a real alerting backend.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Notification {
    pub topic: String,
    pub message: String,
}

impl Notification {
    pub fn new(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Notification {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, notification: Notification) {
        log::warn!("[{}] {}", notification.topic, notification.message);
    }
}
