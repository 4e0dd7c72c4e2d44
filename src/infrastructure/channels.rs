use crate::domain::notification::Notification;
use crate::domain::ports::{NotificationChannel, NotificationError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Writes each notification to the log instead of delivering it.
///
/// Used when no mail transport is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            event = %notification.event,
            recipient = %notification.recipient,
            reference = %notification.payload.reference,
            status = notification.payload.status.as_deref().unwrap_or("-"),
            "notification (delivery disabled)"
        );
        Ok(())
    }
}

/// Keeps every notification it is handed, in order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryChannel {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationChannel for InMemoryChannel {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
