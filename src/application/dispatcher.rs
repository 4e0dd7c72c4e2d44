//! Best-effort delivery of notification intents.
//!
//! Intents go into a bounded outbox drained by one worker task, which keeps up to
//! `max_in_flight` deliveries running at once. Each send attempt is bounded by a timeout
//! and retried a fixed number of times; after that the notification is dropped and
//! logged. Intents that find the outbox full are dropped the same way. Nothing here
//! reports back to the operation that produced the intent.

use crate::config::DispatchConfig;
use crate::domain::notification::{Audience, Notification, NotificationIntent};
use crate::domain::ports::{NotificationChannel, NotificationError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

enum OutboxMessage {
    Deliver(NotificationIntent),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub dropped: u64,
}

pub struct NotificationDispatcher {
    outbox: mpsc::Sender<OutboxMessage>,
    counters: Arc<Counters>,
}

impl NotificationDispatcher {
    /// Starts the delivery worker on the current tokio runtime.
    ///
    /// The worker stops once the dispatcher is dropped and the outbox is drained.
    pub fn spawn(
        channel: Arc<dyn NotificationChannel>,
        operator_email: impl Into<String>,
        config: DispatchConfig,
    ) -> Self {
        let (outbox, inbox) = mpsc::channel(config.outbox_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let max_in_flight = config.max_in_flight.max(1);
        let delivery = Delivery {
            channel,
            operator_email: operator_email.into(),
            config,
            counters: counters.clone(),
        };
        tokio::spawn(run(Arc::new(delivery), inbox, max_in_flight));
        Self { outbox, counters }
    }

    /// Queues `intents` and returns immediately.
    pub fn dispatch(&self, intents: Vec<NotificationIntent>) {
        for intent in intents {
            let reason = match self.outbox.try_send(OutboxMessage::Deliver(intent)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "notification outbox is full",
                Err(TrySendError::Closed(_)) => "notification worker is gone",
            };
            tracing::warn!(reason, "dropping notification");
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Waits until everything queued before this call has been delivered or dropped.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.outbox.send(OutboxMessage::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }

    /// Stops accepting intents and waits for the ones already queued.
    ///
    /// Intents dispatched afterwards are dropped.
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        if self.outbox.send(OutboxMessage::Shutdown(done)).await.is_ok() {
            let _ = wait.await;
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

async fn run(
    delivery: Arc<Delivery>,
    mut inbox: mpsc::Receiver<OutboxMessage>,
    max_in_flight: usize,
) {
    let mut in_flight = JoinSet::new();
    let mut stopped = None;
    while let Some(message) = inbox.recv().await {
        match message {
            OutboxMessage::Deliver(intent) => {
                while in_flight.len() >= max_in_flight {
                    reap(in_flight.join_next().await);
                }
                let delivery = delivery.clone();
                in_flight.spawn(async move { delivery.deliver(intent).await });
            }
            OutboxMessage::Flush(done) => {
                drain(&mut in_flight).await;
                let _ = done.send(());
            }
            OutboxMessage::Shutdown(done) => {
                inbox.close();
                stopped = Some(done);
            }
        }
    }
    drain(&mut in_flight).await;
    tracing::debug!("notification outbox closed");
    if let Some(done) = stopped {
        let _ = done.send(());
    }
}

async fn drain(in_flight: &mut JoinSet<()>) {
    while let Some(joined) = in_flight.join_next().await {
        reap(Some(joined));
    }
}

fn reap(joined: Option<Result<(), tokio::task::JoinError>>) {
    if let Some(Err(error)) = joined {
        tracing::error!(%error, "notification delivery task failed");
    }
}

struct Delivery {
    channel: Arc<dyn NotificationChannel>,
    operator_email: String,
    config: DispatchConfig,
    counters: Arc<Counters>,
}

impl Delivery {
    fn resolve(&self, intent: NotificationIntent) -> Notification {
        let recipient = match intent.audience {
            Audience::Client => intent.client_email,
            Audience::Operator => self.operator_email.clone(),
        };
        Notification {
            event: intent.event,
            recipient,
            payload: intent.payload,
        }
    }

    async fn deliver(&self, intent: NotificationIntent) {
        let notification = self.resolve(intent);
        let attempts = self.config.attempts.max(1);

        for attempt in 1..=attempts {
            let outcome =
                tokio::time::timeout(self.config.send_timeout, self.channel.send(&notification))
                    .await
                    .unwrap_or(Err(NotificationError::Timeout(self.config.send_timeout)));

            match outcome {
                Ok(()) => {
                    tracing::debug!(
                        event = %notification.event,
                        reference = %notification.payload.reference,
                        attempt,
                        "notification delivered"
                    );
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(error) => {
                    tracing::warn!(
                        event = %notification.event,
                        reference = %notification.payload.reference,
                        attempt,
                        %error,
                        "notification attempt failed"
                    );
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_backoff).await;
            }
        }

        tracing::error!(
            event = %notification.event,
            reference = %notification.payload.reference,
            recipient = %notification.recipient,
            attempts,
            "notification dropped"
        );
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }
}
