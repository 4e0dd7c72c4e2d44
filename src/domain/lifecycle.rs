//! The request state machine.
//!
//! `decide` is a pure function from (current record, event) to either a new record plus
//! the notifications it implies, or a no-op. It performs no I/O: persisting the new
//! record and dispatching the notifications are effects applied by the caller, in that
//! order.
//!
//! ```text
//! pending-payment --initiate--> pending-payment   payment -> processing
//! pending-payment --confirm-->  received          payment -> completed
//! received        --set-->      in-progress | cancelled
//! in-progress     --set-->      completed | cancelled
//! in-progress     --upload-->   completed
//! completed       --upload-->   completed         results appended only
//! ```

use crate::domain::notification::{NotificationEvent, NotificationIntent};
use crate::domain::payment::PaymentStatus;
use crate::domain::request::{FileDescriptor, FulfillmentStatus, ServiceRequest};
use crate::domain::validation;
use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum LifecycleEvent {
    InitiatePayment {
        momo_number: String,
    },
    ConfirmPayment {
        transaction_id: String,
    },
    SetStatus {
        target: FulfillmentStatus,
        #[serde(default)]
        admin_notes: Option<String>,
    },
    /// One delivery of result files, at most `MAX_RESULT_FILES` of them.
    UploadResult {
        files: Vec<FileDescriptor>,
    },
}

/// Files accepted in one upload.
pub const MAX_RESULT_FILES: usize = 10;

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitiatePayment { .. } => "initiate-payment",
            Self::ConfirmPayment { .. } => "confirm-payment",
            Self::SetStatus { .. } => "set-status",
            Self::UploadResult { .. } => "upload-result",
        }
    }

    /// Whether only operators may submit this event.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Self::SetStatus { .. } | Self::UploadResult { .. })
    }
}

/// Why a well-formed event left the record untouched.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum NoOpReason {
    /// Payment initiation on a settled request.
    AlreadyPaid,
    /// A repeated confirmation; the first one stands.
    AlreadyConfirmed,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Decision {
    Applied {
        request: ServiceRequest,
        notifications: Vec<NotificationIntent>,
    },
    Unchanged(NoOpReason),
}

/// Targets an operator may move a request to from `from`.
///
/// `received` is absent: only a payment confirmation reaches it. Terminal states have
/// no targets, so when two operators race to complete the same request the one that
/// reads after the other's write gets `IllegalTransition`, not a no-op. Only a caller
/// whose read predates the winning write sees `Conflict`.
pub fn admin_targets(from: FulfillmentStatus) -> &'static [FulfillmentStatus] {
    use FulfillmentStatus::*;
    match from {
        Received => &[InProgress, Cancelled],
        InProgress => &[Completed, Cancelled],
        PendingPayment | Completed | Cancelled => &[],
    }
}

pub fn admin_transition_allowed(from: FulfillmentStatus, to: FulfillmentStatus) -> bool {
    admin_targets(from).contains(&to)
}

/// Computes the effect of `event` on `request` at time `now`.
///
/// Input formats are checked before anything else, so a rejected event never yields a
/// partially updated record.
pub fn decide(
    request: &ServiceRequest,
    event: &LifecycleEvent,
    now: DateTime<Utc>,
) -> Result<Decision> {
    match event {
        LifecycleEvent::InitiatePayment { momo_number } => {
            let momo_number = validation::mobile_number("momo_number", momo_number)?;
            if request.payment.is_settled() {
                return Ok(Decision::Unchanged(NoOpReason::AlreadyPaid));
            }
            ensure_status(
                request,
                FulfillmentStatus::PendingPayment,
                FulfillmentStatus::PendingPayment,
            )?;

            let mut next = touched(request, now);
            next.payment.momo_number = Some(momo_number);
            next.payment.status = PaymentStatus::Processing;
            Ok(applied(next, Vec::new()))
        }
        LifecycleEvent::ConfirmPayment { transaction_id } => {
            let transaction_id = validation::non_empty("transaction_id", transaction_id)?;
            if request.payment.is_settled() {
                return Ok(Decision::Unchanged(NoOpReason::AlreadyConfirmed));
            }
            ensure_status(
                request,
                FulfillmentStatus::PendingPayment,
                FulfillmentStatus::Received,
            )?;

            let mut next = touched(request, now);
            next.payment.status = PaymentStatus::Completed;
            next.payment.transaction_id = Some(transaction_id);
            next.payment.paid_at = Some(now);
            next.status = FulfillmentStatus::Received;

            let notifications = vec![
                NotificationIntent::client(NotificationEvent::PaymentConfirmed, &next),
                NotificationIntent::operator(NotificationEvent::PaymentReceived, &next),
            ];
            Ok(applied(next, notifications))
        }
        LifecycleEvent::SetStatus {
            target,
            admin_notes,
        } => {
            if !admin_transition_allowed(request.status, *target) {
                return Err(illegal(request, *target));
            }

            let mut next = touched(request, now);
            next.status = *target;
            if *target == FulfillmentStatus::Completed && next.completed_at.is_none() {
                next.completed_at = Some(now);
            }
            if let Some(notes) = validation::optional(admin_notes.clone()) {
                next.admin_notes = Some(notes);
            }

            let notifications = vec![NotificationIntent::client(
                NotificationEvent::StatusChanged,
                &next,
            )];
            Ok(applied(next, notifications))
        }
        LifecycleEvent::UploadResult { files } => {
            if files.is_empty() {
                return Err(TrackerError::validation("files", "at least one file is required"));
            }
            if files.len() > MAX_RESULT_FILES {
                return Err(TrackerError::validation(
                    "files",
                    format!("at most {MAX_RESULT_FILES} files per upload, got {}", files.len()),
                ));
            }
            match request.status {
                FulfillmentStatus::InProgress | FulfillmentStatus::Completed => {}
                _ => return Err(illegal(request, FulfillmentStatus::Completed)),
            }

            let mut next = touched(request, now);
            next.completed_files.extend(files.iter().cloned());
            next.status = FulfillmentStatus::Completed;
            if next.completed_at.is_none() {
                next.completed_at = Some(now);
            }

            let notifications = vec![NotificationIntent::client(
                NotificationEvent::ResultsReady,
                &next,
            )];
            Ok(applied(next, notifications))
        }
    }
}

fn touched(request: &ServiceRequest, now: DateTime<Utc>) -> ServiceRequest {
    let mut next = request.clone();
    next.updated_at = now.max(request.updated_at);
    next
}

fn applied(request: ServiceRequest, notifications: Vec<NotificationIntent>) -> Decision {
    Decision::Applied {
        request,
        notifications,
    }
}

fn ensure_status(
    request: &ServiceRequest,
    expected: FulfillmentStatus,
    requested: FulfillmentStatus,
) -> Result<()> {
    if request.status == expected {
        Ok(())
    } else {
        Err(illegal(request, requested))
    }
}

fn illegal(request: &ServiceRequest, requested: FulfillmentStatus) -> TrackerError {
    TrackerError::IllegalTransition {
        reference: request.reference.to_string(),
        current: request.status,
        requested,
    }
}
