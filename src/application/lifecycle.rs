use super::dispatcher::NotificationDispatcher;
use super::references;
use crate::config::TrackerConfig;
use crate::domain::caller::Caller;
use crate::domain::lifecycle::{Decision, LifecycleEvent, NoOpReason, decide};
use crate::domain::notification::{NotificationEvent, NotificationIntent};
use crate::domain::payment::{Amount, Payment, PaymentInstructions};
use crate::domain::ports::{Page, RequestFilter, RequestStoreBox};
use crate::domain::reference::{
    RandomReferences, ReferenceCode, ReferenceSource, SERVICE_REQUEST_PREFIX,
};
use crate::domain::request::{
    FileDescriptor, FulfillmentStatus, NewServiceRequest, PaymentSummary, ServiceRequest,
    ServiceType, TrackingSummary,
};
use crate::domain::validation;
use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// How an operation names the request it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestLocator {
    Id(Uuid),
    Reference(ReferenceCode),
}

impl From<Uuid> for RequestLocator {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl From<ReferenceCode> for RequestLocator {
    fn from(reference: ReferenceCode) -> Self {
        Self::Reference(reference)
    }
}

impl From<&ReferenceCode> for RequestLocator {
    fn from(reference: &ReferenceCode) -> Self {
        Self::Reference(reference.clone())
    }
}

impl fmt::Display for RequestLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "request {id}"),
            Self::Reference(reference) => write!(f, "request {reference}"),
        }
    }
}

/// Result of an event that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The new state was written.
    Applied(ServiceRequest),
    /// Nothing changed; `request` is the stored state.
    Unchanged {
        request: ServiceRequest,
        reason: NoOpReason,
    },
}

impl TransitionOutcome {
    pub fn request(&self) -> &ServiceRequest {
        match self {
            Self::Applied(request) | Self::Unchanged { request, .. } => request,
        }
    }

    pub fn into_request(self) -> ServiceRequest {
        match self {
            Self::Applied(request) | Self::Unchanged { request, .. } => request,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitiateOutcome {
    Initiated {
        request: ServiceRequest,
        instructions: PaymentInstructions,
    },
    /// The request is already paid; nothing was changed.
    AlreadyPaid(ServiceRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed(ServiceRequest),
    /// A repeated confirmation. The stored payment is returned untouched.
    AlreadyConfirmed(ServiceRequest),
}

impl ConfirmOutcome {
    pub fn request(&self) -> &ServiceRequest {
        match self {
            Self::Confirmed(request) | Self::AlreadyConfirmed(request) => request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOffer {
    pub service_type: ServiceType,
    pub name: &'static str,
    pub price: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentRequest {
    pub reference: ReferenceCode,
    pub client_name: String,
    pub service_type: ServiceType,
    pub status: FulfillmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestStats {
    pub total_requests: u64,
    /// Awaiting payment or awaiting pickup.
    pub pending_requests: u64,
    pub in_progress_requests: u64,
    pub completed_requests: u64,
    pub cancelled_requests: u64,
    pub total_revenue: Decimal,
    pub recent_requests: Vec<RecentRequest>,
}

const RECENT_LIMIT: u32 = 5;

/// Entry point for everything that happens to a service request.
///
/// Each event is a read, a pure decision, and a write conditioned on the version that
/// was read. Notifications are queued only after the write succeeded, and their
/// delivery never affects the outcome returned here. A lost race surfaces as
/// `Conflict`; callers may re-fetch and try again.
pub struct RequestLifecycle {
    store: RequestStoreBox,
    references: Box<dyn ReferenceSource>,
    dispatcher: Arc<NotificationDispatcher>,
    config: TrackerConfig,
}

impl RequestLifecycle {
    pub fn new(
        store: RequestStoreBox,
        dispatcher: Arc<NotificationDispatcher>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            store,
            references: Box::new(RandomReferences),
            dispatcher,
            config,
        }
    }

    pub fn with_reference_source(mut self, references: Box<dyn ReferenceSource>) -> Self {
        self.references = references;
        self
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Price list, as quoted to clients.
    pub fn catalogue(&self) -> Vec<ServiceOffer> {
        ServiceType::ALL
            .into_iter()
            .map(|service_type| ServiceOffer {
                service_type,
                name: service_type.display_name(),
                price: self.config.price_of(service_type),
                currency: self.config.currency.clone(),
            })
            .collect()
    }

    /// Creates an unpaid request priced from the catalogue.
    pub async fn submit(&self, input: NewServiceRequest) -> Result<ServiceRequest> {
        let mut input = input.validate()?;
        let amount = Amount::new(self.config.price_of(input.service_type))?;
        let payment = Payment::new(amount, self.config.currency.clone());
        let now = Utc::now();

        let stored = match input.reference.take() {
            Some(reference) => {
                if reference.prefix() != SERVICE_REQUEST_PREFIX {
                    return Err(TrackerError::validation(
                        "reference",
                        format!("service request references start with {SERVICE_REQUEST_PREFIX}"),
                    ));
                }
                let request = ServiceRequest::create(input, reference, payment, now);
                self.store.insert(request).await?
            }
            None => {
                references::allocate(
                    self.references.as_ref(),
                    SERVICE_REQUEST_PREFIX,
                    now.date_naive(),
                    self.config.reference_attempts,
                    |reference| {
                        let request =
                            ServiceRequest::create(input.clone(), reference, payment.clone(), now);
                        self.store.insert(request)
                    },
                )
                .await?
            }
        };

        tracing::info!(
            reference = %stored.reference,
            service = %stored.service_type,
            amount = %stored.payment.amount,
            "service request submitted"
        );
        self.dispatcher.dispatch(vec![NotificationIntent::client(
            NotificationEvent::RequestSubmitted,
            &stored,
        )]);
        Ok(stored)
    }

    pub async fn fetch(&self, locator: impl Into<RequestLocator>) -> Result<ServiceRequest> {
        let locator = locator.into();
        let found = match &locator {
            RequestLocator::Id(id) => self.store.get(*id).await?,
            RequestLocator::Reference(reference) => self.store.get_by_reference(reference).await?,
        };
        found.ok_or_else(|| TrackerError::NotFound(locator.to_string()))
    }

    /// Public status lookup. The email must match the one on the request.
    pub async fn track(&self, email: &str, reference: &ReferenceCode) -> Result<TrackingSummary> {
        let request = self.fetch(reference).await?;
        if request.client.email != validation::normalize_email(email) {
            return Err(TrackerError::NotFound(format!("request {reference}")));
        }
        Ok(TrackingSummary::from(&request))
    }

    pub async fn payment_status(&self, reference: &ReferenceCode) -> Result<PaymentSummary> {
        let request = self.fetch(reference).await?;
        Ok(PaymentSummary::from(&request))
    }

    /// Records the payer's number and returns transfer instructions.
    pub async fn initiate_payment(
        &self,
        reference: &ReferenceCode,
        momo_number: &str,
    ) -> Result<InitiateOutcome> {
        let event = LifecycleEvent::InitiatePayment {
            momo_number: momo_number.to_string(),
        };
        match self.handle(&Caller::anonymous(), reference.into(), event).await? {
            TransitionOutcome::Applied(request) => {
                let instructions = PaymentInstructions::new(
                    request.reference.clone(),
                    &request.payment,
                    &self.config.momo_account,
                );
                Ok(InitiateOutcome::Initiated {
                    request,
                    instructions,
                })
            }
            TransitionOutcome::Unchanged { request, .. } => {
                Ok(InitiateOutcome::AlreadyPaid(request))
            }
        }
    }

    /// Settles the payment and moves the request to `received`. Repeats are no-ops.
    pub async fn confirm_payment(
        &self,
        reference: &ReferenceCode,
        transaction_id: &str,
    ) -> Result<ConfirmOutcome> {
        let event = LifecycleEvent::ConfirmPayment {
            transaction_id: transaction_id.to_string(),
        };
        match self.handle(&Caller::anonymous(), reference.into(), event).await? {
            TransitionOutcome::Applied(request) => Ok(ConfirmOutcome::Confirmed(request)),
            TransitionOutcome::Unchanged { request, .. } => {
                Ok(ConfirmOutcome::AlreadyConfirmed(request))
            }
        }
    }

    /// Operator move along the admin table.
    ///
    /// Terminal states accept nothing. Of two operators completing the same request,
    /// the one reading after the other's write gets `IllegalTransition`; one whose read
    /// predates it gets `Conflict`. Neither is retried here.
    pub async fn set_status(
        &self,
        caller: &Caller,
        locator: impl Into<RequestLocator>,
        target: FulfillmentStatus,
        admin_notes: Option<String>,
    ) -> Result<ServiceRequest> {
        let event = LifecycleEvent::SetStatus {
            target,
            admin_notes,
        };
        Ok(self.handle(caller, locator.into(), event).await?.into_request())
    }

    /// Attaches a result file; delivering results completes the request.
    pub async fn upload_result(
        &self,
        caller: &Caller,
        locator: impl Into<RequestLocator>,
        file: FileDescriptor,
    ) -> Result<ServiceRequest> {
        self.upload_results(caller, locator, vec![file]).await
    }

    /// Attaches up to `MAX_RESULT_FILES` files at once, with a single client notification.
    pub async fn upload_results(
        &self,
        caller: &Caller,
        locator: impl Into<RequestLocator>,
        files: Vec<FileDescriptor>,
    ) -> Result<ServiceRequest> {
        let event = LifecycleEvent::UploadResult { files };
        Ok(self.handle(caller, locator.into(), event).await?.into_request())
    }

    /// Applies one event: read, decide, conditional write, then queue notifications.
    pub async fn handle(
        &self,
        caller: &Caller,
        locator: RequestLocator,
        event: LifecycleEvent,
    ) -> Result<TransitionOutcome> {
        if event.is_administrative() {
            caller.require_operator(event.name())?;
        }

        let current = self.fetch(locator).await?;
        match decide(&current, &event, Utc::now())? {
            Decision::Applied {
                request,
                notifications,
            } => {
                let stored = match self.store.update(request).await {
                    Ok(stored) => stored,
                    Err(err) => {
                        if err.is_retryable() {
                            tracing::warn!(
                                reference = %current.reference,
                                event = event.name(),
                                %err,
                                "lost a concurrent update"
                            );
                        }
                        return Err(err);
                    }
                };
                tracing::info!(
                    reference = %stored.reference,
                    event = event.name(),
                    from = %current.status,
                    to = %stored.status,
                    payment = %stored.payment.status,
                    caller = caller.id.as_deref().unwrap_or("anonymous"),
                    "transition applied"
                );
                self.dispatcher.dispatch(notifications);
                Ok(TransitionOutcome::Applied(stored))
            }
            Decision::Unchanged(reason) => {
                tracing::debug!(
                    reference = %current.reference,
                    event = event.name(),
                    ?reason,
                    "event left request unchanged"
                );
                Ok(TransitionOutcome::Unchanged {
                    request: current,
                    reason,
                })
            }
        }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        filter: &RequestFilter,
    ) -> Result<Page<ServiceRequest>> {
        caller.require_operator("list requests")?;
        self.store.list(filter).await
    }

    pub async fn stats(&self, caller: &Caller) -> Result<RequestStats> {
        caller.require_operator("view request statistics")?;
        let counts = self.store.status_counts().await?;
        let count = |status: FulfillmentStatus| counts.get(&status).copied().unwrap_or(0);

        let recent = self
            .store
            .list(&RequestFilter {
                limit: RECENT_LIMIT,
                ..RequestFilter::default()
            })
            .await?;

        Ok(RequestStats {
            total_requests: counts.values().sum(),
            pending_requests: count(FulfillmentStatus::PendingPayment)
                + count(FulfillmentStatus::Received),
            in_progress_requests: count(FulfillmentStatus::InProgress),
            completed_requests: count(FulfillmentStatus::Completed),
            cancelled_requests: count(FulfillmentStatus::Cancelled),
            total_revenue: self.store.revenue().await?,
            recent_requests: recent
                .items
                .into_iter()
                .map(|request| RecentRequest {
                    reference: request.reference,
                    client_name: request.client.name,
                    service_type: request.service_type,
                    status: request.status,
                    created_at: request.created_at,
                })
                .collect(),
        })
    }
}
