use crate::domain::payment::PaymentStatus;
use crate::domain::reference::ReferenceCode;
use crate::domain::request::ServiceRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationEvent {
    RequestSubmitted,
    PaymentConfirmed,
    PaymentReceived,
    StatusChanged,
    ResultsReady,
    RegistrationReceived,
    ContactReceived,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestSubmitted => "request-submitted",
            Self::PaymentConfirmed => "payment-confirmed",
            Self::PaymentReceived => "payment-received",
            Self::StatusChanged => "status-changed",
            Self::ResultsReady => "results-ready",
            Self::RegistrationReceived => "registration-received",
            Self::ContactReceived => "contact-received",
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a notification is for. Resolved to an address by the dispatcher.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Client,
    Operator,
}

/// Structured data the channel renders; no presentation markup.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NotificationPayload {
    pub reference: ReferenceCode,
    pub client_name: String,
    /// Service or program the record is about.
    pub subject: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<PaymentStatus>,
}

impl From<&ServiceRequest> for NotificationPayload {
    fn from(request: &ServiceRequest) -> Self {
        Self {
            reference: request.reference.clone(),
            client_name: request.client.name.clone(),
            subject: request.service_type.display_name().to_string(),
            amount: Some(request.payment.amount.value()),
            currency: Some(request.payment.currency.clone()),
            transaction_id: request.payment.transaction_id.clone(),
            status: Some(request.status.to_string()),
            payment_status: Some(request.payment.status),
        }
    }
}

/// A message that should be sent once the transition producing it is durable.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NotificationIntent {
    pub event: NotificationEvent,
    pub audience: Audience,
    pub client_email: String,
    pub payload: NotificationPayload,
}

impl NotificationIntent {
    pub fn new(
        event: NotificationEvent,
        audience: Audience,
        client_email: impl Into<String>,
        payload: NotificationPayload,
    ) -> Self {
        Self {
            event,
            audience,
            client_email: client_email.into(),
            payload,
        }
    }

    pub fn client(event: NotificationEvent, request: &ServiceRequest) -> Self {
        Self::about(event, Audience::Client, request)
    }

    pub fn operator(event: NotificationEvent, request: &ServiceRequest) -> Self {
        Self::about(event, Audience::Operator, request)
    }

    fn about(event: NotificationEvent, audience: Audience, request: &ServiceRequest) -> Self {
        Self::new(event, audience, request.client.email.clone(), request.into())
    }
}

/// An intent with its recipient resolved, ready for a channel.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Notification {
    pub event: NotificationEvent,
    pub recipient: String,
    pub payload: NotificationPayload,
}
