use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::reference::ReferenceCode;
use crate::domain::validation;
use crate::error::{Result, TrackerError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The fixed catalogue of services a client can order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    DataCleaning,
    DataAnalysis,
    DataCleaningAnalysis,
    StatisticalConsulting,
    BioinformaticsAnalysis,
    PaperReview,
}

impl ServiceType {
    pub const ALL: [ServiceType; 6] = [
        Self::DataCleaning,
        Self::DataAnalysis,
        Self::DataCleaningAnalysis,
        Self::StatisticalConsulting,
        Self::BioinformaticsAnalysis,
        Self::PaperReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataCleaning => "data-cleaning",
            Self::DataAnalysis => "data-analysis",
            Self::DataCleaningAnalysis => "data-cleaning-analysis",
            Self::StatisticalConsulting => "statistical-consulting",
            Self::BioinformaticsAnalysis => "bioinformatics-analysis",
            Self::PaperReview => "paper-review",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DataCleaning => "Data Cleaning Only",
            Self::DataAnalysis => "Data Analysis Only",
            Self::DataCleaningAnalysis => "Data Cleaning + Full Analysis",
            Self::StatisticalConsulting => "Statistical Consulting",
            Self::BioinformaticsAnalysis => "Bioinformatics Analysis",
            Self::PaperReview => "Research Paper Review",
        }
    }

    /// Default price in GHS, used unless configuration overrides it.
    pub fn base_price(&self) -> Decimal {
        match self {
            Self::DataCleaning => dec!(500),
            Self::DataAnalysis => dec!(700),
            Self::DataCleaningAnalysis => dec!(1000),
            Self::StatisticalConsulting => dec!(600),
            Self::BioinformaticsAnalysis => dec!(1200),
            Self::PaperReview => dec!(500),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work-progress state of a request, independent of payment status.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum FulfillmentStatus {
    #[default]
    PendingPayment,
    Received,
    InProgress,
    Completed,
    Cancelled,
}

impl FulfillmentStatus {
    pub const ALL: [FulfillmentStatus; 5] = [
        Self::PendingPayment,
        Self::Received,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending-payment",
            Self::Received => "received",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Every state past `pending-payment` is only reachable through a settled payment.
    pub fn requires_settled_payment(&self) -> bool {
        !matches!(self, Self::PendingPayment)
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to a file held by the blob store. The bytes are never read here.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct FileDescriptor {
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub size: u64,
    pub mimetype: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
}

/// Payload for a new service request, as handed over by the transport layer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NewServiceRequest {
    /// Pre-assigned reference; generated when absent.
    #[serde(default)]
    pub reference: Option<ReferenceCode>,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    pub service_type: ServiceType,
    pub description: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

impl NewServiceRequest {
    pub fn new(
        client_name: impl Into<String>,
        client_email: impl Into<String>,
        service_type: ServiceType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            reference: None,
            client_name: client_name.into(),
            client_email: client_email.into(),
            phone: None,
            institution: None,
            service_type,
            description: description.into(),
            deadline: None,
            additional_notes: None,
            files: Vec::new(),
        }
    }

    /// Checks and normalizes the payload. Nothing is stored on failure.
    pub fn validate(self) -> Result<Self> {
        let phone = match validation::optional(self.phone) {
            Some(phone) => Some(validation::mobile_number("phone", &phone)?),
            None => None,
        };
        Ok(Self {
            reference: self.reference,
            client_name: validation::non_empty("client_name", &self.client_name)?,
            client_email: validation::email("client_email", &self.client_email)?,
            phone,
            institution: validation::optional(self.institution),
            service_type: self.service_type,
            description: validation::non_empty("description", &self.description)?,
            deadline: self.deadline,
            additional_notes: validation::optional(self.additional_notes),
            files: self.files,
        })
    }
}

/// The central record: a client's order, its payment and its fulfillment progress.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub reference: ReferenceCode,
    pub client: ClientDetails,
    pub service_type: ServiceType,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub additional_notes: Option<String>,
    /// Client-submitted files. Append-only.
    pub uploaded_files: Vec<FileDescriptor>,
    /// Admin-submitted results. Append-only.
    pub completed_files: Vec<FileDescriptor>,
    pub payment: Payment,
    pub status: FulfillmentStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful write.
    pub version: u64,
}

impl ServiceRequest {
    /// Builds a fresh, unpaid request from a validated payload.
    pub fn create(
        input: NewServiceRequest,
        reference: ReferenceCode,
        payment: Payment,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference,
            client: ClientDetails {
                name: input.client_name,
                email: input.client_email,
                phone: input.phone,
                institution: input.institution,
            },
            service_type: input.service_type,
            description: input.description,
            deadline: input.deadline,
            additional_notes: input.additional_notes,
            uploaded_files: input.files,
            completed_files: Vec::new(),
            payment,
            status: FulfillmentStatus::PendingPayment,
            admin_notes: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        }
    }

    /// Checks the invariants that hold for every stored request.
    pub fn check_invariants(&self) -> Result<()> {
        if self.status.requires_settled_payment() && !self.payment.is_settled() {
            return Err(self.violation("fulfillment has started on an unpaid request"));
        }
        if self.status == FulfillmentStatus::Completed && self.completed_at.is_none() {
            return Err(self.violation("completed request has no completion timestamp"));
        }
        if self.payment.is_settled()
            && (self.payment.transaction_id.is_none() || self.payment.paid_at.is_none())
        {
            return Err(self.violation("settled payment has no transaction id"));
        }
        if self.updated_at < self.created_at {
            return Err(self.violation("updated-at precedes created-at"));
        }
        Ok(())
    }

    /// Checks that `self` is a legal successor of the stored `previous` record.
    pub fn check_succession(&self, previous: &ServiceRequest) -> Result<()> {
        if self.id != previous.id
            || self.reference != previous.reference
            || self.created_at != previous.created_at
        {
            return Err(self.violation("identity fields are immutable"));
        }
        if previous.completed_at.is_some() && self.completed_at != previous.completed_at {
            return Err(self.violation("completed-at is set once"));
        }
        if previous.payment.transaction_id.is_some()
            && self.payment.transaction_id != previous.payment.transaction_id
        {
            return Err(self.violation("transaction id is set once"));
        }
        if !self.uploaded_files.starts_with(&previous.uploaded_files)
            || !self.completed_files.starts_with(&previous.completed_files)
        {
            return Err(self.violation("file lists are append-only"));
        }
        self.check_invariants()
    }

    fn violation(&self, detail: &'static str) -> TrackerError {
        TrackerError::InvariantViolated {
            reference: self.reference.to_string(),
            detail,
        }
    }
}

/// Public tracking view, returned only when the caller knows both email and reference.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TrackingSummary {
    pub reference: ReferenceCode,
    pub service_type: ServiceType,
    pub status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub results_available: bool,
}

impl From<&ServiceRequest> for TrackingSummary {
    fn from(request: &ServiceRequest) -> Self {
        Self {
            reference: request.reference.clone(),
            service_type: request.service_type,
            status: request.status,
            payment_status: request.payment.status,
            created_at: request.created_at,
            results_available: !request.completed_files.is_empty(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentSummary {
    pub reference: ReferenceCode,
    pub payment_status: PaymentStatus,
    pub amount: Decimal,
    pub currency: String,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&ServiceRequest> for PaymentSummary {
    fn from(request: &ServiceRequest) -> Self {
        Self {
            reference: request.reference.clone(),
            payment_status: request.payment.status,
            amount: request.payment.amount.value(),
            currency: request.payment.currency.clone(),
            paid_at: request.payment.paid_at,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::payment::Amount;

    pub fn file(name: &str) -> FileDescriptor {
        FileDescriptor {
            filename: format!("{name}-stored"),
            original_name: name.to_string(),
            path: format!("uploads/{name}"),
            size: 1024,
            mimetype: "text/csv".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    pub fn unpaid_request(reference: &str) -> ServiceRequest {
        let input = NewServiceRequest::new(
            "Ama Mensah",
            "ama@ug.edu.gh",
            ServiceType::DataAnalysis,
            "Survival analysis of cohort data",
        );
        ServiceRequest::create(
            input,
            ReferenceCode::parse(reference).unwrap(),
            Payment::new(Amount::new(dec!(700)).unwrap(), "GHS"),
            Utc::now(),
        )
    }
}
