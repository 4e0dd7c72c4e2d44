use super::contact::{ContactStatus, ContactSubmission};
use super::notification::Notification;
use super::reference::ReferenceCode;
use super::registration::TrainingRegistration;
use super::request::{FulfillmentStatus, ServiceRequest};
use super::validation;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Listing criteria for service requests. Results are always newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub status: Option<FulfillmentStatus>,
    pub client_email: Option<String>,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self {
            status: None,
            client_email: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RequestFilter {
    pub fn with_status(status: FulfillmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.status.is_none_or(|status| request.status == status)
            && self
                .client_email
                .as_deref()
                .is_none_or(|email| request.client.email == validation::normalize_email(email))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    /// Slices an already sorted, already filtered list.
    pub fn from_sorted(all: Vec<T>, page: u32, limit: u32) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total = all.len() as u64;
        let skip = ((page - 1) as usize).saturating_mul(limit as usize);
        let items = all.into_iter().skip(skip).take(limit as usize).collect();
        Self {
            items,
            page,
            limit,
            total,
            pages: total.div_ceil(u64::from(limit)),
        }
    }
}

/// Durable home of service requests.
///
/// `update` is a compare-and-swap: the write only lands when the stored version still
/// equals `request.version`, i.e. nobody wrote since the caller read it.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Stores a new request at version 1.
    ///
    /// Fails with `DuplicateReference` on a taken reference.
    async fn insert(&self, request: ServiceRequest) -> Result<ServiceRequest>;
    async fn get(&self, id: Uuid) -> Result<Option<ServiceRequest>>;
    async fn get_by_reference(&self, reference: &ReferenceCode) -> Result<Option<ServiceRequest>>;
    async fn list(&self, filter: &RequestFilter) -> Result<Page<ServiceRequest>>;
    /// Fails with `NotFound` if absent and `Conflict` if the stored version moved on.
    async fn update(&self, request: ServiceRequest) -> Result<ServiceRequest>;
    /// Sum of payment amounts over settled requests.
    async fn revenue(&self) -> Result<Decimal>;
    async fn status_counts(&self) -> Result<HashMap<FulfillmentStatus, u64>>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn insert(&self, registration: TrainingRegistration) -> Result<()>;
    async fn get_by_reference(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Option<TrainingRegistration>>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<TrainingRegistration>>;
    async fn save(&self, registration: TrainingRegistration) -> Result<()>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert(&self, contact: ContactSubmission) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<ContactSubmission>>;
    /// Newest first.
    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Page<ContactSubmission>>;
    async fn save(&self, contact: ContactSubmission) -> Result<()>;
}

pub type RequestStoreBox = Box<dyn RequestStore>;
pub type RegistrationStoreBox = Box<dyn RegistrationStore>;
pub type ContactStoreBox = Box<dyn ContactStore>;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
    #[error("notification send timed out after {0:?}")]
    Timeout(Duration),
    #[error("recipient {0} was rejected")]
    Rejected(String),
}

/// Outbound message channel (mailer, SMS gateway). Renders and sends; never called
/// inside a state transition.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(
        &self,
        notification: &Notification,
    ) -> std::result::Result<(), NotificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slicing() {
        let page = Page::from_sorted((1..=45).collect::<Vec<_>>(), 3, 20);
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.pages, 3);

        let empty = Page::from_sorted(Vec::<u8>::new(), 1, 20);
        assert_eq!(empty.pages, 0);
        assert!(empty.items.is_empty());
    }

    #[test]
    fn test_email_filter_matches_case_folded_address() {
        let mut request = crate::domain::request::fixtures::unpaid_request("ICBB-2402-ABC123");
        request.client.email = "åsa@ug.edu.gh".to_string();

        let filter = RequestFilter {
            client_email: Some(" ÅSA@UG.EDU.GH".to_string()),
            ..RequestFilter::default()
        };
        assert!(filter.matches(&request));

        let other = RequestFilter {
            client_email: Some("asa@ug.edu.gh".to_string()),
            ..RequestFilter::default()
        };
        assert!(!other.matches(&request));
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let page = Page::from_sorted(vec![1, 2, 3], 0, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.items, vec![1, 2]);
    }
}
