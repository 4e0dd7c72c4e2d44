use crate::domain::contact::{ContactStatus, ContactSubmission};
use crate::domain::ports::{ContactStore, Page, RegistrationStore, RequestFilter, RequestStore};
use crate::domain::reference::ReferenceCode;
use crate::domain::registration::TrainingRegistration;
use crate::domain::request::{FulfillmentStatus, ServiceRequest};
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct RequestTable {
    by_id: HashMap<Uuid, ServiceRequest>,
    by_reference: HashMap<ReferenceCode, Uuid>,
}

/// A thread-safe in-memory store for service requests.
///
/// Every write happens under the table's write lock, so the version check in `update`
/// and the write itself are a single atomic step.
#[derive(Default, Clone)]
pub struct InMemoryRequestStore {
    table: Arc<RwLock<RequestTable>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, mut request: ServiceRequest) -> Result<ServiceRequest> {
        request.check_invariants()?;
        let mut table = self.table.write().await;
        if table.by_reference.contains_key(&request.reference) {
            return Err(TrackerError::DuplicateReference(request.reference.to_string()));
        }
        if table.by_id.contains_key(&request.id) {
            return Err(TrackerError::Storage(Box::new(std::io::Error::other(format!(
                "request id {} already stored",
                request.id
            )))));
        }

        request.version = 1;
        table
            .by_reference
            .insert(request.reference.clone(), request.id);
        table.by_id.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ServiceRequest>> {
        let table = self.table.read().await;
        Ok(table.by_id.get(&id).cloned())
    }

    async fn get_by_reference(&self, reference: &ReferenceCode) -> Result<Option<ServiceRequest>> {
        let table = self.table.read().await;
        Ok(table
            .by_reference
            .get(reference)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Page<ServiceRequest>> {
        let table = self.table.read().await;
        let mut matching: Vec<ServiceRequest> = table
            .by_id
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        newest_first(&mut matching);
        Ok(Page::from_sorted(matching, filter.page, filter.limit))
    }

    async fn update(&self, mut request: ServiceRequest) -> Result<ServiceRequest> {
        let mut table = self.table.write().await;
        let stored = table
            .by_id
            .get(&request.id)
            .ok_or_else(|| TrackerError::NotFound(format!("request {}", request.reference)))?;

        if stored.version != request.version {
            return Err(TrackerError::Conflict {
                reference: request.reference.to_string(),
                expected: request.version,
                found: stored.version,
            });
        }
        request.check_succession(stored)?;

        request.version = stored.version + 1;
        request.updated_at = Utc::now().max(stored.updated_at);
        table.by_id.insert(request.id, request.clone());
        Ok(request)
    }

    async fn revenue(&self) -> Result<Decimal> {
        let table = self.table.read().await;
        Ok(table
            .by_id
            .values()
            .filter(|request| request.payment.is_settled())
            .map(|request| request.payment.amount.value())
            .sum())
    }

    async fn status_counts(&self) -> Result<HashMap<FulfillmentStatus, u64>> {
        let table = self.table.read().await;
        let mut counts = HashMap::new();
        for request in table.by_id.values() {
            *counts.entry(request.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

pub(crate) fn newest_first(requests: &mut [ServiceRequest]) {
    requests.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.reference.cmp(&a.reference))
    });
}

/// In-memory store for training registrations.
#[derive(Default, Clone)]
pub struct InMemoryRegistrationStore {
    registrations: Arc<RwLock<HashMap<Uuid, TrainingRegistration>>>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn insert(&self, registration: TrainingRegistration) -> Result<()> {
        let mut registrations = self.registrations.write().await;
        if registrations
            .values()
            .any(|existing| existing.reference == registration.reference)
        {
            return Err(TrackerError::DuplicateReference(
                registration.reference.to_string(),
            ));
        }
        registrations.insert(registration.id, registration);
        Ok(())
    }

    async fn get_by_reference(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Option<TrainingRegistration>> {
        let registrations = self.registrations.read().await;
        Ok(registrations
            .values()
            .find(|registration| &registration.reference == reference)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<TrainingRegistration>> {
        let registrations = self.registrations.read().await;
        let mut all: Vec<_> = registrations.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn save(&self, registration: TrainingRegistration) -> Result<()> {
        let mut registrations = self.registrations.write().await;
        if !registrations.contains_key(&registration.id) {
            return Err(TrackerError::NotFound(format!(
                "registration {}",
                registration.reference
            )));
        }
        registrations.insert(registration.id, registration);
        Ok(())
    }
}

/// In-memory store for contact form submissions.
#[derive(Default, Clone)]
pub struct InMemoryContactStore {
    contacts: Arc<RwLock<HashMap<Uuid, ContactSubmission>>>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn insert(&self, contact: ContactSubmission) -> Result<()> {
        let mut contacts = self.contacts.write().await;
        if contacts
            .values()
            .any(|existing| existing.reference == contact.reference)
        {
            return Err(TrackerError::DuplicateReference(contact.reference.to_string()));
        }
        contacts.insert(contact.id, contact);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ContactSubmission>> {
        let contacts = self.contacts.read().await;
        Ok(contacts.get(&id).cloned())
    }

    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Page<ContactSubmission>> {
        let contacts = self.contacts.read().await;
        let mut matching: Vec<_> = contacts
            .values()
            .filter(|contact| status.is_none_or(|status| contact.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_sorted(matching, page, limit))
    }

    async fn save(&self, contact: ContactSubmission) -> Result<()> {
        let mut contacts = self.contacts.write().await;
        if !contacts.contains_key(&contact.id) {
            return Err(TrackerError::NotFound(format!("contact {}", contact.reference)));
        }
        contacts.insert(contact.id, contact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::{Decision, LifecycleEvent, decide};
    use crate::domain::request::fixtures::unpaid_request;
    use rust_decimal_macros::dec;

    fn confirmed(request: &ServiceRequest) -> ServiceRequest {
        let event = LifecycleEvent::ConfirmPayment {
            transaction_id: "MP240210.1234.A12345".to_string(),
        };
        match decide(request, &event, Utc::now()).unwrap() {
            Decision::Applied { request, .. } => request,
            Decision::Unchanged(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let store = InMemoryRequestStore::new();
        let request = unpaid_request("ICBB-2402-ABC123");
        let stored = store.insert(request.clone()).await.unwrap();
        assert_eq!(stored.version, 1);

        let by_id = store.get(request.id).await.unwrap().unwrap();
        let by_reference = store
            .get_by_reference(&request.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id, by_reference);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let store = InMemoryRequestStore::new();
        store
            .insert(unpaid_request("ICBB-2402-ABC123"))
            .await
            .unwrap();
        let result = store.insert(unpaid_request("ICBB-2402-ABC123")).await;
        assert!(
            matches!(result, Err(TrackerError::DuplicateReference(r)) if r == "ICBB-2402-ABC123")
        );
    }

    #[tokio::test]
    async fn test_update_is_conditional_on_version() {
        let store = InMemoryRequestStore::new();
        let stored = store
            .insert(unpaid_request("ICBB-2402-ABC123"))
            .await
            .unwrap();

        let first = store.update(confirmed(&stored)).await.unwrap();
        assert_eq!(first.version, 2);
        assert!(first.updated_at >= stored.updated_at);

        // Same base version again: lost the race.
        let stale = store.update(confirmed(&stored)).await;
        assert!(matches!(
            stale,
            Err(TrackerError::Conflict {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_request() {
        let store = InMemoryRequestStore::new();
        let mut request = unpaid_request("ICBB-2402-ABC123");
        request.version = 1;
        assert!(matches!(
            store.update(request).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_invariant_breach() {
        let store = InMemoryRequestStore::new();
        let mut stored = store
            .insert(unpaid_request("ICBB-2402-ABC123"))
            .await
            .unwrap();
        stored.status = FulfillmentStatus::InProgress;
        assert!(matches!(
            store.update(stored).await,
            Err(TrackerError::InvariantViolated { .. })
        ));
    }

    #[tokio::test]
    async fn test_revenue_counts_settled_payments_only() {
        let store = InMemoryRequestStore::new();
        let paid = store
            .insert(unpaid_request("ICBB-2402-AAAAAA"))
            .await
            .unwrap();
        store.update(confirmed(&paid)).await.unwrap();
        store
            .insert(unpaid_request("ICBB-2402-BBBBBB"))
            .await
            .unwrap();

        assert_eq!(store.revenue().await.unwrap(), dec!(700));
        let counts = store.status_counts().await.unwrap();
        assert_eq!(counts.get(&FulfillmentStatus::Received), Some(&1));
        assert_eq!(counts.get(&FulfillmentStatus::PendingPayment), Some(&1));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = InMemoryRequestStore::new();
        for (i, reference) in ["ICBB-2402-AAAAAA", "ICBB-2402-BBBBBB", "ICBB-2402-CCCCCC"]
            .iter()
            .enumerate()
        {
            let mut request = unpaid_request(reference);
            request.created_at += chrono::Duration::seconds(i as i64);
            request.updated_at = request.created_at;
            store.insert(request).await.unwrap();
        }

        let page = store.list(&RequestFilter::default()).await.unwrap();
        let references: Vec<_> = page.items.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(
            references,
            vec!["ICBB-2402-CCCCCC", "ICBB-2402-BBBBBB", "ICBB-2402-AAAAAA"]
        );

        let received = store
            .list(&RequestFilter::with_status(FulfillmentStatus::Received))
            .await
            .unwrap();
        assert_eq!(received.total, 0);

        let by_email = RequestFilter {
            client_email: Some("AMA@ug.edu.gh".to_string()),
            limit: 2,
            ..RequestFilter::default()
        };
        let page = store.list(&by_email).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pages, 2);
    }
}
