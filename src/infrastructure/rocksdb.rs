use crate::domain::ports::{Page, RequestFilter, RequestStore};
use crate::domain::reference::ReferenceCode;
use crate::domain::request::{FulfillmentStatus, ServiceRequest};
use crate::error::{Result, TrackerError};
use crate::infrastructure::in_memory::newest_first;
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family holding request records keyed by internal id.
pub const CF_REQUESTS: &str = "requests";
/// Column Family mapping reference codes to internal ids.
pub const CF_REFERENCES: &str = "references";

/// A persistent request store backed by RocksDB.
///
/// Records are stored as JSON under their UUID; a second Column Family enforces
/// reference uniqueness. Writes are serialized through `write_lock` so the version
/// check in `update` and the write that follows cannot interleave with another writer.
///
/// `Clone` shares the underlying `Arc<DB>` and lock.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating missing Column Families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_requests = ColumnFamilyDescriptor::new(CF_REQUESTS, Options::default());
        let cf_references = ColumnFamilyDescriptor::new(CF_REFERENCES, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_requests, cf_references])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            TrackerError::Storage(Box::new(std::io::Error::other(format!(
                "column family {name} not found"
            ))))
        })
    }

    fn load(&self, id: Uuid) -> Result<Option<ServiceRequest>> {
        match self.db.get_cf(self.cf(CF_REQUESTS)?, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn resolve(&self, reference: &ReferenceCode) -> Result<Option<Uuid>> {
        let Some(bytes) = self
            .db
            .get_cf(self.cf(CF_REFERENCES)?, reference.as_str().as_bytes())?
        else {
            return Ok(None);
        };
        Uuid::from_slice(&bytes)
            .map(Some)
            .map_err(|e| TrackerError::Storage(Box::new(e)))
    }

    fn scan(&self) -> Result<Vec<ServiceRequest>> {
        let mut requests = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_REQUESTS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            requests.push(serde_json::from_slice(&value)?);
        }
        Ok(requests)
    }

    fn put(&self, batch: &mut WriteBatch, request: &ServiceRequest) -> Result<()> {
        let value = serde_json::to_vec(request)?;
        batch.put_cf(self.cf(CF_REQUESTS)?, request.id.as_bytes(), value);
        Ok(())
    }
}

#[async_trait]
impl RequestStore for RocksDBStore {
    async fn insert(&self, mut request: ServiceRequest) -> Result<ServiceRequest> {
        request.check_invariants()?;
        let _guard = self.write_lock.lock().await;
        if self.resolve(&request.reference)?.is_some() {
            return Err(TrackerError::DuplicateReference(request.reference.to_string()));
        }

        request.version = 1;
        let mut batch = WriteBatch::default();
        self.put(&mut batch, &request)?;
        batch.put_cf(
            self.cf(CF_REFERENCES)?,
            request.reference.as_str().as_bytes(),
            request.id.as_bytes(),
        );
        self.db.write(batch)?;
        Ok(request)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ServiceRequest>> {
        self.load(id)
    }

    async fn get_by_reference(&self, reference: &ReferenceCode) -> Result<Option<ServiceRequest>> {
        match self.resolve(reference)? {
            Some(id) => self.load(id),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Page<ServiceRequest>> {
        let mut matching: Vec<ServiceRequest> = self
            .scan()?
            .into_iter()
            .filter(|request| filter.matches(request))
            .collect();
        newest_first(&mut matching);
        Ok(Page::from_sorted(matching, filter.page, filter.limit))
    }

    async fn update(&self, mut request: ServiceRequest) -> Result<ServiceRequest> {
        let _guard = self.write_lock.lock().await;
        let stored = self
            .load(request.id)?
            .ok_or_else(|| TrackerError::NotFound(format!("request {}", request.reference)))?;

        if stored.version != request.version {
            return Err(TrackerError::Conflict {
                reference: request.reference.to_string(),
                expected: request.version,
                found: stored.version,
            });
        }
        request.check_succession(&stored)?;

        request.version = stored.version + 1;
        request.updated_at = Utc::now().max(stored.updated_at);
        let mut batch = WriteBatch::default();
        self.put(&mut batch, &request)?;
        self.db.write(batch)?;
        Ok(request)
    }

    async fn revenue(&self) -> Result<Decimal> {
        Ok(self
            .scan()?
            .iter()
            .filter(|request| request.payment.is_settled())
            .map(|request| request.payment.amount.value())
            .sum())
    }

    async fn status_counts(&self) -> Result<HashMap<FulfillmentStatus, u64>> {
        let mut counts = HashMap::new();
        for request in self.scan()? {
            *counts.entry(request.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::{Decision, LifecycleEvent, decide};
    use crate::domain::request::fixtures::unpaid_request;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_REQUESTS).is_some());
        assert!(store.db.cf_handle(CF_REFERENCES).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_insert_and_lookup() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let request = unpaid_request("ICBB-2402-ABC123");

        let stored = store.insert(request.clone()).await.unwrap();
        assert_eq!(stored.version, 1);

        let by_id = store.get(request.id).await.unwrap().unwrap();
        assert_eq!(by_id, stored);
        let by_reference = store
            .get_by_reference(&request.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_reference.id, request.id);

        assert!(matches!(
            store.insert(unpaid_request("ICBB-2402-ABC123")).await,
            Err(TrackerError::DuplicateReference(_))
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_update_checks_version() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let stored = store
            .insert(unpaid_request("ICBB-2402-ABC123"))
            .await
            .unwrap();

        let event = LifecycleEvent::ConfirmPayment {
            transaction_id: "MP240210.1234.A12345".to_string(),
        };
        let Decision::Applied { request, .. } = decide(&stored, &event, Utc::now()).unwrap() else {
            panic!("confirm should apply");
        };

        let updated = store.update(request.clone()).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.status, FulfillmentStatus::Received);

        assert!(matches!(
            store.update(request).await,
            Err(TrackerError::Conflict {
                expected: 1,
                found: 2,
                ..
            })
        ));
        assert_eq!(store.revenue().await.unwrap(), dec!(700));
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        let request = unpaid_request("ICBB-2402-ABC123");
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.insert(request.clone()).await.unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        let page = store.list(&RequestFilter::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].reference, request.reference);
        assert_eq!(
            store
                .status_counts()
                .await
                .unwrap()
                .get(&FulfillmentStatus::PendingPayment),
            Some(&1)
        );
    }
}
