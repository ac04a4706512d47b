//! Record store capability.
//!
//! The store holds one [`AccountRequest`] per account name. Backends only
//! provide keyed reads, full scans, upserts and a status-conditioned put;
//! the conditional read-modify-write helper is a default method.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::request::{AccountRequest, RequestStatus, StatusUpdate};

/// Typed access to the account request table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a single record by account name.
    async fn get(&self, account_name: &str) -> StoreResult<Option<AccountRequest>>;

    /// Return every record. Order is backend-defined.
    async fn scan(&self) -> StoreResult<Vec<AccountRequest>>;

    /// Insert or overwrite the record keyed by the request's account name.
    async fn put(&self, request: &AccountRequest) -> StoreResult<()>;

    /// Overwrite the record only if its stored status equals `expected`.
    ///
    /// Returns `Ok(false)` when the record is missing or its status differs.
    async fn put_if_status(
        &self,
        request: &AccountRequest,
        expected: &RequestStatus,
    ) -> StoreResult<bool>;

    /// Apply `update` only if the record is currently in `expected`.
    ///
    /// Returns `Ok(false)` when the record is missing or another writer
    /// moved it out of `expected` first.
    async fn transition(
        &self,
        account_name: &str,
        expected: &RequestStatus,
        update: StatusUpdate,
    ) -> StoreResult<bool> {
        let Some(mut request) = self.get(account_name).await? else {
            return Ok(false);
        };
        if &request.status != expected {
            return Ok(false);
        }
        request.apply(update);
        self.put_if_status(&request, expected).await
    }
}

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryRecordStore;

#[cfg(any(test, feature = "testing"))]
mod memory {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    use async_trait::async_trait;

    use super::RecordStore;
    use crate::error::{StoreError, StoreResult};
    use crate::request::{AccountRequest, RequestStatus};

    /// In-memory store ordered by account name. Counts successful writes.
    #[derive(Debug, Default)]
    pub struct MemoryRecordStore {
        records: RwLock<BTreeMap<String, AccountRequest>>,
        writes: AtomicUsize,
    }

    impl MemoryRecordStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Store seeded with `records`; seeding does not count as writes.
        #[must_use]
        pub fn with_records(records: impl IntoIterator<Item = AccountRequest>) -> Self {
            let map = records
                .into_iter()
                .map(|r| (r.account_name().to_string(), r))
                .collect();
            Self {
                records: RwLock::new(map),
                writes: AtomicUsize::new(0),
            }
        }

        /// Number of successful `put` / `put_if_status` calls.
        #[must_use]
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Copy of all records in key order.
        #[must_use]
        pub fn snapshot(&self) -> Vec<AccountRequest> {
            self.records
                .read()
                .map(|r| r.values().cloned().collect())
                .unwrap_or_default()
        }

        fn poisoned(operation: &str) -> StoreError {
            StoreError::unavailable(operation, "lock poisoned")
        }
    }

    #[async_trait]
    impl RecordStore for MemoryRecordStore {
        async fn get(&self, account_name: &str) -> StoreResult<Option<AccountRequest>> {
            let records = self.records.read().map_err(|_| Self::poisoned("get"))?;
            Ok(records.get(account_name).cloned())
        }

        async fn scan(&self) -> StoreResult<Vec<AccountRequest>> {
            let records = self.records.read().map_err(|_| Self::poisoned("scan"))?;
            Ok(records.values().cloned().collect())
        }

        async fn put(&self, request: &AccountRequest) -> StoreResult<()> {
            let mut records = self.records.write().map_err(|_| Self::poisoned("put"))?;
            records.insert(request.account_name().to_string(), request.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn put_if_status(
            &self,
            request: &AccountRequest,
            expected: &RequestStatus,
        ) -> StoreResult<bool> {
            let mut records = self
                .records
                .write()
                .map_err(|_| Self::poisoned("put_if_status"))?;
            match records.get_mut(request.account_name()) {
                Some(current) if &current.status == expected => {
                    *current = request.clone();
                    self.writes.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }
}
