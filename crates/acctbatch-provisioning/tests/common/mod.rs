//! Integration test helpers for acctbatch-provisioning.
//!
//! Hand-written doubles for the directory, catalog, batch source,
//! acknowledger and record store, plus builders for a fully wired router.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;

use acctbatch_core::{
    AckResult, Acknowledger, AccountRequest, BatchLocation, BatchSource, CatalogError,
    CatalogResult, CustomResourceRequest, CustomResourceResponse, DirectoryAccount,
    DirectoryError, DirectoryResult, MemoryRecordStore, OrganizationDirectory, OrganizationalUnit,
    PortfolioSummary, ProductSummary, ProvisionRequest, ProvisioningCatalog, RecordStore,
    RequestFields, RequestStatus, SourceError, SourceResult, StoreError, StoreResult,
    WorkflowStatus,
};
use acctbatch_provisioning::{
    BatchValidator, DirectoryInspector, DispatchConfig, Dispatcher, EventRouter, PollConfig,
    StatusReconciler,
};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const HEADER: &str =
    "AccountName,AccountEmail,SSOUserEmail,SSOUserFirstName,SSOUserLastName,OrgUnit";

pub const PRINCIPAL_ARN: &str = "arn:aws:iam::123456789012:role/AccountBatchHandler";
pub const PROVIDER: &str = "AWS Control Tower";
pub const PRODUCT: &str = "AWS Control Tower Account Factory";

pub fn fields(name: &str, email: &str, org_unit: &str) -> RequestFields {
    RequestFields {
        account_name: name.to_string(),
        account_email: email.to_string(),
        sso_user_email: "owner@example.com".to_string(),
        sso_user_first_name: "Ada".to_string(),
        sso_user_last_name: "Lovelace".to_string(),
        org_unit: org_unit.to_string(),
    }
}

pub fn record(name: &str, status: RequestStatus) -> AccountRequest {
    AccountRequest::new(
        fields(name, &format!("{name}@example.com"), "Prod"),
        status,
        "",
    )
}

// =============================================================================
// Organization directory
// =============================================================================

/// Directory with a fixed OU tree (root `r-root`) and account list.
pub struct StaticDirectory {
    children: HashMap<String, Vec<OrganizationalUnit>>,
    accounts: Vec<DirectoryAccount>,
    failing: bool,
    pub child_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
}

impl StaticDirectory {
    /// Root with two OUs, `Prod` and `Dev` (id `ou-xyz1`).
    pub fn standard() -> Self {
        Self::new(&[("r-root", "ou-prod", "Prod"), ("r-root", "ou-xyz1", "Dev")])
    }

    pub fn new(edges: &[(&str, &str, &str)]) -> Self {
        let mut children: HashMap<String, Vec<OrganizationalUnit>> = HashMap::new();
        for (parent, id, name) in edges {
            children
                .entry((*parent).to_string())
                .or_default()
                .push(OrganizationalUnit {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                });
        }
        Self {
            children,
            accounts: Vec::new(),
            failing: false,
            child_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
        }
    }

    /// Directory whose account and OU listings are denied.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::standard()
        }
    }

    pub fn with_account(mut self, id: &str, name: &str, email: &str) -> Self {
        self.accounts.push(DirectoryAccount {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        });
        self
    }
}

#[async_trait]
impl OrganizationDirectory for StaticDirectory {
    async fn list_roots(&self) -> DirectoryResult<Vec<String>> {
        Ok(vec!["r-root".to_string()])
    }

    async fn list_child_units(&self, parent_id: &str) -> DirectoryResult<Vec<OrganizationalUnit>> {
        self.child_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(DirectoryError::query("list_organizational_units_for_parent", "AccessDenied"));
        }
        Ok(self.children.get(parent_id).cloned().unwrap_or_default())
    }

    async fn list_accounts(&self) -> DirectoryResult<Vec<DirectoryAccount>> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(DirectoryError::query("list_accounts", "AccessDenied"));
        }
        Ok(self.accounts.clone())
    }
}

// =============================================================================
// Provisioning catalog
// =============================================================================

/// Configuration for mock catalog provisioning behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionBehavior {
    Success,
    Reject,
    Unavailable,
}

/// Catalog with one Account Factory product shared by one portfolio.
pub struct FakeCatalog {
    principals: Mutex<Vec<String>>,
    provision_behavior: Mutex<ProvisionBehavior>,
    association_denied: bool,
    workflow_statuses: Mutex<VecDeque<WorkflowStatus>>,
    pub provisioned: Mutex<Vec<ProvisionRequest>>,
    pub provision_calls: AtomicUsize,
    pub associate_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            principals: Mutex::new(Vec::new()),
            provision_behavior: Mutex::new(ProvisionBehavior::Success),
            association_denied: false,
            workflow_statuses: Mutex::new(VecDeque::new()),
            provisioned: Mutex::new(Vec::new()),
            provision_calls: AtomicUsize::new(0),
            associate_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_principal(self, arn: &str) -> Self {
        self.principals.lock().unwrap().push(arn.to_string());
        self
    }

    pub fn rejecting(self) -> Self {
        self.with_behavior(ProvisionBehavior::Reject)
    }

    pub fn with_behavior(self, behavior: ProvisionBehavior) -> Self {
        *self.provision_behavior.lock().unwrap() = behavior;
        self
    }

    /// Catalog refusing to associate the principal with the portfolio.
    pub fn failing_association(mut self) -> Self {
        self.association_denied = true;
        self
    }

    /// Queue workflow statuses returned by successive status checks.
    /// Once drained, every check reports `UNDER_CHANGE`.
    pub fn with_workflow_statuses(self, statuses: &[(&str, Option<&str>)]) -> Self {
        {
            let mut queue = self.workflow_statuses.lock().unwrap();
            for (status, message) in statuses {
                queue.push_back(WorkflowStatus {
                    status: (*status).to_string(),
                    message: message.map(str::to_string),
                });
            }
        }
        self
    }

    pub fn provision_count(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }

    pub fn principals(&self) -> Vec<String> {
        self.principals.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProvisioningCatalog for FakeCatalog {
    async fn search_products(&self, owner: &str) -> CatalogResult<Vec<ProductSummary>> {
        if owner != PROVIDER {
            return Ok(vec![]);
        }
        Ok(vec![
            ProductSummary {
                id: "prod-other".to_string(),
                name: "Something Else".to_string(),
            },
            ProductSummary {
                id: "prod-factory".to_string(),
                name: PRODUCT.to_string(),
            },
        ])
    }

    async fn list_portfolios(&self, _product_id: &str) -> CatalogResult<Vec<PortfolioSummary>> {
        Ok(vec![
            PortfolioSummary {
                id: "port-unnamed".to_string(),
                provider_name: None,
            },
            PortfolioSummary {
                id: "port-ct".to_string(),
                provider_name: Some(PROVIDER.to_string()),
            },
        ])
    }

    async fn list_artifacts(&self, _product_id: &str) -> CatalogResult<Vec<String>> {
        Ok(vec!["pa-old".to_string(), "pa-latest".to_string()])
    }

    async fn list_principals(&self, _portfolio_id: &str) -> CatalogResult<Vec<String>> {
        Ok(self.principals())
    }

    async fn associate_principal(
        &self,
        _portfolio_id: &str,
        principal_arn: &str,
    ) -> CatalogResult<()> {
        self.associate_calls.fetch_add(1, Ordering::SeqCst);
        if self.association_denied {
            return Err(CatalogError::rejected(
                "associate_principal_with_portfolio",
                "AccessDenied",
            ));
        }
        self.principals.lock().unwrap().push(principal_arn.to_string());
        Ok(())
    }

    async fn provision(&self, request: &ProvisionRequest) -> CatalogResult<String> {
        let call = self.provision_calls.fetch_add(1, Ordering::SeqCst);
        self.provisioned.lock().unwrap().push(request.clone());
        match *self.provision_behavior.lock().unwrap() {
            ProvisionBehavior::Success => Ok(format!("pp-{call}")),
            ProvisionBehavior::Reject => Err(CatalogError::rejected(
                "provision_product",
                "Account email already in use",
            )),
            ProvisionBehavior::Unavailable => Err(CatalogError::unavailable(
                "provision_product",
                "ThrottlingException",
            )),
        }
    }

    async fn workflow_status(&self, _workflow_id: &str) -> CatalogResult<WorkflowStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .workflow_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WorkflowStatus {
                status: "UNDER_CHANGE".to_string(),
                message: None,
            }))
    }
}

// =============================================================================
// Batch source and acknowledger
// =============================================================================

/// Source returning fixed content, or failing.
pub struct StaticSource {
    content: Option<String>,
    pub fetch_calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            content: None,
            fetch_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BatchSource for StaticSource {
    async fn fetch(&self, location: &BatchLocation) -> SourceResult<String> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.content.clone().ok_or_else(|| SourceError::ReadFailed {
            location: location.to_string(),
            message: "NoSuchKey".to_string(),
        })
    }
}

/// Acknowledger that records every response.
#[derive(Default)]
pub struct RecordingAcknowledger {
    pub responses: Mutex<Vec<CustomResourceResponse>>,
}

#[async_trait]
impl Acknowledger for RecordingAcknowledger {
    async fn acknowledge(
        &self,
        _request: &CustomResourceRequest,
        response: &CustomResourceResponse,
    ) -> AckResult<()> {
        self.responses.lock().unwrap().push(response.clone());
        Ok(())
    }
}

// =============================================================================
// Record stores
// =============================================================================

/// Memory store whose listed conditional writes fail.
///
/// `failures` holds zero-based indexes of `put_if_status` calls.
pub struct FlakyStore {
    pub inner: MemoryRecordStore,
    failures: Vec<usize>,
    conditional_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryRecordStore, failures: &[usize]) -> Self {
        Self {
            inner,
            failures: failures.to_vec(),
            conditional_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, account_name: &str) -> StoreResult<Option<AccountRequest>> {
        self.inner.get(account_name).await
    }

    async fn scan(&self) -> StoreResult<Vec<AccountRequest>> {
        self.inner.scan().await
    }

    async fn put(&self, request: &AccountRequest) -> StoreResult<()> {
        self.inner.put(request).await
    }

    async fn put_if_status(
        &self,
        request: &AccountRequest,
        expected: &RequestStatus,
    ) -> StoreResult<bool> {
        let call = self.conditional_calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.contains(&call) {
            return Err(StoreError::unavailable("put_item", "ProvisionedThroughputExceeded"));
        }
        self.inner.put_if_status(request, expected).await
    }
}

/// Memory store that yields to the scheduler before every operation, so
/// concurrent callers interleave between their reads and writes.
pub struct YieldingStore {
    pub inner: MemoryRecordStore,
}

#[async_trait]
impl RecordStore for YieldingStore {
    async fn get(&self, account_name: &str) -> StoreResult<Option<AccountRequest>> {
        tokio::task::yield_now().await;
        self.inner.get(account_name).await
    }

    async fn scan(&self) -> StoreResult<Vec<AccountRequest>> {
        tokio::task::yield_now().await;
        self.inner.scan().await
    }

    async fn put(&self, request: &AccountRequest) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.put(request).await
    }

    async fn put_if_status(
        &self,
        request: &AccountRequest,
        expected: &RequestStatus,
    ) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        self.inner.put_if_status(request, expected).await
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub fn dispatch_config() -> DispatchConfig {
    DispatchConfig {
        principal_arn: PRINCIPAL_ARN.to_string(),
        catalog_provider: PROVIDER.to_string(),
        catalog_product: PRODUCT.to_string(),
        association_delay: Duration::ZERO,
        claim_timeout: Duration::from_secs(900),
    }
}

pub fn poll_config() -> PollConfig {
    PollConfig {
        attempts: 3,
        interval: Duration::ZERO,
    }
}

pub fn dispatcher(store: Arc<dyn RecordStore>, catalog: Arc<FakeCatalog>) -> Dispatcher {
    Dispatcher::new(store, catalog, dispatch_config())
}

pub fn reconciler(store: Arc<dyn RecordStore>, catalog: Arc<FakeCatalog>) -> StatusReconciler {
    StatusReconciler::new(store, catalog, poll_config())
}

/// Everything a router test needs to inspect afterwards.
pub struct Harness {
    pub router: EventRouter,
    pub directory: Arc<StaticDirectory>,
    pub store: Arc<MemoryRecordStore>,
    pub catalog: Arc<FakeCatalog>,
    pub source: Arc<StaticSource>,
    pub acknowledger: Arc<RecordingAcknowledger>,
}

impl Harness {
    pub fn new(
        directory: StaticDirectory,
        store: MemoryRecordStore,
        catalog: FakeCatalog,
        source: StaticSource,
    ) -> Self {
        let directory = Arc::new(directory);
        let store = Arc::new(store);
        let catalog = Arc::new(catalog);
        let source = Arc::new(source);
        let acknowledger = Arc::new(RecordingAcknowledger::default());

        let record_store: Arc<dyn RecordStore> = store.clone();
        let validator = BatchValidator::new(
            DirectoryInspector::new(directory.clone()),
            record_store.clone(),
        );
        let router = EventRouter::new(
            validator,
            Dispatcher::new(record_store.clone(), catalog.clone(), dispatch_config()),
            StatusReconciler::new(record_store, catalog.clone(), poll_config()),
            source.clone(),
            acknowledger.clone(),
            Some(BatchLocation::object("batch-bucket", "accounts.csv")),
        );

        Self {
            router,
            directory,
            store,
            catalog,
            source,
            acknowledger,
        }
    }

    pub fn acknowledgments(&self) -> Vec<CustomResourceResponse> {
        self.acknowledger.responses.lock().unwrap().clone()
    }
}
