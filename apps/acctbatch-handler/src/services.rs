//! Service wiring: AWS adapters behind the engine's capability traits.

use std::sync::Arc;

use acctbatch_aws::{
    load_sdk_config, BatchFetcher, CfnResponder, DynamoRecordStore, OrganizationsDirectory,
    ServiceCatalog,
};
use acctbatch_core::{
    Acknowledger, BatchSource, HandlerConfig, OrganizationDirectory, ProvisioningCatalog,
    RecordStore,
};
use acctbatch_provisioning::{
    BatchValidator, DirectoryInspector, DispatchConfig, Dispatcher, EventRouter, PollConfig,
    StatusReconciler,
};

/// Every external service the handler talks to.
pub struct Services {
    pub directory: Arc<dyn OrganizationDirectory>,
    pub store: Arc<dyn RecordStore>,
    pub catalog: Arc<dyn ProvisioningCatalog>,
    pub source: Arc<dyn BatchSource>,
    pub acknowledger: Arc<dyn Acknowledger>,
}

impl Services {
    /// Build the AWS-backed services for `config`.
    pub async fn from_config(config: &HandlerConfig) -> Self {
        let sdk_config = load_sdk_config(config.region.as_deref()).await;

        tracing::info!(
            table = %config.table_name,
            batch_location = ?config.batch_location.as_ref().map(ToString::to_string),
            "Services initialized"
        );

        Self {
            directory: Arc::new(OrganizationsDirectory::new(&sdk_config)),
            store: Arc::new(DynamoRecordStore::new(&sdk_config, &config.table_name)),
            catalog: Arc::new(ServiceCatalog::new(&sdk_config)),
            source: Arc::new(BatchFetcher::new(&sdk_config)),
            acknowledger: Arc::new(CfnResponder::new()),
        }
    }

    pub fn validator(&self) -> BatchValidator {
        BatchValidator::new(
            DirectoryInspector::new(self.directory.clone()),
            self.store.clone(),
        )
    }

    pub fn dispatcher(&self, config: &HandlerConfig) -> Dispatcher {
        Dispatcher::new(
            self.store.clone(),
            self.catalog.clone(),
            DispatchConfig::from(config),
        )
    }

    pub fn reconciler(&self, config: &HandlerConfig) -> StatusReconciler {
        StatusReconciler::new(
            self.store.clone(),
            self.catalog.clone(),
            PollConfig::from(config),
        )
    }

    pub fn router(&self, config: &HandlerConfig) -> EventRouter {
        EventRouter::new(
            self.validator(),
            self.dispatcher(config),
            self.reconciler(config),
            self.source.clone(),
            self.acknowledger.clone(),
            config.batch_location.clone(),
        )
    }
}
