//! Provisioning Dispatcher
//!
//! Moves the pipeline forward by at most one request per call. A record is
//! claimed with a conditional VALID -> DISPATCHING write before it is
//! submitted, so two invocations racing on the same scan cannot both submit
//! it. While any record is in flight the dispatcher does nothing.
//!
//! The claim carries the submission's idempotency token. A claim older than
//! the configured timeout belongs to an invocation that never finished, and
//! is resubmitted with the same token; a submission that did reach the
//! catalog is not started twice. Once the catalog accepts a submission the
//! record moves to IN_PROGRESS.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use acctbatch_core::{
    AccountRequest, CatalogError, HandlerConfig, ProvisionRequest, ProvisioningCatalog,
    ProvisioningParameter, RecordStore, RequestFields, RequestStatus, StatusUpdate, StoreError,
};

/// Prefix of the provisioned product name; the account name follows.
pub const PROVISIONED_PRODUCT_PREFIX: &str = "AccountLaunch-";

const CLAIM_TOKEN_PREFIX: &str = "Dispatching, token ";
const CLAIM_TIME_SEPARATOR: &str = ", claimed at ";

/// Dispatcher errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Record store error.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Catalog lookup failed before anything was submitted.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The principal could not be associated with the portfolio.
    #[error("Failed to associate principal with portfolio {portfolio_id}: {source}")]
    Association {
        portfolio_id: String,
        #[source]
        source: CatalogError,
    },
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Principal that launches the account factory product.
    pub principal_arn: String,
    /// Owner of the product and provider of its portfolio.
    pub catalog_provider: String,
    /// Product name.
    pub catalog_product: String,
    /// Wait after creating a new principal association.
    pub association_delay: Duration,
    /// Age after which a DISPATCHING claim is resubmitted.
    pub claim_timeout: Duration,
}

impl From<&HandlerConfig> for DispatchConfig {
    fn from(config: &HandlerConfig) -> Self {
        Self {
            principal_arn: config.principal_arn.clone(),
            catalog_provider: config.catalog_provider.clone(),
            catalog_product: config.catalog_product.clone(),
            association_delay: config.association_delay,
            claim_timeout: config.claim_timeout,
        }
    }
}

/// Claim stored as the message of a DISPATCHING record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchClaim {
    /// Idempotency token of the submission.
    pub token: String,
    pub claimed_at: DateTime<Utc>,
}

impl DispatchClaim {
    /// New claim with a fresh token.
    #[must_use]
    pub fn new(claimed_at: DateTime<Utc>) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            claimed_at,
        }
    }

    #[must_use]
    pub fn to_message(&self) -> String {
        format!(
            "{CLAIM_TOKEN_PREFIX}{}{CLAIM_TIME_SEPARATOR}{}",
            self.token,
            self.claimed_at.to_rfc3339()
        )
    }

    /// Read a claim back from a record message.
    #[must_use]
    pub fn parse(message: &str) -> Option<Self> {
        let rest = message.strip_prefix(CLAIM_TOKEN_PREFIX)?;
        let (token, claimed_at) = rest.split_once(CLAIM_TIME_SEPARATOR)?;
        let claimed_at = DateTime::parse_from_rfc3339(claimed_at)
            .ok()?
            .with_timezone(&Utc);
        Some(Self {
            token: token.to_string(),
            claimed_at,
        })
    }

    /// Whether the claim is at least `timeout` old at `now`.
    #[must_use]
    pub fn is_expired(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        (now - self.claimed_at)
            .to_std()
            .is_ok_and(|age| age >= timeout)
    }
}

/// Catalog identifiers needed to launch the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTarget {
    pub product_id: String,
    pub portfolio_id: String,
    pub artifact_id: String,
}

/// Audit summary logged once no VALID record remains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<String>,
    /// Every record not SUCCEEDED, INVALID ones included.
    pub not_succeeded: Vec<String>,
    pub invalid: Vec<String>,
}

impl BatchSummary {
    #[must_use]
    pub fn from_records(records: &[AccountRequest]) -> Self {
        let mut summary = Self::default();
        for record in records {
            let name = record.account_name().to_string();
            if record.status == RequestStatus::Succeeded {
                summary.succeeded.push(name);
                continue;
            }
            if record.status == RequestStatus::Invalid {
                summary.invalid.push(name.clone());
            }
            summary.not_succeeded.push(name);
        }
        summary
    }

    fn log(&self) {
        info!(
            succeeded = self.succeeded.len(),
            accounts = ?self.succeeded,
            "Provisioning the batch completed: SUCCESS entries"
        );
        info!(
            not_succeeded = self.not_succeeded.len(),
            accounts = ?self.not_succeeded,
            "TOTAL FAILED entries"
        );
        if !self.invalid.is_empty() {
            warn!(
                invalid = self.invalid.len(),
                not_succeeded = self.not_succeeded.len(),
                accounts = ?self.invalid,
                "Entries failed due to INVALID input"
            );
        }
    }
}

/// Result of one `provision_next` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A provisioning workflow was started.
    Dispatched {
        account_name: String,
        workflow_id: String,
    },
    /// The catalog refused the submission; recorded as NOT_PROVISIONED.
    Rejected {
        account_name: String,
        message: String,
    },
    /// Another request is still in flight.
    Busy { account_name: String },
    /// A concurrent invocation claimed the record first.
    Contended { account_name: String },
    /// No VALID record remains.
    BatchComplete(BatchSummary),
}

/// Submits VALID requests to the catalog one at a time.
pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
    catalog: Arc<dyn ProvisioningCatalog>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RecordStore>,
        catalog: Arc<dyn ProvisioningCatalog>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Dispatch the next VALID request, if any.
    #[instrument(skip(self))]
    pub async fn provision_next(&self) -> DispatchResult<DispatchOutcome> {
        let records = self.store.scan().await?;
        let now = Utc::now();

        let mut stale = None;
        for record in records.iter().filter(|r| r.status.is_in_flight()) {
            match self.stale_claim(record, now) {
                Some(claim) => {
                    stale.get_or_insert((record, claim));
                }
                None => {
                    info!(
                        account_name = %record.account_name(),
                        status = %record.status,
                        "Provisioning already in flight, not dispatching"
                    );
                    return Ok(DispatchOutcome::Busy {
                        account_name: record.account_name().to_string(),
                    });
                }
            }
        }

        if let Some((record, claim)) = stale {
            return self.resubmit(record, claim).await;
        }

        let Some(candidate) = records.iter().find(|r| r.status == RequestStatus::Valid) else {
            info!("No more accounts found to provision");
            let summary = BatchSummary::from_records(&records);
            summary.log();
            return Ok(DispatchOutcome::BatchComplete(summary));
        };

        let target = self.resolve_target().await?;
        self.ensure_association(&target.portfolio_id).await?;

        let account_name = candidate.account_name();
        let claim = DispatchClaim::new(Utc::now());
        let claimed = self
            .store
            .transition(
                account_name,
                &RequestStatus::Valid,
                StatusUpdate::new(RequestStatus::Dispatching, claim.to_message()),
            )
            .await?;
        if !claimed {
            warn!(account_name = %account_name, "Record claimed by another invocation, backing off");
            return Ok(DispatchOutcome::Contended {
                account_name: account_name.to_string(),
            });
        }

        self.submit(&candidate.fields, &target, &claim).await
    }

    /// The record's claim, if it is DISPATCHING under a claim past the timeout.
    fn stale_claim(&self, record: &AccountRequest, now: DateTime<Utc>) -> Option<DispatchClaim> {
        if record.status != RequestStatus::Dispatching {
            return None;
        }
        let Some(claim) = DispatchClaim::parse(&record.message) else {
            warn!(
                account_name = %record.account_name(),
                "DISPATCHING record carries no readable claim"
            );
            return None;
        };
        claim
            .is_expired(self.config.claim_timeout, now)
            .then_some(claim)
    }

    /// Take over a stale claim and submit again with its token.
    async fn resubmit(
        &self,
        record: &AccountRequest,
        claim: DispatchClaim,
    ) -> DispatchResult<DispatchOutcome> {
        let account_name = record.account_name();
        warn!(
            account_name = %account_name,
            claimed_at = %claim.claimed_at,
            "Resubmitting stale dispatch claim"
        );

        let target = self.resolve_target().await?;
        self.ensure_association(&target.portfolio_id).await?;

        let refreshed = DispatchClaim {
            token: claim.token,
            claimed_at: Utc::now(),
        };
        let claimed = self
            .store
            .transition(
                account_name,
                &RequestStatus::Dispatching,
                StatusUpdate::new(RequestStatus::Dispatching, refreshed.to_message()),
            )
            .await?;
        if !claimed {
            return Ok(DispatchOutcome::Contended {
                account_name: account_name.to_string(),
            });
        }

        self.submit(&record.fields, &target, &refreshed).await
    }

    /// Resolve product, portfolio and latest provisioning artifact.
    #[instrument(skip(self))]
    pub async fn resolve_target(&self) -> DispatchResult<CatalogTarget> {
        let provider = &self.config.catalog_provider;
        let product_name = &self.config.catalog_product;

        let product = self
            .catalog
            .search_products(provider)
            .await?
            .into_iter()
            .find(|p| &p.name == product_name)
            .ok_or_else(|| CatalogError::not_found("product", product_name.clone()))?;

        let portfolios = self.catalog.list_portfolios(&product.id).await?;
        for skipped in portfolios.iter().filter(|p| p.provider_name.is_none()) {
            debug!(portfolio_id = %skipped.id, "Portfolio without provider name, skipping");
        }
        let portfolio = portfolios
            .into_iter()
            .find(|p| p.provider_name.as_deref() == Some(provider.as_str()))
            .ok_or_else(|| CatalogError::not_found("portfolio", provider.clone()))?;

        let artifact_id = self
            .catalog
            .list_artifacts(&product.id)
            .await?
            .pop()
            .ok_or_else(|| CatalogError::not_found("provisioning artifact", product.id.clone()))?;

        debug!(
            product_id = %product.id,
            portfolio_id = %portfolio.id,
            artifact_id = %artifact_id,
            "Resolved catalog target"
        );

        Ok(CatalogTarget {
            product_id: product.id,
            portfolio_id: portfolio.id,
            artifact_id,
        })
    }

    /// Associate the configured principal with `portfolio_id` unless it already is.
    ///
    /// Returns `true` when a new association was created (after waiting
    /// the propagation delay).
    #[instrument(skip(self))]
    pub async fn ensure_association(&self, portfolio_id: &str) -> DispatchResult<bool> {
        let association_error = |source| DispatchError::Association {
            portfolio_id: portfolio_id.to_string(),
            source,
        };

        let principals = self
            .catalog
            .list_principals(portfolio_id)
            .await
            .map_err(association_error)?;
        if principals.iter().any(|p| p == &self.config.principal_arn) {
            debug!(principal = %self.config.principal_arn, "Principal already associated");
            return Ok(false);
        }

        self.catalog
            .associate_principal(portfolio_id, &self.config.principal_arn)
            .await
            .map_err(association_error)?;

        info!(
            principal = %self.config.principal_arn,
            portfolio_id = %portfolio_id,
            delay_secs = self.config.association_delay.as_secs(),
            "Associated principal with portfolio, waiting for propagation"
        );
        tokio::time::sleep(self.config.association_delay).await;
        Ok(true)
    }

    async fn submit(
        &self,
        fields: &RequestFields,
        target: &CatalogTarget,
        claim: &DispatchClaim,
    ) -> DispatchResult<DispatchOutcome> {
        let account_name = fields.account_name.clone();
        let request = ProvisionRequest {
            product_id: target.product_id.clone(),
            artifact_id: target.artifact_id.clone(),
            provisioned_product_name: format!("{PROVISIONED_PRODUCT_PREFIX}{account_name}"),
            parameters: provisioning_parameters(fields),
            token: claim.token.clone(),
        };

        match self.catalog.provision(&request).await {
            Ok(workflow_id) => {
                info!(
                    account_name = %account_name,
                    workflow_id = %workflow_id,
                    "Submitted provisioning request"
                );
                self.record_submission(&account_name, &workflow_id).await;
                Ok(DispatchOutcome::Dispatched {
                    account_name,
                    workflow_id,
                })
            }
            Err(e) if e.is_transient() => {
                warn!(
                    account_name = %account_name,
                    error = %e,
                    "Catalog unavailable, keeping the claim for resubmission"
                );
                Err(e.into())
            }
            Err(e) => {
                let message = e.to_string();
                error!(account_name = %account_name, error = %message, "Catalog provisioning failed");
                let recorded = self
                    .store
                    .transition(
                        &account_name,
                        &RequestStatus::Dispatching,
                        StatusUpdate::not_provisioned(message.clone()),
                    )
                    .await?;
                if !recorded {
                    warn!(account_name = %account_name, "Record left DISPATCHING before the rejection was recorded");
                }
                Ok(DispatchOutcome::Rejected {
                    account_name,
                    message,
                })
            }
        }
    }

    /// Move the claimed record to IN_PROGRESS.
    ///
    /// A failed write leaves the claim in place; its resubmission reuses the
    /// token, so the catalog returns the same workflow.
    async fn record_submission(&self, account_name: &str, workflow_id: &str) {
        let update = StatusUpdate::new(
            RequestStatus::InProgress,
            format!("Provisioned product {workflow_id} submitted"),
        );
        match self
            .store
            .transition(account_name, &RequestStatus::Dispatching, update)
            .await
        {
            Ok(true) => debug!(account_name = %account_name, "Record moved to IN_PROGRESS"),
            Ok(false) => debug!(account_name = %account_name, "Record already advanced"),
            Err(e) => error!(
                account_name = %account_name,
                workflow_id = %workflow_id,
                error = %e,
                "Failed to record submission, claim left for resubmission"
            ),
        }
    }
}

/// Workflow parameters for one request.
#[must_use]
pub fn provisioning_parameters(fields: &RequestFields) -> Vec<ProvisioningParameter> {
    vec![
        ProvisioningParameter::new("SSOUserEmail", &fields.sso_user_email),
        ProvisioningParameter::new("SSOUserFirstName", &fields.sso_user_first_name),
        ProvisioningParameter::new("SSOUserLastName", &fields.sso_user_last_name),
        ProvisioningParameter::new("ManagedOrganizationalUnit", &fields.org_unit),
        ProvisioningParameter::new("AccountName", &fields.account_name),
        ProvisioningParameter::new("AccountEmail", &fields.account_email),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctbatch_core::{AccountId, RequestFields};

    fn record(name: &str, status: RequestStatus) -> AccountRequest {
        let mut request = AccountRequest::new(
            RequestFields {
                account_name: name.to_string(),
                account_email: format!("{name}@example.com"),
                sso_user_email: "owner@example.com".to_string(),
                sso_user_first_name: "Ada".to_string(),
                sso_user_last_name: "Lovelace".to_string(),
                org_unit: "Prod".to_string(),
            },
            status,
            "",
        );
        request.account_id = AccountId::Unknown;
        request
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            record("a", RequestStatus::Succeeded),
            record("b", RequestStatus::Invalid),
            record("c", RequestStatus::NotProvisioned),
            record("d", RequestStatus::Failed),
        ];
        let summary = BatchSummary::from_records(&records);
        assert_eq!(summary.succeeded, vec!["a"]);
        assert_eq!(summary.not_succeeded, vec!["b", "c", "d"]);
        assert_eq!(summary.invalid, vec!["b"]);
    }

    #[test]
    fn test_claim_message_round_trip() {
        let claim = DispatchClaim::new(Utc::now());
        let parsed = DispatchClaim::parse(&claim.to_message()).unwrap();
        assert_eq!(parsed.token, claim.token);
        assert_eq!(parsed.claimed_at.timestamp(), claim.claimed_at.timestamp());
        assert!(DispatchClaim::parse("").is_none());
        assert!(DispatchClaim::parse("Provisioned product pp-1 submitted").is_none());
    }

    #[test]
    fn test_claim_expiry() {
        let claimed_at = Utc::now();
        let claim = DispatchClaim::new(claimed_at);
        let timeout = Duration::from_secs(900);
        assert!(!claim.is_expired(timeout, claimed_at + chrono::Duration::seconds(60)));
        assert!(claim.is_expired(timeout, claimed_at + chrono::Duration::seconds(900)));
        assert!(!claim.is_expired(timeout, claimed_at - chrono::Duration::seconds(5)));
    }

    #[test]
    fn test_parameters_carry_every_field() {
        let params = provisioning_parameters(&record("acme-01", RequestStatus::Valid).fields);
        let keys: Vec<_> = params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "SSOUserEmail",
                "SSOUserFirstName",
                "SSOUserLastName",
                "ManagedOrganizationalUnit",
                "AccountName",
                "AccountEmail",
            ]
        );
        assert_eq!(params[3].value, "Prod");
        assert_eq!(params[4].value, "acme-01");
    }
}
