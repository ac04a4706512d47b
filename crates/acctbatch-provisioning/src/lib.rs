//! # Account Provisioning Engine
//!
//! Batch validation, sequential dispatch and status reconciliation for
//! cloud account provisioning.
//!
//! This crate provides:
//! - CSV batch parsing and per-row validation against the organization directory
//! - One-at-a-time dispatch of VALID requests to the provisioning catalog
//! - Lifecycle reconciliation and early-failure polling
//! - Event routing for the handler entry point
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ Initial Load │────►│ BatchValidator│────►│ Record Store │
//! └──────────────┘     └───────────────┘     └──────┬───────┘
//!                                                   │ change events
//!                                                   ▼
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │  Lifecycle   │────►│  Reconciler   │     │  Dispatcher  │────► Catalog
//! │    Event     │     └───────────────┘     └──────────────┘
//! └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use acctbatch_provisioning::{EventRouter, RouteOutcome};
//!
//! let outcome = router.route(serde_json::from_str(&payload)?).await?;
//! if let RouteOutcome::Ignored { reason } = outcome {
//!     tracing::warn!(%reason, "event ignored");
//! }
//! ```

pub mod batch;
pub mod directory;
pub mod dispatcher;
pub mod events;
pub mod reconciler;
pub mod router;
pub mod validator;

pub use batch::{parse_batch, BatchError, BatchRow, ParsedBatch, RowError, MISSING_VALUE};
pub use directory::{strip_ou_suffix, AccountIndex, DirectoryInspector, OuSnapshot};
pub use dispatcher::{
    provisioning_parameters, BatchSummary, CatalogTarget, DispatchClaim, DispatchConfig,
    DispatchError, DispatchOutcome, DispatchResult, Dispatcher,
};
pub use events::{
    EventError, InboundEvent, LifecycleEvent, ManagedAccount, ManagedAccountStatus,
    StoreChange, StoreMutationEvent,
};
pub use reconciler::{
    PollConfig, PollOutcome, ReconcileError, ReconcileOutcome, ReconcileResult, StatusReconciler,
};
pub use router::{DispatchReport, EventRouter, RouteOutcome, RouterError, RouterResult};
pub use validator::{
    validate_row, BatchReport, BatchValidator, RowOutcome, RowReport, RowValidation,
    ValidatorError, ValidatorResult,
};
