//! Batch Validator
//!
//! Classifies each batch row against the live directory and upserts the
//! result into the record store.
//!
//! Per row:
//! 1. every field must be supplied (not the literal `None`)
//! 2. a row whose email and name both match one existing account is
//!    `ALREADY_EXISTS` and is not written
//! 3. otherwise name length, email format, OU existence and email reuse are
//!    checked, and the row is written as `VALID` or `INVALID`
//!
//! The OU snapshot and account index are loaded once per batch.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use acctbatch_core::{AccountRequest, DirectoryError, RecordStore, RequestFields, RequestStatus};

use crate::batch::{parse_batch, BatchError, MISSING_VALUE};
use crate::directory::{AccountIndex, DirectoryInspector, OuSnapshot};

/// Maximum account name length accepted by the account factory.
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 50;

/// Minimum email length.
pub const MIN_EMAIL_LENGTH: usize = 7;

/// Separator used when persisting a row's error list as its message.
const MESSAGE_SEPARATOR: &str = "; ";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+").expect("EMAIL_RE is a valid regex pattern")
});

/// Errors that stop a whole validation run.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Batch rejected: {0}")]
    Batch(#[from] BatchError),

    #[error("Directory unavailable: {0}")]
    Directory(#[from] DirectoryError),
}

/// Result type for validation runs.
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Classification of a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowValidation {
    /// One of `VALID`, `INVALID` or `ALREADY_EXISTS`.
    pub status: RequestStatus,
    pub errors: Vec<String>,
}

impl RowValidation {
    /// Whether the row produces a record store write.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.status != RequestStatus::AlreadyExists
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.errors.join(MESSAGE_SEPARATOR)
    }
}

/// Validate one row against the directory views.
#[must_use]
pub fn validate_row(
    fields: &RequestFields,
    accounts: &AccountIndex,
    ous: &OuSnapshot,
) -> RowValidation {
    let mut errors: Vec<String> = fields
        .named_values()
        .iter()
        .filter(|(_, value)| *value == MISSING_VALUE)
        .map(|(name, _)| format!("{name} is a required field."))
        .collect();

    if accounts.matches_existing(&fields.account_email, &fields.account_name) {
        return RowValidation {
            status: RequestStatus::AlreadyExists,
            errors,
        };
    }

    if fields.account_name.chars().count() > MAX_ACCOUNT_NAME_LENGTH {
        errors.push(format!(
            "AccountName should be at most {MAX_ACCOUNT_NAME_LENGTH} characters."
        ));
    }
    for (name, email) in [
        ("AccountEmail", &fields.account_email),
        ("SSOUserEmail", &fields.sso_user_email),
    ] {
        if email.chars().count() < MIN_EMAIL_LENGTH {
            errors.push(format!(
                "{name} should be at least {MIN_EMAIL_LENGTH} characters."
            ));
        }
        if !EMAIL_RE.is_match(email) {
            errors.push(format!("{name} is not valid."));
        }
    }
    if !ous.contains_org_unit(&fields.org_unit) {
        errors.push(format!("OrgUnit {} is not valid.", fields.org_unit));
    }
    if accounts.email_in_use(&fields.account_email) {
        errors.push(format!(
            "Account email - {} in use by another account.",
            fields.account_email
        ));
    }

    let status = if errors.is_empty() {
        RequestStatus::Valid
    } else {
        RequestStatus::Invalid
    };

    RowValidation { status, errors }
}

/// What happened to one batch row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Valid,
    Invalid { errors: Vec<String> },
    AlreadyExists,
    /// The row could not be decoded.
    Unreadable { message: String },
}

/// Per-row entry of a [`BatchReport`].
#[derive(Debug, Clone, Serialize)]
pub struct RowReport {
    pub line_number: usize,
    pub account_name: Option<String>,
    #[serde(flatten)]
    pub outcome: RowOutcome,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
    /// Line of an earlier VALID row with the same account email and name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<usize>,
}

/// Summary of one validation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub rows: Vec<RowReport>,
    pub valid: usize,
    pub invalid: usize,
    pub already_exists: usize,
    pub duplicates: usize,
    pub unreadable: usize,
    pub writes: usize,
    pub write_failures: usize,
}

impl BatchReport {
    fn record(&mut self, row: RowReport) {
        match &row.outcome {
            RowOutcome::Valid => self.valid += 1,
            RowOutcome::Invalid { .. } => self.invalid += 1,
            RowOutcome::AlreadyExists => self.already_exists += 1,
            RowOutcome::Unreadable { .. } => self.unreadable += 1,
        }
        if row.duplicate_of.is_some() {
            self.duplicates += 1;
        }
        if row.written {
            self.writes += 1;
        }
        if row.write_error.is_some() {
            self.write_failures += 1;
        }
        self.rows.push(row);
    }
}

/// Validates batches and records the results.
pub struct BatchValidator {
    inspector: DirectoryInspector,
    store: Arc<dyn RecordStore>,
}

impl BatchValidator {
    pub fn new(inspector: DirectoryInspector, store: Arc<dyn RecordStore>) -> Self {
        Self { inspector, store }
    }

    /// Validate `content` and upsert every VALID / INVALID row.
    #[instrument(skip(self, content))]
    pub async fn validate_batch(&self, content: &str) -> ValidatorResult<BatchReport> {
        self.run(content, true).await
    }

    /// Classify `content` without writing anything.
    #[instrument(skip(self, content))]
    pub async fn classify_batch(&self, content: &str) -> ValidatorResult<BatchReport> {
        self.run(content, false).await
    }

    async fn run(&self, content: &str, persist: bool) -> ValidatorResult<BatchReport> {
        let batch = parse_batch(content)?;
        let accounts = self.inspector.account_index().await?;
        let ous = self.inspector.ou_snapshot().await?;

        info!(
            rows = batch.total_rows(),
            existing_accounts = accounts.len(),
            ous = ous.len(),
            persist,
            "Validating batch"
        );

        let mut report = BatchReport::default();
        // (account email, account name) of VALID rows -> first line
        let mut valid_rows: HashMap<(String, String), usize> = HashMap::new();

        for row_error in &batch.errors {
            warn!(line = row_error.line_number, error = %row_error.message, "Skipping unreadable row");
            report.record(RowReport {
                line_number: row_error.line_number,
                account_name: None,
                outcome: RowOutcome::Unreadable {
                    message: row_error.message.clone(),
                },
                written: false,
                write_error: None,
                duplicate_of: None,
            });
        }

        for row in batch.rows {
            let account_name = row.fields.account_name.clone();
            let validation = validate_row(&row.fields, &accounts, &ous);

            let outcome = match validation.status {
                RequestStatus::AlreadyExists => {
                    warn!(
                        account_name = %account_name,
                        account_email = %row.fields.account_email,
                        "Account already exists, leaving record untouched"
                    );
                    RowOutcome::AlreadyExists
                }
                RequestStatus::Valid => RowOutcome::Valid,
                _ => RowOutcome::Invalid {
                    errors: validation.errors.clone(),
                },
            };

            let mut written = false;
            let mut write_error = None;
            let mut duplicate_of = None;

            if matches!(outcome, RowOutcome::Valid | RowOutcome::Invalid { .. }) {
                let key = (row.fields.account_email.clone(), account_name.clone());
                duplicate_of = valid_rows.get(&key).copied();
                if let Some(first_line) = duplicate_of {
                    warn!(
                        account_name = %account_name,
                        account_email = %row.fields.account_email,
                        line = row.line_number,
                        first_line,
                        "Duplicate entry in batch"
                    );
                }
                if outcome == RowOutcome::Valid {
                    valid_rows.entry(key).or_insert(row.line_number);
                }
                info!(
                    account_name = %account_name,
                    status = %validation.status,
                    errors = ?validation.errors,
                    "Row validated"
                );

                if persist {
                    let request = AccountRequest::new(
                        row.fields,
                        validation.status.clone(),
                        validation.message(),
                    );
                    match self.store.put(&request).await {
                        Ok(()) => written = true,
                        Err(e) => {
                            error!(account_name = %account_name, error = %e, "Failed to record row");
                            write_error = Some(e.to_string());
                        }
                    }
                }
            }

            report.record(RowReport {
                line_number: row.line_number,
                account_name: Some(account_name),
                outcome,
                written,
                write_error,
                duplicate_of,
            });
        }
        report.rows.sort_by_key(|r| r.line_number);

        if report.invalid > 0 {
            warn!(invalid = report.invalid, "Batch contains INVALID entries");
        }
        info!(
            valid = report.valid,
            invalid = report.invalid,
            already_exists = report.already_exists,
            duplicates = report.duplicates,
            unreadable = report.unreadable,
            writes = report.writes,
            "Batch validation finished"
        );

        Ok(report)
    }
}
