use sea_orm::DatabaseConnection;

use crate::{LedgerConfig, LedgerError, Money, ResultLedger};

mod access;
mod accounts;
mod fund;
mod reconcile;

pub use accounts::{CreditCmd, DebitCmd, Posting};
pub use fund::{MemberTransferOutcome, TransferOutcome};
pub use reconcile::Drift;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The member financial ledger.
///
/// All balance mutations go through the operations on this struct; each one
/// is a single DB transaction that updates the owner balance row and appends
/// the matching [`LedgerEntry`](crate::LedgerEntry) atomically. The stored
/// balance column is authoritative; the entry history exists to audit and
/// reconcile it (see [`Ledger::drift_report`]).
#[derive(Debug)]
pub struct Ledger {
    database: DatabaseConnection,
    config: LedgerConfig,
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }
}

/// Optional free-form metadata attached to an entry.
#[derive(Clone, Debug, Default)]
pub struct EntryMeta {
    pub description: Option<String>,
    /// Correlation key for idempotency lookups and search. Transfer
    /// operations stamp the same reference on both legs.
    pub reference: Option<String>,
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn normalize_meta(meta: &EntryMeta) -> (Option<String>, Option<String>) {
    (
        normalize_optional_text(meta.description.as_deref()),
        normalize_optional_text(meta.reference.as_deref()),
    )
}

fn require_positive(amount: Money, label: &str) -> ResultLedger<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(format!(
            "{label} amount must be > 0, got {amount}"
        )));
    }
    Ok(())
}

fn normalize_required_id(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// The builder for `Ledger`
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
    config: LedgerConfig,
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Override the default policy (overdraft, lock wait).
    pub fn config(mut self, config: LedgerConfig) -> LedgerBuilder {
        self.config = config;
        self
    }

    /// Construct `Ledger`
    pub async fn build(self) -> ResultLedger<Ledger> {
        Ok(Ledger {
            database: self.database,
            config: self.config,
        })
    }
}
