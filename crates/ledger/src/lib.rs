pub use accounts::MemberAccount;
pub use config::LedgerConfig;
pub use entries::{EntryKind, LedgerEntry, OwnerType};
pub use error::LedgerError;
pub use funds::CashFund;
pub use money::Money;
pub use ops::{
    CreditCmd, DebitCmd, Drift, EntryMeta, Ledger, LedgerBuilder, MemberTransferOutcome, Posting,
    TransferOutcome,
};

mod accounts;
mod config;
mod entries;
mod error;
mod funds;
mod money;
mod ops;

type ResultLedger<T> = Result<T, LedgerError>;
