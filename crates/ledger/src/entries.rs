//! Ledger entries.
//!
//! A [`LedgerEntry`] is one immutable, append-only record of a balance
//! change on an owner (a member account or the club cash fund). Amounts are
//! stored as **non-negative** integer minor units; the direction is implied
//! by [`EntryKind`]. Each row also snapshots the owner balance right after
//! the change (`resulting_balance`), which is what makes drift detection
//! possible without trusting the balance column.
//!
//! In the ledger, *every* change to balances happens via entries.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Money};

/// Which balance table an entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    MemberAccount,
    CashFund,
}

impl OwnerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemberAccount => "member_account",
            Self::CashFund => "cash_fund",
        }
    }
}

impl TryFrom<&str> for OwnerType {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "member_account" => Ok(Self::MemberAccount),
            "cash_fund" => Ok(Self::CashFund),
            other => Err(LedgerError::CorruptRow(format!(
                "unknown owner type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for OwnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Credit,
    Debit,
    TransferIn,
    TransferOut,
    FundAdd,
    FundRemove,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::FundAdd => "fund_add",
            Self::FundRemove => "fund_remove",
        }
    }

    /// Returns `true` when the kind increases the owner balance.
    pub fn is_inflow(self) -> bool {
        matches!(self, Self::Credit | Self::TransferIn | Self::FundAdd)
    }

    /// Applies the kind's direction to a non-negative amount.
    pub fn signed(self, amount: Money) -> Money {
        if self.is_inflow() { amount } else { -amount }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "transfer_in" => Ok(Self::TransferIn),
            "transfer_out" => Ok(Self::TransferOut),
            "fund_add" => Ok(Self::FundAdd),
            "fund_remove" => Ok(Self::FundRemove),
            other => Err(LedgerError::CorruptRow(format!(
                "unknown entry kind: {other}"
            ))),
        }
    }
}

/// One committed balance change, as read back from the history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Monotonic id assigned at insert; per-owner history order.
    pub id: i64,
    pub owner_type: OwnerType,
    pub owner_id: String,
    pub club_id: String,
    pub kind: EntryKind,
    /// Always non-negative; direction comes from `kind`.
    pub amount: Money,
    /// Owner balance immediately after this entry.
    pub resulting_balance: Money,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The amount with the kind's direction applied; summing these over an
    /// owner's history recomputes its balance.
    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_type: String,
    pub owner_id: String,
    pub club_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub resulting_balance_minor: i64,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub actor_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner_type: OwnerType::try_from(model.owner_type.as_str())?,
            owner_id: model.owner_id,
            club_id: model.club_id,
            kind: EntryKind::try_from(model.kind.as_str())?,
            amount: Money::from_minor(model.amount_minor),
            resulting_balance: Money::from_minor(model.resulting_balance_minor),
            description: model.description,
            reference: model.reference,
            actor_id: model.actor_id,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_as_str() {
        for kind in [
            EntryKind::Credit,
            EntryKind::Debit,
            EntryKind::TransferIn,
            EntryKind::TransferOut,
            EntryKind::FundAdd,
            EntryKind::FundRemove,
        ] {
            assert_eq!(EntryKind::try_from(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_stored_strings_are_corrupt_not_retryable() {
        let err = EntryKind::try_from("withdrawal").unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRow(_)));
        assert!(!err.is_retryable());

        let err = OwnerType::try_from("bank_account").unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRow(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn signed_amount_follows_kind() {
        let amount = Money::from_minor(500);
        assert_eq!(EntryKind::Credit.signed(amount), amount);
        assert_eq!(EntryKind::TransferIn.signed(amount), amount);
        assert_eq!(EntryKind::FundAdd.signed(amount), amount);
        assert_eq!(EntryKind::Debit.signed(amount), -amount);
        assert_eq!(EntryKind::TransferOut.signed(amount), -amount);
        assert_eq!(EntryKind::FundRemove.signed(amount), -amount);
    }
}
