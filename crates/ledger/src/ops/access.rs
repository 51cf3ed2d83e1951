//! Store-level helpers: row locks, point reads, balance writes and the
//! append of history rows.
//!
//! Everything here runs against an open [`DatabaseTransaction`]; the public
//! operations own the transaction boundary via `with_tx!`. Lock acquisition
//! is bounded by [`LedgerConfig::lock_wait`](crate::LedgerConfig); on expiry
//! the transaction is dropped, which rolls it back, so a `LockTimeout` never
//! leaves partial state behind.

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QuerySelect, prelude::*};
use tokio::time::timeout;

use crate::{
    EntryKind, LedgerError, Money, OwnerType, ResultLedger, accounts, entries, funds,
};

use super::Ledger;

/// A history row about to be appended.
pub(super) struct NewEntry<'a> {
    pub owner_type: OwnerType,
    pub owner_id: &'a str,
    pub club_id: &'a str,
    pub kind: EntryKind,
    pub amount: Money,
    pub resulting_balance: Money,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub actor_id: &'a str,
}

impl Ledger {
    /// Acquires the member account row for update, serializing concurrent
    /// mutations of the same account.
    ///
    /// Row locks are a no-op on sqlite (the whole database serializes
    /// writers there); on server backends this issues `SELECT ... FOR
    /// UPDATE`.
    pub(super) async fn lock_account(
        &self,
        db_tx: &DatabaseTransaction,
        club_id: &str,
        member_id: &str,
    ) -> ResultLedger<accounts::Model> {
        let query = accounts::Entity::find_by_id((club_id.to_string(), member_id.to_string()))
            .lock_exclusive()
            .one(db_tx);
        timeout(self.config.lock_wait, query)
            .await
            .map_err(|_| {
                LedgerError::LockTimeout(format!("member account {club_id}/{member_id}"))
            })??
            .ok_or_else(|| {
                LedgerError::AccountNotFound(format!("member account {club_id}/{member_id}"))
            })
    }

    /// Acquires the club's cash fund row for update.
    pub(super) async fn lock_fund(
        &self,
        db_tx: &DatabaseTransaction,
        club_id: &str,
    ) -> ResultLedger<funds::Model> {
        let query = funds::Entity::find_by_id(club_id.to_string())
            .lock_exclusive()
            .one(db_tx);
        timeout(self.config.lock_wait, query)
            .await
            .map_err(|_| LedgerError::LockTimeout(format!("cash fund {club_id}")))??
            .ok_or_else(|| LedgerError::AccountNotFound(format!("cash fund {club_id}")))
    }

    /// Unlocked point read of a member account (informational).
    pub(super) async fn find_account(
        &self,
        club_id: &str,
        member_id: &str,
    ) -> ResultLedger<Option<accounts::Model>> {
        accounts::Entity::find_by_id((club_id.to_string(), member_id.to_string()))
            .one(&self.database)
            .await
            .map_err(Into::into)
    }

    /// Unlocked point read of a cash fund (informational).
    pub(super) async fn find_fund(&self, club_id: &str) -> ResultLedger<Option<funds::Model>> {
        funds::Entity::find_by_id(club_id.to_string())
            .one(&self.database)
            .await
            .map_err(Into::into)
    }

    /// Single-row balance write; call only after `lock_account` in the same
    /// transaction.
    pub(super) async fn update_account_balance(
        &self,
        db_tx: &DatabaseTransaction,
        club_id: &str,
        member_id: &str,
        new_balance: Money,
    ) -> ResultLedger<()> {
        let model = accounts::ActiveModel {
            club_id: ActiveValue::Set(club_id.to_string()),
            member_id: ActiveValue::Set(member_id.to_string()),
            balance_minor: ActiveValue::Set(new_balance.minor()),
        };
        model.update(db_tx).await?;
        Ok(())
    }

    /// Single-row balance write; call only after `lock_fund` in the same
    /// transaction.
    pub(super) async fn update_fund_balance(
        &self,
        db_tx: &DatabaseTransaction,
        club_id: &str,
        new_balance: Money,
    ) -> ResultLedger<()> {
        let model = funds::ActiveModel {
            club_id: ActiveValue::Set(club_id.to_string()),
            balance_minor: ActiveValue::Set(new_balance.minor()),
        };
        model.update(db_tx).await?;
        Ok(())
    }

    /// Appends one immutable history row and returns its monotonic id.
    pub(super) async fn append_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry: NewEntry<'_>,
    ) -> ResultLedger<i64> {
        debug_assert!(!entry.amount.is_negative());
        let model = entries::ActiveModel {
            id: ActiveValue::NotSet,
            owner_type: ActiveValue::Set(entry.owner_type.as_str().to_string()),
            owner_id: ActiveValue::Set(entry.owner_id.to_string()),
            club_id: ActiveValue::Set(entry.club_id.to_string()),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount.minor()),
            resulting_balance_minor: ActiveValue::Set(entry.resulting_balance.minor()),
            description: ActiveValue::Set(entry.description),
            reference: ActiveValue::Set(entry.reference),
            actor_id: ActiveValue::Set(entry.actor_id.to_string()),
            created_at: ActiveValue::Set(Utc::now()),
        };
        let inserted = model.insert(db_tx).await?;
        Ok(inserted.id)
    }
}
