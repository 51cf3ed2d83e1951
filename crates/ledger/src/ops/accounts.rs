//! Account ledger operations: per-member credits, debits and history.

use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait, prelude::*,
};

use crate::{
    EntryKind, LedgerEntry, LedgerError, MemberAccount, Money, OwnerType, ResultLedger, accounts,
    entries,
};

use super::access::NewEntry;
use super::{EntryMeta, Ledger, normalize_meta, normalize_required_id, require_positive, with_tx};

/// Parameters for [`Ledger::credit`].
#[derive(Clone, Debug)]
pub struct CreditCmd {
    pub club_id: String,
    pub member_id: String,
    pub amount: Money,
    pub meta: EntryMeta,
    pub actor_id: String,
}

/// Parameters for [`Ledger::debit`].
#[derive(Clone, Debug)]
pub struct DebitCmd {
    pub club_id: String,
    pub member_id: String,
    pub amount: Money,
    pub meta: EntryMeta,
    pub actor_id: String,
}

/// Outcome of a committed single-account operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Posting {
    pub entry_id: i64,
    pub new_balance: Money,
}

impl Ledger {
    /// Creates the zero-balance account row for a member.
    ///
    /// Called when the member record is created. Idempotent: opening an
    /// existing account is a no-op that returns the current balance. The
    /// insert goes first and a duplicate key falls back to a read, so two
    /// concurrent opens both succeed.
    pub async fn open_account(&self, club_id: &str, member_id: &str) -> ResultLedger<Money> {
        let club_id = normalize_required_id(club_id, "club_id")?;
        let member_id = normalize_required_id(member_id, "member_id")?;

        let inserted: ResultLedger<Money> = with_tx!(self, |db_tx| {
            let model = accounts::ActiveModel {
                club_id: ActiveValue::Set(club_id.clone()),
                member_id: ActiveValue::Set(member_id.clone()),
                balance_minor: ActiveValue::Set(0),
            };
            model.insert(&db_tx).await?;
            tracing::debug!(club = %club_id, member = %member_id, "account opened");
            Ok(Money::ZERO)
        });

        match inserted {
            Err(LedgerError::Database(err))
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                self.balance_of(&club_id, &member_id).await
            }
            other => other,
        }
    }

    /// Adds `amount` to a member balance and appends the `credit` entry.
    ///
    /// Credits have no upper bound and never fail for balance reasons.
    pub async fn credit(&self, cmd: CreditCmd) -> ResultLedger<Posting> {
        let club_id = normalize_required_id(&cmd.club_id, "club_id")?;
        let member_id = normalize_required_id(&cmd.member_id, "member_id")?;
        require_positive(cmd.amount, "credit")?;
        let (description, reference) = normalize_meta(&cmd.meta);

        let posting: Posting = with_tx!(self, |db_tx| {
            let account = self.lock_account(&db_tx, &club_id, &member_id).await?;
            let balance = Money::from_minor(account.balance_minor);
            let new_balance = balance.checked_add(cmd.amount).ok_or_else(|| {
                LedgerError::InvalidAmount("balance overflow".to_string())
            })?;

            self.update_account_balance(&db_tx, &club_id, &member_id, new_balance)
                .await?;
            let entry_id = self
                .append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::MemberAccount,
                        owner_id: &member_id,
                        club_id: &club_id,
                        kind: EntryKind::Credit,
                        amount: cmd.amount,
                        resulting_balance: new_balance,
                        description,
                        reference,
                        actor_id: &cmd.actor_id,
                    },
                )
                .await?;
            Ok::<_, LedgerError>(Posting {
                entry_id,
                new_balance,
            })
        })?;

        tracing::debug!(
            club = %club_id,
            member = %member_id,
            amount = %cmd.amount,
            balance = %posting.new_balance,
            "credit posted"
        );
        Ok(posting)
    }

    /// Subtracts `amount` from a member balance and appends the `debit`
    /// entry.
    ///
    /// The funds-availability check and the write happen under the same row
    /// lock; checking first and writing later would let two concurrent
    /// debits both pass the check. With overdraft disabled (default) a
    /// would-be negative balance rejects with
    /// [`LedgerError::InsufficientBalance`] and writes nothing.
    pub async fn debit(&self, cmd: DebitCmd) -> ResultLedger<Posting> {
        let club_id = normalize_required_id(&cmd.club_id, "club_id")?;
        let member_id = normalize_required_id(&cmd.member_id, "member_id")?;
        require_positive(cmd.amount, "debit")?;
        let (description, reference) = normalize_meta(&cmd.meta);

        let posting: Posting = with_tx!(self, |db_tx| {
            let account = self.lock_account(&db_tx, &club_id, &member_id).await?;
            let balance = Money::from_minor(account.balance_minor);
            let candidate = balance.checked_sub(cmd.amount).ok_or_else(|| {
                LedgerError::InvalidAmount("balance overflow".to_string())
            })?;

            if candidate.is_negative() && !self.config.allow_member_overdraft {
                Err(LedgerError::InsufficientBalance {
                    current: balance,
                    requested: cmd.amount,
                })
            } else {
                self.update_account_balance(&db_tx, &club_id, &member_id, candidate)
                    .await?;
                let entry_id = self
                    .append_entry(
                        &db_tx,
                        NewEntry {
                            owner_type: OwnerType::MemberAccount,
                            owner_id: &member_id,
                            club_id: &club_id,
                            kind: EntryKind::Debit,
                            amount: cmd.amount,
                            resulting_balance: candidate,
                            description,
                            reference,
                            actor_id: &cmd.actor_id,
                        },
                    )
                    .await?;
                Ok(Posting {
                    entry_id,
                    new_balance: candidate,
                })
            }
        })?;

        tracing::debug!(
            club = %club_id,
            member = %member_id,
            amount = %cmd.amount,
            balance = %posting.new_balance,
            "debit posted"
        );
        Ok(posting)
    }

    /// Unlocked balance read for display purposes; no transaction.
    pub async fn balance_of(&self, club_id: &str, member_id: &str) -> ResultLedger<Money> {
        self.find_account(club_id, member_id)
            .await?
            .map(|model| Money::from_minor(model.balance_minor))
            .ok_or_else(|| {
                LedgerError::AccountNotFound(format!("member account {club_id}/{member_id}"))
            })
    }

    /// All member accounts of a club (informational).
    pub async fn accounts_of_club(&self, club_id: &str) -> ResultLedger<Vec<MemberAccount>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::ClubId.eq(club_id))
            .order_by_asc(accounts::Column::MemberId)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(MemberAccount::from).collect())
    }

    /// The member's entry history, newest first, paginated.
    pub async fn history(
        &self,
        club_id: &str,
        member_id: &str,
        limit: u64,
        offset: u64,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        let models = entries::Entity::find()
            .filter(entries::Column::ClubId.eq(club_id))
            .filter(entries::Column::OwnerType.eq(OwnerType::MemberAccount.as_str()))
            .filter(entries::Column::OwnerId.eq(member_id))
            .order_by_desc(entries::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.database)
            .await?;
        models.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// Entries carrying a given correlation reference, oldest first.
    ///
    /// The result for a reference is stable: later unrelated operations
    /// never change it, which is what makes caller-driven idempotent
    /// retries possible.
    pub async fn entries_by_reference(
        &self,
        club_id: &str,
        reference: &str,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        let models = entries::Entity::find()
            .filter(entries::Column::ClubId.eq(club_id))
            .filter(entries::Column::Reference.eq(reference))
            .order_by_asc(entries::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(LedgerEntry::try_from).collect()
    }
}
