//! Cash fund operations: till adjustments, bank movements and the
//! fund↔member / member↔member transfers.
//!
//! Transfers span two owners inside **one** transaction. Locks follow a
//! fixed global order (cash fund before member account, member accounts by
//! ascending `member_id`) so two simultaneous opposite-direction transfers
//! cannot deadlock. If either leg fails, nothing is written.

use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    CashFund, EntryKind, LedgerEntry, LedgerError, Money, OwnerType, ResultLedger, entries, funds,
};

use super::access::NewEntry;
use super::{EntryMeta, Ledger, normalize_meta, normalize_required_id, require_positive, with_tx};

/// Balances after a committed fund↔member transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferOutcome {
    pub fund_balance: Money,
    pub member_balance: Money,
}

/// Balances after a committed member↔member transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberTransferOutcome {
    pub from_balance: Money,
    pub to_balance: Money,
}

impl Ledger {
    /// Creates the club's cash fund row at zero.
    ///
    /// Called when the club is created. Idempotent like
    /// [`Ledger::open_account`]: a duplicate key falls back to reading the
    /// existing fund, so two concurrent creates both succeed.
    pub async fn create_fund(&self, club_id: &str) -> ResultLedger<Money> {
        let club_id = normalize_required_id(club_id, "club_id")?;

        let inserted: ResultLedger<Money> = with_tx!(self, |db_tx| {
            let model = funds::ActiveModel {
                club_id: ActiveValue::Set(club_id.clone()),
                balance_minor: ActiveValue::Set(0),
            };
            model.insert(&db_tx).await?;
            tracing::debug!(club = %club_id, "cash fund created");
            Ok(Money::ZERO)
        });

        match inserted {
            Err(LedgerError::Database(err))
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                self.fund_balance(&club_id).await
            }
            other => other,
        }
    }

    /// Records physical cash put into the till (`fund_add`).
    pub async fn add_to_fund(
        &self,
        club_id: &str,
        amount: Money,
        actor_id: &str,
        meta: EntryMeta,
    ) -> ResultLedger<Money> {
        self.adjust_fund(club_id, amount, EntryKind::FundAdd, actor_id, meta)
            .await
    }

    /// Records physical cash taken out of the till (`fund_remove`).
    ///
    /// The fund never overdrafts, regardless of the member overdraft
    /// policy.
    pub async fn remove_from_fund(
        &self,
        club_id: &str,
        amount: Money,
        actor_id: &str,
        meta: EntryMeta,
    ) -> ResultLedger<Money> {
        self.adjust_fund(club_id, amount, EntryKind::FundRemove, actor_id, meta)
            .await
    }

    /// Cash deposited from the till to the club bank account.
    ///
    /// Only the fund side is modeled: the bank ledger belongs to an
    /// external collaborator, so the contract here is just that the fund's
    /// own balance and history reflect the movement.
    pub async fn transfer_fund_to_bank(
        &self,
        club_id: &str,
        amount: Money,
        actor_id: &str,
        mut meta: EntryMeta,
    ) -> ResultLedger<Money> {
        if meta.description.is_none() {
            meta.description = Some("transfer to bank".to_string());
        }
        self.adjust_fund(club_id, amount, EntryKind::FundRemove, actor_id, meta)
            .await
    }

    /// Cash withdrawn from the club bank account into the till.
    pub async fn transfer_bank_to_fund(
        &self,
        club_id: &str,
        amount: Money,
        actor_id: &str,
        mut meta: EntryMeta,
    ) -> ResultLedger<Money> {
        if meta.description.is_none() {
            meta.description = Some("transfer from bank".to_string());
        }
        self.adjust_fund(club_id, amount, EntryKind::FundAdd, actor_id, meta)
            .await
    }

    async fn adjust_fund(
        &self,
        club_id: &str,
        amount: Money,
        kind: EntryKind,
        actor_id: &str,
        meta: EntryMeta,
    ) -> ResultLedger<Money> {
        let club_id = normalize_required_id(club_id, "club_id")?;
        require_positive(amount, kind.as_str())?;
        let (description, reference) = normalize_meta(&meta);

        let new_balance: Money = with_tx!(self, |db_tx| {
            let fund = self.lock_fund(&db_tx, &club_id).await?;
            let balance = Money::from_minor(fund.balance_minor);
            let candidate = balance.checked_add(kind.signed(amount)).ok_or_else(|| {
                LedgerError::InvalidAmount("balance overflow".to_string())
            })?;

            if candidate.is_negative() {
                Err(LedgerError::InsufficientBalance {
                    current: balance,
                    requested: amount,
                })
            } else {
                self.update_fund_balance(&db_tx, &club_id, candidate).await?;
                self.append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::CashFund,
                        owner_id: &club_id,
                        club_id: &club_id,
                        kind,
                        amount,
                        resulting_balance: candidate,
                        description,
                        reference,
                        actor_id,
                    },
                )
                .await?;
                Ok(candidate)
            }
        })?;

        tracing::debug!(
            club = %club_id,
            kind = kind.as_str(),
            amount = %amount,
            balance = %new_balance,
            "fund adjusted"
        );
        Ok(new_balance)
    }

    /// Moves cash from the till onto a member account: `transfer_out` on
    /// the fund, `transfer_in` on the member, one atomic unit.
    pub async fn transfer_fund_to_member(
        &self,
        club_id: &str,
        member_id: &str,
        amount: Money,
        actor_id: &str,
        meta: EntryMeta,
    ) -> ResultLedger<TransferOutcome> {
        let club_id = normalize_required_id(club_id, "club_id")?;
        let member_id = normalize_required_id(member_id, "member_id")?;
        require_positive(amount, "transfer")?;
        let (description, reference) = normalize_meta(&meta);
        // Both legs share one reference so they stay correlated in history.
        let reference = Some(reference.unwrap_or_else(|| Uuid::new_v4().to_string()));

        let outcome: TransferOutcome = with_tx!(self, |db_tx| {
            // Fixed global lock order: fund before member account.
            let fund = self.lock_fund(&db_tx, &club_id).await?;
            let fund_balance = Money::from_minor(fund.balance_minor);
            let fund_candidate = fund_balance.checked_sub(amount).ok_or_else(|| {
                LedgerError::InvalidAmount("balance overflow".to_string())
            })?;

            if fund_candidate.is_negative() {
                Err(LedgerError::InsufficientBalance {
                    current: fund_balance,
                    requested: amount,
                })
            } else {
                let account = self.lock_account(&db_tx, &club_id, &member_id).await?;
                let member_balance = Money::from_minor(account.balance_minor)
                    .checked_add(amount)
                    .ok_or_else(|| {
                        LedgerError::InvalidAmount("balance overflow".to_string())
                    })?;

                self.update_fund_balance(&db_tx, &club_id, fund_candidate).await?;
                self.append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::CashFund,
                        owner_id: &club_id,
                        club_id: &club_id,
                        kind: EntryKind::TransferOut,
                        amount,
                        resulting_balance: fund_candidate,
                        description: description.clone(),
                        reference: reference.clone(),
                        actor_id,
                    },
                )
                .await?;

                self.update_account_balance(&db_tx, &club_id, &member_id, member_balance)
                    .await?;
                self.append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::MemberAccount,
                        owner_id: &member_id,
                        club_id: &club_id,
                        kind: EntryKind::TransferIn,
                        amount,
                        resulting_balance: member_balance,
                        description,
                        reference,
                        actor_id,
                    },
                )
                .await?;

                Ok(TransferOutcome {
                    fund_balance: fund_candidate,
                    member_balance,
                })
            }
        })?;

        tracing::debug!(
            club = %club_id,
            member = %member_id,
            amount = %amount,
            fund = %outcome.fund_balance,
            balance = %outcome.member_balance,
            "fund-to-member transfer posted"
        );
        Ok(outcome)
    }

    /// Moves money from a member account into the till: `transfer_out` on
    /// the member, `transfer_in` on the fund, one atomic unit.
    ///
    /// The member side follows the overdraft policy; the fund side cannot
    /// fail (it only grows).
    pub async fn transfer_member_to_fund(
        &self,
        club_id: &str,
        member_id: &str,
        amount: Money,
        actor_id: &str,
        meta: EntryMeta,
    ) -> ResultLedger<TransferOutcome> {
        let club_id = normalize_required_id(club_id, "club_id")?;
        let member_id = normalize_required_id(member_id, "member_id")?;
        require_positive(amount, "transfer")?;
        let (description, reference) = normalize_meta(&meta);
        let reference = Some(reference.unwrap_or_else(|| Uuid::new_v4().to_string()));

        let outcome: TransferOutcome = with_tx!(self, |db_tx| {
            // Same lock order as the opposite direction, so the two cannot
            // deadlock each other.
            let fund = self.lock_fund(&db_tx, &club_id).await?;
            let account = self.lock_account(&db_tx, &club_id, &member_id).await?;

            let member_balance = Money::from_minor(account.balance_minor);
            let member_candidate = member_balance.checked_sub(amount).ok_or_else(|| {
                LedgerError::InvalidAmount("balance overflow".to_string())
            })?;

            if member_candidate.is_negative() && !self.config.allow_member_overdraft {
                Err(LedgerError::InsufficientBalance {
                    current: member_balance,
                    requested: amount,
                })
            } else {
                let fund_balance = Money::from_minor(fund.balance_minor)
                    .checked_add(amount)
                    .ok_or_else(|| {
                        LedgerError::InvalidAmount("balance overflow".to_string())
                    })?;

                self.update_account_balance(&db_tx, &club_id, &member_id, member_candidate)
                    .await?;
                self.append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::MemberAccount,
                        owner_id: &member_id,
                        club_id: &club_id,
                        kind: EntryKind::TransferOut,
                        amount,
                        resulting_balance: member_candidate,
                        description: description.clone(),
                        reference: reference.clone(),
                        actor_id,
                    },
                )
                .await?;

                self.update_fund_balance(&db_tx, &club_id, fund_balance).await?;
                self.append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::CashFund,
                        owner_id: &club_id,
                        club_id: &club_id,
                        kind: EntryKind::TransferIn,
                        amount,
                        resulting_balance: fund_balance,
                        description,
                        reference,
                        actor_id,
                    },
                )
                .await?;

                Ok(TransferOutcome {
                    fund_balance,
                    member_balance: member_candidate,
                })
            }
        })?;

        tracing::debug!(
            club = %club_id,
            member = %member_id,
            amount = %amount,
            fund = %outcome.fund_balance,
            balance = %outcome.member_balance,
            "member-to-fund transfer posted"
        );
        Ok(outcome)
    }

    /// Moves money between two member accounts, one atomic unit.
    ///
    /// Locks are taken in ascending `member_id` order regardless of
    /// direction, matching the global lock ordering.
    pub async fn transfer_member_to_member(
        &self,
        club_id: &str,
        from_member: &str,
        to_member: &str,
        amount: Money,
        actor_id: &str,
        meta: EntryMeta,
    ) -> ResultLedger<MemberTransferOutcome> {
        let club_id = normalize_required_id(club_id, "club_id")?;
        let from_member = normalize_required_id(from_member, "from_member")?;
        let to_member = normalize_required_id(to_member, "to_member")?;
        if from_member == to_member {
            return Err(LedgerError::InvalidAmount(
                "from_member and to_member must differ".to_string(),
            ));
        }
        require_positive(amount, "transfer")?;
        let (description, reference) = normalize_meta(&meta);
        let reference = Some(reference.unwrap_or_else(|| Uuid::new_v4().to_string()));

        let outcome: MemberTransferOutcome = with_tx!(self, |db_tx| {
            let (first, second) = if from_member < to_member {
                (&from_member, &to_member)
            } else {
                (&to_member, &from_member)
            };
            let first_model = self.lock_account(&db_tx, &club_id, first).await?;
            let second_model = self.lock_account(&db_tx, &club_id, second).await?;

            let (from_model, to_model) = if *first == from_member {
                (first_model, second_model)
            } else {
                (second_model, first_model)
            };

            let from_balance = Money::from_minor(from_model.balance_minor);
            let from_candidate = from_balance.checked_sub(amount).ok_or_else(|| {
                LedgerError::InvalidAmount("balance overflow".to_string())
            })?;

            if from_candidate.is_negative() && !self.config.allow_member_overdraft {
                Err(LedgerError::InsufficientBalance {
                    current: from_balance,
                    requested: amount,
                })
            } else {
                let to_balance = Money::from_minor(to_model.balance_minor)
                    .checked_add(amount)
                    .ok_or_else(|| {
                        LedgerError::InvalidAmount("balance overflow".to_string())
                    })?;

                self.update_account_balance(&db_tx, &club_id, &from_member, from_candidate)
                    .await?;
                self.append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::MemberAccount,
                        owner_id: &from_member,
                        club_id: &club_id,
                        kind: EntryKind::TransferOut,
                        amount,
                        resulting_balance: from_candidate,
                        description: description.clone(),
                        reference: reference.clone(),
                        actor_id,
                    },
                )
                .await?;

                self.update_account_balance(&db_tx, &club_id, &to_member, to_balance)
                    .await?;
                self.append_entry(
                    &db_tx,
                    NewEntry {
                        owner_type: OwnerType::MemberAccount,
                        owner_id: &to_member,
                        club_id: &club_id,
                        kind: EntryKind::TransferIn,
                        amount,
                        resulting_balance: to_balance,
                        description,
                        reference,
                        actor_id,
                    },
                )
                .await?;

                Ok(MemberTransferOutcome {
                    from_balance: from_candidate,
                    to_balance,
                })
            }
        })?;

        tracing::debug!(
            club = %club_id,
            from = %from_member,
            to = %to_member,
            amount = %amount,
            "member-to-member transfer posted"
        );
        Ok(outcome)
    }

    /// Unlocked fund balance read for display purposes.
    pub async fn fund_balance(&self, club_id: &str) -> ResultLedger<Money> {
        self.find_fund(club_id)
            .await?
            .map(|model| Money::from_minor(model.balance_minor))
            .ok_or_else(|| LedgerError::AccountNotFound(format!("cash fund {club_id}")))
    }

    /// The fund snapshot (informational).
    pub async fn fund(&self, club_id: &str) -> ResultLedger<CashFund> {
        self.find_fund(club_id)
            .await?
            .map(CashFund::from)
            .ok_or_else(|| LedgerError::AccountNotFound(format!("cash fund {club_id}")))
    }

    /// The fund's entry history, newest first, paginated.
    pub async fn fund_history(
        &self,
        club_id: &str,
        limit: u64,
        offset: u64,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        let models = entries::Entity::find()
            .filter(entries::Column::ClubId.eq(club_id))
            .filter(entries::Column::OwnerType.eq(OwnerType::CashFund.as_str()))
            .filter(entries::Column::OwnerId.eq(club_id))
            .order_by_desc(entries::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.database)
            .await?;
        models.into_iter().map(LedgerEntry::try_from).collect()
    }
}
