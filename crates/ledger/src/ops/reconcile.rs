//! Reconciliation: recompute balances from the entry history and compare
//! them against the stored balance columns.
//!
//! The stored balance is authoritative for operations; the history is the
//! audit trail. They must agree at all times, so any delta found here means
//! a bug or out-of-band tampering and is worth an alert.

use sea_orm::{ConnectionTrait, Statement, prelude::*};

use crate::{Money, OwnerType, ResultLedger, funds};

use super::Ledger;

/// One owner whose stored balance disagrees with its replayed history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Drift {
    pub owner_type: OwnerType,
    pub owner_id: String,
    pub stored: Money,
    pub recomputed: Money,
}

impl Drift {
    /// `recomputed - stored`; positive means the history says the owner
    /// should hold more than the stored column does.
    pub fn delta(&self) -> Money {
        self.recomputed - self.stored
    }
}

impl Ledger {
    /// Replays the full entry history of one owner and returns the balance
    /// it implies. An owner with no entries recomputes to zero.
    pub async fn recomputed_balance(
        &self,
        club_id: &str,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> ResultLedger<Money> {
        // Signed sum in SQL rather than pulling every row into memory.
        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "SELECT COALESCE(SUM(\
                 CASE WHEN kind IN ('credit', 'transfer_in', 'fund_add') \
                      THEN amount_minor \
                      ELSE -amount_minor \
                 END), 0) AS sum \
             FROM ledger_entries \
             WHERE club_id = ? AND owner_type = ? AND owner_id = ?",
            [
                club_id.into(),
                owner_type.as_str().into(),
                owner_id.into(),
            ],
        );
        let row = self.database.query_one(stmt).await?;
        let minor: i64 = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0);
        Ok(Money::from_minor(minor))
    }

    /// Checks every member account and the cash fund of one club, returning
    /// the owners whose stored balance drifted from their history.
    ///
    /// Each check is a single statement reading the balance row and the
    /// replayed sum together, so a ledger operation committing while the
    /// report runs can never surface as a drift.
    ///
    /// An empty report means the club's books are internally consistent.
    /// This is a read-only pass; repairing a drift is a deliberate manual
    /// action, not something the ledger does on its own.
    pub async fn drift_report(&self, club_id: &str) -> ResultLedger<Vec<Drift>> {
        let backend = self.database.get_database_backend();
        let mut report = Vec::new();

        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT a.member_id AS owner_id, a.balance_minor AS stored, \
                 COALESCE((SELECT SUM(\
                     CASE WHEN e.kind IN ('credit', 'transfer_in', 'fund_add') \
                          THEN e.amount_minor \
                          ELSE -e.amount_minor \
                     END) \
                   FROM ledger_entries e \
                   WHERE e.club_id = a.club_id \
                     AND e.owner_type = 'member_account' \
                     AND e.owner_id = a.member_id), 0) AS recomputed \
             FROM member_accounts a \
             WHERE a.club_id = ? \
             ORDER BY a.member_id",
            [club_id.into()],
        );
        for row in self.database.query_all(stmt).await? {
            let stored = Money::from_minor(row.try_get("", "stored")?);
            let recomputed = Money::from_minor(row.try_get("", "recomputed")?);
            if stored != recomputed {
                report.push(Drift {
                    owner_type: OwnerType::MemberAccount,
                    owner_id: row.try_get("", "owner_id")?,
                    stored,
                    recomputed,
                });
            }
        }

        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT f.balance_minor AS stored, \
                 COALESCE((SELECT SUM(\
                     CASE WHEN e.kind IN ('credit', 'transfer_in', 'fund_add') \
                          THEN e.amount_minor \
                          ELSE -e.amount_minor \
                     END) \
                   FROM ledger_entries e \
                   WHERE e.club_id = f.club_id \
                     AND e.owner_type = 'cash_fund' \
                     AND e.owner_id = f.club_id), 0) AS recomputed \
             FROM cash_funds f \
             WHERE f.club_id = ?",
            [club_id.into()],
        );
        if let Some(row) = self.database.query_one(stmt).await? {
            let stored = Money::from_minor(row.try_get("", "stored")?);
            let recomputed = Money::from_minor(row.try_get("", "recomputed")?);
            if stored != recomputed {
                report.push(Drift {
                    owner_type: OwnerType::CashFund,
                    owner_id: club_id.to_string(),
                    stored,
                    recomputed,
                });
            }
        }

        if report.is_empty() {
            tracing::debug!(club = %club_id, "drift report clean");
        } else {
            for drift in &report {
                tracing::warn!(
                    club = %club_id,
                    owner_type = drift.owner_type.as_str(),
                    owner = %drift.owner_id,
                    stored = %drift.stored,
                    recomputed = %drift.recomputed,
                    delta = %drift.delta(),
                    "balance drift detected"
                );
            }
        }
        Ok(report)
    }

    /// All clubs that have a cash fund, for sweeping reconciliation runs.
    pub async fn club_ids(&self) -> ResultLedger<Vec<String>> {
        let row_funds = funds::Entity::find().all(&self.database).await?;
        Ok(row_funds.into_iter().map(|fund| fund.club_id).collect())
    }
}
