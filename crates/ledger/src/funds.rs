//! The module contains the `CashFund` struct and its entity.
//!
//! The cash fund ("caisse") is the club's physical till: one row per club,
//! tracked independently of member balances. It is never required to equal
//! the sum of member balances; like an account it is only constrained by
//! its own entry history, and it never overdrafts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::Money;

/// The club-level cash pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFund {
    pub club_id: String,
    pub balance: Money,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "cash_funds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub club_id: String,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CashFund {
    fn from(model: Model) -> Self {
        Self {
            club_id: model.club_id,
            balance: Money::from_minor(model.balance_minor),
        }
    }
}
