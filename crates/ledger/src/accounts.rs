//! The module contains the `MemberAccount` struct and its entity.
//!
//! A member account holds the authoritative running balance for one member
//! in one club. It is created implicitly (at zero) when the member record
//! is created and only ever mutated through the account ledger operations,
//! each of which appends a matching [`LedgerEntry`](crate::LedgerEntry).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::Money;

/// A member's club-scoped balance row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAccount {
    pub club_id: String,
    pub member_id: String,
    /// Authoritative current balance; equals the signed sum of the
    /// account's entries after every committed operation.
    pub balance: Money,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "member_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub club_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub member_id: String,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MemberAccount {
    fn from(model: Model) -> Self {
        Self {
            club_id: model.club_id,
            member_id: model.member_id,
            balance: Money::from_minor(model.balance_minor),
        }
    }
}
