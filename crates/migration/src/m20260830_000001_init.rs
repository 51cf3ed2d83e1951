//! Initial schema migration - creates all tables from scratch.
//!
//! Complete schema for the club ledger:
//!
//! - `member_accounts`: one prepaid balance per (club, member)
//! - `cash_funds`: the physical till, one row per club
//! - `ledger_entries`: append-only history of every balance change

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum MemberAccounts {
    Table,
    ClubId,
    MemberId,
    BalanceMinor,
}

#[derive(Iden)]
enum CashFunds {
    Table,
    ClubId,
    BalanceMinor,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    OwnerType,
    OwnerId,
    ClubId,
    Kind,
    AmountMinor,
    ResultingBalanceMinor,
    Description,
    Reference,
    ActorId,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Member accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(MemberAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MemberAccounts::ClubId).string().not_null())
                    .col(ColumnDef::new(MemberAccounts::MemberId).string().not_null())
                    .col(
                        ColumnDef::new(MemberAccounts::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(MemberAccounts::ClubId)
                            .col(MemberAccounts::MemberId),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Cash funds
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CashFunds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashFunds::ClubId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CashFunds::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Ledger entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        // `integer` rather than `big_integer` so sqlite maps
                        // this onto its rowid and the sequence is monotonic.
                        ColumnDef::new(LedgerEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::OwnerType).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::OwnerId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::ClubId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::Kind).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::ResultingBalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Description).string())
                    .col(ColumnDef::new(LedgerEntries::Reference).string())
                    .col(ColumnDef::new(LedgerEntries::ActorId).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-owner")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::ClubId)
                    .col(LedgerEntries::OwnerType)
                    .col(LedgerEntries::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-reference")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::ClubId)
                    .col(LedgerEntries::Reference)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CashFunds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MemberAccounts::Table).to_owned())
            .await?;

        Ok(())
    }
}
