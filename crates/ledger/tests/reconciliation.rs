use std::sync::Arc;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use ledger::{CreditCmd, DebitCmd, EntryMeta, Ledger, LedgerError, Money, OwnerType};
use migration::MigratorTrait;

async fn ledger_with_db() -> (Ledger, DatabaseConnection) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let ledger = Ledger::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (ledger, db)
}

fn eur(text: &str) -> Money {
    text.parse().unwrap()
}

async fn seed_club(ledger: &Ledger) {
    ledger.create_fund("tennis").await.unwrap();
    ledger.open_account("tennis", "alice").await.unwrap();
    ledger.open_account("tennis", "bob").await.unwrap();
    ledger
        .credit(CreditCmd {
            club_id: "tennis".to_string(),
            member_id: "alice".to_string(),
            amount: eur("20.00"),
            meta: EntryMeta::default(),
            actor_id: "staff".to_string(),
        })
        .await
        .unwrap();
    ledger
        .debit(DebitCmd {
            club_id: "tennis".to_string(),
            member_id: "alice".to_string(),
            amount: eur("4.50"),
            meta: EntryMeta::default(),
            actor_id: "staff".to_string(),
        })
        .await
        .unwrap();
    ledger
        .add_to_fund("tennis", eur("50.00"), "staff", EntryMeta::default())
        .await
        .unwrap();
    ledger
        .transfer_fund_to_member("tennis", "bob", eur("10.00"), "staff", EntryMeta::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn recomputed_balance_replays_the_history() {
    let (ledger, _db) = ledger_with_db().await;
    seed_club(&ledger).await;

    let alice = ledger
        .recomputed_balance("tennis", OwnerType::MemberAccount, "alice")
        .await
        .unwrap();
    assert_eq!(alice, eur("15.50"));

    let fund = ledger
        .recomputed_balance("tennis", OwnerType::CashFund, "tennis")
        .await
        .unwrap();
    assert_eq!(fund, eur("40.00"));

    // No entries means zero, not an error.
    let empty = ledger
        .recomputed_balance("tennis", OwnerType::MemberAccount, "ghost")
        .await
        .unwrap();
    assert_eq!(empty, Money::ZERO);
}

#[tokio::test]
async fn signed_entry_amounts_replay_to_the_balance() {
    let (ledger, _db) = ledger_with_db().await;
    seed_club(&ledger).await;

    let history = ledger.history("tennis", "alice", 100, 0).await.unwrap();
    let replayed: Money = history.iter().map(|entry| entry.signed_amount()).sum();
    assert_eq!(
        replayed,
        ledger.balance_of("tennis", "alice").await.unwrap()
    );
}

#[tokio::test]
async fn drift_report_is_clean_after_normal_operations() {
    let (ledger, _db) = ledger_with_db().await;
    seed_club(&ledger).await;

    let report = ledger.drift_report("tennis").await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn report_stays_clean_while_writes_commit() {
    let (ledger, _db) = ledger_with_db().await;
    seed_club(&ledger).await;
    let ledger = Arc::new(ledger);

    // Every write goes through the ledger, so no interleaving of the
    // report with committing credits may ever show a drift.
    let writer = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            for _ in 0..25 {
                ledger
                    .credit(CreditCmd {
                        club_id: "tennis".to_string(),
                        member_id: "alice".to_string(),
                        amount: eur("1.00"),
                        meta: EntryMeta::default(),
                        actor_id: "staff".to_string(),
                    })
                    .await
                    .unwrap();
            }
        })
    };

    while !writer.is_finished() {
        let report = ledger.drift_report("tennis").await.unwrap();
        assert!(report.is_empty(), "phantom drift: {report:?}");
    }
    writer.await.unwrap();

    assert!(ledger.drift_report("tennis").await.unwrap().is_empty());
}

#[tokio::test]
async fn tampered_balance_shows_up_in_the_report() {
    let (ledger, db) = ledger_with_db().await;
    seed_club(&ledger).await;

    // Out-of-band write, bypassing the ledger.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE member_accounts SET balance_minor = ? WHERE club_id = ? AND member_id = ?",
        vec![9999i64.into(), "tennis".into(), "alice".into()],
    ))
    .await
    .unwrap();

    let report = ledger.drift_report("tennis").await.unwrap();
    assert_eq!(report.len(), 1);
    let drift = &report[0];
    assert_eq!(drift.owner_type, OwnerType::MemberAccount);
    assert_eq!(drift.owner_id, "alice");
    assert_eq!(drift.stored, eur("99.99"));
    assert_eq!(drift.recomputed, eur("15.50"));
    assert_eq!(drift.delta(), eur("-84.49"));
}

#[tokio::test]
async fn tampered_fund_is_reported_too() {
    let (ledger, db) = ledger_with_db().await;
    seed_club(&ledger).await;

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE cash_funds SET balance_minor = ? WHERE club_id = ?",
        vec![0i64.into(), "tennis".into()],
    ))
    .await
    .unwrap();

    let report = ledger.drift_report("tennis").await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].owner_type, OwnerType::CashFund);
    assert_eq!(report[0].delta(), eur("40.00"));
}

#[tokio::test]
async fn club_ids_lists_every_fund() {
    let (ledger, _db) = ledger_with_db().await;
    ledger.create_fund("tennis").await.unwrap();
    ledger.create_fund("chess").await.unwrap();

    let mut clubs = ledger.club_ids().await.unwrap();
    clubs.sort();
    assert_eq!(clubs, vec!["chess".to_string(), "tennis".to_string()]);
}

#[tokio::test]
async fn rejected_operations_leave_the_books_consistent() {
    let (ledger, _db) = ledger_with_db().await;
    seed_club(&ledger).await;

    let err = ledger
        .debit(DebitCmd {
            club_id: "tennis".to_string(),
            member_id: "bob".to_string(),
            amount: eur("999.00"),
            meta: EntryMeta::default(),
            actor_id: "staff".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    let err = ledger
        .remove_from_fund("tennis", eur("999.00"), "staff", EntryMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    assert!(ledger.drift_report("tennis").await.unwrap().is_empty());
}
