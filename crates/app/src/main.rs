use std::time::Duration;

use ledger::{Ledger, LedgerConfig};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "caisse={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.app.database).await?;
    let ledger = Ledger::builder()
        .database(db)
        .config(LedgerConfig {
            allow_member_overdraft: settings.app.allow_overdraft,
            ..LedgerConfig::default()
        })
        .build()
        .await?;

    if let Some(reconcile) = settings.reconcile {
        tasks.spawn(async move {
            tracing::info!(
                interval_minutes = reconcile.interval_minutes,
                "starting reconciliation sweeps"
            );
            let mut ticker =
                tokio::time::interval(Duration::from_secs(reconcile.interval_minutes * 60));
            loop {
                ticker.tick().await;
                if let Err(err) = sweep(&ledger).await {
                    tracing::error!("reconciliation sweep failed: {err}");
                }
            }
        });
    } else {
        tracing::info!("no reconcile settings; nothing to run");
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

/// One drift pass over every club. Drifts are logged by
/// [`Ledger::drift_report`] itself; this just drives the loop.
async fn sweep(ledger: &Ledger) -> Result<(), ledger::LedgerError> {
    for club_id in ledger.club_ids().await? {
        let report = ledger.drift_report(&club_id).await?;
        if !report.is_empty() {
            tracing::warn!(club = %club_id, drifted = report.len(), "club books are inconsistent");
        }
    }
    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
