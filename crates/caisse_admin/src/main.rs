use std::error::Error;

use clap::{Args, Parser, Subcommand};
use ledger::{EntryMeta, Ledger, LedgerConfig, Money};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "caisse_admin")]
#[command(about = "Admin utilities for the club ledger (accounts, fund, reconciliation)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./caisse.db?mode=rwc"
    )]
    database_url: String,

    /// Allow member accounts to go below zero.
    #[arg(long, default_value_t = false)]
    allow_overdraft: bool,

    /// Operator recorded as the actor on every written entry.
    #[arg(long, default_value = "admin")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    Fund(Fund),
    /// Move money between two member accounts.
    Transfer(TransferArgs),
    /// Compare stored balances against the replayed entry history.
    Drift(DriftArgs),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Open a zero-balance account for a member.
    Open(OwnerArgs),
    /// Add money to a member account.
    Credit(AmountArgs),
    /// Spend from a member account.
    Debit(AmountArgs),
    /// Show the current balance.
    Balance(OwnerArgs),
    /// List every account of a club with its balance.
    List(ClubArgs),
    /// Show the newest entries of a member account.
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct Fund {
    #[command(subcommand)]
    command: FundCommand,
}

#[derive(Subcommand, Debug)]
enum FundCommand {
    /// Create the club's cash fund at zero.
    Create(ClubArgs),
    /// Record cash put into the till.
    Add(FundAmountArgs),
    /// Record cash taken out of the till.
    Remove(FundAmountArgs),
    /// Move money from the till onto a member account.
    ToMember(AmountArgs),
    /// Move money from a member account into the till.
    FromMember(AmountArgs),
    /// Record a deposit from the till to the bank.
    ToBank(FundAmountArgs),
    /// Record a withdrawal from the bank into the till.
    FromBank(FundAmountArgs),
    /// Show the fund balance.
    Balance(ClubArgs),
    /// Show the newest fund entries.
    History(FundHistoryArgs),
}

#[derive(Args, Debug)]
struct ClubArgs {
    #[arg(long)]
    club: String,
}

#[derive(Args, Debug)]
struct OwnerArgs {
    #[arg(long)]
    club: String,
    #[arg(long)]
    member: String,
}

#[derive(Args, Debug)]
struct AmountArgs {
    #[arg(long)]
    club: String,
    #[arg(long)]
    member: String,
    /// Amount in major units, e.g. "12.50".
    #[arg(long)]
    amount: Money,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    reference: Option<String>,
}

#[derive(Args, Debug)]
struct FundAmountArgs {
    #[arg(long)]
    club: String,
    #[arg(long)]
    amount: Money,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    reference: Option<String>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(long)]
    club: String,
    #[arg(long)]
    member: String,
    #[arg(long, default_value_t = 20)]
    limit: u64,
    #[arg(long, default_value_t = 0)]
    offset: u64,
}

#[derive(Args, Debug)]
struct FundHistoryArgs {
    #[arg(long)]
    club: String,
    #[arg(long, default_value_t = 20)]
    limit: u64,
    #[arg(long, default_value_t = 0)]
    offset: u64,
}

#[derive(Args, Debug)]
struct TransferArgs {
    #[arg(long)]
    club: String,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long)]
    amount: Money,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    reference: Option<String>,
}

#[derive(Args, Debug)]
struct DriftArgs {
    /// Limit the check to one club; all clubs otherwise.
    #[arg(long)]
    club: Option<String>,
}

fn meta(description: Option<String>, reference: Option<String>) -> EntryMeta {
    EntryMeta {
        description,
        reference,
    }
}

fn print_entries(entries: &[ledger::LedgerEntry]) {
    for entry in entries {
        let description = entry.description.as_deref().unwrap_or("-");
        let reference = entry.reference.as_deref().unwrap_or("-");
        println!(
            "#{} {} {} {} -> {} [{}] ref={} by {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.kind.as_str(),
            entry.amount,
            entry.resulting_balance,
            description,
            reference,
            entry.actor_id,
        );
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let ledger = Ledger::builder()
        .database(db)
        .config(LedgerConfig {
            allow_member_overdraft: cli.allow_overdraft,
            ..LedgerConfig::default()
        })
        .build()
        .await?;

    if let Err(err) = run(cli.command, &ledger, &cli.actor).await {
        if err.is_retryable() {
            eprintln!("transient error, safe to retry: {err}");
        } else {
            eprintln!("{err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command, ledger: &Ledger, actor: &str) -> Result<(), ledger::LedgerError> {
    match command {
        Command::Account(Account {
            command: AccountCommand::Open(args),
        }) => {
            let balance = ledger.open_account(&args.club, &args.member).await?;
            println!("account {}/{}: {balance}", args.club, args.member);
        }
        Command::Account(Account {
            command: AccountCommand::Credit(args),
        }) => {
            let posting = ledger
                .credit(ledger::CreditCmd {
                    club_id: args.club.clone(),
                    member_id: args.member.clone(),
                    amount: args.amount,
                    meta: meta(args.description, args.reference),
                    actor_id: actor.to_string(),
                })
                .await?;
            println!(
                "credited {}/{}: entry #{}, balance {}",
                args.club, args.member, posting.entry_id, posting.new_balance
            );
        }
        Command::Account(Account {
            command: AccountCommand::Debit(args),
        }) => {
            let posting = ledger
                .debit(ledger::DebitCmd {
                    club_id: args.club.clone(),
                    member_id: args.member.clone(),
                    amount: args.amount,
                    meta: meta(args.description, args.reference),
                    actor_id: actor.to_string(),
                })
                .await?;
            println!(
                "debited {}/{}: entry #{}, balance {}",
                args.club, args.member, posting.entry_id, posting.new_balance
            );
        }
        Command::Account(Account {
            command: AccountCommand::Balance(args),
        }) => {
            let balance = ledger.balance_of(&args.club, &args.member).await?;
            println!("{balance}");
        }
        Command::Account(Account {
            command: AccountCommand::List(args),
        }) => {
            for account in ledger.accounts_of_club(&args.club).await? {
                println!("{} {}", account.member_id, account.balance);
            }
        }
        Command::Account(Account {
            command: AccountCommand::History(args),
        }) => {
            let entries = ledger
                .history(&args.club, &args.member, args.limit, args.offset)
                .await?;
            print_entries(&entries);
        }
        Command::Fund(Fund {
            command: FundCommand::Create(args),
        }) => {
            let balance = ledger.create_fund(&args.club).await?;
            println!("fund {}: {balance}", args.club);
        }
        Command::Fund(Fund {
            command: FundCommand::Add(args),
        }) => {
            let balance = ledger
                .add_to_fund(
                    &args.club,
                    args.amount,
                    actor,
                    meta(args.description, args.reference),
                )
                .await?;
            println!("fund {}: {balance}", args.club);
        }
        Command::Fund(Fund {
            command: FundCommand::Remove(args),
        }) => {
            let balance = ledger
                .remove_from_fund(
                    &args.club,
                    args.amount,
                    actor,
                    meta(args.description, args.reference),
                )
                .await?;
            println!("fund {}: {balance}", args.club);
        }
        Command::Fund(Fund {
            command: FundCommand::ToMember(args),
        }) => {
            let outcome = ledger
                .transfer_fund_to_member(
                    &args.club,
                    &args.member,
                    args.amount,
                    actor,
                    meta(args.description, args.reference),
                )
                .await?;
            println!(
                "fund {} -> member {}: fund {}, member {}",
                args.club, args.member, outcome.fund_balance, outcome.member_balance
            );
        }
        Command::Fund(Fund {
            command: FundCommand::FromMember(args),
        }) => {
            let outcome = ledger
                .transfer_member_to_fund(
                    &args.club,
                    &args.member,
                    args.amount,
                    actor,
                    meta(args.description, args.reference),
                )
                .await?;
            println!(
                "member {} -> fund {}: fund {}, member {}",
                args.member, args.club, outcome.fund_balance, outcome.member_balance
            );
        }
        Command::Fund(Fund {
            command: FundCommand::ToBank(args),
        }) => {
            let balance = ledger
                .transfer_fund_to_bank(
                    &args.club,
                    args.amount,
                    actor,
                    meta(args.description, args.reference),
                )
                .await?;
            println!("fund {}: {balance}", args.club);
        }
        Command::Fund(Fund {
            command: FundCommand::FromBank(args),
        }) => {
            let balance = ledger
                .transfer_bank_to_fund(
                    &args.club,
                    args.amount,
                    actor,
                    meta(args.description, args.reference),
                )
                .await?;
            println!("fund {}: {balance}", args.club);
        }
        Command::Fund(Fund {
            command: FundCommand::Balance(args),
        }) => {
            let fund = ledger.fund(&args.club).await?;
            println!("{}", fund.balance);
        }
        Command::Fund(Fund {
            command: FundCommand::History(args),
        }) => {
            let entries = ledger
                .fund_history(&args.club, args.limit, args.offset)
                .await?;
            print_entries(&entries);
        }
        Command::Transfer(args) => {
            let outcome = ledger
                .transfer_member_to_member(
                    &args.club,
                    &args.from,
                    &args.to,
                    args.amount,
                    actor,
                    meta(args.description, args.reference),
                )
                .await?;
            println!(
                "{} -> {}: from {}, to {}",
                args.from, args.to, outcome.from_balance, outcome.to_balance
            );
        }
        Command::Drift(args) => {
            let clubs = match args.club {
                Some(club) => vec![club],
                None => ledger.club_ids().await?,
            };
            let mut dirty = false;
            for club in clubs {
                let report = ledger.drift_report(&club).await?;
                if report.is_empty() {
                    println!("{club}: clean");
                    continue;
                }
                dirty = true;
                for drift in report {
                    println!(
                        "{club}: {} {} stored {} recomputed {} (delta {})",
                        drift.owner_type.as_str(),
                        drift.owner_id,
                        drift.stored,
                        drift.recomputed,
                        drift.delta(),
                    );
                }
            }
            if dirty {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
