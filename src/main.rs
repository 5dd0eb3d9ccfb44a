use chrono::{DateTime, Utc};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tierpay::application::checkout::{CheckoutOutcome, CheckoutService};
use tierpay::application::orchestrator::PaymentOrchestrator;
use tierpay::config::CheckoutConfig;
use tierpay::domain::ports::{GatewayHandle, SubscriptionStoreBox};
use tierpay::domain::tier::TierCatalog;
use tierpay::error::BillingError;
use tierpay::infrastructure::in_memory::InMemorySubscriptionStore;
use tierpay::infrastructure::notifier::ConsoleNotifier;
#[cfg(feature = "storage-rocksdb")]
use tierpay::infrastructure::rocksdb::RocksDBStore;
use tierpay::infrastructure::scripted_gateway::ScriptedGateway;
use tierpay::interfaces::csv::command_reader::{CheckoutCommand, CommandReader, CommandType};
use tierpay::interfaces::csv::subscription_writer::SubscriptionWriter;
use tierpay::observability::{LogFormat, init_tracing};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input checkout commands CSV file
    input: PathBuf,

    /// Tier catalog as a JSON array
    #[arg(long)]
    catalog: PathBuf,

    /// Sandbox gateway scripts keyed by payment method (JSON).
    /// Without it every charge succeeds.
    #[arg(long)]
    gateway: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Run the billing cycle at this instant (RFC 3339) after the commands.
    #[arg(long)]
    cycle_at: Option<DateTime<Utc>>,
}

fn open_store(db_path: Option<PathBuf>) -> Result<SubscriptionStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemorySubscriptionStore::new()))
        }
        None => Ok(Box::new(InMemorySubscriptionStore::new())),
    }
}

async fn process(
    service: &CheckoutService,
    command: CheckoutCommand,
) -> tierpay::error::Result<()> {
    match command.action {
        CommandType::Subscribe => {
            let payment_method = command.payment_method.ok_or_else(|| {
                BillingError::ValidationError("subscribe requires a payment method".to_string())
            })?;
            let user = command.user.clone();
            match service.subscribe(command.user, command.tier, payment_method).await? {
                CheckoutOutcome::AlreadySubscribed => {
                    eprintln!("User {} is already subscribed to this tier", user)
                }
                CheckoutOutcome::AlreadyInProgress => {
                    eprintln!("A payment for user {} is already in progress", user)
                }
                outcome => info!(?outcome, "checkout finished"),
            }
        }
        CommandType::Cancel => {
            service
                .request_cancellation(&command.user, &command.tier)
                .await?;
        }
        CommandType::Resume => {
            service.resume(&command.user, &command.tier).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(LogFormat::from_env());
    let cli = Cli::parse();

    let catalog = TierCatalog::from_json(File::open(&cli.catalog).into_diagnostic()?)
        .into_diagnostic()?;
    let gateway: GatewayHandle = match &cli.gateway {
        Some(path) => Arc::new(
            ScriptedGateway::from_json(File::open(path).into_diagnostic()?).into_diagnostic()?,
        ),
        None => Arc::new(ScriptedGateway::new()),
    };

    let orchestrator = PaymentOrchestrator::new(gateway, Arc::new(ConsoleNotifier));
    let service = CheckoutService::new(
        orchestrator,
        open_store(cli.db_path)?,
        catalog,
        CheckoutConfig::from_env(),
    );

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = process(&service, command).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    if service.pending_activations() > 0 {
        let written = service.reconcile().await;
        let pending = service.pending_activations();
        if pending > 0 {
            eprintln!(
                "WARNING: {} settled charge(s) could not be written ({} reconciled)",
                pending, written
            );
        }
    }

    if let Some(now) = cli.cycle_at {
        let report = service.run_billing_cycle(now).await.into_diagnostic()?;
        eprintln!(
            "Billing cycle: {} renewed, {} cancelled, {} past due, {} skipped, {} failed",
            report.renewed, report.cancelled, report.past_due, report.skipped, report.failed
        );
    }

    let subscriptions = service.subscriptions().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = SubscriptionWriter::new(stdout.lock());
    writer.write_subscriptions(&subscriptions).into_diagnostic()?;

    Ok(())
}
