use std::sync::Arc;

use clap::Parser;
use colored::*;
use tracing::{error, info};

use rentwatch::{
    chain::{rpc::EvmRpcClient, ChainReader, ChainWriter},
    cli::{Cli, Commands},
    config::Config,
    error,
    monitor::{ExpiryMonitor, MonitorConfig},
    notify::{email::EmailNotifier, Notifier},
    storage::Database,
    sweep::ExpirySweeper,
    utils,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentwatch=debug,info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Watch { interval, no_email } => run_watch(&config, interval, no_email).await,
        Commands::Check { threshold } => run_check(&config, threshold).await,
        Commands::Status { token_id } => show_status(&config, token_id).await,
        Commands::Sweep {
            batch_size,
            dry_run,
        } => run_sweep(&config, batch_size, dry_run).await,
        Commands::History { limit } => show_history(&config, limit),
        Commands::Init => initialize(&config),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn build_notifier(config: &Config, no_email: bool) -> error::Result<Option<Arc<dyn Notifier>>> {
    if no_email {
        return Ok(None);
    }
    match EmailNotifier::new(config.email.as_ref()) {
        Some(Ok(notifier)) => Ok(Some(Arc::new(notifier))),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

async fn run_watch(config: &Config, interval: Option<u64>, no_email: bool) -> error::Result<()> {
    let reader: Arc<dyn ChainReader> = Arc::new(EvmRpcClient::new(&config.chain));
    let notifier = build_notifier(config, no_email)?;
    if notifier.is_some() {
        println!("{}", "✓ Email notifications enabled".green());
    }

    let mut monitor_config = MonitorConfig::from_settings(&config.monitor);
    if let Some(secs) = interval {
        monitor_config.poll_interval = std::time::Duration::from_secs(secs.max(1));
    }

    println!(
        "{}",
        format!(
            "Watching {} every {}s (expiring window: {})",
            config.chain.contract_address,
            monitor_config.poll_interval.as_secs(),
            utils::format_time(monitor_config.inclusion_threshold),
        )
        .cyan()
    );

    let db = Database::new(&config.database.path)?;
    let monitor = Arc::new(
        ExpiryMonitor::new(reader, notifier, monitor_config).with_store(db),
    );

    let handle = Arc::clone(&monitor).spawn();

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| error::WatchError::Other(anyhow::anyhow!("signal error: {}", e)))?;
    info!("Interrupt received, shutting down");
    handle.shutdown().await;

    let snapshot = monitor.snapshot();
    println!(
        "Stopped. {} rental(s) currently expiring.",
        snapshot.expiring.len()
    );
    Ok(())
}

async fn run_check(config: &Config, threshold: Option<i64>) -> error::Result<()> {
    println!("{}", "Scanning for expiring rentals...".cyan());

    let reader: Arc<dyn ChainReader> = Arc::new(EvmRpcClient::new(&config.chain));
    let mut monitor_config = MonitorConfig::from_settings(&config.monitor);
    if let Some(t) = threshold {
        monitor_config.inclusion_threshold = t;
    }

    let monitor = ExpiryMonitor::new(reader, None, monitor_config);
    let outcome = monitor.check_expirations().await?;

    println!("\n{}", "=== Expiring Rentals ===".cyan().bold());
    println!("Tokens scanned:  {}", outcome.scanned);
    println!("Read failures:   {}", outcome.read_failures);
    println!(
        "Expiring:        {}",
        outcome.expiring.len().to_string().yellow()
    );

    if !outcome.expiring.is_empty() {
        println!();
        utils::print_table_border(80);
        utils::print_table_row(&["Token", "Renter", "Contact", "Remaining"], &[8, 16, 30, 15]);
        utils::print_table_border(80);
        for rental in &outcome.expiring {
            utils::print_table_row(
                &[
                    &format!("#{}", rental.token_id),
                    &utils::format_address(&rental.renter),
                    rental.renter_contact.as_deref().unwrap_or("-"),
                    &utils::format_time(rental.remaining_time),
                ],
                &[8, 16, 30, 15],
            );
        }
        utils::print_table_border(80);
    }

    Ok(())
}

async fn show_status(config: &Config, token_id: u64) -> error::Result<()> {
    let reader = EvmRpcClient::new(&config.chain);
    let record = reader.rental_record(token_id).await?;

    println!("{}", format!("=== Token #{} ===", token_id).cyan().bold());
    if !record.is_rented {
        println!("Status:     {}", "not rented".yellow());
        return Ok(());
    }

    let remaining = record.remaining_time(chrono::Utc::now().timestamp());
    println!("Status:     {}", "rented".green());
    println!("Renter:     {}", record.renter);
    println!(
        "Contact:    {}",
        record.renter_contact.as_deref().unwrap_or("-")
    );
    println!(
        "Started:    {}",
        utils::format_timestamp(
            &chrono::DateTime::from_timestamp(record.start_time, 0).unwrap_or_default()
        )
    );
    println!("Duration:   {}", utils::format_time(record.duration));
    if remaining > 0 {
        println!("Remaining:  {}", utils::format_time(remaining).green());
    } else {
        println!("Remaining:  {}", "Expired".red());
    }

    Ok(())
}

async fn run_sweep(config: &Config, batch_size: Option<u64>, dry_run: bool) -> error::Result<()> {
    println!("{}", "Sweeping expired rentals...".cyan());

    let client = Arc::new(EvmRpcClient::new(&config.chain));
    let reader: Arc<dyn ChainReader> = client.clone();
    let writer: Arc<dyn ChainWriter> = client;

    let sweeper = ExpirySweeper::new(
        reader,
        writer,
        batch_size.unwrap_or(config.monitor.sweep_batch_size),
        dry_run,
    );
    let summary = sweeper.sweep().await?;

    println!("\n{}", "=== Sweep Results ===".cyan().bold());
    println!("Tokens scanned:  {}", summary.scanned);
    println!("Batches:         {}", summary.batches);
    if summary.failed_batches > 0 {
        println!(
            "Failed batches:  {}",
            summary.failed_batches.to_string().red()
        );
    }
    if dry_run {
        println!("\n{}", "DRY RUN: No transactions were sent".yellow());
    }

    Ok(())
}

fn show_history(config: &Config, limit: usize) -> error::Result<()> {
    let db = Database::new(&config.database.path)?;
    let history = db.recent_notifications(Some(limit))?;

    if history.is_empty() {
        println!("No notifications sent yet");
        return Ok(());
    }

    println!("{}", "Recent Notifications:".yellow());
    utils::print_table_border(90);
    utils::print_table_row(
        &["Sent At", "Token", "Contact", "Renter", "Remaining"],
        &[22, 8, 26, 16, 12],
    );
    utils::print_table_border(90);
    for record in &history {
        utils::print_table_row(
            &[
                &utils::format_timestamp(&record.sent_at),
                &format!("#{}", record.token_id),
                &record.contact,
                &utils::format_address(&record.renter),
                &utils::format_time(record.remaining_secs),
            ],
            &[22, 8, 26, 16, 12],
        );
    }
    utils::print_table_border(90);

    let stats = db.stats()?;
    println!(
        "\nTotal sent: {}  Unique tokens: {}",
        stats.total_sent, stats.unique_tokens
    );

    Ok(())
}

fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Initializing rentwatch...".green());
    let _db = Database::new(&config.database.path)?;
    println!("{}", "✓ Database initialized".green());
    println!("{}", "✓ Configuration loaded".green());
    println!("\n{}", "Configuration:".cyan());
    println!("  RPC URL:                {}", config.chain.rpc_url);
    println!("  Contract:               {}", config.chain.contract_address);
    println!(
        "  Inclusion threshold:    {}s",
        config.monitor.inclusion_threshold_secs
    );
    println!(
        "  Notification threshold: {}s",
        config.monitor.notification_threshold_secs
    );
    println!("  Poll interval:          {}s", config.monitor.poll_interval_secs);
    println!(
        "  Email:                  {}",
        if config.email.is_some() {
            "configured"
        } else {
            "disabled"
        }
    );

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to scan once", "rentwatch check".yellow());
    println!("  {} to start the monitor", "rentwatch watch".yellow());
    println!("  {} to sweep expired rentals", "rentwatch sweep --dry-run".yellow());
    Ok(())
}
