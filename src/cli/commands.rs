use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rentwatch")]
#[command(about = "Expiry watcher for NFT rental marketplace contracts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the expiry monitor until interrupted
    Watch {
        /// Poll interval in seconds (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Disable email notifications for this run
        #[arg(long)]
        no_email: bool,
    },

    /// Scan once and print the current expiring rentals
    Check {
        /// Inclusion threshold in seconds (overrides config)
        #[arg(short, long)]
        threshold: Option<i64>,
    },

    /// Show one token's rental state and remaining time
    Status {
        /// Token id to inspect
        token_id: u64,
    },

    /// Submit batch expiry checks for the whole token range
    Sweep {
        /// Tokens per transaction (overrides config)
        #[arg(short, long)]
        batch_size: Option<u64>,

        /// Dry run mode (don't submit transactions)
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recently sent notifications
    History {
        /// Limit number of entries shown
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Initialize the database and validate configuration
    Init,
}
