//! Dinner poll bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p dinner-telegram
//! ```

use std::path::PathBuf;

use clap::Parser;
use dinner_core::{config, BotSettings};
use dinner_telegram::{DinnerBot, DEFAULT_WEBHOOK_PORT};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Dinner poll bot - collect daily dinner replies over Telegram
#[derive(Parser, Debug)]
#[command(name = "dinner-telegram")]
#[command(about = "Telegram bot that polls a group about dinner and reports the tally")]
struct Args {
    /// Public URL for webhook mode (default: long polling)
    #[arg(long, env = "TELEGRAM_WEBHOOK_URL")]
    webhook_url: Option<Url>,

    /// Webhook listen port
    #[arg(short, long, default_value_t = DEFAULT_WEBHOOK_PORT)]
    port: u16,

    /// Reply database path (overrides DINNER_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Roster file path (overrides DINNER_USERS_CONFIG)
    #[arg(long)]
    users_config: Option<PathBuf>,

    /// Do not send scheduled notifications from this process
    #[arg(long)]
    no_scheduler: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    config::load_env_files();

    let filter = match args.verbose {
        0 => "dinner_telegram=info,dinner_core=info,teloxide=warn",
        1 => "dinner_telegram=debug,dinner_core=debug,dinner_persistence=debug,teloxide=info",
        2 => "dinner_telegram=trace,dinner_core=trace,dinner_persistence=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create all directories");
    }

    let mut settings = BotSettings::from_env();
    if let Some(db) = args.db {
        settings.db_path = db;
    }
    if let Some(users_config) = args.users_config {
        settings.users_config = users_config;
    }
    if args.no_scheduler {
        settings.run_scheduler = false;
    }

    let bot = DinnerBot::new(settings)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[dinner] Dinner Poll Bot");
            println!("   Bot: @{}", username);
            println!("   Mode: {}", if args.webhook_url.is_some() { "webhook" } else { "polling" });
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("   Press Ctrl+C to stop\n");

    match args.webhook_url {
        Some(url) => bot.start_webhook(url, args.port).await?,
        None => bot.start_polling().await?,
    }

    Ok(())
}
