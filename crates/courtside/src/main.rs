// Courtside operator shell.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Open database
// 5. Load the lineup session and run the command
// 6. Wait briefly for a detached publish to finish

mod cli;
mod report;

use courtside_core::config;
use courtside_core::db;
use courtside_core::lineup::session::{LineupSession, SessionSettings};
use courtside_core::notify::Notifier;

use anyhow::Context;
use tracing::{info, warn};

use clap::Parser;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line (exits on --help or bad input)
    let command = Cli::parse().command;

    // 2. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Courtside starting up: {:?}", command);

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} courts, set rule {:?}",
        config.league.name, config.league.courts, config.scoring.set_rule
    );

    // 4. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 5. Load the session and run the command
    let settings = SessionSettings::from_config(&config);
    let match_id = command.match_id();
    let mut session = LineupSession::load(&db, match_id, &settings)
        .with_context(|| format!("failed to load match {match_id}"))?;

    let mut publish = None;
    match command {
        Command::Show { .. } => {
            print!("{}", report::render(&session));
        }
        Command::Recompute { .. } => {
            let receipt = session
                .save(&db)
                .with_context(|| format!("failed to save match {match_id}"))?;
            match receipt.aggregate {
                Some(agg) => println!(
                    "Match {match_id}: {} ({}), {} courts, {} sets",
                    agg.result,
                    agg.summary,
                    receipt.lineup_ids.len(),
                    receipt.scores_written
                ),
                None => println!("Match {match_id}: no scored court; stored result unchanged"),
            }
        }
        Command::Publish { .. } => {
            let notifier =
                Notifier::from_config(&config.notifications).context("failed to set up notifier")?;
            if !notifier.is_active() {
                warn!("Publish requested but notifications are disabled");
                println!("Notifications are disabled; lineup saved without publishing");
            }
            let published = session
                .save_and_publish(&db, &notifier)
                .with_context(|| format!("failed to save match {match_id}"))?;
            println!(
                "Match {match_id}: saved {} lineups",
                published.receipt.lineup_ids.len()
            );
            publish = published.publish;
        }
    }

    // 6. Cleanup: give a detached publish a moment to complete (with timeout)
    if let Some(handle) = publish {
        let finished = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            let _ = handle.await;
        })
        .await;
        if finished.is_err() {
            warn!("Publish for match {} still running at exit; abandoning it", match_id);
        }
    }

    info!("Courtside finished");
    Ok(())
}

/// Initialize tracing to log to a file (stdout carries command output).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("courtside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtside=info,courtside_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
