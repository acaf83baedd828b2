//! Petnook moderation console
//!
//! Operator CLI for bans, chat restrictions and auth rate limits.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use petnook_core::config::{default_database_path, load_config};
use petnook_core::tracing_init::{default_filter, init_tracing};
use petnook_core::{Clock, SystemClock};

use petnook_moderation::console::ModerationConsole;
use petnook_moderation::notifications::NotificationDispatcher;
use petnook_moderation::punishment::PunishmentService;
use petnook_moderation::rate_limit::{ActionKind, RateLimitRules, RateLimiter};
use petnook_moderation::storage::ModerationDatabase;

#[derive(Parser, Debug)]
#[command(name = "petnook-admin")]
#[command(version, about = "Petnook moderation console - bans, chat restrictions, rate limits")]
struct Args {
    /// Path to the moderation `SQLite` database.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Directory containing `.petnook/settings.json` (defaults to the current directory).
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ban a user for a number of days (e.g. `3` or `3d`).
    Ban {
        user_id: String,
        duration: String,
        /// Acting administrator.
        #[arg(long, env = "PETNOOK_ADMIN")]
        admin: String,
    },
    /// Lift a user's ban and restore their profile and content.
    Unban { user_id: String },
    /// Restrict a user's chat (e.g. `12h`, `3d`; a bare number means hours).
    Restrict {
        user_id: String,
        duration: String,
        /// Shown to the user; required.
        #[arg(long)]
        reason: Option<String>,
        /// Acting administrator.
        #[arg(long, env = "PETNOOK_ADMIN")]
        admin: String,
    },
    /// Lift a user's chat restriction.
    Unrestrict { user_id: String },
    /// Show the punishments currently in force for a user.
    Status { user_id: String },
    /// Inspect or clear auth rate limits.
    Limit {
        #[command(subcommand)]
        action: LimitAction,
    },
    /// List a user's moderation notifications.
    Notifications { user_id: String },
}

#[derive(Subcommand, Debug)]
enum LimitAction {
    /// Show the current decision for an identifier.
    Check {
        /// `login`, `signup` or `email_verification`.
        action: ActionKind,
        identifier: String,
    },
    /// Clear failed attempts for an identifier.
    Reset {
        action: ActionKind,
        identifier: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let project_dir = match args.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let config = load_config(Some(project_dir.as_path()))?;

    init_tracing(
        &default_filter(env!("CARGO_PKG_NAME"), &config.log_level),
        args.log_json,
    );

    let db_path = args
        .db_path
        .or_else(|| config.storage.database_path.clone())
        .or_else(default_database_path)
        .context("No database path configured. Use --db-path")?;
    info!(path = %db_path.display(), "Opening moderation database");
    let db = ModerationDatabase::open(&db_path).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier = NotificationDispatcher::new(
        db.clone(),
        clock.clone(),
        config.notifications.dedup_window_secs,
    );
    let punishments = PunishmentService::new(
        db.clone(),
        notifier.clone(),
        clock.clone(),
        config.punishment.clone(),
    );
    let limiter = RateLimiter::new(db.clone(), RateLimitRules::from_config(&config), clock);
    let console = ModerationConsole::new(punishments, limiter, notifier);

    let result = run(&console, args.command).await;
    db.close().await;
    result
}

async fn run(console: &ModerationConsole, command: Command) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match command {
        Command::Ban {
            user_id,
            duration,
            admin,
        } => writeln!(out, "{}", console.ban(&user_id, &duration, &admin).await?)?,
        Command::Unban { user_id } => writeln!(out, "{}", console.unban(&user_id).await?)?,
        Command::Restrict {
            user_id,
            duration,
            reason,
            admin,
        } => writeln!(
            out,
            "{}",
            console
                .restrict(&user_id, &duration, reason.as_deref(), &admin)
                .await?
        )?,
        Command::Unrestrict { user_id } => {
            writeln!(out, "{}", console.unrestrict(&user_id).await?)?;
        }
        Command::Status { user_id } => writeln!(out, "{}", console.status(&user_id).await?)?,
        Command::Limit { action } => match action {
            LimitAction::Check { action, identifier } => {
                writeln!(out, "{}", console.limit_check(action, &identifier).await)?;
            }
            LimitAction::Reset { action, identifier } => {
                writeln!(out, "{}", console.limit_reset(action, &identifier).await)?;
            }
        },
        Command::Notifications { user_id } => {
            let lines = console.notifications(&user_id).await?;
            if lines.is_empty() {
                writeln!(out, "No notifications for {user_id}")?;
            }
            for line in lines {
                writeln!(out, "{line}")?;
            }
        }
    }
    Ok(())
}
