//! Fitness Coach
//!
//! Interactive terminal client for the fitness coaching API.
//!
//! ## Architecture
//!
//! - Facades: every read and write, with fallback to cache and demo data
//! - Probe: background health checks that track backend availability
//! - Sync: replay of writes queued while offline
//! - Chat: assistant conversation with embedded plan and progress actions

use anyhow::Result;
use fitness_coach_client::{config, ClientState, SyncReport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Commands: status, plans, nutrition, progress, sync, help, quit. \
Anything else is sent to the assistant.";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        backend = %config.api.base_url,
        "Starting Fitness Coach"
    );

    let state = ClientState::from_config(config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let probe = tokio::spawn(state.probe()?.run(shutdown_rx));
    let banners = tokio::spawn(print_notifications(state.notifier.subscribe()));

    println!("{}", HELP);
    tokio::select! {
        result = repl(&state) => {
            if let Err(e) = result {
                error!(error = %e, "Input loop failed");
            }
        }
        _ = shutdown_signal() => {}
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = probe.await {
        warn!(error = %e, "Probe task ended abnormally");
    }
    banners.abort();

    info!("Shutdown complete");
    Ok(())
}

async fn repl(state: &ClientState) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "status" => {
                let available = state.status.is_available();
                println!(
                    "Backend {} | pending changes: {} | last check: {}",
                    if available { "online" } else { "offline" },
                    state.cache.pending_count(),
                    state
                        .status
                        .last_checked()
                        .map_or_else(|| "never".to_string(), |t| t.to_rfc3339()),
                );
            }
            "plans" => {
                let plans = state.workouts.list_plans().await;
                println!("Workout plans ({}):", plans.source);
                for plan in &plans.data {
                    let id = plan.id.map_or_else(|| "-".to_string(), |id| id.to_string());
                    println!("  [{}] {} ({} sessions)", id, plan.name, plan.sessions.len());
                }
            }
            "nutrition" => {
                let plans = state.nutrition.list_plans().await;
                println!("Nutrition plans ({}):", plans.source);
                for plan in &plans.data {
                    let kcal = plan
                        .daily_calories
                        .map_or_else(|| "?".to_string(), |c| format!("{:.0}", c));
                    println!("  {} ({} kcal, {} meals)", plan.name, kcal, plan.meals.len());
                }
            }
            "progress" => {
                let entries = state.progress.list_entries().await;
                println!("Progress ({}):", entries.source);
                for entry in &entries.data {
                    let weight = entry
                        .weight
                        .map_or_else(|| "?".to_string(), |w| format!("{:.1}", w));
                    println!("  {}  {} kg", entry.date, weight);
                }
            }
            "sync" => print_report(&state.sync.sync_all().await),
            message => {
                let outcome = state.chat.send(message).await;
                println!("{}", outcome.message);
                for action in &outcome.actions {
                    println!("  + {} ({})", action.summary, action.source);
                }
                for failure in &outcome.errors {
                    println!("  ! {}", failure);
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("{}", report.message);
    for failure in &report.failures {
        println!("  ! {}", failure);
    }
}

async fn print_notifications(mut rx: broadcast::Receiver<fitness_coach_client::Notification>) {
    loop {
        match rx.recv().await {
            Ok(notification) => println!("** {} **", notification),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed notifications");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "fitness_coach_client=info".into()
        } else {
            "fitness_coach_client=debug,reqwest=warn".into()
        }
    });

    // Logs go to stderr so they never interleave with command output
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
