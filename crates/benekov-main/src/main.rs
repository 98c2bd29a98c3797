// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Benekov FVE Monitor.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Benekov FVE Monitor - host process
//!
//! Sets up one monitor entry per configured endpoint, logs every sensor
//! update and shuts everything down on Ctrl-C / SIGTERM.

mod config;
mod publisher;

use anyhow::{Context, Result};
use benekov_core::{EndpointConfig, StatePublisher, setup_entry, validate_connection};
use config::AppConfig;
use publisher::TracingPublisher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Delay before a failed entry setup is attempted again
const SETUP_RETRY_DELAY: Duration = Duration::from_secs(30);

enum Mode {
    Run,
    Check,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mode = match args.get(1).map(String::as_str) {
        Some("--help" | "-h") => {
            println!("Benekov FVE Monitor");
            println!("Version: {VERSION}");
            println!();
            println!("Usage: benekov-fve [OPTIONS]");
            println!();
            println!("Options:");
            println!("  -c, --check   Test the connection to every configured endpoint and exit");
            println!("  -h, --help    Print this help message");
            println!("  -v, --version Print version");
            return Ok(());
        }
        Some("--version" | "-v") => {
            println!("{VERSION}");
            return Ok(());
        }
        Some("--check" | "-c") => Mode::Check,
        _ => Mode::Run,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default tracing subscriber")?;

    let config = AppConfig::load()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match mode {
        Mode::Check => runtime.block_on(check_connections(&config)),
        Mode::Run => runtime.block_on(run(config)),
    }
}

async fn check_connections(config: &AppConfig) -> Result<()> {
    let mut failed = 0;
    for entry in &config.entries {
        match validate_connection(entry).await {
            Ok(title) => println!("OK    {} -> {}", entry.url, title),
            Err(e) => {
                failed += 1;
                println!("FAIL  {} [{}] {}", entry.url, e.form_error_key(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} endpoints failed", config.entries.len());
    }
    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    info!("🚀 Starting Benekov FVE Monitor v{}", VERSION);
    info!("📋 Configuration Summary:");
    info!("   Entries: {}", config.entries.len());
    for entry in &config.entries {
        info!(
            "     - {} every {}s (verify_ssl={})",
            entry.url, entry.scan_interval_secs, entry.verify_ssl
        );
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let publisher: Arc<dyn StatePublisher> = Arc::new(TracingPublisher::new());

    let tasks: Vec<JoinHandle<()>> = config
        .entries
        .into_iter()
        .map(|entry| tokio::spawn(run_entry(entry, Arc::clone(&publisher), shutdown_rx.clone())))
        .collect();

    wait_for_signal().await;
    info!("🛑 Shutdown requested");
    if shutdown_tx.send(true).is_err() {
        debug!("No entry task left to stop");
    }

    for task in tasks {
        if let Err(e) = task.await {
            error!("Entry task failed: {}", e);
        }
    }

    info!("👋 Benekov FVE Monitor stopped");
    Ok(())
}

/// Set up one entry, retrying until it succeeds or shutdown is requested,
/// then keep it running until shutdown.
async fn run_entry(
    config: EndpointConfig,
    publisher: Arc<dyn StatePublisher>,
    mut shutdown: watch::Receiver<bool>,
) {
    let entry = loop {
        match setup_entry(&config).await {
            Ok(entry) => break entry,
            Err(e) => {
                warn!(
                    "⚠️ Setup of {} failed ({}): {}. Retrying in {:?}",
                    config.url,
                    e.form_error_key(),
                    e,
                    SETUP_RETRY_DELAY
                );
                tokio::select! {
                    _ = shutdown.wait_for(|stop| *stop) => return,
                    () = tokio::time::sleep(SETUP_RETRY_DELAY) => {}
                }
            }
        }
    };

    info!("✅ {} is running", entry.title());
    entry.attach(&publisher);

    if shutdown.wait_for(|stop| *stop).await.is_err() {
        warn!("Shutdown channel closed, unloading {}", entry.title());
    }
    entry.unload().await;
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
