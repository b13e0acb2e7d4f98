//! LOLBin Monitor - Suspicious Activity Tray Alerts
//!
//! Polls the detection backend for LOLBin events and surfaces them as
//! popup notifications behind a tray icon.
//! For autostart: Use Task Scheduler.

// Only show console in console mode
#![cfg_attr(windows, windows_subsystem = "windows")]

mod alert;
mod backend;
mod config;
mod dashboard;
mod icon;
mod logger;
mod notifier;
mod poller;
mod seen;

#[cfg(windows)]
#[path = "tray_windows.rs"]
mod tray;
#[cfg(not(windows))]
#[path = "tray_headless.rs"]
mod tray;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::thread;
use tracing::info;

#[cfg(windows)]
use windows::Win32::System::Console::{AllocConsole, AttachConsole, ATTACH_PARENT_PROCESS};

use config::Config;

/// LOLBin Monitor - tray alerts for suspicious process executions
#[derive(Parser)]
#[command(name = "lolbin_monitor")]
#[command(about = "Tray alerts for LOLBin detections")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend API base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Dashboard base URL
    #[arg(long)]
    dashboard_url: Option<String>,

    /// Seconds between alert checks
    #[arg(long)]
    check_interval: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run with console window (for debugging)
    Console,
    /// Set up Task Scheduler autostart
    Install,
    /// Remove Task Scheduler autostart
    Uninstall,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Console) => {
            // Create own console (don't attach to parent)
            // User can close console with X button
            #[cfg(windows)]
            unsafe {
                let _ = AllocConsole();
            }

            logger::init_console_logger()?;
            info!("LOLBin Monitor started in console mode");

            run_app(&cli)?;
        }
        Some(Commands::Install) => {
            install_autostart()?;
        }
        Some(Commands::Uninstall) => {
            uninstall_autostart()?;
        }
        None => {
            // Normal start (without console) - for autostart
            logger::init_file_logger()?;
            info!("LOLBin Monitor started");

            run_app(&cli)?;
        }
    }

    Ok(())
}

/// Main application logic
fn run_app(cli: &Cli) -> Result<()> {
    let mut config = Config::load();
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(url) = &cli.dashboard_url {
        config.dashboard_url = url.clone();
    }
    if let Some(seconds) = cli.check_interval {
        config.check_interval_seconds = seconds;
    }
    let config = Arc::new(config);

    // Alert log worker
    let (alert_log_tx, alert_log_rx) = bounded(256);
    let log_worker = thread::spawn(move || {
        logger::alert_log_worker(alert_log_rx);
    });

    // Poller (scheduled + manual checks run through one thread)
    let (poller_handle, poller_join) = poller::start(config.clone(), alert_log_tx)?;

    // Startup notification
    notifier::show_startup(&config);

    // CTRL+C Handler - can fail with windows_subsystem="windows"
    let _ = ctrlc::set_handler(move || {
        info!("CTRL+C received, shutting down...");
        tray::request_exit();
    });

    // Tray run loop (blocks until Exit)
    tray::run(config, poller_handle.clone()).map_err(|e| anyhow::anyhow!(e))?;

    // Cleanup: stop polling, close open popups, drain the alert log
    poller_handle.shutdown();
    notifier::dismiss_all();
    let _ = poller_join.join();
    let _ = log_worker.join();

    info!("LOLBin Monitor ended");
    Ok(())
}

/// Sets up autostart via Task Scheduler
#[cfg(windows)]
fn install_autostart() -> Result<()> {
    // Console for output
    unsafe {
        if AttachConsole(ATTACH_PARENT_PROCESS).is_err() {
            let _ = AllocConsole();
        }
    }

    let exe_path = std::env::current_exe()?;
    let exe_str = exe_path.to_string_lossy();

    println!("Setting up autostart...");

    // Create task with schtasks
    let output = std::process::Command::new("schtasks")
        .args([
            "/Create",
            "/TN", "LolbinMonitor",
            "/TR", &format!("\"{}\"", exe_str),
            "/SC", "ONLOGON",
            "/F",
        ])
        .output()?;

    if output.status.success() {
        println!("Autostart configured!");
        println!("LOLBin Monitor will start automatically at logon.");
        println!();
        println!("Starting LOLBin Monitor now...");

        // Start program directly (no arguments = normal mode)
        let _ = std::process::Command::new(&exe_path).spawn();

        println!("LOLBin Monitor is running! (Check tray icon)");
        println!();
        println!("To remove: lolbin_monitor uninstall");
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        println!("Error setting up: {}", stderr);
    }

    Ok(())
}

#[cfg(not(windows))]
fn install_autostart() -> Result<()> {
    anyhow::bail!("autostart setup is only supported on Windows")
}

/// Removes autostart
#[cfg(windows)]
fn uninstall_autostart() -> Result<()> {
    // Console for output
    unsafe {
        if AttachConsole(ATTACH_PARENT_PROCESS).is_err() {
            let _ = AllocConsole();
        }
    }

    println!("Removing autostart...");

    let output = std::process::Command::new("schtasks")
        .args(["/Delete", "/TN", "LolbinMonitor", "/F"])
        .output()?;

    if output.status.success() {
        println!("Autostart removed!");
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not exist") {
            println!("No autostart task found.");
        } else {
            println!("Error: {}", stderr);
        }
    }

    Ok(())
}

#[cfg(not(windows))]
fn uninstall_autostart() -> Result<()> {
    anyhow::bail!("autostart removal is only supported on Windows")
}
