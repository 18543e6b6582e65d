mod config;
mod control;
mod daemon;
mod history;
mod ipc;
mod lifecycle;
mod listener;
mod menu;
mod remarker;
mod socket_client;
mod socket_server;
mod sway_client;

use anyhow::{Context, Result};
use config::{Command, Config, RofiCommand};
use daemon::DaemonOptions;
use ipc::Route;
use menu::MenuWidths;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

fn init_logging(config: &Config) {
    let parsed = tracing::Level::from_str(&config.log_level);
    let log_level = match (&parsed, config.verbose) {
        (_, true) => tracing::Level::DEBUG,
        (Ok(level), false) => *level,
        (Err(_), false) => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if parsed.is_err() {
        warn!("Unable to parse log level '{}', using info", config.log_level);
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let config = Config::parse();

    init_logging(&config);

    let socket = ipc::get_socket_path(config.socket_file.clone())?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    runtime.block_on(lifecycle::run_with_cancellation(move |token| async move {
        dispatch(config.command, &socket, token).await
    }))
}

async fn dispatch(command: Command, socket: &Path, token: CancellationToken) -> Result<()> {
    match command {
        Command::Run { mark_format, restart } => {
            let options = DaemonOptions { mark_format, restart };
            daemon::run(socket, options, token).await
        }
        Command::List => {
            println!("{}", fetch(socket, Route::List, &token).await?);
            Ok(())
        }
        Command::Focus { num } => focus(socket, num, &token).await,
        Command::Stop => {
            println!("{}", fetch(socket, Route::Stop, &token).await?);
            Ok(())
        }
        Command::Rofi {
            command: RofiCommand::Menu {
                width_class,
                width_title,
            },
        } => {
            let body = fetch(socket, Route::List, &token).await?;
            let windows: Vec<history::WindowRecord> = serde_json::from_str(&body).context("Failed to parse window list")?;
            let workspaces = menu::fetch_workspaces().await?;
            let widths = MenuWidths {
                class: width_class,
                title: width_title,
            };
            for line in menu::format_menu(&windows, &workspaces, widths) {
                println!("{}", line);
            }
            Ok(())
        }
        Command::Rofi {
            command: RofiCommand::Select,
        } => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read selection from stdin")?;
            let num = menu::parse_selection(&input).context("Nothing was selected")?;
            focus(socket, num.to_string(), &token).await
        }
    }
}

async fn focus(socket: &Path, num: String, token: &CancellationToken) -> Result<()> {
    let answer = fetch(socket, Route::Focus(num.clone()), token).await?;
    debug!(answer = %answer, "Successfully changed to window number {}", num);
    Ok(())
}

/// Call the daemon, giving up early when the process is interrupted.
async fn fetch(socket: &Path, route: Route, token: &CancellationToken) -> Result<String> {
    tokio::select! {
        result = socket_client::fetch(socket, &route) => {
            result.with_context(|| format!("Unable to get {}", route))
        }
        _ = token.cancelled() => anyhow::bail!("Interrupted while waiting for {}", route),
    }
}
