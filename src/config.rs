use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Listen to Sway window events and serve the window history
    #[command(visible_alias = "start")]
    Run {
        /// Mark format, `%d` is replaced by the window number; empty disables marks
        #[arg(short, long, env = "SWAY_QWS_MARK_FORMAT", default_value = "%d")]
        mark_format: String,

        /// Stop an already running instance instead of failing
        #[arg(short = 'R', long)]
        restart: bool,
    },
    /// Print the window history as a JSON array
    #[command(visible_alias = "ls")]
    List,
    /// Focus a window by number: 0 is the current one, 1 the previous,
    /// negative numbers count from the least recent (-1 is the last)
    Focus {
        #[arg(allow_hyphen_values = true)]
        num: String,
    },
    /// Stop the running instance
    Stop,
    /// rofi integration
    Rofi {
        #[command(subcommand)]
        command: RofiCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum RofiCommand {
    /// Print the window list as a rofi menu
    Menu {
        /// Window class column width
        #[arg(long = "width-class", default_value_t = 20)]
        width_class: usize,

        /// Window title column width
        #[arg(long = "width-title", default_value_t = 80)]
        width_title: usize,
    },
    /// Read the chosen menu line from stdin and focus that window
    Select,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sway-qws")]
#[command(about = "Quick window select for Sway: jump back to recently focused windows", long_about = None)]
pub struct Config {
    /// Socket file for communication [default: ~/.sway-qws.sock]
    #[arg(short, long = "socket-file", env = "SWAY_QWS_SOCKET", global = true)]
    pub socket_file: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, env = "SWAY_QWS_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Enable verbose logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }
}
