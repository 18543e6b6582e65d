use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default socket file name, created in the home directory
pub const SOCKET_FILE_NAME: &str = ".sway-qws.sock";

/// Routes served by the control socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Dump the window history, most recent first
    List,
    /// Focus the window at a position; the raw segment is parsed by the handler
    Focus(String),
    /// Shut the daemon down
    Stop,
}

/// JSON body of every non-200 response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorBody {
            message: message.into(),
        }
    }
}

/// Resolve the control socket path: the explicit setting wins, otherwise the
/// default file in the home directory.
pub fn get_socket_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    socket_path_in(explicit, dirs::home_dir())
}

fn socket_path_in(explicit: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    let home = home.context(
        "Setting unspecified: socket-file (no --socket-file given and no home directory found)",
    )?;
    Ok(home.join(SOCKET_FILE_NAME))
}

/// Error returned when a request path matches no route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRouteError(pub String);

impl fmt::Display for ParseRouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no route for '{}'", self.0)
    }
}

impl std::error::Error for ParseRouteError {}

impl FromStr for Route {
    type Err = ParseRouteError;

    /// Parse a request path. A trailing `/` is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim_end_matches('/');
        match path {
            "/list" => return Ok(Route::List),
            "/stop" => return Ok(Route::Stop),
            _ => {}
        }
        match path.strip_prefix("/focus/") {
            Some(num) if !num.is_empty() && !num.contains('/') => Ok(Route::Focus(num.to_string())),
            _ => Err(ParseRouteError(s.to_string())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::List => write!(f, "/list"),
            Route::Focus(num) => write!(f, "/focus/{}", num),
            Route::Stop => write!(f, "/stop"),
        }
    }
}
