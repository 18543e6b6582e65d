use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;

use crate::ipc::{ErrorBody, Route};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to connect to daemon at {}. Is the daemon running?", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("HTTP exchange with the daemon failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Daemon did not answer within {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,

    #[error("Daemon answered {status}: {message}")]
    Status { status: StatusCode, message: String },
}

impl FetchError {
    /// True when nothing listens on the socket file, i.e. it is stale.
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, FetchError::Connect { source, .. } if source.kind() == io::ErrorKind::ConnectionRefused)
    }
}

/// GET `route` from the daemon listening on `socket` and return the body.
///
/// Non-success answers become [`FetchError::Status`] carrying the server's message.
pub async fn fetch(socket: &Path, route: &Route) -> Result<String, FetchError> {
    tokio::time::timeout(REQUEST_TIMEOUT, fetch_inner(socket, route))
        .await
        .map_err(|_| FetchError::Timeout)?
}

async fn fetch_inner(socket: &Path, route: &Route) -> Result<String, FetchError> {
    let stream = UnixStream::connect(socket)
        .await
        .map_err(|source| FetchError::Connect {
            path: socket.to_path_buf(),
            source,
        })?;

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("Client connection error: {}", e);
        }
    });

    let request = Request::get(route.to_string())
        .header(hyper::header::HOST, "localhost")
        .body(Empty::<Bytes>::new())?;

    let response = sender.send_request(request).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    let body = String::from_utf8_lossy(&body).into_owned();

    debug!(url = %route, answer = %body, "Successfully invoked");

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        return Err(FetchError::Status { status, message });
    }

    Ok(body)
}
