use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::control::ControlService;
use crate::ipc::{ErrorBody, Route};
use crate::socket_client::fetch;
use crate::sway_client::SwayCommander;

/// How long in-flight requests get to finish once shutdown starts
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between asking a running instance to stop and binding again
const RESTART_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum BindError {
    #[error("Another instance is already running on {}", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("Failed to bind socket at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Who holds the socket path right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant {
    Vacant,
    /// A daemon answered the probe
    Live,
    /// The file exists but nothing listens on it
    Stale,
    /// Something is there but did not answer properly
    Unresponsive,
}

async fn probe(socket: &Path) -> Occupant {
    if !socket.exists() {
        return Occupant::Vacant;
    }
    match fetch(socket, &Route::List).await {
        Ok(_) => Occupant::Live,
        Err(e) if e.is_connection_refused() => Occupant::Stale,
        Err(e) => {
            debug!("Probe of {} failed: {}", socket.display(), e);
            Occupant::Unresponsive
        }
    }
}

/// Device and inode of whatever sits at `path` now
fn file_identity(path: &Path) -> Option<(u64, u64)> {
    fs::symlink_metadata(path).ok().map(|m| (m.dev(), m.ino()))
}

/// Guard that removes the socket file when dropped.
///
/// The file is only removed while it is still the one this process bound. A
/// newer instance may have replaced it during our shutdown drain.
#[derive(Debug)]
pub struct SocketGuard {
    path: PathBuf,
    identity: Option<(u64, u64)>,
}

impl SocketGuard {
    fn new(path: &Path) -> Self {
        SocketGuard {
            path: path.to_path_buf(),
            identity: file_identity(path),
        }
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match file_identity(&self.path) {
            None => debug!("Socket file at {} is already gone", self.path.display()),
            Some(current) if Some(current) != self.identity => {
                info!("Socket file at {} belongs to another instance now, leaving it", self.path.display());
            }
            Some(_) => match fs::remove_file(&self.path) {
                Ok(()) => info!("Removed socket file at {}", self.path.display()),
                Err(e) => error!("Failed to remove socket file: {}", e),
            },
        }
    }
}

/// Bind the control socket, making sure only one daemon owns it.
///
/// A socket left behind by a dead process is removed first. A live daemon is
/// an error unless `restart` is set, in which case it is asked to stop.
pub async fn bind(socket: &Path, restart: bool) -> Result<(UnixListener, SocketGuard), BindError> {
    let mut stop_requested = false;

    loop {
        match probe(socket).await {
            Occupant::Live if restart && !stop_requested => {
                info!("Stopping the instance running on {}", socket.display());
                if let Err(e) = fetch(socket, &Route::Stop).await {
                    warn!("Unable to stop existing instance: {}", e);
                }
                stop_requested = true;
                tokio::time::sleep(RESTART_WAIT).await;
                continue;
            }
            Occupant::Live => return Err(BindError::AlreadyRunning(socket.to_path_buf())),
            Occupant::Stale => {
                info!("Removing stale socket at {}", socket.display());
                if let Err(source) = fs::remove_file(socket)
                    && source.kind() != io::ErrorKind::NotFound
                {
                    return Err(BindError::Io {
                        path: socket.to_path_buf(),
                        source,
                    });
                }
            }
            Occupant::Vacant | Occupant::Unresponsive => {}
        }
        break;
    }

    let listener = UnixListener::bind(socket).map_err(|source| BindError::Io {
        path: socket.to_path_buf(),
        source,
    })?;

    info!("Control socket listening at {}", socket.display());

    Ok((listener, SocketGuard::new(socket)))
}

/// Accept and serve control connections until `token` is cancelled, then give
/// in-flight requests [`SHUTDOWN_TIMEOUT`] to finish.
pub async fn serve<C: SwayCommander>(
    listener: UnixListener,
    service: Arc<ControlService<C>>,
    token: CancellationToken,
) {
    serve_with_timeout(listener, service, token, SHUTDOWN_TIMEOUT).await
}

pub async fn serve_with_timeout<C: SwayCommander>(
    listener: UnixListener,
    service: Arc<ControlService<C>>,
    token: CancellationToken,
    drain: Duration,
) {
    let tracker = TaskTracker::new();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    tracker.spawn(handle_client(stream, service.clone(), token.clone()));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
        }
    }

    drop(listener);
    tracker.close();

    if tokio::time::timeout(drain, tracker.wait()).await.is_err() {
        warn!(
            "{} control connections still open after {:?}, abandoning them",
            tracker.len(),
            drain
        );
    }
    info!("Control service stopped");
}

/// Serve one client connection, winding it down gracefully on shutdown.
async fn handle_client<C: SwayCommander>(
    stream: UnixStream,
    service: Arc<ControlService<C>>,
    token: CancellationToken,
) {
    let svc = service_fn(move |req| handle_request(service.clone(), req));
    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), svc);
    tokio::pin!(conn);

    tokio::select! {
        res = conn.as_mut() => {
            if let Err(e) = res {
                debug!("Client connection error: {}", e);
            }
        }
        _ = token.cancelled() => {
            conn.as_mut().graceful_shutdown();
            if let Err(e) = conn.await {
                debug!("Client connection error during shutdown: {}", e);
            }
        }
    }
}

async fn handle_request<C: SwayCommander>(
    service: Arc<ControlService<C>>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    debug!(method = %req.method(), path = %path, "Received control request");

    let response = match path.parse::<Route>() {
        Ok(Route::List) => json_response(StatusCode::OK, &service.list()),
        Ok(Route::Focus(num)) => match service.focus(&num).await {
            Ok(window) => json_response(StatusCode::OK, &window),
            Err(e) => {
                warn!("Focus request failed: {}", e);
                json_response(StatusCode::BAD_REQUEST, &ErrorBody::new(e.to_string()))
            }
        },
        Ok(Route::Stop) => {
            service.stop();
            response(StatusCode::OK, "text/plain; charset=utf-8", b"done".to_vec())
        }
        Err(e) => {
            warn!("Unknown control request: {}", path);
            json_response(StatusCode::NOT_FOUND, &ErrorBody::new(e.to_string()))
        }
    };

    Ok(response)
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => response(status, "application/json", body),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain; charset=utf-8",
                e.to_string().into_bytes(),
            )
        }
    }
}

fn response(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
