//! Listener implementation for daemon transport sockets.

use std::fs;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use tracing::{debug, info, warn};

use pyjail_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to the configured endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let listener = match endpoint {
            SocketEndpoint::Tcp { host, port } => ListenerKind::Tcp(bind_tcp(host, *port)?),
            SocketEndpoint::Unix { path } => ListenerKind::Unix(bind_unix(path)?),
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Endpoint actually bound; a TCP port of zero is replaced by the port
    /// the kernel picked.
    pub(crate) fn local_endpoint(&self) -> SocketEndpoint {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().map_or_else(
                |_| self.endpoint.clone(),
                |addr| SocketEndpoint::tcp(addr.ip().to_string(), addr.port()),
            ),
            ListenerKind::Unix(_) => self.endpoint.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            ListenerKind::Unix(_) => None,
        }
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        if let Err(error) = match &self.listener {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        } {
            cleanup_unix_socket(&self.endpoint);
            return Err(ListenerError::Configure {
                endpoint: self.endpoint,
                source: error,
            });
        }
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("pyjaild-accept".to_owned())
            .spawn(move || run_accept_loop(&self, &shutdown_flag, &handler))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Stops accepting new connections. Connections already handed to the
    /// handler keep running.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        self.handle.take().map_or(Ok(()), |handle| {
            handle.join().map_err(|_| ListenerError::ThreadPanic)
        })
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let connection_handler = Arc::clone(handler);
                if let Err(error) = thread::Builder::new()
                    .name("pyjaild-conn".to_owned())
                    .spawn(move || connection_handler.handle(stream))
                {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "failed to spawn connection thread"
                    );
                }
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    cleanup_unix_socket(&listener.endpoint);
    debug!(target: LISTENER_TARGET, "socket listener stopped");
}

fn accept_connection(listener: &SocketListener) -> io::Result<Option<ConnectionStream>> {
    let accepted = match &listener.listener {
        ListenerKind::Tcp(tcp) => tcp.accept().and_then(|(stream, _)| {
            stream.set_nonblocking(false)?;
            Ok(ConnectionStream::Tcp(stream))
        }),
        ListenerKind::Unix(unix) => unix.accept().and_then(|(stream, _)| {
            stream.set_nonblocking(false)?;
            Ok(ConnectionStream::Unix(stream))
        }),
    };
    match accepted {
        Ok(stream) => Ok(Some(stream)),
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let unresolved = |source: Option<io::Error>| ListenerError::Resolve {
        host: host.to_owned(),
        port,
        source,
    };
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|error| unresolved(Some(error)))?
        .next()
        .ok_or_else(|| unresolved(None))?;
    TcpListener::bind(addr).map_err(|source| ListenerError::Bind {
        endpoint: SocketEndpoint::tcp(host, addr.port()),
        source,
    })
}

fn bind_unix(path: &Utf8Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        reclaim_stale_socket(path)?;
    }
    UnixListener::bind(path).map_err(|source| ListenerError::Bind {
        endpoint: SocketEndpoint::unix(path),
        source,
    })
}

/// Removes a socket file left behind by a daemon that is no longer running.
fn reclaim_stale_socket(path: &Utf8Path) -> Result<(), ListenerError> {
    let stale = |source: io::Error| ListenerError::StaleSocket {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::symlink_metadata(path).map_err(stale)?;
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::NotASocket {
            path: path.to_path_buf(),
        });
    }
    match UnixStream::connect(path) {
        Ok(_live) => Err(ListenerError::SocketInUse {
            path: path.to_path_buf(),
        }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            debug!(target: LISTENER_TARGET, path = %path, "removing stale socket");
            fs::remove_file(path).map_err(stale)
        }
        Err(error) => Err(stale(error)),
    }
}

fn cleanup_unix_socket(endpoint: &SocketEndpoint) {
    let SocketEndpoint::Unix { path } = endpoint else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        );
    }
}
