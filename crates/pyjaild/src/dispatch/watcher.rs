//! Cancels a run when its client goes away.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use pyjail_runner::CancelToken;

use super::DISPATCH_TARGET;
use crate::transport::ConnectionStream;

/// How long one read blocks before the finished flag is checked again.
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Reads the otherwise idle connection while a script runs.
///
/// End of stream or a reset cancels the token. Stray bytes are ignored
/// because a connection carries a single request.
pub(crate) struct DisconnectWatcher {
    finished: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl DisconnectWatcher {
    /// Starts watching a clone of `stream`.
    pub(crate) fn spawn(stream: &ConnectionStream, cancel: CancelToken) -> io::Result<Self> {
        let reader = stream.try_clone()?;
        reader.set_read_timeout(Some(WATCH_INTERVAL))?;
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let handle = thread::Builder::new()
            .name("pyjaild-watch".to_owned())
            .spawn(move || watch(reader, &cancel, &flag))?;
        Ok(Self { finished, handle })
    }

    /// Stops watching and waits for the thread to exit.
    pub(crate) fn finish(self) {
        self.finished.store(true, Ordering::SeqCst);
        if self.handle.join().is_err() {
            debug!(target: DISPATCH_TARGET, "disconnect watcher panicked");
        }
    }
}

fn watch(mut reader: ConnectionStream, cancel: &CancelToken, finished: &AtomicBool) {
    let mut scratch = [0_u8; 256];
    while !finished.load(Ordering::SeqCst) {
        match reader.read(&mut scratch) {
            Ok(0) => {
                info!(target: DISPATCH_TARGET, "client disconnected; cancelling run");
                cancel.cancel();
                return;
            }
            Ok(_) => {}
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(error) => {
                info!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    "client connection failed; cancelling run"
                );
                cancel.cancel();
                return;
            }
        }
    }
}
