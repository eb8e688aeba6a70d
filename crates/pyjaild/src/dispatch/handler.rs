//! Connection handler that answers one request per connection.

use std::sync::Arc;

use tracing::{debug, warn};

use pyjail_runner::{CancelToken, LimitOverrides, SandboxRunner, ScriptRunner};

use super::request::{DaemonRequest, read_request_line};
use super::response::{DaemonMessage, ResponseWriter};
use super::DISPATCH_TARGET;
use super::watcher::DisconnectWatcher;
use crate::transport::{ConnectionHandler, ConnectionStream};

/// Reads a request, runs it through the [`ScriptRunner`], and writes the
/// reply.
pub(crate) struct DispatchConnectionHandler<R> {
    runner: Arc<ScriptRunner<R>>,
    shutdown: CancelToken,
    request_limit: usize,
}

impl<R: SandboxRunner> DispatchConnectionHandler<R> {
    /// Every run is cancelled together with `shutdown`.
    pub(crate) const fn new(
        runner: Arc<ScriptRunner<R>>,
        shutdown: CancelToken,
        request_limit: usize,
    ) -> Self {
        Self {
            runner,
            shutdown,
            request_limit,
        }
    }

    fn dispatch(&self, mut stream: ConnectionStream) {
        let message = match read_request_line(&mut stream, self.request_limit)
            .and_then(|line| line.map(|bytes| DaemonRequest::parse(&bytes)).transpose())
        {
            Ok(Some(request)) => self.route(request, &stream),
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client closed without a request");
                return;
            }
            Err(error) if error.is_client_error() => {
                debug!(target: DISPATCH_TARGET, %error, "bad request");
                DaemonMessage::bad_request(&error)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                return;
            }
        };

        if let Err(error) = ResponseWriter::new(&mut stream).write_message(&message) {
            warn!(target: DISPATCH_TARGET, %error, "failed to write response");
        }
    }

    fn route(&self, request: DaemonRequest, stream: &ConnectionStream) -> DaemonMessage {
        match request {
            DaemonRequest::Health => DaemonMessage::health(self.runner.pool()),
            DaemonRequest::Execute { script, limits } => {
                self.execute(&script, limits.as_ref(), stream)
            }
        }
    }

    fn execute(
        &self,
        script: &str,
        limits: Option<&LimitOverrides>,
        stream: &ConnectionStream,
    ) -> DaemonMessage {
        let cancel = self.shutdown.child();
        let watcher = DisconnectWatcher::spawn(stream, cancel.clone())
            .inspect_err(|error| {
                warn!(
                    target: DISPATCH_TARGET,
                    %error,
                    "running without disconnect detection"
                );
            })
            .ok();

        let outcome = self.runner.execute(script, limits, &cancel);
        if let Some(active) = watcher {
            active.finish();
        }

        match outcome {
            Ok(response) => DaemonMessage::Response(response),
            Err(error) => DaemonMessage::unavailable(&error),
        }
    }
}

impl<R> ConnectionHandler for DispatchConnectionHandler<R>
where
    R: SandboxRunner + 'static,
{
    fn handle(&self, stream: ConnectionStream) {
        self.dispatch(stream);
    }
}
