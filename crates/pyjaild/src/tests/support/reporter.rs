//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use pyjail_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    PreflightPassed,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady(SocketEndpoint),
    ShutdownStarted,
}

/// Records health events and lets tests wait for them.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
    changed: Condvar,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Waits for the listener to come up and returns its endpoint.
    pub fn wait_for_listener(&self, timeout: Duration) -> Option<SocketEndpoint> {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock().expect("health reporter mutex poisoned");
        loop {
            let ready = events.iter().find_map(|event| match event {
                HealthEvent::ListenerReady(endpoint) => Some(endpoint.clone()),
                _ => None,
            });
            if ready.is_some() {
                return ready;
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            events = self
                .changed
                .wait_timeout(events, remaining)
                .expect("health reporter mutex poisoned")
                .0;
        }
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
        self.changed.notify_all();
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn preflight_passed(&self, _config: &Config) {
        self.record(HealthEvent::PreflightPassed);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerReady(endpoint.clone()));
    }

    fn shutdown_started(&self) {
        self.record(HealthEvent::ShutdownStarted);
    }
}
