//! Execution requests.

use std::sync::atomic::{AtomicU64, Ordering};

use pyjail_syntax::AcceptedScript;

use crate::harness::{HarnessPayload, HarnessSettings};
use crate::limits::ResourceLimits;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// A harness-wrapped script and the limits it runs under.
///
/// Built only from an [`AcceptedScript`], so a rejected submission can never
/// reach the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    run_id: u64,
    payload: HarnessPayload,
    limits: ResourceLimits,
}

impl ExecutionRequest {
    /// Wraps `accepted` and assigns a process-unique run id.
    #[must_use]
    pub fn build(
        accepted: AcceptedScript,
        limits: ResourceLimits,
        settings: HarnessSettings,
    ) -> Self {
        Self {
            run_id: NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed),
            payload: HarnessPayload::wrap(accepted, settings),
            limits,
        }
    }

    /// Identifier used to correlate log events for this run.
    #[must_use]
    pub const fn run_id(&self) -> u64 {
        self.run_id
    }

    /// The wrapped script.
    #[must_use]
    pub const fn payload(&self) -> &HarnessPayload {
        &self.payload
    }

    /// Limits for this run.
    #[must_use]
    pub const fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}
