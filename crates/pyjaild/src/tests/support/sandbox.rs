//! Scripted [`SandboxRunner`] doubles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use mockall::mock;

use pyjail_runner::{
    CancelToken, ExecutionOutcome, ExecutionRequest, ExitState, InfrastructureError,
    SandboxRunner,
};

mock! {
    pub Runner {}
    impl SandboxRunner for Runner {
        fn run(
            &self,
            request: &ExecutionRequest,
            cancel: &CancelToken,
        ) -> Result<ExecutionOutcome, InfrastructureError>;
    }
}

/// What the fake sandbox does when launched.
#[derive(Debug, Clone, Default)]
pub enum SandboxScript {
    /// Any launch fails the test.
    #[default]
    NeverLaunched,
    /// The script completes with `stdout` and a raw result-channel payload.
    Completes { stdout: String, channel: String },
    /// The isolation tool is missing.
    ToolMissing,
    /// The run lasts until cancelled, recording what it saw.
    WaitsForCancel {
        started: Arc<AtomicBool>,
        cancelled: Arc<AtomicBool>,
    },
}

/// Longest a cancellable fake run lasts before giving up.
const CANCEL_PATIENCE: Duration = Duration::from_secs(5);

/// Builds a mock following `script`.
#[must_use]
pub fn scripted_runner(script: SandboxScript) -> MockRunner {
    let mut runner = MockRunner::new();
    match script {
        SandboxScript::NeverLaunched => {
            runner.expect_run().never();
        }
        SandboxScript::Completes { stdout, channel } => {
            runner
                .expect_run()
                .returning(move |_, _| Ok(outcome(ExitState::Completed, &stdout, Some(&channel))));
        }
        SandboxScript::ToolMissing => {
            runner.expect_run().returning(|_, _| {
                Err(InfrastructureError::IsolationUnavailable {
                    tool: "/usr/local/bin/pyjail-cage".into(),
                    source: Arc::new(std::io::Error::from(std::io::ErrorKind::NotFound)),
                })
            });
        }
        SandboxScript::WaitsForCancel { started, cancelled } => {
            runner.expect_run().returning(move |_, cancel| {
                started.store(true, Ordering::SeqCst);
                let deadline = Instant::now() + CANCEL_PATIENCE;
                while !cancel.is_cancelled() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(10));
                }
                cancelled.store(cancel.is_cancelled(), Ordering::SeqCst);
                Ok(outcome(ExitState::Killed, "", None))
            });
        }
    }
    runner
}

fn outcome(state: ExitState, stdout: &str, channel: Option<&str>) -> ExecutionOutcome {
    let killed = state == ExitState::Killed;
    ExecutionOutcome {
        state,
        stdout: stdout.to_owned(),
        stdout_truncated: false,
        result_channel: channel.map(str::to_owned),
        exit_code: (!killed).then_some(0),
        signal: killed.then_some(9),
        stderr: String::new(),
        wall_timeout_ms: 5_000,
        elapsed: Duration::from_millis(5),
    }
}
