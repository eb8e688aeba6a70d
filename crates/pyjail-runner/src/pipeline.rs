//! Validation, execution, and assembly behind one call.

use std::time::Duration;

use pyjail_config::Config;
use pyjail_syntax::{SyntaxError, ValidationPolicy, ValidationVerdict, Validator};
use tracing::{debug, error, info};

use crate::error::InfrastructureError;
use crate::executor::{CancelToken, SandboxRunner};
use crate::harness::HarnessSettings;
use crate::limits::{LimitOverrides, ResourceLimits};
use crate::outcome::{ExecutionResponse, ParserSettings, assemble};
use crate::pool::SlotPool;
use crate::request::ExecutionRequest;

/// Tracing target for pipeline events.
const PIPELINE_TARGET: &str = "pyjail_runner::pipeline";

/// Runs submitted scripts end to end.
///
/// Rejected scripts are answered without touching the sandbox. Accepted
/// scripts wait for a [`SlotPool`] permit, run through the
/// [`SandboxRunner`], and are assembled into an [`ExecutionResponse`].
#[derive(Debug)]
pub struct ScriptRunner<R> {
    validator: Validator,
    runner: R,
    pool: SlotPool,
    queue_timeout: Duration,
    limits: ResourceLimits,
    harness: HarnessSettings,
    parser: ParserSettings,
}

impl<R: SandboxRunner> ScriptRunner<R> {
    /// Builds a pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError`] if the Python grammar cannot be loaded.
    pub fn new(config: &Config, runner: R) -> Result<Self, SyntaxError> {
        Ok(Self {
            validator: Validator::new(ValidationPolicy::from_config(config))?,
            runner,
            pool: SlotPool::new(config.max_concurrent_runs()),
            queue_timeout: Duration::from_millis(config.queue_timeout_ms()),
            limits: ResourceLimits::from_config(config),
            harness: HarnessSettings::from_config(config),
            parser: ParserSettings::from_config(config),
        })
    }

    /// Slots shared by concurrent runs.
    #[must_use]
    pub const fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// Deployment limits before per-request overrides.
    #[must_use]
    pub const fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Validates and runs `source`.
    ///
    /// Script failures are reported inside the response; only conditions
    /// that stop any script from running surface as errors.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureError`] when no slot is free in time or the
    /// sandbox cannot be launched.
    pub fn execute(
        &self,
        source: &str,
        overrides: Option<&LimitOverrides>,
        cancel: &CancelToken,
    ) -> Result<ExecutionResponse, InfrastructureError> {
        let accepted = match self.validator.validate(source) {
            ValidationVerdict::Accepted(accepted) => accepted,
            ValidationVerdict::Rejected(rejection) => {
                info!(
                    target: PIPELINE_TARGET,
                    reason = rejection.reason().as_str(),
                    bytes = source.len(),
                    "script rejected"
                );
                return Ok(ExecutionResponse::rejected(&rejection));
            }
        };

        let limits = overrides.map_or(self.limits, |requested| {
            self.limits.tightened_by(requested)
        });
        let request = ExecutionRequest::build(accepted, limits, self.harness);
        let run_id = request.run_id();

        let permit = self.pool.acquire(self.queue_timeout).inspect_err(|failure| {
            info!(target: PIPELINE_TARGET, run_id, error = %failure, "no sandbox slot");
        })?;
        debug!(
            target: PIPELINE_TARGET,
            run_id,
            available_slots = self.pool.available(),
            "sandbox slot acquired"
        );

        let outcome = self.runner.run(&request, cancel).inspect_err(|failure| {
            if failure.is_fatal() {
                error!(
                    target: PIPELINE_TARGET,
                    run_id,
                    reason = failure.reason(),
                    error = %failure,
                    "sandbox infrastructure failure"
                );
            }
        });
        drop(permit);
        Ok(assemble(outcome?, &self.parser))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use mockall::mock;
    use mockall::predicate::always;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::outcome::{ExecutionOutcome, ExitState};

    mock! {
        Runner {}
        impl SandboxRunner for Runner {
            fn run(
                &self,
                request: &ExecutionRequest,
                cancel: &CancelToken,
            ) -> Result<ExecutionOutcome, InfrastructureError>;
        }
    }

    fn completed(stdout: &str, channel: &str, wall_timeout_ms: u64) -> ExecutionOutcome {
        ExecutionOutcome {
            state: ExitState::Completed,
            stdout: stdout.to_owned(),
            stdout_truncated: false,
            result_channel: Some(channel.to_owned()),
            exit_code: Some(0),
            signal: None,
            stderr: String::new(),
            wall_timeout_ms,
            elapsed: Duration::from_millis(5),
        }
    }

    #[fixture]
    fn config() -> Config {
        Config::default()
    }

    #[rstest]
    fn rejected_scripts_never_reach_the_sandbox(config: Config) {
        let mut runner = MockRunner::new();
        runner.expect_run().never();
        let pipeline = ScriptRunner::new(&config, runner).expect("pipeline");

        let response = pipeline
            .execute("def foo():\n    return {\"x\": 1}\n", None, &CancelToken::new())
            .expect("response");
        assert_eq!(response.stdout(), "");
        assert!(
            response
                .error()
                .is_some_and(|error| error.contains("must define main"))
        );
    }

    #[rstest]
    fn oversized_scripts_are_rejected_before_running(config: Config) {
        let mut runner = MockRunner::new();
        runner.expect_run().never();
        let pipeline = ScriptRunner::new(&config, runner).expect("pipeline");
        let script = format!("def main():\n    return 1\n#{}\n", "x".repeat(200_000));

        let response = pipeline
            .execute(&script, None, &CancelToken::new())
            .expect("response");
        assert!(
            response
                .error()
                .is_some_and(|error| error.contains("too large"))
        );
    }

    #[rstest]
    fn accepted_scripts_are_run_and_assembled(config: Config) {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .with(always(), always())
            .once()
            .returning(|request, _| {
                Ok(completed(
                    "hello from sandbox\n",
                    r#"{"status": "ok", "value": {"message": "success"}}"#,
                    request.limits().wall_timeout_ms,
                ))
            });
        let pipeline = ScriptRunner::new(&config, runner).expect("pipeline");

        let response = pipeline
            .execute(
                "def main():\n    print(\"hello from sandbox\")\n    return {\"message\": \"success\"}\n",
                None,
                &CancelToken::new(),
            )
            .expect("response");
        assert_eq!(response.result(), Some(&json!({"message": "success"})));
        assert_eq!(response.stdout(), "hello from sandbox\n");
        assert_eq!(pipeline.pool().available(), pipeline.pool().capacity());
    }

    #[rstest]
    fn overrides_tighten_the_request(config: Config) {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|request, _| request.limits().wall_timeout_ms == 750)
            .once()
            .returning(|_, _| Ok(completed("", r#"{"status": "ok", "value": 1}"#, 750)));
        let pipeline = ScriptRunner::new(&config, runner).expect("pipeline");
        let overrides = LimitOverrides {
            wall_timeout_ms: Some(750),
            cpu_seconds: Some(3_600),
            ..LimitOverrides::default()
        };

        let response = pipeline
            .execute("def main():\n    return 1\n", Some(&overrides), &CancelToken::new())
            .expect("response");
        assert_eq!(response.result(), Some(&json!(1)));
    }

    #[rstest]
    fn infrastructure_failures_release_the_slot(config: Config) {
        let mut runner = MockRunner::new();
        runner.expect_run().once().returning(|_, _| {
            Err(InfrastructureError::IsolationMisconfigured {
                diagnostic: "bad profile".into(),
            })
        });
        let pipeline = ScriptRunner::new(&config, runner).expect("pipeline");

        let error = pipeline
            .execute("def main():\n    return 1\n", None, &CancelToken::new())
            .expect_err("infrastructure failure");
        assert!(error.is_fatal());
        assert_eq!(pipeline.pool().available(), pipeline.pool().capacity());
    }

    #[test]
    fn saturated_pools_report_capacity_exceeded() {
        let mut config = Config::default();
        config.max_concurrent_runs = 1;
        config.queue_timeout_ms = 20;

        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let mut runner = MockRunner::new();
        {
            let entered_run = Arc::clone(&entered);
            let release_run = Arc::clone(&release);
            runner.expect_run().once().returning(move |_, _| {
                entered_run.wait();
                release_run.wait();
                Ok(completed("", r#"{"status": "ok", "value": 1}"#, 5_000))
            });
        }
        let pipeline = ScriptRunner::new(&config, runner).expect("pipeline");

        thread::scope(|scope| {
            let busy = scope.spawn(|| {
                pipeline.execute("def main():\n    return 1\n", None, &CancelToken::new())
            });
            entered.wait();
            let error = pipeline
                .execute("def main():\n    return 2\n", None, &CancelToken::new())
                .expect_err("no free slot");
            assert_eq!(error.reason(), "capacity_exceeded");
            release.wait();
            assert!(busy.join().expect("busy thread").is_ok());
        });
    }
}
