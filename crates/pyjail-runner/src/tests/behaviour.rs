//! Behaviour-driven tests for the execution pipeline.

use std::time::Duration;

use mockall::mock;
use pyjail_config::Config;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;

use crate::error::InfrastructureError;
use crate::executor::{CancelToken, SandboxRunner};
use crate::outcome::{ExecutionOutcome, ExecutionResponse, ExitState};
use crate::pipeline::ScriptRunner;
use crate::request::ExecutionRequest;

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

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default, Clone)]
enum SandboxMode {
    #[default]
    NeverLaunched,
    Completes {
        stdout: String,
        channel: String,
    },
    TimesOut,
}

#[derive(Default)]
struct TestWorld {
    mode: SandboxMode,
    response: Option<ExecutionResponse>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strips surrounding quotes and expands `\n` and `\"` escapes.
fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
        .replace("\\\"", "\"")
        .replace("\\n", "\n")
}

fn envelope(kind: &str) -> String {
    match kind {
        "ok_message" => json!({"status": "ok", "value": {"message": "success"}}),
        "not_serializable_set" => {
            json!({"status": "not_serializable", "type": "set", "detail": "TypeError"})
        }
        "exception_value_error" => json!({"status": "exception", "summary": "ValueError: boom"}),
        other => panic!("unsupported envelope kind: '{other}'"),
    }
    .to_string()
}

fn runner_for(mode: SandboxMode) -> MockRunner {
    let mut runner = MockRunner::new();
    match mode {
        SandboxMode::NeverLaunched => {
            runner.expect_run().never();
        }
        SandboxMode::Completes { stdout, channel } => {
            runner.expect_run().once().returning(move |request, _| {
                Ok(ExecutionOutcome {
                    state: ExitState::Completed,
                    stdout: stdout.clone(),
                    stdout_truncated: false,
                    result_channel: Some(channel.clone()),
                    exit_code: Some(0),
                    signal: None,
                    stderr: String::new(),
                    wall_timeout_ms: request.limits().wall_timeout_ms,
                    elapsed: Duration::from_millis(8),
                })
            });
        }
        SandboxMode::TimesOut => {
            runner.expect_run().once().returning(|request, _| {
                Ok(ExecutionOutcome {
                    state: ExitState::TimedOut,
                    stdout: String::new(),
                    stdout_truncated: false,
                    result_channel: None,
                    exit_code: None,
                    signal: Some(9),
                    stderr: String::new(),
                    wall_timeout_ms: request.limits().wall_timeout_ms,
                    elapsed: Duration::from_millis(5_500),
                })
            });
        }
    }
    runner
}

fn response(world: &TestWorld) -> &ExecutionResponse {
    world.response.as_ref().expect("no response captured")
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a sandbox that must not be launched")]
fn given_never_launched(world: &mut TestWorld) {
    world.mode = SandboxMode::NeverLaunched;
}

#[given("a sandbox that prints {stdout} and reports {kind}")]
fn given_completing_sandbox(world: &mut TestWorld, stdout: String, kind: String) {
    world.mode = SandboxMode::Completes {
        stdout: unquote(&stdout),
        channel: envelope(kind.trim_matches('"')),
    };
}

#[given("a sandbox that exceeds the wall-clock limit")]
fn given_timeout(world: &mut TestWorld) {
    world.mode = SandboxMode::TimesOut;
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the script {script} is submitted")]
fn when_submitted(world: &mut TestWorld, script: String) {
    let runner = runner_for(world.mode.clone());
    let pipeline = ScriptRunner::new(&Config::default(), runner).expect("pipeline");
    let outcome = pipeline
        .execute(&unquote(&script), None, &CancelToken::new())
        .expect("no infrastructure failure");
    world.response = Some(outcome);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the result is the message {message}")]
fn then_result_message(world: &mut TestWorld, message: String) {
    let expected = json!({"message": message.trim_matches('"')});
    assert_eq!(response(world).result(), Some(&expected));
    assert_eq!(response(world).error(), None);
}

#[then("no result is returned")]
fn then_no_result(world: &mut TestWorld) {
    assert_eq!(response(world).result(), None);
}

#[then("the stdout is {stdout}")]
fn then_stdout(world: &mut TestWorld, stdout: String) {
    assert_eq!(response(world).stdout(), unquote(&stdout));
}

#[then("the error mentions {fragment}")]
fn then_error_mentions(world: &mut TestWorld, fragment: String) {
    let expected = fragment.trim_matches('"');
    let error = response(world).error().expect("error expected");
    assert!(error.contains(expected), "{expected:?} not in {error:?}");
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/script_execution.feature")]
fn script_execution_behaviour(world: TestWorld) {
    let _ = world;
}
