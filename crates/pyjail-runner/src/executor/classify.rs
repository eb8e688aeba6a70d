//! Mapping how a run ended onto an [`ExitState`].
//!
//! The tool's own exit status only matters when it left no verdict. Codes
//! such as 124 or 125 from a verdict are the script's, not the tool's.

use pyjail_cage::CageVerdict;

use crate::error::InfrastructureError;
use crate::outcome::ExitState;

const SIGKILL: i32 = 9;

/// What the watchdog saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    /// The watchdog deadline passed and the group was killed.
    Deadline,
    /// The cancellation token fired and the group was killed.
    Cancelled,
    /// The tool exited by itself.
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

/// Terminal state plus the exit details worth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Classified {
    pub(crate) state: ExitState,
    pub(crate) exit_code: Option<i32>,
    pub(crate) signal: Option<i32>,
}

impl Classified {
    const fn new(state: ExitState, exit_code: Option<i32>, signal: Option<i32>) -> Self {
        Self {
            state,
            exit_code,
            signal,
        }
    }
}

/// Classifies a termination together with the tool's verdict.
///
/// A `setup_failed` verdict, or a tool that exited without any verdict,
/// becomes [`InfrastructureError::IsolationMisconfigured`]. Without a
/// verdict the diagnostic is the last line of `stderr`.
pub(crate) fn classify(
    termination: Termination,
    verdict: Option<CageVerdict>,
    stderr: &str,
) -> Result<Classified, InfrastructureError> {
    let (code, signal) = match termination {
        Termination::Deadline => {
            return Ok(Classified::new(ExitState::TimedOut, None, Some(SIGKILL)));
        }
        Termination::Cancelled => {
            return Ok(Classified::new(ExitState::Killed, None, Some(SIGKILL)));
        }
        Termination::Exited { code, signal } => (code, signal),
    };

    let classified = match verdict {
        Some(CageVerdict::Exited { code: 0 }) => {
            Classified::new(ExitState::Completed, Some(0), None)
        }
        Some(CageVerdict::Exited { code }) => {
            Classified::new(ExitState::CrashedNonZero, Some(code), None)
        }
        Some(CageVerdict::Signalled { signal }) => {
            Classified::new(ExitState::Killed, None, Some(signal))
        }
        Some(CageVerdict::TimedOut) => Classified::new(ExitState::TimedOut, None, None),
        Some(CageVerdict::SetupFailed { diagnostic }) => {
            return Err(InfrastructureError::IsolationMisconfigured { diagnostic });
        }
        None => {
            let diagnostic = last_line(stderr).unwrap_or_else(|| {
                format!("isolation tool left no verdict (exit code {code:?}, signal {signal:?})")
            });
            return Err(InfrastructureError::IsolationMisconfigured { diagnostic });
        }
    };
    Ok(classified)
}

fn last_line(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const EXITED: Termination = Termination::Exited {
        code: Some(0),
        signal: None,
    };

    const fn exited(code: i32) -> Option<CageVerdict> {
        Some(CageVerdict::Exited { code })
    }

    const fn signalled(signal: i32) -> Option<CageVerdict> {
        Some(CageVerdict::Signalled { signal })
    }

    #[rstest]
    #[case::watchdog(Termination::Deadline, None, ExitState::TimedOut, Some(9))]
    #[case::cancelled(Termination::Cancelled, None, ExitState::Killed, Some(9))]
    #[case::clean(EXITED, exited(0), ExitState::Completed, None)]
    #[case::tool_timeout(EXITED, Some(CageVerdict::TimedOut), ExitState::TimedOut, None)]
    #[case::relayed_kill(EXITED, signalled(9), ExitState::Killed, Some(9))]
    #[case::relayed_xcpu(EXITED, signalled(24), ExitState::Killed, Some(24))]
    #[case::crash(EXITED, exited(1), ExitState::CrashedNonZero, None)]
    fn terminations_map_to_states(
        #[case] termination: Termination,
        #[case] verdict: Option<CageVerdict>,
        #[case] state: ExitState,
        #[case] signal: Option<i32>,
    ) {
        let classified = classify(termination, verdict, "").expect("classified");
        assert_eq!(classified.state, state);
        assert_eq!(classified.signal, signal);
    }

    #[rstest]
    #[case::timeout_code(124)]
    #[case::setup_code(125)]
    #[case::kill_code(137)]
    fn reserved_looking_script_codes_are_crashes(#[case] code: i32) {
        let tool_exit = Termination::Exited {
            code: Some(code),
            signal: None,
        };
        let classified = classify(tool_exit, exited(code), "").expect("classified");
        assert_eq!(classified.state, ExitState::CrashedNonZero);
        assert_eq!(classified.exit_code, Some(code));
    }

    #[test]
    fn setup_verdicts_carry_their_diagnostic() {
        let verdict = Some(CageVerdict::SetupFailed {
            diagnostic: "sandbox initialisation failed before the command started".to_owned(),
        });
        let error = classify(EXITED, verdict, "sandboxing failure: No such file or directory\n")
            .expect_err("setup failure");
        assert!(matches!(
            &error,
            InfrastructureError::IsolationMisconfigured { diagnostic }
                if diagnostic.starts_with("sandbox initialisation failed")
        ));
        assert!(error.is_fatal());
    }

    #[test]
    fn missing_verdicts_fall_back_to_stderr() {
        let tool_exit = Termination::Exited {
            code: Some(125),
            signal: None,
        };
        let error = classify(tool_exit, None, "warming up\ninvalid profile p.toml: bad key\n\n")
            .expect_err("setup failure");
        assert!(matches!(
            &error,
            InfrastructureError::IsolationMisconfigured { diagnostic }
                if diagnostic == "invalid profile p.toml: bad key"
        ));
    }

    #[test]
    fn silent_tools_without_a_verdict_report_their_exit() {
        let tool_exit = Termination::Exited {
            code: None,
            signal: Some(11),
        };
        let error = classify(tool_exit, None, "").expect_err("setup failure");
        assert!(error.to_string().contains("signal Some(11)"));
    }
}
