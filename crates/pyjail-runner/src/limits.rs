//! Resource limits for one run.

use pyjail_config::Config;
use serde::{Deserialize, Serialize};

/// Ceilings enforced on a single sandboxed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceLimits {
    /// CPU time in seconds.
    pub cpu_seconds: u64,
    /// Address space in bytes.
    pub memory_bytes: u64,
    /// Wall-clock limit in milliseconds.
    pub wall_timeout_ms: u64,
    /// Largest file the script may write.
    pub file_size_bytes: u64,
    /// Open file descriptors.
    pub open_files: u64,
    /// Processes, when limited.
    pub max_processes: Option<u64>,
}

impl ResourceLimits {
    /// Deployment defaults from configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            cpu_seconds: config.cpu_time_seconds(),
            memory_bytes: config.memory_bytes(),
            wall_timeout_ms: config.wall_timeout_ms(),
            file_size_bytes: config.max_file_size_bytes(),
            open_files: config.max_open_files(),
            max_processes: config.max_processes(),
        }
    }

    /// Applies client overrides, keeping every limit at or below `self`.
    ///
    /// Zero overrides are ignored so a client cannot disable a limit.
    #[must_use]
    pub fn tightened_by(self, overrides: &LimitOverrides) -> Self {
        let tighten = |current: u64, requested: Option<u64>| {
            requested
                .filter(|value| *value > 0)
                .map_or(current, |value| value.min(current))
        };
        Self {
            cpu_seconds: tighten(self.cpu_seconds, overrides.cpu_seconds),
            memory_bytes: tighten(self.memory_bytes, overrides.memory_bytes),
            wall_timeout_ms: tighten(self.wall_timeout_ms, overrides.wall_timeout_ms),
            file_size_bytes: tighten(self.file_size_bytes, overrides.file_size_bytes),
            open_files: tighten(self.open_files, overrides.open_files),
            max_processes: self.max_processes,
        }
    }
}

/// Per-request limit overrides supplied by a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitOverrides {
    /// Requested CPU seconds.
    pub cpu_seconds: Option<u64>,
    /// Requested address space in bytes.
    pub memory_bytes: Option<u64>,
    /// Requested wall-clock limit in milliseconds.
    pub wall_timeout_ms: Option<u64>,
    /// Requested file size ceiling.
    pub file_size_bytes: Option<u64>,
    /// Requested descriptor ceiling.
    pub open_files: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn defaults() -> ResourceLimits {
        ResourceLimits::from_config(&Config::default())
    }

    #[rstest]
    fn defaults_follow_configuration(defaults: ResourceLimits) {
        assert_eq!(defaults.cpu_seconds, 5);
        assert_eq!(defaults.wall_timeout_ms, 5_000);
        assert_eq!(defaults.memory_bytes, 256 * 1024 * 1024);
        assert_eq!(defaults.max_processes, Some(512));
    }

    #[rstest]
    fn overrides_only_tighten(defaults: ResourceLimits) {
        let overrides = LimitOverrides {
            cpu_seconds: Some(60),
            wall_timeout_ms: Some(1_000),
            ..LimitOverrides::default()
        };
        let limits = defaults.tightened_by(&overrides);
        assert_eq!(limits.cpu_seconds, 5);
        assert_eq!(limits.wall_timeout_ms, 1_000);
    }

    #[rstest]
    fn zero_overrides_are_ignored(defaults: ResourceLimits) {
        let overrides = LimitOverrides {
            memory_bytes: Some(0),
            ..LimitOverrides::default()
        };
        assert_eq!(defaults.tightened_by(&overrides), defaults);
    }

    #[test]
    fn unknown_override_keys_are_rejected() {
        let parsed = serde_json::from_str::<LimitOverrides>(r#"{"network": true}"#);
        assert!(parsed.is_err());
    }
}
