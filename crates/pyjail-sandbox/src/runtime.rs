//! Platform helpers for sandbox defaults and preflight checks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Library and interpreter roots a dynamically linked Python needs.
#[cfg(target_os = "linux")]
const RUNTIME_ROOTS: &[&str] = &[
    "/lib",
    "/lib64",
    "/usr/lib",
    "/usr/lib64",
    "/usr/local/lib",
    "/etc/ld.so.cache",
];

/// Returns the existing runtime roots, canonicalised.
#[must_use]
pub fn linux_runtime_roots() -> Vec<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let mut roots: Vec<PathBuf> = RUNTIME_ROOTS
            .iter()
            .map(Path::new)
            .filter(|candidate| candidate.exists())
            .filter_map(|candidate| fs::canonicalize(candidate).ok())
            .collect();
        roots.dedup();
        roots
    }

    #[cfg(not(target_os = "linux"))]
    {
        Vec::new()
    }
}

/// Returns the number of threads in the current process.
///
/// # Errors
///
/// Returns an error when `/proc/self/status` is unreadable or lacks a
/// `Threads:` line.
pub fn thread_count() -> io::Result<usize> {
    #[cfg(target_os = "linux")]
    {
        let status = fs::read_to_string("/proc/self/status")?;
        parse_thread_count(&status)
    }

    #[cfg(not(target_os = "linux"))]
    {
        Ok(1)
    }
}

fn parse_thread_count(status: &str) -> io::Result<usize> {
    let value = status
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing thread count"))?;
    value
        .trim()
        .parse::<usize>()
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Name:\tcat\nThreads:\t1\nVmRSS:\t1 kB\n", 1)]
    #[case("Threads:   12\n", 12)]
    fn parses_thread_counts(#[case] status: &str, #[case] expected: usize) {
        assert_eq!(parse_thread_count(status).expect("parse"), expected);
    }

    #[rstest]
    #[case("Name:\tcat\n")]
    #[case("Threads:\tmany\n")]
    fn rejects_malformed_status(#[case] status: &str) {
        assert!(parse_thread_count(status).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn runtime_roots_exist() {
        for root in linux_runtime_roots() {
            assert!(root.is_absolute());
            assert!(root.exists(), "{} missing", root.display());
        }
    }
}
