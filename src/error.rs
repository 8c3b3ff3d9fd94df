/*!
 * Error types for Driftguard
 */

use driftguard_core_policy::PolicyError;
use driftguard_sentinel::SentinelError;
use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, DriftguardError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum DriftguardError {
    /// Configuration error
    Config(String),

    /// I/O error
    Io(io::Error),

    /// A file could not be read
    ReadFile { path: PathBuf, source: io::Error },

    /// Malformed fleet snapshot
    Snapshot(String),

    /// A policy payload failed validation
    Policy(PolicyError),

    /// The Sentinel refused to start
    Sentinel(SentinelError),

    /// A scan cycle aborted or panicked before finishing
    CycleAborted,

    /// A scan cycle finished but some checks or instances failed
    PartialScan {
        checks_failed: usize,
        instances_failed: usize,
    },
}

impl DriftguardError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // Partial failures: the cycle ran, some evidence is missing
            DriftguardError::CycleAborted | DriftguardError::PartialScan { .. } => EXIT_PARTIAL,
            // Everything else stops before scanning
            _ => EXIT_FATAL,
        }
    }
}

impl fmt::Display for DriftguardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftguardError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            DriftguardError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            DriftguardError::ReadFile { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            DriftguardError::Snapshot(msg) => {
                write!(f, "Invalid fleet snapshot: {}", msg)
            }
            DriftguardError::Policy(err) => {
                write!(f, "Invalid policy: {}", err)
            }
            DriftguardError::Sentinel(err) => {
                write!(f, "Sentinel error: {}", err)
            }
            DriftguardError::CycleAborted => {
                write!(f, "Scan cycle aborted, see log for details")
            }
            DriftguardError::PartialScan {
                checks_failed,
                instances_failed,
            } => {
                write!(
                    f,
                    "Scan incomplete: {} checks and {} instances failed",
                    checks_failed, instances_failed
                )
            }
        }
    }
}

impl std::error::Error for DriftguardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriftguardError::Io(err) => Some(err),
            DriftguardError::ReadFile { source, .. } => Some(source),
            DriftguardError::Policy(err) => Some(err),
            DriftguardError::Sentinel(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DriftguardError {
    fn from(err: io::Error) -> Self {
        DriftguardError::Io(err)
    }
}

impl From<serde_json::Error> for DriftguardError {
    fn from(err: serde_json::Error) -> Self {
        DriftguardError::Snapshot(format!("JSON parse error: {}", err))
    }
}

impl From<PolicyError> for DriftguardError {
    fn from(err: PolicyError) -> Self {
        DriftguardError::Policy(err)
    }
}

impl From<SentinelError> for DriftguardError {
    fn from(err: SentinelError) -> Self {
        DriftguardError::Sentinel(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            DriftguardError::Config("bad".to_string()).exit_code(),
            EXIT_FATAL
        );
        assert_eq!(
            DriftguardError::Snapshot("bad".to_string()).exit_code(),
            EXIT_FATAL
        );
        assert_eq!(
            DriftguardError::Policy(PolicyError::UnknownType("x".to_string())).exit_code(),
            EXIT_FATAL
        );
        assert_eq!(DriftguardError::CycleAborted.exit_code(), EXIT_PARTIAL);
        assert_eq!(
            DriftguardError::PartialScan {
                checks_failed: 2,
                instances_failed: 0
            }
            .exit_code(),
            EXIT_PARTIAL
        );
    }

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(EXIT_SUCCESS, 0);
        assert_eq!(EXIT_PARTIAL, 1);
        assert_eq!(EXIT_FATAL, 2);
    }

    #[test]
    fn test_error_display() {
        let err = DriftguardError::PartialScan {
            checks_failed: 3,
            instances_failed: 1,
        };
        assert_eq!(
            err.to_string(),
            "Scan incomplete: 3 checks and 1 instances failed"
        );

        let err = DriftguardError::ReadFile {
            path: PathBuf::from("/etc/driftguard.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/driftguard.toml"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DriftguardError = json_err.into();
        assert!(matches!(err, DriftguardError::Snapshot(_)));
    }
}
