//! Error types for Cocoon

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::PivotStep;

/// Cocoon error types
///
/// Every variant is terminal: a failed isolation step aborts the container
/// before any user code runs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The confined process could not be created
    #[error("failed to create container process ({operation})")]
    ProcessCreation {
        /// Operation that failed
        operation: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Waiting on the confined process failed
    #[error("failed to wait for container process {pid}")]
    Wait {
        /// Host PID of the confined process
        pid: i32,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A mount from the mount table failed
    #[error("failed to mount {fstype} on {}", target.display())]
    Mount {
        /// Resolved mount target
        target: PathBuf,
        /// Filesystem type
        fstype: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A step of the root switch failed
    #[error("root switch failed at {step} ({})", path.display())]
    Pivot {
        /// Step that failed
        step: PivotStep,
        /// Path the step operated on
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Setting the hostname failed
    #[error("failed to set hostname {hostname:?}")]
    Hostname {
        /// Requested hostname
        hostname: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The user program could not be started or waited on
    #[error("failed to run {program}")]
    ChildExec {
        /// Program path
        program: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Shorthand for an [`Error::InvalidConfig`]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result type alias for Cocoon operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pivot_error_names_step_and_path() {
        let err = Error::Pivot {
            step: PivotStep::DetachOldRoot,
            path: PathBuf::from("/.pivot_root"),
            source: io::Error::from_raw_os_error(libc_ebusy()),
        };

        let msg = err.to_string();
        assert!(msg.contains("detach old root"));
        assert!(msg.contains("/.pivot_root"));
    }

    #[test]
    fn test_mount_error_names_target() {
        let err = Error::Mount {
            target: PathBuf::from("/rootfs/sys"),
            fstype: "sysfs".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };

        let msg = err.to_string();
        assert!(msg.contains("sysfs"));
        assert!(msg.contains("/rootfs/sys"));
    }

    #[test]
    fn test_os_error_only_in_source_chain() {
        let err = Error::ChildExec {
            program: "/bin/missing".to_string(),
            source: io::Error::from_raw_os_error(nix::errno::Errno::ENOENT as i32),
        };

        let os_text = io::Error::from_raw_os_error(nix::errno::Errno::ENOENT as i32).to_string();
        assert_eq!(err.to_string(), "failed to run /bin/missing");
        assert!(!err.to_string().contains(&os_text));

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), os_text);
    }

    fn libc_ebusy() -> i32 {
        nix::errno::Errno::EBUSY as i32
    }
}
