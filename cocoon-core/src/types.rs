//! Core type definitions shared by the launcher and the initializer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verb the launcher passes to the re-executed binary so it acts as the initializer
pub const CHILD_VERB: &str = "child";

/// What the launcher forwards to the re-executed process
///
/// Built once per invocation and consumed when the confined process is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRequest {
    /// Arguments placed after the [`CHILD_VERB`] marker
    pub args: Vec<String>,
    /// Real user ID of the caller
    pub uid: u32,
    /// Real group ID of the caller
    pub gid: u32,
}

impl NamespaceRequest {
    /// Create a request for an explicit identity
    #[must_use]
    pub fn new(args: Vec<String>, uid: u32, gid: u32) -> Self {
        Self { args, uid, gid }
    }

    /// Create a request carrying the real uid/gid of the calling process
    #[must_use]
    pub fn for_current_user(args: Vec<String>) -> Self {
        Self::new(
            args,
            nix::unistd::getuid().as_raw(),
            nix::unistd::getgid().as_raw(),
        )
    }

    /// UID mapping for the new user namespace
    #[must_use]
    pub const fn uid_mapping(&self) -> IdMapping {
        IdMapping::root_to(self.uid)
    }

    /// GID mapping for the new user namespace
    #[must_use]
    pub const fn gid_mapping(&self) -> IdMapping {
        IdMapping::root_to(self.gid)
    }
}

/// One line of a user namespace `uid_map` / `gid_map`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdMapping {
    /// First ID inside the namespace
    pub container_id: u32,
    /// First ID on the host
    pub host_id: u32,
    /// Number of consecutive IDs mapped
    pub size: u32,
}

impl IdMapping {
    /// Map namespace root (0) onto a single host ID
    #[must_use]
    pub const fn root_to(host_id: u32) -> Self {
        Self {
            container_id: 0,
            host_id,
            size: 1,
        }
    }

    /// Contents to write into `/proc/<pid>/{uid,gid}_map`
    #[must_use]
    pub fn to_map_line(&self) -> String {
        format!("{} {} {}\n", self.container_id, self.host_id, self.size)
    }
}

/// Steps of the root switch, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PivotStep {
    /// Bind-mount the new root onto itself
    BindRoot,
    /// Create the staging directory for the old root
    CreateStaging,
    /// `pivot_root(2)`
    PivotRoot,
    /// `chdir("/")` inside the new root
    EnterNewRoot,
    /// Lazily unmount the old root
    DetachOldRoot,
    /// Remove the empty staging directory
    RemoveStaging,
}

impl PivotStep {
    /// All steps in the order they run
    pub const ALL: [Self; 6] = [
        Self::BindRoot,
        Self::CreateStaging,
        Self::PivotRoot,
        Self::EnterNewRoot,
        Self::DetachOldRoot,
        Self::RemoveStaging,
    ];
}

impl fmt::Display for PivotStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BindRoot => "bind root",
            Self::CreateStaging => "create staging directory",
            Self::PivotRoot => "pivot_root",
            Self::EnterNewRoot => "chdir to new root",
            Self::DetachOldRoot => "detach old root",
            Self::RemoveStaging => "remove staging directory",
        };
        f.write_str(name)
    }
}

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitOutcome {
    /// Normal exit with a status code
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
}

impl ExitOutcome {
    /// Whether the process exited with status 0
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Shell-style exit code (`128 + signal` for signals)
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(signal) => 128 + signal,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entry_mapping() {
        let request = NamespaceRequest::new(vec!["/bin/sh".to_string()], 1000, 100);

        assert_eq!(request.uid_mapping(), IdMapping::root_to(1000));
        assert_eq!(request.gid_mapping().to_map_line(), "0 100 1\n");
    }

    #[test]
    fn test_current_user_request() {
        let request = NamespaceRequest::for_current_user(Vec::new());
        assert_eq!(request.uid, nix::unistd::getuid().as_raw());
        assert_eq!(request.gid, nix::unistd::getgid().as_raw());
    }

    #[test]
    fn test_exit_outcome_codes() {
        assert!(ExitOutcome::Exited(0).success());
        assert!(!ExitOutcome::Exited(1).success());
        assert!(!ExitOutcome::Signaled(9).success());
        assert_eq!(ExitOutcome::Exited(3).code(), 3);
        assert_eq!(ExitOutcome::Signaled(15).code(), 143);
    }

    #[test]
    fn test_pivot_steps_order() {
        assert_eq!(PivotStep::ALL.first(), Some(&PivotStep::BindRoot));
        assert_eq!(PivotStep::ALL.last(), Some(&PivotStep::RemoveStaging));
        assert_eq!(PivotStep::PivotRoot.to_string(), "pivot_root");
    }

    #[test]
    fn test_request_serde() {
        let request = NamespaceRequest::new(vec!["/bin/true".to_string()], 1, 2);
        let json = serde_json::to_string(&request).unwrap();
        let back: NamespaceRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }
}
