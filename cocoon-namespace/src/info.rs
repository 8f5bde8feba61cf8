//! Namespace inspection through `/proc`

use cocoon_core::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Namespaces and identity maps of one process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceInfo {
    /// Process the info was read for
    pub pid: u32,
    /// PID namespace ID
    pub pid_ns: Option<String>,
    /// Network namespace ID
    pub net: Option<String>,
    /// Mount namespace ID
    pub mnt: Option<String>,
    /// UTS namespace ID
    pub uts: Option<String>,
    /// IPC namespace ID
    pub ipc: Option<String>,
    /// User namespace ID
    pub user: Option<String>,
    /// Contents of `uid_map`
    pub uid_map: Option<String>,
    /// Contents of `gid_map`
    pub gid_map: Option<String>,
}

impl NamespaceInfo {
    /// Namespaces of the calling process
    ///
    /// # Errors
    /// Returns error if `/proc/self` cannot be read
    pub fn current() -> Result<Self> {
        Self::for_pid(std::process::id())
    }

    /// Get namespace IDs for a specific PID
    ///
    /// # Errors
    /// Returns error if the process does not exist
    pub fn for_pid(pid: u32) -> Result<Self> {
        Self::read_from(&Path::new("/proc").join(pid.to_string()), pid)
    }

    /// Read from a proc-like directory
    ///
    /// # Errors
    /// Returns error if `proc_dir` does not exist
    pub fn read_from(proc_dir: &Path, pid: u32) -> Result<Self> {
        if !proc_dir.is_dir() {
            return Err(Error::invalid_config(format!(
                "no such process: {}",
                proc_dir.display()
            )));
        }

        let ns = proc_dir.join("ns");
        let read_ns = |name: &str| {
            fs::read_link(ns.join(name))
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        };
        let read_map = |name: &str| {
            fs::read_to_string(proc_dir.join(name))
                .ok()
                .map(|s| s.trim().to_string())
        };

        Ok(Self {
            pid,
            pid_ns: read_ns("pid"),
            net: read_ns("net"),
            mnt: read_ns("mnt"),
            uts: read_ns("uts"),
            ipc: read_ns("ipc"),
            user: read_ns("user"),
            uid_map: read_map("uid_map"),
            gid_map: read_map("gid_map"),
        })
    }

    /// Check if in different namespace than init (PID 1)
    ///
    /// # Errors
    /// Returns error if cannot read namespaces
    pub fn is_isolated(&self) -> Result<bool> {
        let init_ns = Self::for_pid(1)?;
        Ok(self.differs_from(&init_ns))
    }

    /// Whether any namespace differs from `other`
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.pid_ns != other.pid_ns
            || self.net != other.net
            || self.mnt != other.mnt
            || self.uts != other.uts
            || self.ipc != other.ipc
            || self.user != other.user
    }
}

impl std::fmt::Display for NamespaceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Namespace Info (PID {}):", self.pid)?;
        let rows = [
            ("PID", &self.pid_ns),
            ("NET", &self.net),
            ("MNT", &self.mnt),
            ("UTS", &self.uts),
            ("IPC", &self.ipc),
            ("USER", &self.user),
            ("UID MAP", &self.uid_map),
            ("GID MAP", &self.gid_map),
        ];
        for (label, value) in rows {
            if let Some(value) = value {
                writeln!(f, "  {:<8} {value}", format!("{label}:"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_namespaces() {
        let info = NamespaceInfo::current().unwrap();

        assert!(info.pid_ns.is_some());
        assert!(info.mnt.is_some());
        assert!(info.uid_map.is_some());
    }

    #[test]
    fn test_missing_process() {
        assert!(NamespaceInfo::read_from(Path::new("/nonexistent/proc/1"), 1).is_err());
    }

    #[test]
    fn test_namespace_info_display() {
        let info = NamespaceInfo {
            pid: 7,
            pid_ns: Some("pid:[4026531836]".to_string()),
            net: Some("net:[4026531905]".to_string()),
            uid_map: Some("0 1000 1".to_string()),
            ..Default::default()
        };

        let display = format!("{info}");
        assert!(display.contains("PID 7"));
        assert!(display.contains("NET:"));
        assert!(display.contains("0 1000 1"));
        assert!(!display.contains("IPC:"));
    }

    #[test]
    fn test_differs_from() {
        let host = NamespaceInfo {
            user: Some("user:[1]".to_string()),
            ..Default::default()
        };
        let mut container = host.clone();
        assert!(!container.differs_from(&host));

        container.user = Some("user:[2]".to_string());
        assert!(container.differs_from(&host));
    }
}
