//! Namespace configuration

use nix::sched::CloneFlags;
use serde::{Deserialize, Serialize};

/// Which namespaces the launcher creates for the confined process
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Enable user namespace
    pub user: bool,

    /// Enable PID namespace
    pub pid: bool,

    /// Enable UTS namespace (hostname)
    pub uts: bool,

    /// Enable mount namespace
    pub mount: bool,

    /// Enable network namespace
    pub network: bool,

    /// Enable IPC namespace
    pub ipc: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self::all()
    }
}

impl NamespaceConfig {
    /// Create a new namespace configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All six namespaces a container needs
    #[must_use]
    pub const fn all() -> Self {
        Self {
            user: true,
            pid: true,
            uts: true,
            mount: true,
            network: true,
            ipc: true,
        }
    }

    /// Enable user namespace
    #[must_use]
    pub const fn with_user(mut self, enable: bool) -> Self {
        self.user = enable;
        self
    }

    /// Enable PID namespace
    #[must_use]
    pub const fn with_pid(mut self, enable: bool) -> Self {
        self.pid = enable;
        self
    }

    /// Enable UTS namespace
    #[must_use]
    pub const fn with_uts(mut self, enable: bool) -> Self {
        self.uts = enable;
        self
    }

    /// Enable mount namespace
    #[must_use]
    pub const fn with_mount(mut self, enable: bool) -> Self {
        self.mount = enable;
        self
    }

    /// Enable network namespace
    #[must_use]
    pub const fn with_network(mut self, enable: bool) -> Self {
        self.network = enable;
        self
    }

    /// Enable IPC namespace
    #[must_use]
    pub const fn with_ipc(mut self, enable: bool) -> Self {
        self.ipc = enable;
        self
    }

    /// Convert to clone flags for clone(2)
    #[must_use]
    pub fn to_clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();

        if self.user {
            flags |= CloneFlags::CLONE_NEWUSER;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.network {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.ipc {
            flags |= CloneFlags::CLONE_NEWIPC;
        }

        flags
    }

    /// Check if any namespaces are enabled
    #[must_use]
    pub const fn has_any(&self) -> bool {
        self.user || self.pid || self.uts || self.mount || self.network || self.ipc
    }

    /// Get list of enabled namespace names
    #[must_use]
    pub fn enabled_namespaces(&self) -> Vec<&'static str> {
        [
            (self.user, "user"),
            (self.pid, "pid"),
            (self.uts, "uts"),
            (self.mount, "mnt"),
            (self.network, "net"),
            (self.ipc, "ipc"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect()
    }
}
