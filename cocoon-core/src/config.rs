//! Initializer configuration: mount table, hostname, root switch

use nix::libc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Hostname given to every container unless overridden
pub const DEFAULT_HOSTNAME: &str = "container";

/// Directory (inside the new root) that receives the old root during the pivot
pub const DEFAULT_STAGING_DIR: &str = ".pivot_root";

/// Longest hostname the kernel accepts (`HOST_NAME_MAX`)
pub const MAX_HOSTNAME_LEN: usize = 64;

/// Mount flags, using the kernel `MS_*` bit values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountFlags(u64);

impl MountFlags {
    /// `MS_RDONLY`
    pub const RDONLY: Self = Self(libc::MS_RDONLY as u64);
    /// `MS_NOSUID`
    pub const NOSUID: Self = Self(libc::MS_NOSUID as u64);
    /// `MS_NODEV`
    pub const NODEV: Self = Self(libc::MS_NODEV as u64);
    /// `MS_NOEXEC`
    pub const NOEXEC: Self = Self(libc::MS_NOEXEC as u64);
    /// `MS_BIND`
    pub const BIND: Self = Self(libc::MS_BIND as u64);
    /// `MS_REC`
    pub const REC: Self = Self(libc::MS_REC as u64);
    /// `MS_STRICTATIME`
    pub const STRICTATIME: Self = Self(libc::MS_STRICTATIME as u64);
    /// No flags
    pub const NONE: Self = Self(0);

    /// Create from raw value
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Get raw value
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Check if flag is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for MountFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One entry of the container mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Mount source (`proc`, `tmpfs`, ...)
    pub source: String,
    /// Absolute target inside the container root
    pub target: String,
    /// Filesystem type
    pub fstype: String,
    /// Mount flags
    pub flags: MountFlags,
    /// Filesystem-specific data string
    pub data: Option<String>,
}

impl MountSpec {
    /// Create a mount spec without a data string
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        fstype: impl Into<String>,
        flags: MountFlags,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            fstype: fstype.into(),
            flags,
            data: None,
        }
    }

    /// Attach a data string (e.g. `mode=755`)
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// The `/proc`, `/dev`, `/sys` table every container gets
    #[must_use]
    pub fn default_table() -> Vec<Self> {
        vec![
            Self::new(
                "proc",
                "/proc",
                "proc",
                MountFlags::NOEXEC | MountFlags::NOSUID | MountFlags::NODEV,
            ),
            Self::new(
                "tmpfs",
                "/dev",
                "tmpfs",
                MountFlags::NOSUID | MountFlags::STRICTATIME,
            )
            .with_data("mode=755"),
            Self::new(
                "sysfs",
                "/sys",
                "sysfs",
                MountFlags::NOSUID | MountFlags::NOEXEC | MountFlags::NODEV | MountFlags::RDONLY,
            ),
        ]
    }
}

/// Everything the initializer needs to build the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitConfig {
    /// Directory that becomes `/`
    pub root: PathBuf,

    /// Hostname for the UTS namespace
    pub hostname: String,

    /// Mounts applied under `root` before the pivot
    pub mounts: Vec<MountSpec>,

    /// Name of the staging directory for the old root
    pub staging_dir: String,
}

impl InitConfig {
    /// Configuration for the given root with the default table and hostname
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            mounts: MountSpec::default_table(),
            staging_dir: DEFAULT_STAGING_DIR.to_string(),
        }
    }

    /// Set the directory that becomes `/`
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set hostname
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Replace the mount table
    #[must_use]
    pub fn with_mounts(mut self, mounts: Vec<MountSpec>) -> Self {
        self.mounts = mounts;
        self
    }

    /// Set the staging directory name
    #[must_use]
    pub fn with_staging_dir(mut self, name: impl Into<String>) -> Self {
        self.staging_dir = name.into();
        self
    }

    /// Container root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns error if the root is relative, the hostname is empty or too
    /// long, a mount target is empty, or the staging name is not a plain
    /// directory name
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_absolute() {
            return Err(Error::invalid_config(format!(
                "container root must be absolute, got {}",
                self.root.display()
            )));
        }

        if self.hostname.is_empty() {
            return Err(Error::invalid_config("hostname cannot be empty"));
        }

        if self.hostname.len() > MAX_HOSTNAME_LEN {
            return Err(Error::invalid_config(format!(
                "hostname too long (max {MAX_HOSTNAME_LEN} bytes)"
            )));
        }

        if let Some(spec) = self
            .mounts
            .iter()
            .find(|m| m.target.trim_start_matches('/').is_empty())
        {
            return Err(Error::invalid_config(format!(
                "mount of {} has no target",
                spec.source
            )));
        }

        let staging = self.staging_dir.as_str();
        if staging.is_empty() || staging == "." || staging == ".." || staging.contains('/') {
            return Err(Error::invalid_config(format!(
                "invalid staging directory name {staging:?}"
            )));
        }

        tracing::trace!(root = %self.root.display(), "init config validated");
        Ok(())
    }
}
