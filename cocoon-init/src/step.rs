//! Individual fallible setup steps
//!
//! Each step wraps exactly one backend call and maps its OS error into the
//! matching [`Error`] variant, so a failure always names what was being done
//! and to which path.

use cocoon_core::{Error, MountFlags, MountSpec, PivotStep, Result};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::backend::IsolationBackend;

/// Mode of the staging directory created for the old root
pub const STAGING_DIR_MODE: u32 = 0o777;

/// Tag identifying a step, for reports and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// A mount-table entry
    Mount,
    /// One of the root-switch steps
    Pivot(PivotStep),
    /// Hostname assignment
    Hostname,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mount => f.write_str("mount"),
            Self::Pivot(step) => write!(f, "{step}"),
            Self::Hostname => f.write_str("sethostname"),
        }
    }
}

/// One irreversible operation of container setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Mount `spec` at the resolved `target`
    Mount {
        /// Mount table entry
        spec: MountSpec,
        /// Target joined under the container root
        target: PathBuf,
    },
    /// Recursively bind-mount the new root onto itself, carrying the
    /// mounts already made under it
    BindRoot {
        /// New root
        root: PathBuf,
    },
    /// Create the staging directory inside the new root
    CreateStaging {
        /// Staging directory, seen from the old root
        path: PathBuf,
    },
    /// Swap roots
    PivotRoot {
        /// New root
        new_root: PathBuf,
        /// Where the old root goes
        put_old: PathBuf,
    },
    /// `chdir("/")` after the pivot
    EnterNewRoot,
    /// Lazily unmount the old root
    DetachOldRoot {
        /// Staging directory, seen from the new root
        path: PathBuf,
    },
    /// Remove the staging directory
    RemoveStaging {
        /// Staging directory, seen from the new root
        path: PathBuf,
    },
    /// Set the UTS hostname
    SetHostname {
        /// Hostname
        hostname: String,
    },
}

impl Step {
    /// Tag of this step
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::Mount { .. } => StepKind::Mount,
            Self::BindRoot { .. } => StepKind::Pivot(PivotStep::BindRoot),
            Self::CreateStaging { .. } => StepKind::Pivot(PivotStep::CreateStaging),
            Self::PivotRoot { .. } => StepKind::Pivot(PivotStep::PivotRoot),
            Self::EnterNewRoot => StepKind::Pivot(PivotStep::EnterNewRoot),
            Self::DetachOldRoot { .. } => StepKind::Pivot(PivotStep::DetachOldRoot),
            Self::RemoveStaging { .. } => StepKind::Pivot(PivotStep::RemoveStaging),
            Self::SetHostname { .. } => StepKind::Hostname,
        }
    }

    /// Path the step operates on, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Mount { target, .. } => Some(target.as_path()),
            Self::BindRoot { root } => Some(root.as_path()),
            Self::CreateStaging { path }
            | Self::DetachOldRoot { path }
            | Self::RemoveStaging { path } => Some(path.as_path()),
            Self::PivotRoot { new_root, .. } => Some(new_root.as_path()),
            Self::EnterNewRoot => Some(Path::new("/")),
            Self::SetHostname { .. } => None,
        }
    }

    /// Perform the step
    ///
    /// # Errors
    /// Returns [`Error::Mount`], [`Error::Pivot`] or [`Error::Hostname`]
    /// wrapping the OS error
    pub fn apply<B: IsolationBackend + ?Sized>(&self, backend: &B) -> Result<()> {
        match self {
            Self::Mount { spec, target } => backend
                .mount(
                    Some(spec.source.as_str()),
                    target,
                    Some(spec.fstype.as_str()),
                    spec.flags,
                    spec.data.as_deref(),
                )
                .map_err(|source| Error::Mount {
                    target: target.clone(),
                    fstype: spec.fstype.clone(),
                    source,
                }),
            Self::BindRoot { root } => backend
                .mount(
                    Some(path_str(root)?),
                    root,
                    None,
                    MountFlags::BIND | MountFlags::REC,
                    None,
                )
                .map_err(|source| pivot_error(PivotStep::BindRoot, root, source)),
            Self::CreateStaging { path } => backend
                .create_dir(path, STAGING_DIR_MODE)
                .map_err(|source| pivot_error(PivotStep::CreateStaging, path, source)),
            Self::PivotRoot { new_root, put_old } => backend
                .pivot_root(new_root, put_old)
                .map_err(|source| pivot_error(PivotStep::PivotRoot, new_root, source)),
            Self::EnterNewRoot => backend
                .change_dir(Path::new("/"))
                .map_err(|source| pivot_error(PivotStep::EnterNewRoot, Path::new("/"), source)),
            Self::DetachOldRoot { path } => backend
                .unmount_detach(path)
                .map_err(|source| pivot_error(PivotStep::DetachOldRoot, path, source)),
            Self::RemoveStaging { path } => backend
                .remove_dir(path)
                .map_err(|source| pivot_error(PivotStep::RemoveStaging, path, source)),
            Self::SetHostname { hostname } => {
                backend
                    .set_hostname(hostname)
                    .map_err(|source| Error::Hostname {
                        hostname: hostname.clone(),
                        source,
                    })
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetHostname { hostname } => write!(f, "sethostname {hostname}"),
            Self::Mount { spec, target } => {
                write!(f, "mount {} on {}", spec.fstype, target.display())
            }
            other => match other.path() {
                Some(path) => write!(f, "{} {}", other.kind(), path.display()),
                None => write!(f, "{}", other.kind()),
            },
        }
    }
}

fn pivot_error(step: PivotStep, path: &Path, source: io::Error) -> Error {
    Error::Pivot {
        step,
        path: path.to_path_buf(),
        source,
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        Error::invalid_config(format!("path is not valid UTF-8: {}", path.display()))
    })
}
