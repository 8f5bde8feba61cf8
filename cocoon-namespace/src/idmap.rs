//! User namespace UID/GID mapping
//!
//! Written by the parent into `/proc/<pid>/` of the freshly cloned child,
//! which waits until this is done before exec.

use cocoon_core::{Error, IdMapping, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes the one-entry uid/gid maps for a child process
#[derive(Debug, Clone)]
pub struct IdMapWriter {
    proc_dir: PathBuf,
}

impl IdMapWriter {
    /// Writer targeting `/proc/<pid>`
    #[must_use]
    pub fn for_pid(pid: i32) -> Self {
        Self::at(Path::new("/proc").join(pid.to_string()))
    }

    /// Writer targeting an arbitrary proc-like directory
    #[must_use]
    pub fn at(proc_dir: impl Into<PathBuf>) -> Self {
        Self {
            proc_dir: proc_dir.into(),
        }
    }

    /// Write `setgroups`, `uid_map`, then `gid_map`
    ///
    /// `setgroups` is denied first because an unprivileged writer may not
    /// set a gid map otherwise. Kernels without the file are tolerated.
    ///
    /// # Errors
    /// Returns [`Error::ProcessCreation`] naming the file that could not be written
    pub fn write(&self, uid: IdMapping, gid: IdMapping) -> Result<()> {
        let setgroups = self.proc_dir.join("setgroups");
        if setgroups.exists() {
            write_proc_file(&setgroups, "deny")?;
        }

        write_proc_file(&self.proc_dir.join("uid_map"), &uid.to_map_line())?;
        write_proc_file(&self.proc_dir.join("gid_map"), &gid.to_map_line())?;

        tracing::debug!(
            proc_dir = %self.proc_dir.display(),
            uid = uid.host_id,
            gid = gid.host_id,
            "wrote UID/GID map"
        );
        Ok(())
    }
}

fn write_proc_file(path: &Path, contents: &str) -> Result<()> {
    // map files must be written in a single write(2)
    fs::write(path, contents.as_bytes()).map_err(|source: io::Error| Error::ProcessCreation {
        operation: format!("write {}", path.display()),
        source,
    })
}
