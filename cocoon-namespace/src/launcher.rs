//! Parent side: create the namespaces and re-execute ourselves inside them
//!
//! This module uses `unsafe` for clone(2), which is the only way to create a
//! PID namespace whose first process is the re-executed binary itself.

#![allow(unsafe_code)]

use cocoon_core::{CHILD_VERB, Error, ExitOutcome, NamespaceRequest, Result};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sched::clone;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{Pid, execv, pipe2, write};
use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::NamespaceConfig;
use crate::idmap::IdMapWriter;

/// Absolute path of the running executable
pub const SELF_EXE: &str = "/proc/self/exe";

/// Stack for the cloned child; it only blocks on a pipe and calls execv
const STACK_SIZE: usize = 1024 * 1024;

/// Exit code of the cloned child when re-execution fails
const EXEC_FAILED: isize = 127;

/// Starts the confined process and waits for it
#[derive(Debug, Clone)]
pub struct Launcher {
    request: NamespaceRequest,
    namespaces: NamespaceConfig,
    executable: PathBuf,
    argv0: String,
}

impl Launcher {
    /// Launcher re-executing [`SELF_EXE`] in all six namespaces of `namespaces`
    #[must_use]
    pub fn new(request: NamespaceRequest, namespaces: NamespaceConfig) -> Self {
        let argv0 = std::env::args_os()
            .next()
            .map_or_else(|| "cocoon".to_string(), |a| a.to_string_lossy().into_owned());
        Self {
            request,
            namespaces,
            executable: PathBuf::from(SELF_EXE),
            argv0,
        }
    }

    /// Execute a different binary instead of [`SELF_EXE`]
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    /// Override `argv[0]` of the re-executed process
    #[must_use]
    pub fn with_argv0(mut self, argv0: impl Into<String>) -> Self {
        self.argv0 = argv0.into();
        self
    }

    /// Get the request
    #[must_use]
    pub const fn request(&self) -> &NamespaceRequest {
        &self.request
    }

    /// Binary that will be executed
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Full argument vector of the re-executed process
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.request.args.len() + 2);
        argv.push(self.argv0.clone());
        argv.push(CHILD_VERB.to_string());
        argv.extend(self.request.args.iter().cloned());
        argv
    }

    /// Create the confined process and block until it exits
    ///
    /// The cloned child waits on a pipe until its uid/gid maps are written,
    /// so the re-executed binary always starts with its identity in place.
    ///
    /// # Errors
    /// Returns [`Error::ProcessCreation`] if the process cannot be created or
    /// its identity mapping cannot be written, and [`Error::Wait`] if waiting
    /// fails. A non-zero exit of the child is an `Ok` outcome.
    pub fn launch(&self) -> Result<ExitOutcome> {
        if self.request.args.is_empty() {
            return Err(Error::invalid_config("no command to run in the container"));
        }

        let executable = to_cstring(self.executable.as_os_str().as_bytes())?;
        let argv = self
            .argv()
            .into_iter()
            .map(|arg| to_cstring(arg.as_bytes()))
            .collect::<Result<Vec<_>>>()?;

        let (ready_fd, release_fd) =
            pipe2(OFlag::O_CLOEXEC).map_err(|e| creation_error("create sync pipe", e))?;
        let ready = File::from(ready_fd);
        let mut release = File::from(release_fd);

        let flags = self.namespaces.to_clone_flags();
        debug!(
            namespaces = ?self.namespaces.enabled_namespaces(),
            executable = %self.executable.display(),
            "cloning container process"
        );

        let exec_failure = exec_failure_prefix(&self.executable);
        let mut stack = vec![0u8; STACK_SIZE];
        let child_main = Box::new(|| confined_entry(&ready, &executable, &argv, &exec_failure));

        // SAFETY: no CLONE_VM, so the child runs on a copy of our memory and
        // only reads the pipe and calls execv before leaving this image.
        let pid = unsafe { clone(child_main, &mut stack, flags, Some(libc::SIGCHLD)) }
            .map_err(|e| creation_error("clone", e))?;
        drop(ready);

        info!("container pid: {pid}");

        if self.namespaces.user {
            let mapped = IdMapWriter::for_pid(pid.as_raw())
                .write(self.request.uid_mapping(), self.request.gid_mapping());
            if let Err(err) = mapped {
                abort_child(pid);
                return Err(err);
            }
        }

        if let Err(e) = release.write_all(&[1]) {
            abort_child(pid);
            return Err(Error::ProcessCreation {
                operation: "release container process".to_string(),
                source: e,
            });
        }
        drop(release);

        wait_for_exit(pid)
    }
}

/// Runs in the cloned child: wait for the parent, then become the initializer
///
/// Only async-signal-safe work happens here; the parent may hold locks that
/// were copied into this process locked.
fn confined_entry(
    ready: &File,
    executable: &CStr,
    argv: &[CString],
    exec_failure: &[u8],
) -> isize {
    let mut reader = ready;
    let mut byte = [0u8; 1];
    if reader.read_exact(&mut byte).is_err() {
        return 1;
    }

    match execv(executable, argv) {
        Ok(never) => match never {},
        Err(errno) => {
            let stderr = std::io::stderr();
            for part in [exec_failure, errno.desc().as_bytes(), &b"\n"[..]] {
                let _ = write(&stderr, part);
            }
            EXEC_FAILED
        }
    }
}

/// Message written by the child when re-execution fails, minus the OS reason
fn exec_failure_prefix(executable: &Path) -> Vec<u8> {
    let mut message = b"cocoon: failed to execute ".to_vec();
    message.extend_from_slice(executable.as_os_str().as_bytes());
    message.extend_from_slice(b": ");
    message
}

/// Wait for the confined process to exit
fn wait_for_exit(pid: Pid) -> Result<ExitOutcome> {
    debug!(%pid, "waiting for container process");

    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                debug!(%pid, code, "container process exited");
                return Ok(ExitOutcome::Exited(code));
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                warn!(%pid, ?signal, "container process killed by signal");
                return Ok(ExitOutcome::Signaled(signal as i32));
            }
            Ok(status) => {
                debug!(?status, "container process status");
            }
            Err(Errno::EINTR) => {}
            Err(e) => {
                return Err(Error::Wait {
                    pid: pid.as_raw(),
                    source: e.into(),
                });
            }
        }
    }
}

fn abort_child(pid: Pid) {
    warn!(%pid, "killing container process after failed setup");
    let _ = kill(pid, Signal::SIGKILL);
    let _ = waitpid(pid, None);
}

fn creation_error(operation: &str, errno: Errno) -> Error {
    Error::ProcessCreation {
        operation: operation.to_string(),
        source: errno.into(),
    }
}

fn to_cstring(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|e| Error::invalid_config(format!("argument contains NUL: {e}")))
}
