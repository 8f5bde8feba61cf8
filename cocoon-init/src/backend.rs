//! Isolation backend trait for pluggable implementations

use cocoon_core::{ExitOutcome, MountFlags};
use nix::mount::{MntFlags, MsFlags};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};

/// Operations the initializer needs from the kernel
///
/// This allows for different implementations:
/// - [`LinuxBackend`] - real syscalls through `nix`
/// - [`MockBackend`] - testing without namespaces or privileges
pub trait IsolationBackend {
    /// `mount(2)`
    ///
    /// # Errors
    /// Returns the OS error of the mount call
    fn mount(
        &self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MountFlags,
        data: Option<&str>,
    ) -> io::Result<()>;

    /// Create a single directory with the given mode
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// `pivot_root(2)`
    ///
    /// # Errors
    /// Returns the OS error of the pivot
    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> io::Result<()>;

    /// Change the working directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be entered
    fn change_dir(&self, path: &Path) -> io::Result<()>;

    /// `umount2(2)` with `MNT_DETACH`
    ///
    /// # Errors
    /// Returns the OS error of the unmount
    fn unmount_detach(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be removed
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// `sethostname(2)`
    ///
    /// # Errors
    /// Returns the OS error of the call
    fn set_hostname(&self, hostname: &str) -> io::Result<()>;

    /// Start `program` as a child with inherited stdio and environment, then wait for it
    ///
    /// # Errors
    /// Returns error if the program cannot be started or waited on
    fn run_program(&self, program: &str, args: &[String]) -> io::Result<ExitOutcome>;
}

/// Backend issuing real syscalls
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxBackend;

impl LinuxBackend {
    /// Create a new Linux backend
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl IsolationBackend for LinuxBackend {
    fn mount(
        &self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MountFlags,
        data: Option<&str>,
    ) -> io::Result<()> {
        let flags = MsFlags::from_bits_truncate(flags.bits() as nix::libc::c_ulong);
        nix::mount::mount(source, target, fstype, flags, data)?;
        Ok(())
    }

    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()> {
        std::fs::DirBuilder::new().mode(mode).create(path)
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> io::Result<()> {
        nix::unistd::pivot_root(new_root, put_old)?;
        Ok(())
    }

    fn change_dir(&self, path: &Path) -> io::Result<()> {
        nix::unistd::chdir(path)?;
        Ok(())
    }

    fn unmount_detach(&self, path: &Path) -> io::Result<()> {
        nix::mount::umount2(path, MntFlags::MNT_DETACH)?;
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }

    fn set_hostname(&self, hostname: &str) -> io::Result<()> {
        nix::unistd::sethostname(hostname)?;
        Ok(())
    }

    fn run_program(&self, program: &str, args: &[String]) -> io::Result<ExitOutcome> {
        let mut child = Command::new(program).args(args).spawn()?;
        tracing::debug!(pid = child.id(), program, "user program started");

        let status = child.wait()?;
        Ok(match (status.code(), status.signal()) {
            (Some(code), _) => ExitOutcome::Exited(code),
            (None, Some(signal)) => ExitOutcome::Signaled(signal),
            (None, None) => ExitOutcome::Exited(1),
        })
    }
}

/// Kind of call recorded by [`MockBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// [`IsolationBackend::mount`]
    Mount,
    /// [`IsolationBackend::create_dir`]
    CreateDir,
    /// [`IsolationBackend::pivot_root`]
    PivotRoot,
    /// [`IsolationBackend::change_dir`]
    ChangeDir,
    /// [`IsolationBackend::unmount_detach`]
    UnmountDetach,
    /// [`IsolationBackend::remove_dir`]
    RemoveDir,
    /// [`IsolationBackend::set_hostname`]
    SetHostname,
    /// [`IsolationBackend::run_program`]
    RunProgram,
}

/// A call recorded by [`MockBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Which operation was called
    pub kind: CallKind,
    /// Primary path (or hostname / program) the call operated on
    pub target: PathBuf,
    /// Mount flags, for mount calls
    pub flags: Option<MountFlags>,
}

/// Mock backend for testing (doesn't touch the system)
///
/// # Example
/// ```
/// use cocoon_init::{CallKind, IsolationBackend, MockBackend};
/// use std::path::Path;
///
/// let backend = MockBackend::new().fail_on(CallKind::PivotRoot);
///
/// backend.change_dir(Path::new("/")).unwrap();
/// assert!(backend.pivot_root(Path::new("/new"), Path::new("/new/.old")).is_err());
/// assert_eq!(backend.call_count(), 2);
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    fail_on: Option<(CallKind, usize)>,
    outcome: Option<ExitOutcome>,
    hostname: Option<String>,
}

impl MockBackend {
    /// Create a new mock backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first call of `kind` with `EPERM`
    #[must_use]
    pub fn fail_on(self, kind: CallKind) -> Self {
        self.fail_on_nth(kind, 0)
    }

    /// Fail the `nth` (zero-based) call of `kind` with `EPERM`
    #[must_use]
    pub fn fail_on_nth(self, kind: CallKind, nth: usize) -> Self {
        self.lock().fail_on = Some((kind, nth));
        self
    }

    /// Outcome returned by [`IsolationBackend::run_program`]
    #[must_use]
    pub fn with_outcome(self, outcome: ExitOutcome) -> Self {
        self.lock().outcome = Some(outcome);
        self
    }

    /// All calls made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Kinds of all calls made so far, in order
    #[must_use]
    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.lock().calls.iter().map(|c| c.kind).collect()
    }

    /// Get the number of backend calls made
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Hostname set through the backend, if any
    #[must_use]
    pub fn hostname(&self) -> Option<String> {
        self.lock().hostname.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, kind: CallKind, target: &Path, flags: Option<MountFlags>) -> io::Result<()> {
        let mut state = self.lock();
        let seen = state.calls.iter().filter(|c| c.kind == kind).count();
        state.calls.push(Call {
            kind,
            target: target.to_path_buf(),
            flags,
        });

        tracing::debug!(?kind, target = %target.display(), "Mock: call");

        match state.fail_on {
            Some((fail_kind, nth)) if fail_kind == kind && nth == seen => {
                Err(io::Error::from_raw_os_error(nix::libc::EPERM))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

impl IsolationBackend for MockBackend {
    fn mount(
        &self,
        _source: Option<&str>,
        target: &Path,
        _fstype: Option<&str>,
        flags: MountFlags,
        _data: Option<&str>,
    ) -> io::Result<()> {
        self.record(CallKind::Mount, target, Some(flags))
    }

    fn create_dir(&self, path: &Path, _mode: u32) -> io::Result<()> {
        self.record(CallKind::CreateDir, path, None)
    }

    fn pivot_root(&self, new_root: &Path, _put_old: &Path) -> io::Result<()> {
        self.record(CallKind::PivotRoot, new_root, None)
    }

    fn change_dir(&self, path: &Path) -> io::Result<()> {
        self.record(CallKind::ChangeDir, path, None)
    }

    fn unmount_detach(&self, path: &Path) -> io::Result<()> {
        self.record(CallKind::UnmountDetach, path, None)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.record(CallKind::RemoveDir, path, None)
    }

    fn set_hostname(&self, hostname: &str) -> io::Result<()> {
        self.record(CallKind::SetHostname, Path::new(hostname), None)?;
        self.lock().hostname = Some(hostname.to_string());
        Ok(())
    }

    fn run_program(&self, program: &str, _args: &[String]) -> io::Result<ExitOutcome> {
        self.record(CallKind::RunProgram, Path::new(program), None)?;
        Ok(self.lock().outcome.unwrap_or(ExitOutcome::Exited(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_backend_records_calls() {
        let backend = MockBackend::new();

        backend
            .mount(
                Some("proc"),
                Path::new("/r/proc"),
                Some("proc"),
                MountFlags::NOSUID,
                None,
            )
            .unwrap();
        backend.set_hostname("box").unwrap();

        assert_eq!(backend.call_kinds(), [CallKind::Mount, CallKind::SetHostname]);
        assert_eq!(backend.calls()[0].flags, Some(MountFlags::NOSUID));
        assert_eq!(backend.hostname().as_deref(), Some("box"));
    }

    #[test]
    fn test_mock_backend_fails_nth_call() {
        let backend = MockBackend::new().fail_on_nth(CallKind::Mount, 1);
        let mount = |target: &str| {
            backend.mount(None, Path::new(target), None, MountFlags::NONE, None)
        };

        assert!(mount("/a").is_ok());
        let err = mount("/b").unwrap_err();
        assert_eq!(err.raw_os_error(), Some(nix::libc::EPERM));
        assert!(mount("/c").is_ok());
    }

    #[test]
    fn test_mock_backend_outcome() {
        let backend = MockBackend::new().with_outcome(ExitOutcome::Exited(7));
        let outcome = backend.run_program("/bin/false", &[]).unwrap();
        assert_eq!(outcome, ExitOutcome::Exited(7));
    }

    #[test]
    fn test_linux_backend_runs_program() {
        let backend = LinuxBackend::new();

        let ok = backend.run_program("/bin/sh", &["-c".into(), "exit 0".into()]);
        assert_eq!(ok.unwrap(), ExitOutcome::Exited(0));

        let code = backend.run_program("/bin/sh", &["-c".into(), "exit 5".into()]);
        assert_eq!(code.unwrap(), ExitOutcome::Exited(5));

        let killed = backend.run_program("/bin/sh", &["-c".into(), "kill -9 $$".into()]);
        assert_eq!(killed.unwrap(), ExitOutcome::Signaled(9));
    }

    #[test]
    fn test_linux_backend_missing_program() {
        let backend = LinuxBackend::new();
        assert!(backend.run_program("/nonexistent/program", &[]).is_err());
    }
}
