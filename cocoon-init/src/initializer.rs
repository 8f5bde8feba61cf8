//! Container initializer: the process that runs as PID 1 in the new namespaces

use cocoon_core::{Error, ExitOutcome, InitConfig, Result};
use tracing::{debug, info, warn};

use crate::backend::{IsolationBackend, LinuxBackend};
use crate::plan::SetupPlan;

/// Builds the container filesystem view and runs the user program
///
/// Setup order is fixed: mount table, root switch, hostname, then the
/// program. The program never starts unless every setup step succeeded.
#[derive(Debug)]
pub struct Initializer<B = LinuxBackend> {
    config: InitConfig,
    backend: B,
}

impl Initializer<LinuxBackend> {
    /// Initializer issuing real syscalls
    #[must_use]
    pub const fn linux(config: InitConfig) -> Self {
        Self::new(config, LinuxBackend::new())
    }
}

impl<B: IsolationBackend> Initializer<B> {
    /// Create an initializer over any backend
    #[must_use]
    pub const fn new(config: InitConfig, backend: B) -> Self {
        Self { config, backend }
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &InitConfig {
        &self.config
    }

    /// Get the backend
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Prepare the container and run `program` in it
    ///
    /// `program` is used as a path; it is not looked up in `PATH`.
    ///
    /// # Errors
    /// Returns the first setup error, or [`Error::ChildExec`] if the program
    /// cannot be started or waited on. A program that runs and fails is an
    /// `Ok` outcome.
    pub fn run(&self, program: &str, args: &[String]) -> Result<ExitOutcome> {
        if program.is_empty() {
            return Err(Error::invalid_config("program cannot be empty"));
        }
        self.config.validate()?;

        let pid = std::process::id();
        if pid == 1 {
            debug!("initializer is PID 1");
        } else {
            warn!(pid, "initializer is not PID 1, PID namespace may be missing");
        }

        let plan = SetupPlan::from_config(&self.config);
        plan.execute(&self.backend).into_result()?;

        info!(
            hostname = %self.config.hostname,
            root = %self.config.root.display(),
            "container ready"
        );

        let outcome = self
            .backend
            .run_program(program, args)
            .map_err(|source| Error::ChildExec {
                program: program.to_string(),
                source,
            })?;

        debug!(%outcome, program, "user program finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CallKind, MockBackend};

    #[test]
    fn test_program_runs_last() {
        let backend = MockBackend::new().with_outcome(ExitOutcome::Exited(3));
        let init = Initializer::new(InitConfig::new("/rootfs"), backend.clone());

        let outcome = init.run("/bin/false", &[]).unwrap();

        assert_eq!(outcome, ExitOutcome::Exited(3));
        assert_eq!(backend.call_kinds().last(), Some(&CallKind::RunProgram));
        assert_eq!(backend.call_count(), 11);
    }

    #[test]
    fn test_no_program_after_setup_failure() {
        let backend = MockBackend::new().fail_on(CallKind::Mount);
        let init = Initializer::new(InitConfig::new("/rootfs"), backend.clone());

        let err = init.run("/bin/echo", &["hello".to_string()]).unwrap_err();

        assert!(matches!(err, Error::Mount { .. }));
        assert!(!backend.call_kinds().contains(&CallKind::RunProgram));
    }

    #[test]
    fn test_exec_failure() {
        let backend = MockBackend::new().fail_on(CallKind::RunProgram);
        let init = Initializer::new(InitConfig::new("/rootfs"), backend);

        let err = init.run("/bin/missing", &[]).unwrap_err();
        assert!(matches!(err, Error::ChildExec { ref program, .. } if program == "/bin/missing"));
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let backend = MockBackend::new();
        let init = Initializer::new(InitConfig::new("relative"), backend.clone());

        assert!(init.run("/bin/true", &[]).is_err());
        assert!(init.run("", &[]).is_err());
        assert_eq!(backend.call_count(), 0);
    }
}
