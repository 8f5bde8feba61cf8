//! The full container setup sequence as data
//!
//! Steps run in order until one fails; [`SetupReport`] records where it stopped.

use cocoon_core::{Error, InitConfig, Result};
use tracing::{debug, error, info};

use crate::backend::IsolationBackend;
use crate::mount::mount_steps;
use crate::pivot::pivot_steps;
use crate::step::{Step, StepKind};

/// Ordered setup steps: mounts, then root switch, then hostname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPlan {
    steps: Vec<Step>,
}

impl SetupPlan {
    /// Build the plan for a container
    #[must_use]
    pub fn from_config(config: &InitConfig) -> Self {
        let mut steps = mount_steps(&config.mounts, &config.root);
        steps.extend(pivot_steps(&config.root, &config.staging_dir));
        steps.push(Step::SetHostname {
            hostname: config.hostname.clone(),
        });
        Self { steps }
    }

    /// The steps, in execution order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, stopping at the first failure
    pub fn execute<B: IsolationBackend + ?Sized>(&self, backend: &B) -> SetupReport {
        for (index, step) in self.steps.iter().enumerate() {
            debug!(index, %step, "setup step");

            if let Err(err) = step.apply(backend) {
                error!(
                    index,
                    %step,
                    error = &err as &dyn std::error::Error,
                    "setup step failed"
                );
                return SetupReport {
                    completed: index,
                    total: self.steps.len(),
                    failure: Some(StepFailure {
                        index,
                        kind: step.kind(),
                        error: err,
                    }),
                };
            }

            if let Step::Mount { target, .. } = step {
                info!("mounted {}", target.display());
            }
        }

        SetupReport {
            completed: self.steps.len(),
            total: self.steps.len(),
            failure: None,
        }
    }
}

/// Where and why a plan stopped
#[derive(Debug)]
pub struct StepFailure {
    /// Position of the failed step in the plan
    pub index: usize,
    /// Tag of the failed step
    pub kind: StepKind,
    /// The error
    pub error: Error,
}

/// Result of executing a [`SetupPlan`]
#[derive(Debug)]
pub struct SetupReport {
    /// Steps that succeeded
    pub completed: usize,
    /// Steps in the plan
    pub total: usize,
    /// The failure, if the plan stopped early
    pub failure: Option<StepFailure>,
}

impl SetupReport {
    /// Whether every step succeeded
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Tag of the failed step, if any
    #[must_use]
    pub fn failed_at(&self) -> Option<StepKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    /// Convert to a plain result
    ///
    /// # Errors
    /// Returns the error of the failed step
    pub fn into_result(self) -> Result<()> {
        match self.failure {
            Some(failure) => Err(failure.error),
            None => Ok(()),
        }
    }
}
