//! Container initialization inside fresh namespaces
//!
//! This crate runs in the re-executed child:
//! - Mount table - `/proc`, `/dev`, `/sys` under the new root
//! - Root switch - `pivot_root(2)` into the new root, old root detached
//! - Hostname - set in the new UTS namespace
//! - User program - started as a child and waited on
//!
//! All kernel access goes through [`IsolationBackend`], so the whole
//! sequence can be exercised with [`MockBackend`].

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod backend;
pub mod initializer;
pub mod mount;
pub mod pivot;
pub mod plan;
pub mod step;

pub use backend::{Call, CallKind, IsolationBackend, LinuxBackend, MockBackend};
pub use initializer::Initializer;
pub use mount::{mount_steps, resolve_target};
pub use pivot::pivot_steps;
pub use plan::{SetupPlan, SetupReport, StepFailure};
pub use step::{Step, StepKind};
