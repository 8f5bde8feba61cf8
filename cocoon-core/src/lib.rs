//! Cocoon Core - shared data model, configuration, and errors
//!
//! Types here cross the launcher/initializer boundary only by value: the
//! launcher encodes them into the re-exec argument list, the initializer
//! rebuilds them from it.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{DEFAULT_HOSTNAME, DEFAULT_STAGING_DIR, InitConfig, MountFlags, MountSpec};
pub use error::{Error, Result};
pub use types::{CHILD_VERB, ExitOutcome, IdMapping, NamespaceRequest, PivotStep};
