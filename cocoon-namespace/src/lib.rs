//! Namespace creation for the container launcher
//!
//! This crate runs on the host side:
//! - Namespace selection - user, PID, UTS, mount, network, IPC
//! - Identity mapping - namespace root mapped onto the calling user
//! - Launcher - clone(2) into the namespaces and re-exec as the initializer
//! - Inspection - namespace IDs of any process from `/proc`

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod config;
pub mod idmap;
pub mod info;
pub mod launcher;

pub use config::NamespaceConfig;
pub use idmap::IdMapWriter;
pub use info::NamespaceInfo;
pub use launcher::{Launcher, SELF_EXE};
