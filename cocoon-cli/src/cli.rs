//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use cocoon_core::DEFAULT_HOSTNAME;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cocoon")]
#[command(about = "Minimal namespace container runtime", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program in a new container
    Run(ContainerArgs),

    /// Set up the container from inside its namespaces
    #[command(hide = true)]
    Child(ContainerArgs),

    /// Show namespace information
    Namespaces {
        /// Process ID (default: current process)
        #[arg(short, long)]
        pid: Option<u32>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments shared by the launcher and the initializer
#[derive(Args, Debug, Clone)]
pub struct ContainerArgs {
    /// Hostname inside the container
    #[arg(long, default_value = DEFAULT_HOSTNAME)]
    pub hostname: String,

    /// Directory that becomes the container root (default: current directory)
    #[arg(long)]
    pub rootfs: Option<PathBuf>,

    /// Program and its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl ContainerArgs {
    /// Arguments that reproduce these settings for the `child` verb
    pub fn to_child_args(&self, verbose: bool) -> Vec<String> {
        let mut args = vec!["--hostname".to_string(), self.hostname.clone()];
        if let Some(rootfs) = &self.rootfs {
            args.push("--rootfs".to_string());
            args.push(rootfs.to_string_lossy().into_owned());
        }
        if verbose {
            args.push("--verbose".to_string());
        }
        args.push("--".to_string());
        args.extend(self.command.iter().cloned());
        args
    }
}
