use crate::cli::Commands;
use anyhow::Result;

pub mod child;
pub mod namespaces;
pub mod run;

/// Dispatch command to appropriate handler, returning the process exit code
pub fn dispatch(command: Commands, verbose: bool) -> Result<i32> {
    match command {
        Commands::Run(args) => run::execute(&args, verbose),

        Commands::Child(args) => child::execute(&args),

        Commands::Namespaces { pid, json } => {
            namespaces::execute(pid, json)?;
            Ok(0)
        }
    }
}
