//! Child command implementation, running as PID 1 of the new namespaces

use anyhow::{Context, Result};
use cocoon_core::InitConfig;
use cocoon_init::Initializer;

use crate::cli::ContainerArgs;

pub fn execute(args: &ContainerArgs) -> Result<i32> {
    let root = match &args.rootfs {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let config = InitConfig::new(root).with_hostname(args.hostname.clone());

    let (program, program_args) = args
        .command
        .split_first()
        .context("no program to run in the container")?;

    let outcome = Initializer::linux(config)
        .run(program, program_args)
        .context("container setup failed")?;

    Ok(outcome.code())
}
