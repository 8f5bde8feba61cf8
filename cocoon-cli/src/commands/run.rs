//! Run command implementation

use anyhow::{Context, Result};
use cocoon_core::NamespaceRequest;
use cocoon_namespace::{Launcher, NamespaceConfig};

use crate::cli::ContainerArgs;

pub fn execute(args: &ContainerArgs, verbose: bool) -> Result<i32> {
    let args = resolve_rootfs(args)?;

    tracing::info!(
        hostname = %args.hostname,
        program = ?args.command.first(),
        "starting container"
    );

    let request = NamespaceRequest::for_current_user(args.to_child_args(verbose));
    let outcome = Launcher::new(request, NamespaceConfig::all())
        .launch()
        .context("failed to start container process")?;

    tracing::debug!(%outcome, "container finished");
    Ok(outcome.code())
}

/// Resolve `--rootfs` against the working directory; the child only accepts
/// an absolute root
fn resolve_rootfs(args: &ContainerArgs) -> Result<ContainerArgs> {
    let mut resolved = args.clone();
    if let Some(rootfs) = &args.rootfs {
        let absolute = std::fs::canonicalize(rootfs)
            .with_context(|| format!("failed to resolve rootfs {}", rootfs.display()))?;
        resolved.rootfs = Some(absolute);
    }
    Ok(resolved)
}
