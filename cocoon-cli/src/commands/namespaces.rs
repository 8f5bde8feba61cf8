//! Namespaces command implementation

use anyhow::{Context, Result};
use cocoon_namespace::NamespaceInfo;

pub fn execute(pid: Option<u32>, json: bool) -> Result<()> {
    let target_pid = pid.unwrap_or_else(std::process::id);

    let ns_info = NamespaceInfo::for_pid(target_pid)
        .with_context(|| format!("failed to read namespaces of PID {target_pid}"))?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&ns_info).context("failed to serialize namespaces")?;
        println!("{rendered}");
        return Ok(());
    }

    print!("{ns_info}");

    match ns_info.is_isolated() {
        Ok(true) => println!("Process is in isolated namespaces"),
        Ok(false) => println!("Process is in host namespaces"),
        Err(e) => println!("Failed to check isolation: {e}"),
    }

    Ok(())
}
