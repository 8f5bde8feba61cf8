//! Mount table setup under the future container root

use cocoon_core::MountSpec;
use std::path::{Path, PathBuf};

use crate::step::Step;

/// Resolve a mount target under `root`
///
/// The target is always joined below the root, even when written as an
/// absolute path.
#[must_use]
pub fn resolve_target(root: &Path, target: &str) -> PathBuf {
    root.join(target.trim_start_matches('/'))
}

/// One [`Step::Mount`] per entry, in table order
#[must_use]
pub fn mount_steps(mounts: &[MountSpec], root: &Path) -> Vec<Step> {
    mounts
        .iter()
        .map(|spec| Step::Mount {
            spec: spec.clone(),
            target: resolve_target(root, &spec.target),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CallKind, MockBackend};
    use crate::plan::SetupPlan;
    use crate::step::StepKind;
    use cocoon_core::{Error, InitConfig};

    #[test]
    fn test_resolve_target_stays_under_root() {
        let root = Path::new("/home/user/rootfs");
        assert_eq!(resolve_target(root, "/proc"), root.join("proc"));
        assert_eq!(resolve_target(root, "sys"), root.join("sys"));
        assert_eq!(resolve_target(root, "//dev"), root.join("dev"));
    }

    #[test]
    fn test_mounts_in_table_order() {
        let root = Path::new("/rootfs");
        let steps = mount_steps(&MountSpec::default_table(), root);

        let targets: Vec<_> = steps.iter().filter_map(Step::path).collect();
        assert_eq!(
            targets,
            [root.join("proc"), root.join("dev"), root.join("sys")]
        );
        assert!(steps.iter().all(|s| s.kind() == StepKind::Mount));
    }

    #[test]
    fn test_first_failure_aborts() {
        let backend = MockBackend::new().fail_on_nth(CallKind::Mount, 1);
        let config = InitConfig::new("/r");

        let report = SetupPlan::from_config(&config).execute(&backend);

        assert_eq!(report.completed, 1);
        match report.into_result().unwrap_err() {
            Error::Mount { target, fstype, .. } => {
                assert_eq!(target, PathBuf::from("/r/dev"));
                assert_eq!(fstype, "tmpfs");
            }
            other => panic!("unexpected error: {other}"),
        }
        // /sys is never attempted
        assert_eq!(backend.call_count(), 2);
    }
}
