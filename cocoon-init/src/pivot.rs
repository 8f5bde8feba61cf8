//! Root filesystem switch via `pivot_root(2)`
//!
//! Order matters here:
//! 1. The new root must be a mount point, so it is bind-mounted onto itself
//!    recursively; the mounts already made under it move along
//! 2. The old root is moved into a staging directory inside the new root
//! 3. The working directory must leave the old root before it can be detached
//! 4. The old root is lazily unmounted with all its submounts, then the
//!    staging directory is removed
//!
//! There is no rollback. A failure leaves the mount namespace half switched
//! and the caller must not run user code in it.

use std::path::Path;

use crate::step::Step;

/// The six root-switch steps for `root`, staging the old root under `staging`
#[must_use]
pub fn pivot_steps(root: &Path, staging: &str) -> Vec<Step> {
    let put_old = root.join(staging);
    let staged = Path::new("/").join(staging);

    vec![
        Step::BindRoot {
            root: root.to_path_buf(),
        },
        Step::CreateStaging {
            path: put_old.clone(),
        },
        Step::PivotRoot {
            new_root: root.to_path_buf(),
            put_old,
        },
        Step::EnterNewRoot,
        Step::DetachOldRoot {
            path: staged.clone(),
        },
        Step::RemoveStaging { path: staged },
    ]
}
