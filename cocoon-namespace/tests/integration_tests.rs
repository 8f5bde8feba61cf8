use cocoon_core::{ExitOutcome, NamespaceRequest};
use cocoon_namespace::*;
use nix::sched::CloneFlags;

fn host_only() -> NamespaceConfig {
    NamespaceConfig::all()
        .with_user(false)
        .with_pid(false)
        .with_uts(false)
        .with_mount(false)
        .with_network(false)
        .with_ipc(false)
}

#[test]
fn test_default_requests_all_six() {
    let config = NamespaceConfig::new();
    assert_eq!(
        config.enabled_namespaces(),
        ["user", "pid", "uts", "mnt", "net", "ipc"]
    );

    let flags = config.to_clone_flags();
    for flag in [
        CloneFlags::CLONE_NEWUSER,
        CloneFlags::CLONE_NEWPID,
        CloneFlags::CLONE_NEWUTS,
        CloneFlags::CLONE_NEWNS,
        CloneFlags::CLONE_NEWNET,
        CloneFlags::CLONE_NEWIPC,
    ] {
        assert!(flags.contains(flag));
    }
}

#[test]
fn test_host_only_config() {
    let config = host_only();
    assert!(!config.has_any());
    assert!(config.to_clone_flags().is_empty());
}

#[test]
fn test_launcher_forwards_arguments() {
    let request = NamespaceRequest::new(
        vec!["--hostname".into(), "box".into(), "--".into(), "/bin/sh".into()],
        1000,
        1000,
    );
    let launcher = Launcher::new(request, NamespaceConfig::all()).with_argv0("/usr/bin/cocoon");

    assert_eq!(
        launcher.argv(),
        ["/usr/bin/cocoon", "child", "--hostname", "box", "--", "/bin/sh"]
    );
}

#[test]
fn test_launch_reports_exit_status() {
    let request = NamespaceRequest::new(vec!["ignored".into()], 0, 0);
    let outcome = Launcher::new(request, host_only())
        .with_executable("/bin/false")
        .launch()
        .unwrap();

    assert_eq!(outcome, ExitOutcome::Exited(1));
    assert_eq!(outcome.code(), 1);
}

#[test]
fn test_current_process_not_isolated_from_itself() {
    let info = NamespaceInfo::current().unwrap();
    let again = NamespaceInfo::for_pid(std::process::id()).unwrap();
    assert!(!info.differs_from(&again));
}

#[test]
fn test_namespace_info_json() {
    let info = NamespaceInfo {
        pid: 1,
        uts: Some("uts:[4026531838]".to_string()),
        ..Default::default()
    };

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["pid"], 1);
    assert_eq!(json["uts"], "uts:[4026531838]");
    assert!(json["net"].is_null());
}

#[test]
fn test_id_map_writer_for_request() {
    let dir = tempfile::tempdir().unwrap();
    let request = NamespaceRequest::new(vec!["/bin/true".into()], 1234, 5678);

    IdMapWriter::at(dir.path())
        .write(request.uid_mapping(), request.gid_mapping())
        .unwrap();

    let uid_map = std::fs::read_to_string(dir.path().join("uid_map")).unwrap();
    let gid_map = std::fs::read_to_string(dir.path().join("gid_map")).unwrap();
    assert_eq!(uid_map, "0 1234 1\n");
    assert_eq!(gid_map, "0 5678 1\n");
}

#[test]
#[ignore] // Requires unprivileged user namespaces
fn test_launch_in_new_namespaces() {
    let request = NamespaceRequest::for_current_user(vec!["ignored".into()]);
    let outcome = Launcher::new(request, NamespaceConfig::all())
        .with_executable("/bin/true")
        .launch()
        .unwrap();

    assert!(outcome.success());
}
