use cocoon_core::*;
use std::path::Path;

#[test]
fn test_init_config_defaults() {
    let config = InitConfig::new("/var/lib/rootfs");

    assert_eq!(config.root(), Path::new("/var/lib/rootfs"));
    assert_eq!(config.hostname, DEFAULT_HOSTNAME);
    assert_eq!(config.staging_dir, DEFAULT_STAGING_DIR);
    assert_eq!(config.mounts, MountSpec::default_table());
    assert!(config.validate().is_ok());
}

#[test]
fn test_init_config_serialization() {
    let config = InitConfig::new("/rootfs").with_hostname("web");

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"hostname\":\"web\""));
    assert!(json.contains("mode=755"));

    let deserialized: InitConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, deserialized);
}

#[test]
fn test_sysfs_is_read_only() {
    let sys = MountSpec::default_table()
        .into_iter()
        .find(|m| m.target == "/sys")
        .unwrap();

    assert_eq!(sys.fstype, "sysfs");
    assert!(sys.flags.contains(MountFlags::RDONLY));
    assert!(sys.flags.contains(MountFlags::NOEXEC));
    assert!(sys.data.is_none());
}

#[test]
fn test_request_maps_root_to_caller() {
    let request = NamespaceRequest::new(vec!["/bin/echo".into(), "hello".into()], 1000, 1000);

    for mapping in [request.uid_mapping(), request.gid_mapping()] {
        assert_eq!(mapping.container_id, 0);
        assert_eq!(mapping.host_id, 1000);
        assert_eq!(mapping.size, 1);
    }
}

#[test]
fn test_invalid_config_message() {
    let err = InitConfig::new("rootfs").validate().unwrap_err();

    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert!(err.to_string().contains("absolute"));
}

#[test]
fn test_exit_outcome_display() {
    assert_eq!(ExitOutcome::Exited(2).to_string(), "exited with code 2");
    assert_eq!(ExitOutcome::Signaled(9).to_string(), "killed by signal 9");
}
