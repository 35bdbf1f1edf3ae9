//! Environment variable overrides. Kept in its own test binary because the
//! variables are process-wide.

use std::fs;

use golem_dispatch::config::ConfigManager;

#[test]
fn test_environment_variables_override_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("golem_dispatch.toml"),
        r#"
[protocol]
exchange = "from_file"
command_name = "generate_music_wav"

[completion]
timeout_seconds = 60
"#,
    )
    .unwrap();

    std::env::set_var("GOLEM_DISPATCH__PROTOCOL__EXCHANGE", "from_env");
    std::env::set_var("GOLEM_DISPATCH__COMPLETION__TIMEOUT_SECONDS", "15");

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");

    std::env::remove_var("GOLEM_DISPATCH__PROTOCOL__EXCHANGE");
    std::env::remove_var("GOLEM_DISPATCH__COMPLETION__TIMEOUT_SECONDS");

    let manager = manager.unwrap();
    assert_eq!(manager.config().protocol.exchange, "from_env");
    assert_eq!(manager.config().protocol.command_name, "generate_music_wav");
    assert_eq!(manager.config().completion.timeout_seconds, Some(15));
    assert_eq!(manager.config().payload.config_group, "chat_ability/music_generation");
}
