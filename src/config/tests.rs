//! Config module tests

use std::io::Write;

use test_case::test_case;

use super::*;

#[test]
fn test_substitute_env_vars_simple() {
    std::env::set_var("VMS_TEST_VAR_SIMPLE", "hello");
    let result = substitute_env_vars("value = \"${VMS_TEST_VAR_SIMPLE}\"").unwrap();
    assert_eq!(result, "value = \"hello\"");
    std::env::remove_var("VMS_TEST_VAR_SIMPLE");
}

#[test]
fn test_substitute_env_vars_with_default() {
    std::env::remove_var("VMS_TEST_VAR_UNSET");
    let result = substitute_env_vars("value = \"${VMS_TEST_VAR_UNSET:-fallback}\"").unwrap();
    assert_eq!(result, "value = \"fallback\"");
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.log.level, "info");
    assert_eq!(config.session.max_pending_messages_per_client, 250);
    assert_eq!(
        config.session.pending_messages_overflow_strategy,
        OverflowStrategy::DropOldestQueuedMessage
    );
    assert_eq!(
        config.session.expiry_check_interval_duration(),
        Duration::from_secs(60)
    );
}

#[test_case("drop_new_message", OverflowStrategy::DropNewMessage ; "drop new")]
#[test_case("drop_oldest_queued_message", OverflowStrategy::DropOldestQueuedMessage ; "drop oldest")]
fn test_parse_overflow_strategy(name: &str, expected: OverflowStrategy) {
    let content = format!(
        "[session]\nmax_pending_messages_per_client = 8\npending_messages_overflow_strategy = \"{}\"\n",
        name
    );
    let config = Config::parse(&content).unwrap();
    assert_eq!(config.session.max_pending_messages_per_client, 8);
    assert_eq!(config.session.pending_messages_overflow_strategy, expected);
}

#[test]
fn test_parse_rejects_unknown_strategy() {
    let content = "[session]\npending_messages_overflow_strategy = \"drop_everything\"\n";
    assert!(matches!(Config::parse(content), Err(ConfigError::Parse(_))));
}

#[test]
fn test_validate_rejects_zero_pending() {
    let content = "[session]\nmax_pending_messages_per_client = 0\n";
    assert!(matches!(
        Config::parse(content),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.session.max_pending_messages_per_client, 250);
}

#[test]
fn test_load_config_with_env_substitution() {
    std::env::set_var("VMS_TEST_MAX_PENDING", "42");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[log]
level = "${{VMS_TEST_LOG_LEVEL:-debug}}"

[session]
max_pending_messages_per_client = ${{VMS_TEST_MAX_PENDING}}
pending_messages_overflow_strategy = "drop_new_message"
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.session.max_pending_messages_per_client, 42);
    assert_eq!(
        config.session.pending_messages_overflow_strategy,
        OverflowStrategy::DropNewMessage
    );

    std::env::remove_var("VMS_TEST_MAX_PENDING");
}
