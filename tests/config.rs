mod common;

use common::TestFixture;
use keyquest::config::settings::DebugLogRotation;
use keyquest::config::station::Provider;
use keyquest::config::{load_config_from, save_config_to, Config};
use std::time::Duration;

#[test]
fn saved_config_loads_back() {
    let fixture = TestFixture::new();
    let path = fixture.path().join("config.toml");

    let mut config = Config::default();
    config.default_station = "claude".to_string();
    config.suggest.level_counts = [8, 4, 2];
    config.volume.enabled = true;
    config.volume.login = "me@example.com".to_string();
    config.debug_log_rotation = Some(DebugLogRotation::Daily);
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.default_station, "claude");
    assert_eq!(loaded.suggest.level_counts, [8, 4, 2]);
    assert!(loaded.volume.enabled);
    assert_eq!(loaded.debug_log_rotation, Some(DebugLogRotation::Daily));
    assert_eq!(loaded.station(None).unwrap().provider, Provider::Anthropic);
}

#[test]
fn minimal_file_gets_defaults() {
    let fixture = TestFixture::new();
    let path = fixture.create_file(
        "config.toml",
        r#"
export_dir = "out"

[[stations]]
id = "local"
name = "Local"
provider = "openai"
api_key = "sk-local"
api_base = "http://localhost:8080"
model = "llama"

[retry]
max_attempts = 5
"#,
    );

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.export_dir, "out");
    assert_eq!(config.stations.len(), 1);
    assert_eq!(config.stations[0].base_url(), "http://localhost:8080");
    assert!(config.station(Some("local")).is_some());
    // default_station still points at "openai", which this file removed
    assert!(config.station(None).is_none());

    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.base_delay, Duration::from_secs(1));
    assert_eq!(policy.timeout, Duration::from_secs(5));

    assert_eq!(config.suggest.level_counts, [10, 0, 0]);
    assert_eq!(config.analysis.final_questions_count, 20);
    assert!(!config.volume.is_configured());
}

#[test]
fn volume_policy_keeps_retry_settings_but_not_timeout() {
    let config = Config::default();
    let policy = config.volume.retry_policy(config.retry_policy());
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.timeout, Duration::from_secs(60));
}

#[test]
fn broken_file_reports_its_path() {
    let fixture = TestFixture::new();
    let path = fixture.create_file("config.toml", "default_station = [");

    let err = load_config_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains("config.toml"));
}
