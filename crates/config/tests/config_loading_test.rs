use std::io::Write;

use commander_config::{AppConfig, ConfigValidator, LogFormat};
use commander_core::{LoadBalanceStrategy, TaskSchedule};
use tempfile::NamedTempFile;

const SAMPLE: &str = r#"
[scheduler]
check_interval_seconds = 3
default_timeout_seconds = 600

[load_balancer]
strategy = "task_affinity"
heartbeat_timeout_seconds = 60

[retry]
backoff_multiplier = 1.5
max_interval_seconds = 120

[observability]
log_level = "debug"
log_format = "json"

[[workers]]
node_id = "local-1"
max_concurrent_tasks = 2
supported_task_types = ["echo", "delay"]

[[tasks]]
task_id = "heartbeat-echo"
name = "心跳回显"
task_type = "echo"

[tasks.schedule]
type = "interval"
seconds = 30
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_from_explicit_file() {
    let file = write_config(SAMPLE);
    let path = file.path().to_str().unwrap();

    let config = AppConfig::load(Some(path)).unwrap();
    assert_eq!(config.scheduler.check_interval_seconds, 3);
    assert_eq!(config.scheduler.default_timeout_seconds, 600);
    assert_eq!(config.scheduler.max_dispatch_per_tick, 100);
    assert_eq!(config.load_balancer.strategy, LoadBalanceStrategy::TaskAffinity);
    assert_eq!(config.retry.backoff_multiplier, 1.5);
    assert_eq!(config.observability.log_format, LogFormat::Json);
    assert_eq!(config.workers.len(), 1);
    assert_eq!(config.tasks[0].schedule, Some(TaskSchedule::interval(30)));
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_explicit_file_is_error() {
    let result = AppConfig::load(Some("/nonexistent/commander/scheduler.toml"));
    assert!(result.is_err());
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let file = write_config(
        r#"
[scheduler]
check_interval_seconds = 0
"#,
    );
    let result = AppConfig::load(Some(file.path().to_str().unwrap()));
    assert!(result.is_err());
}

#[test]
fn test_invalid_task_rejected() {
    let result = AppConfig::from_toml(
        r#"
[[tasks]]
task_id = "bad"
name = "bad"
timeout_seconds = 0
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_log_format_from_str() {
    assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    assert!("xml".parse::<LogFormat>().is_err());
}

#[test]
fn test_bundled_sample_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/scheduler.toml");
    let config = AppConfig::load(Some(path)).unwrap();

    assert_eq!(config.workers.len(), 1);
    assert_eq!(config.tasks.len(), 3);
    assert!(config.quotas[0].priority_boost);
    assert_eq!(config.tasks[0].cron_expression(), Some("*/15 * * * *"));
    assert_eq!(config.tasks[1].dependencies, vec!["crawl-news"]);
}
