use std::io::Write;
use std::time::Duration;

use commander_config::AppConfig;
use commander_core::TaskStatus;
use commander_scheduler::{Application, ShutdownManager};
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[scheduler]
check_interval_seconds = 1

[observability]
metrics_enabled = false

[[workers]]
node_id = "local-1"
max_concurrent_tasks = 2
supported_task_types = ["echo", "delay"]

[[quotas]]
owner = "crawler-team"
max_concurrent_tasks = 1

[[tasks]]
task_id = "fetch"
name = "抓取首页"
task_type = "echo"
owner = "crawler-team"
config = { url = "https://example.com" }

[[tasks]]
task_id = "settle"
name = "等待入库"
task_type = "delay"
dependencies = ["fetch"]
config = { duration_ms = 10 }
"#;

fn write_config() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_application_from_config_file() {
    let file = write_config();
    let config = AppConfig::load(file.path().to_str()).unwrap();
    let app = Application::new(config).await.unwrap();
    let scheduler = app.scheduler();

    let workers = scheduler.workers().await;
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].node_id, "local-1");
    assert!(scheduler.quota("crawler-team").await.is_some());

    let queued: Vec<String> = scheduler
        .queued_tasks()
        .await
        .into_iter()
        .map(|entry| entry.task_id)
        .collect();
    assert_eq!(queued, vec!["fetch"]);
    assert_eq!(scheduler.dependents_of("fetch").await, vec!["settle"]);
}

#[tokio::test]
async fn test_application_runs_until_shutdown() {
    let file = write_config();
    let config = AppConfig::load(file.path().to_str()).unwrap();
    let app = std::sync::Arc::new(Application::new(config).await.unwrap());
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = app.clone();
        let shutdown_rx = shutdown.subscribe().await;
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    let mut status = None;
    for _ in 0..200 {
        status = app
            .scheduler()
            .get_task_status("settle")
            .await
            .map(|snapshot| snapshot.status);
        if status == Some(TaskStatus::Completed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status, Some(TaskStatus::Completed));

    let fetch = app.scheduler().get_task_status("fetch").await.unwrap();
    let result = fetch.latest_execution.unwrap().result_data.unwrap();
    assert_eq!(result["config"]["url"], "https://example.com");

    shutdown.shutdown().await;
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert!(!app.scheduler().is_running());
}

#[tokio::test]
async fn test_invalid_task_in_config_fails_startup() {
    let mut config = AppConfig::from_toml(CONFIG).unwrap();
    config.tasks[1].dependencies = vec!["settle".to_string()];
    assert!(Application::new(config).await.is_err());
}
