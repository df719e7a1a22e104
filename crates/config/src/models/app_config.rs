use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use commander_core::{ResourceQuota, TaskDefinition, WorkerNode};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::observability::ObservabilityConfig;
use super::scheduler::{LoadBalancerConfig, RetryConfig, SchedulerConfig};
use crate::validation::{ConfigValidator, ValidationUtils};
use crate::{ConfigError, ConfigResult};

/// 未指定配置文件时依次查找的路径
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/scheduler.toml", "scheduler.toml"];

/// 环境变量前缀，例如 `COMMANDER_SCHEDULER__CHECK_INTERVAL_SECONDS=10`
pub const ENV_PREFIX: &str = "COMMANDER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub load_balancer: LoadBalancerConfig,
    pub retry: RetryConfig,
    pub observability: ObservabilityConfig,
    /// 启动时注册的Worker节点
    pub workers: Vec<WorkerNode>,
    /// 按owner划分的资源配额
    pub quotas: Vec<ResourceQuota>,
    /// 启动时注册的任务
    pub tasks: Vec<TaskDefinition>,
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    fn validate_workers(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for worker in &self.workers {
            ValidationUtils::validate_not_empty(&worker.node_id, "workers.node_id")?;
            if !seen.insert(worker.node_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate worker node_id: {}",
                    worker.node_id
                )));
            }
            if worker.supported_task_types.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "worker {} must support at least one task type",
                    worker.node_id
                )));
            }
        }
        Ok(())
    }

    fn validate_quotas(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for quota in &self.quotas {
            ValidationUtils::validate_not_empty(&quota.owner, "quotas.owner")?;
            if !seen.insert(quota.owner.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate quota owner: {}",
                    quota.owner
                )));
            }
            ValidationUtils::validate_seconds(
                quota.max_execution_time_per_task,
                "quotas.max_execution_time_per_task",
                7 * 24 * 3600,
            )?;
        }
        Ok(())
    }

    fn validate_tasks(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            task.validate()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
            if !seen.insert(task.task_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate task_id: {}",
                    task.task_id
                )));
            }
        }
        Ok(())
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.scheduler.validate()?;
        self.load_balancer.validate()?;
        self.retry.validate()?;
        self.observability.validate()?;
        self.validate_workers()?;
        self.validate_quotas()?;
        self.validate_tasks()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commander_core::{LoadBalanceStrategy, TaskPriority, TaskSchedule};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.check_interval_seconds, 5);
        assert_eq!(config.scheduler.default_timeout_seconds, 1800);
        assert_eq!(config.load_balancer.strategy, LoadBalanceStrategy::LeastLoaded);
        assert_eq!(config.retry.backoff_multiplier, 2.0);
        assert!(config.workers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_from_toml() {
        let toml_str = r#"
[scheduler]
check_interval_seconds = 2

[load_balancer]
strategy = "round_robin"

[[workers]]
node_id = "node-1"
max_concurrent_tasks = 4
supported_task_types = ["crawler", "cleaner"]

[[quotas]]
owner = "alice"
max_concurrent_tasks = 2

[[tasks]]
task_id = "crawl-news"
name = "新闻抓取"
priority = "HIGH"
max_retries = 2

[tasks.schedule]
type = "cron"
expression = "*/15 * * * *"
"#;

        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.scheduler.check_interval_seconds, 2);
        assert_eq!(config.scheduler.max_dispatch_per_tick, 100);
        assert_eq!(config.load_balancer.strategy, LoadBalanceStrategy::RoundRobin);
        assert_eq!(config.workers[0].max_concurrent_tasks, 4);
        assert_eq!(config.quotas[0].max_concurrent_tasks, 2);
        assert_eq!(config.quotas[0].max_tasks_per_day, 100);

        let task = &config.tasks[0];
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.schedule, Some(TaskSchedule::cron("*/15 * * * *")));
    }

    #[test]
    fn test_duplicate_worker_rejected() {
        let mut config = AppConfig::default();
        config.workers = vec![
            WorkerNode::new("node-1", 2, vec!["crawler".to_string()]),
            WorkerNode::new("node-1", 2, vec!["crawler".to_string()]),
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_retry_multiplier_rejected() {
        let mut config = AppConfig::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_toml_roundtrip_keeps_sections() {
        let mut config = AppConfig::default();
        config.scheduler.check_interval_seconds = 9;
        let text = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.scheduler.check_interval_seconds, 9);
    }
}
