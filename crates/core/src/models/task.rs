use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::MAX_TASK_DURATION_SECONDS;
use crate::{SchedulerError, SchedulerResult};

/// 任务优先级，数值越大越先被分发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low = 1,
    Normal = 2,
    High = 3,
    Critical = 4,
    Urgent = 5,
}

impl TaskPriority {
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Normal
    }
}

/// 周期调度方式，cron与固定间隔二选一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskSchedule {
    Cron { expression: String },
    Interval { seconds: u64 },
}

impl TaskSchedule {
    pub fn cron<S: Into<String>>(expression: S) -> Self {
        TaskSchedule::Cron {
            expression: expression.into(),
        }
    }

    pub fn interval(seconds: u64) -> Self {
        TaskSchedule::Interval { seconds }
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
    Cancelled,
    Retrying,
}

impl TaskStatus {
    /// 终态不会再被调度（周期任务的 COMPLETED 除外，由调度循环重新触发）
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Timeout | TaskStatus::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskStatus::Pending | TaskStatus::Running | TaskStatus::Retrying
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Timeout => "TIMEOUT",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Retrying => "RETRYING",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务定义，注册后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 与Worker能力匹配的任务类型
    #[serde(default = "default_task_type")]
    pub task_type: String,
    /// 原样转交给执行器，调度器不解析
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    #[serde(default)]
    pub schedule: Option<TaskSchedule>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub max_retries: u32,
    /// 首次重试前的等待秒数，后续按退避倍数增长
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: f64,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_task_type() -> String {
    "crawler".to_string()
}

fn default_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_owner() -> String {
    "system".to_string()
}

impl TaskDefinition {
    pub fn new<I, N, T>(task_id: I, name: N, task_type: T) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        T: Into<String>,
    {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            name: name.into(),
            description: None,
            task_type: task_type.into(),
            config: default_config(),
            schedule: None,
            priority: TaskPriority::Normal,
            dependencies: Vec::new(),
            timeout_seconds: None,
            max_retries: 0,
            retry_delay_seconds: default_retry_delay(),
            owner: default_owner(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn cron_expression(&self) -> Option<&str> {
        match &self.schedule {
            Some(TaskSchedule::Cron { expression }) => Some(expression),
            _ => None,
        }
    }

    /// 基本字段检查，CRON语法由调度器在注册时解析校验
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.task_id.trim().is_empty() {
            return Err(SchedulerError::InvalidTask("task_id不能为空".to_string()));
        }
        if self.task_type.trim().is_empty() {
            return Err(SchedulerError::InvalidTask(format!(
                "任务 {} 的task_type不能为空",
                self.task_id
            )));
        }
        if !self.retry_delay_seconds.is_finite() || self.retry_delay_seconds < 0.0 {
            return Err(SchedulerError::InvalidTask(format!(
                "任务 {} 的retry_delay_seconds必须是非负数",
                self.task_id
            )));
        }
        if let Some(TaskSchedule::Interval { seconds }) = self.schedule {
            if seconds == 0 || seconds > MAX_TASK_DURATION_SECONDS {
                return Err(SchedulerError::InvalidTask(format!(
                    "任务 {} 的调度间隔必须在1到{}秒之间",
                    self.task_id, MAX_TASK_DURATION_SECONDS
                )));
            }
        }
        if let Some(timeout) = self.timeout_seconds {
            if timeout == 0 || timeout > MAX_TASK_DURATION_SECONDS {
                return Err(SchedulerError::InvalidTask(format!(
                    "任务 {} 的timeout_seconds必须在1到{}秒之间",
                    self.task_id, MAX_TASK_DURATION_SECONDS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::Urgent > TaskPriority::Critical);
        assert!(TaskPriority::High > TaskPriority::Normal);
        assert_eq!(TaskPriority::Low.value(), 1);
        assert_eq!(TaskPriority::Urgent.value(), 5);
    }

    #[test]
    fn test_task_definition_deserialize_defaults() {
        let def: TaskDefinition = serde_json::from_value(serde_json::json!({
            "task_id": "crawl-news",
            "name": "新闻抓取",
            "schedule": { "type": "cron", "expression": "*/15 * * * *" },
            "priority": "HIGH"
        }))
        .unwrap();

        assert_eq!(def.task_type, "crawler");
        assert_eq!(def.owner, "system");
        assert_eq!(def.priority, TaskPriority::High);
        assert_eq!(def.cron_expression(), Some("*/15 * * * *"));
        assert!(def.config.is_object());
        assert_eq!(def.retry_delay_seconds, 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut def = TaskDefinition::new("", "empty", "crawler");
        assert!(def.validate().is_err());

        def.task_id = "t1".to_string();
        assert!(def.validate().is_ok());

        def.schedule = Some(TaskSchedule::interval(0));
        assert!(def.validate().is_err());

        def.schedule = Some(TaskSchedule::interval(30));
        def.retry_delay_seconds = -1.0;
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        let mut def = TaskDefinition::new("t1", "poll", "crawler");
        def.schedule = Some(TaskSchedule::interval(MAX_TASK_DURATION_SECONDS));
        def.timeout_seconds = Some(MAX_TASK_DURATION_SECONDS);
        assert!(def.validate().is_ok());

        def.schedule = Some(TaskSchedule::interval(10_000_000_000_000_000));
        assert!(def.validate().is_err());

        def.schedule = None;
        def.timeout_seconds = Some(u64::MAX);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_status_flags() {
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(TaskStatus::Timeout.is_terminal());
        assert!(!TaskStatus::Retrying.is_terminal());
        assert!(TaskStatus::Retrying.is_active());
        assert_eq!(TaskStatus::Running.to_string(), "RUNNING");
    }
}
