//! Test data builders for creating test entities
//!
//! This module provides builder patterns for creating test data with
//! sensible defaults and easy customization.

use chrono::{DateTime, Utc};
use commander_core::{
    ResourceQuota, TaskDefinition, TaskPriority, TaskSchedule, WorkerNode, WorkerStatus,
};

/// Builder for creating test TaskDefinition entities
pub struct TaskDefinitionBuilder {
    task: TaskDefinition,
}

impl TaskDefinitionBuilder {
    /// 默认任务类型为 `crawler`
    pub fn new(task_id: &str) -> Self {
        Self {
            task: TaskDefinition::new(task_id, format!("test_{task_id}"), "crawler"),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn with_task_type(mut self, task_type: &str) -> Self {
        self.task.task_type = task_type.to_string();
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.task.config = config;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_cron(mut self, expression: &str) -> Self {
        self.task.schedule = Some(TaskSchedule::cron(expression));
        self
    }

    pub fn with_interval(mut self, seconds: u64) -> Self {
        self.task.schedule = Some(TaskSchedule::interval(seconds));
        self
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.task.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.task.timeout_seconds = Some(timeout_seconds);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.task.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay_seconds: f64) -> Self {
        self.task.retry_delay_seconds = retry_delay_seconds;
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.task.owner = owner.to_string();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.task.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.task.created_at = created_at;
        self.task.updated_at = created_at;
        self
    }

    pub fn build(self) -> TaskDefinition {
        self.task
    }
}

/// Builder for creating test WorkerNode entities
pub struct WorkerNodeBuilder {
    worker: WorkerNode,
}

impl WorkerNodeBuilder {
    /// 默认容量为1，支持 `crawler`
    pub fn new(node_id: &str) -> Self {
        let mut worker = WorkerNode::new(node_id, 1, vec!["crawler".to_string()]);
        worker.hostname = format!("host-{node_id}");
        Self { worker }
    }

    pub fn with_capacity(mut self, max_concurrent_tasks: u32) -> Self {
        self.worker.max_concurrent_tasks = max_concurrent_tasks;
        self
    }

    pub fn with_task_types(mut self, task_types: &[&str]) -> Self {
        self.worker.supported_task_types = task_types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_current_tasks(mut self, current_task_count: u32) -> Self {
        self.worker.current_task_count = current_task_count;
        self
    }

    pub fn with_load_average(mut self, load_average: f64) -> Self {
        self.worker.load_average = load_average;
        self
    }

    pub fn with_status(mut self, status: WorkerStatus) -> Self {
        self.worker.status = status;
        self
    }

    pub fn with_last_heartbeat(mut self, last_heartbeat: DateTime<Utc>) -> Self {
        self.worker.last_heartbeat = last_heartbeat;
        self
    }

    pub fn build(self) -> WorkerNode {
        self.worker
    }
}

/// Builder for creating test ResourceQuota entities
pub struct ResourceQuotaBuilder {
    quota: ResourceQuota,
}

impl ResourceQuotaBuilder {
    pub fn new(owner: &str) -> Self {
        Self {
            quota: ResourceQuota::new(owner),
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent_tasks: u32) -> Self {
        self.quota.max_concurrent_tasks = max_concurrent_tasks;
        self
    }

    pub fn with_max_per_day(mut self, max_tasks_per_day: u32) -> Self {
        self.quota.max_tasks_per_day = max_tasks_per_day;
        self
    }

    pub fn with_max_execution_time(mut self, seconds: u64) -> Self {
        self.quota.max_execution_time_per_task = seconds;
        self
    }

    pub fn with_priority_boost(mut self) -> Self {
        self.quota.priority_boost = true;
        self
    }

    pub fn build(self) -> ResourceQuota {
        self.quota
    }
}
