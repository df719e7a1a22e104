use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskDefinition, TaskExecution, TaskStatus, WorkerNode};

/// 对外暴露的任务状态快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusSnapshot {
    pub task_id: String,
    pub name: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub last_execution_time: Option<DateTime<Utc>>,
    pub execution_count: u64,
    pub dependencies: Vec<String>,
    pub pending_dependencies: Vec<String>,
    pub ready: bool,
    pub definition: TaskDefinition,
    pub latest_execution: Option<TaskExecution>,
}

/// 队列统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    pub queue_length: usize,
    pub avg_wait_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub node_id: String,
    pub status: super::WorkerStatus,
    pub task_count: u32,
    pub max_concurrent_tasks: u32,
    pub load: f64,
}

/// 负载分布统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadDistribution {
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub total_running_tasks: u32,
    pub average_load: f64,
    pub nodes: Vec<NodeLoad>,
}

/// 调度器整体统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub is_running: bool,
    pub total_tasks: usize,
    pub queued_tasks: usize,
    pub running_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub cancelled_tasks: usize,
    pub retrying_tasks: usize,
    pub queue: QueueStats,
    pub load: LoadDistribution,
}

/// 调度器状态检查点，供外部持久化使用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerCheckpoint {
    pub tasks: Vec<TaskDefinition>,
    pub executions: HashMap<String, Vec<TaskExecution>>,
    pub completed: Vec<String>,
    pub workers: Vec<WorkerNode>,
    pub created_at: Option<DateTime<Utc>>,
}
