use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::seconds_to_duration;

/// Worker节点信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerNode {
    pub node_id: String,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default)]
    pub status: WorkerStatus,
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: u32,
    #[serde(default)]
    pub current_task_count: u32,
    pub supported_task_types: Vec<String>,
    #[serde(default)]
    pub load_average: f64,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "Utc::now")]
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

/// Worker状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Active,
    /// 不再接收新任务，已分配的任务继续运行
    Draining,
    Down,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        WorkerStatus::Active
    }
}

/// Worker心跳信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerHeartbeat {
    pub node_id: String,
    pub max_concurrent_tasks: u32,
    pub current_task_count: u32,
    pub load_average: f64,
    pub supported_task_types: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Worker选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    LeastLoaded,
    RoundRobin,
    Random,
    TaskAffinity,
}

impl Default for LoadBalanceStrategy {
    fn default() -> Self {
        LoadBalanceStrategy::LeastLoaded
    }
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_max_concurrent_tasks() -> u32 {
    10
}

fn default_region() -> String {
    "local".to_string()
}

impl WorkerNode {
    pub fn new<S: Into<String>>(
        node_id: S,
        max_concurrent_tasks: u32,
        supported_task_types: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            node_id: node_id.into(),
            hostname: default_hostname(),
            status: WorkerStatus::Active,
            max_concurrent_tasks,
            current_task_count: 0,
            supported_task_types,
            load_average: 0.0,
            region: default_region(),
            last_heartbeat: now,
            registered_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WorkerStatus::Active
    }

    pub fn has_capacity(&self) -> bool {
        self.current_task_count < self.max_concurrent_tasks
    }

    pub fn supports(&self, task_type: &str) -> bool {
        self.supported_task_types.iter().any(|t| t == task_type)
    }

    /// 检查Worker是否可以接受新任务
    pub fn can_accept_task(&self, task_type: &str) -> bool {
        self.is_active() && self.has_capacity() && self.supports(task_type)
    }

    /// 当前任务数占容量的比例
    pub fn load_ratio(&self) -> f64 {
        self.current_task_count as f64 / self.max_concurrent_tasks.max(1) as f64
    }

    pub fn is_heartbeat_expired(&self, timeout_seconds: u64, now: DateTime<Utc>) -> bool {
        now - self.last_heartbeat > seconds_to_duration(timeout_seconds)
    }

    pub fn apply_heartbeat(&mut self, heartbeat: &WorkerHeartbeat) {
        self.max_concurrent_tasks = heartbeat.max_concurrent_tasks;
        self.current_task_count = heartbeat.current_task_count;
        self.load_average = heartbeat.load_average;
        self.supported_task_types = heartbeat.supported_task_types.clone();
        self.last_heartbeat = heartbeat.timestamp;
    }
}
