use serde::{Deserialize, Serialize};

/// 按任务所有者划分的资源配额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub owner: String,
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: u32,
    #[serde(default = "default_max_tasks_per_day")]
    pub max_tasks_per_day: u32,
    /// 单个任务的最长执行时间（秒），会收紧任务自身的超时设置
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time_per_task: u64,
    #[serde(default)]
    pub priority_boost: bool,
}

fn default_max_concurrent_tasks() -> u32 {
    5
}

fn default_max_tasks_per_day() -> u32 {
    100
}

fn default_max_execution_time() -> u64 {
    3600
}

impl ResourceQuota {
    pub fn new<S: Into<String>>(owner: S) -> Self {
        Self {
            owner: owner.into(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            max_tasks_per_day: default_max_tasks_per_day(),
            max_execution_time_per_task: default_max_execution_time(),
            priority_boost: false,
        }
    }

    /// 入队时叠加到任务优先级上的提升值
    pub fn priority_bonus(&self) -> u8 {
        u8::from(self.priority_boost)
    }
}
