pub mod quota;
pub mod snapshot;
pub mod task;
pub mod task_execution;
pub mod worker;

pub use quota::ResourceQuota;
pub use snapshot::{
    LoadDistribution, NodeLoad, QueueStats, SchedulerCheckpoint, SchedulerStats,
    TaskStatusSnapshot,
};
pub use task::{TaskDefinition, TaskPriority, TaskSchedule, TaskStatus};
pub use task_execution::TaskExecution;
pub use worker::{LoadBalanceStrategy, WorkerHeartbeat, WorkerNode, WorkerStatus};
