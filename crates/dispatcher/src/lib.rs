//! 调度引擎
//!
//! CRON解析、优先级队列、依赖图、Worker负载均衡，以及把它们串成任务
//! 生命周期状态机的 [`Scheduler`]。

pub mod cron_utils;
pub mod dependency_graph;
pub mod load_balancer;
pub mod metrics;
pub mod retry_policy;
pub mod scheduler;
mod scheduler_core;
pub mod strategies;
pub mod task_queue;

#[cfg(test)]
mod strategies_test;

pub use cron_utils::{CronExpressionParser, CronSchedule};
pub use dependency_graph::DependencyGraph;
pub use load_balancer::LoadBalancer;
pub use metrics::MetricsCollector;
pub use retry_policy::RetryPolicy;
pub use scheduler::Scheduler;
pub use scheduler_core::{ExecutionOutcome, TickReport};
pub use strategies::*;
pub use task_queue::{QueueEntry, TaskQueue};
