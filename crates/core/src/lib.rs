//! 任务调度核心的共享类型：错误、数据模型、执行器接口。

pub mod errors;
pub mod executor_registry;
pub mod models;
pub mod time_utils;
pub mod traits;

pub use errors::*;
pub use executor_registry::ExecutorRegistry;
pub use models::*;
pub use time_utils::{seconds_to_duration, MAX_TASK_DURATION_SECONDS};
pub use traits::{CancellationFlag, TaskExecutionContext, TaskExecutor};
