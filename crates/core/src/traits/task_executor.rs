//! 任务执行器接口定义
//!
//! 调度器只负责决定“何时、在哪个Worker上”执行任务，任务本身的逻辑
//! （爬取、清洗、校验等）由按任务类型注册的执行器完成。
//!
//! ## 使用示例
//!
//! ```rust
//! use async_trait::async_trait;
//! use commander_core::traits::{TaskExecutionContext, TaskExecutor};
//! use commander_core::SchedulerResult;
//!
//! pub struct CrawlerExecutor;
//!
//! #[async_trait]
//! impl TaskExecutor for CrawlerExecutor {
//!     async fn execute(&self, context: TaskExecutionContext) -> SchedulerResult<serde_json::Value> {
//!         if context.cancellation.is_cancelled() {
//!             return Ok(serde_json::json!({ "skipped": true }));
//!         }
//!         Ok(serde_json::json!({ "pages": 42 }))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "crawler"
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::SchedulerResult;

/// 协作式取消标记
///
/// 调度器无法强制中断正在运行的任务，只能设置该标记，由执行器在
/// 合适的检查点自行退出。
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 任务执行上下文
#[derive(Debug, Clone)]
pub struct TaskExecutionContext {
    pub execution_id: String,
    pub task_id: String,
    pub task_name: String,
    pub task_type: String,
    /// 任务定义中的配置，原样转交
    pub config: serde_json::Value,
    pub retry_count: u32,
    pub worker_id: String,
    pub timeout_seconds: u64,
    pub cancellation: CancellationFlag,
}

/// 任务执行器
///
/// 返回 `Ok(result_data)` 表示成功，`Err` 会被记录到执行记录上并驱动重试。
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, context: TaskExecutionContext) -> SchedulerResult<serde_json::Value>;

    fn name(&self) -> &str;
}
