use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use commander_core::{
    ExecutorRegistry, SchedulerError, SchedulerResult, TaskExecutionContext, TaskExecutor,
};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// 取消标记的检查间隔
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 原样返回任务配置的执行器，任务类型 `echo`
#[derive(Debug, Default)]
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(&self, context: TaskExecutionContext) -> SchedulerResult<serde_json::Value> {
        info!(
            "执行echo任务: task_id={}, execution_id={}",
            context.task_id, context.execution_id
        );
        Ok(serde_json::json!({
            "task_id": context.task_id,
            "worker_id": context.worker_id,
            "config": context.config,
        }))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// delay任务参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayTaskParams {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// 等待结束后返回失败，用于演示重试
    #[serde(default)]
    pub fail: bool,
}

fn default_duration_ms() -> u64 {
    1000
}

impl Default for DelayTaskParams {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            fail: false,
        }
    }
}

/// 等待指定时长的执行器，任务类型 `delay`
///
/// 等待期间定期检查取消标记，被取消时提前返回错误。
#[derive(Debug, Default)]
pub struct DelayExecutor;

#[async_trait]
impl TaskExecutor for DelayExecutor {
    async fn execute(&self, context: TaskExecutionContext) -> SchedulerResult<serde_json::Value> {
        let params: DelayTaskParams = if context.config.is_null() {
            DelayTaskParams::default()
        } else {
            serde_json::from_value(context.config.clone()).map_err(|e| {
                SchedulerError::execution(format!("解析delay任务参数失败: {e}"))
            })?
        };

        debug!(
            "执行delay任务: task_id={}, duration_ms={}",
            context.task_id, params.duration_ms
        );

        let started = Instant::now();
        let deadline = started + Duration::from_millis(params.duration_ms);
        while Instant::now() < deadline {
            if context.cancellation.is_cancelled() {
                warn!("delay任务 {} 收到取消信号，提前退出", context.task_id);
                return Err(SchedulerError::execution("任务已取消"));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(remaining.min(CANCEL_POLL_INTERVAL)).await;
        }

        if params.fail {
            return Err(SchedulerError::execution(format!(
                "delay任务 {} 按配置返回失败",
                context.task_id
            )));
        }

        Ok(serde_json::json!({
            "slept_ms": started.elapsed().as_millis() as u64,
        }))
    }

    fn name(&self) -> &str {
        "delay"
    }
}

/// 注册内置执行器
pub async fn register_builtin_executors(registry: &ExecutorRegistry) {
    registry.register("echo", Arc::new(EchoExecutor)).await;
    registry.register("delay", Arc::new(DelayExecutor)).await;
}
