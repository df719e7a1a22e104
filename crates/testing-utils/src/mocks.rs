//! Scripted task executors for scheduler tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use commander_core::{SchedulerError, SchedulerResult, TaskExecutionContext, TaskExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// 返回 `{"task_id": ..., "retry_count": ...}`
    Succeed,
    Fail,
    /// 前n次调用失败，之后成功
    FailTimes(usize),
    /// 一直运行直到取消标记被设置，然后返回失败
    Hang,
    Panic,
}

/// 按预设行为执行的测试执行器，记录每次调用的上下文
#[derive(Clone)]
pub struct MockExecutor {
    behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
    contexts: Arc<Mutex<Vec<TaskExecutionContext>>>,
}

impl MockExecutor {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(MockBehavior::Succeed)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Fail)
    }

    pub fn failing_times(times: usize) -> Self {
        Self::new(MockBehavior::FailTimes(times))
    }

    pub fn hanging() -> Self {
        Self::new(MockBehavior::Hang)
    }

    pub fn panicking() -> Self {
        Self::new(MockBehavior::Panic)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 按调用顺序记录的任务ID
    pub fn executed_task_ids(&self) -> Vec<String> {
        self.contexts
            .lock()
            .map(|contexts| contexts.iter().map(|c| c.task_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn contexts(&self) -> Vec<TaskExecutionContext> {
        self.contexts
            .lock()
            .map(|contexts| contexts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn execute(&self, context: TaskExecutionContext) -> SchedulerResult<serde_json::Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(context.clone());
        }

        match self.behavior {
            MockBehavior::Succeed => Ok(serde_json::json!({
                "task_id": context.task_id,
                "retry_count": context.retry_count,
            })),
            MockBehavior::Fail => Err(SchedulerError::execution(format!(
                "mock failure for {}",
                context.task_id
            ))),
            MockBehavior::FailTimes(times) if call < times => Err(SchedulerError::execution(
                format!("mock failure {} of {}", call + 1, times),
            )),
            MockBehavior::FailTimes(_) => Ok(serde_json::json!({ "attempt": call + 1 })),
            MockBehavior::Hang => {
                while !context.cancellation.is_cancelled() {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Err(SchedulerError::execution("cancelled"))
            }
            MockBehavior::Panic => panic!("mock executor panic"),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
