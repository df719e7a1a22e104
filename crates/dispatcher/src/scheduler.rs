use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};

use commander_config::AppConfig;
use commander_core::{
    ExecutorRegistry, LoadDistribution, QueueStats, ResourceQuota, SchedulerCheckpoint,
    SchedulerError, SchedulerResult, SchedulerStats, TaskDefinition, TaskExecution,
    TaskStatusSnapshot, WorkerHeartbeat, WorkerNode, WorkerStatus,
};

use crate::metrics::MetricsCollector;
use crate::scheduler_core::{ExecutionOutcome, Launch, SchedulerCore, TickReport};
use crate::task_queue::QueueEntry;

struct LoopHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<mpsc::UnboundedReceiver<ExecutionOutcome>>,
}

struct SchedulerInner {
    core: Mutex<SchedulerCore>,
    executors: ExecutorRegistry,
    completion_tx: mpsc::UnboundedSender<ExecutionOutcome>,
    /// 调度循环运行期间由循环持有
    completion_rx: Mutex<Option<mpsc::UnboundedReceiver<ExecutionOutcome>>>,
    loop_handle: Mutex<Option<LoopHandle>>,
    running: AtomicBool,
    check_interval: Duration,
}

/// 任务调度器
///
/// 可以廉价克隆的句柄，所有克隆共享同一份状态。队列、依赖图和Worker
/// 注册表只在内部互斥锁中修改；执行器在独立的tokio任务中运行，结果通过
/// 通道回到调度器。
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(config: &AppConfig, executors: ExecutorRegistry) -> Self {
        let metrics = Arc::new(MetricsCollector::new(config.observability.metrics_enabled));
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(SchedulerInner {
                core: Mutex::new(SchedulerCore::new(config, metrics)),
                executors,
                completion_tx,
                completion_rx: Mutex::new(Some(completion_rx)),
                loop_handle: Mutex::new(None),
                running: AtomicBool::new(false),
                check_interval: Duration::from_secs(config.scheduler.check_interval_seconds),
            }),
        }
    }

    pub fn executors(&self) -> &ExecutorRegistry {
        &self.inner.executors
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    // 任务操作

    pub async fn schedule_task(&self, definition: TaskDefinition) -> SchedulerResult<String> {
        self.schedule_task_at(definition, Utc::now()).await
    }

    pub async fn schedule_task_at(
        &self,
        definition: TaskDefinition,
        now: DateTime<Utc>,
    ) -> SchedulerResult<String> {
        self.inner.core.lock().await.register_task(definition, now)
    }

    /// 取消任务
    ///
    /// 排队或等待中的任务保证不会再运行；运行中的任务只设置协作式取消标记。
    pub async fn cancel_task(&self, task_id: &str) -> bool {
        self.inner.core.lock().await.cancel(task_id, Utc::now())
    }

    pub async fn get_task_status(&self, task_id: &str) -> Option<TaskStatusSnapshot> {
        self.inner.core.lock().await.snapshot(task_id)
    }

    pub async fn executions(&self, task_id: &str) -> Vec<TaskExecution> {
        self.inner.core.lock().await.executions(task_id)
    }

    pub async fn queued_tasks(&self) -> Vec<QueueEntry> {
        self.inner.core.lock().await.queue().entries()
    }

    pub async fn transitive_dependencies(&self, task_id: &str) -> Vec<String> {
        self.inner
            .core
            .lock()
            .await
            .graph()
            .transitive_dependencies(task_id)
    }

    pub async fn dependents_of(&self, task_id: &str) -> Vec<String> {
        self.inner.core.lock().await.graph().dependents_of(task_id)
    }

    // Worker与配额

    pub async fn register_worker(&self, node: WorkerNode) {
        self.inner.core.lock().await.register_worker(node);
    }

    pub async fn unregister_worker(&self, node_id: &str) -> bool {
        self.inner.core.lock().await.unregister_worker(node_id)
    }

    pub async fn record_heartbeat(&self, heartbeat: WorkerHeartbeat) -> SchedulerResult<()> {
        self.inner.core.lock().await.apply_heartbeat(&heartbeat)
    }

    pub async fn update_worker_status(
        &self,
        node_id: &str,
        task_count: u32,
        load_average: f64,
    ) -> SchedulerResult<()> {
        self.inner
            .core
            .lock()
            .await
            .update_worker_status(node_id, task_count, load_average, Utc::now())
    }

    /// 进程内Worker的存活心跳，不改变任务计数
    pub async fn touch_worker(&self, node_id: &str) -> SchedulerResult<()> {
        self.touch_worker_at(node_id, Utc::now()).await
    }

    pub async fn touch_worker_at(&self, node_id: &str, now: DateTime<Utc>) -> SchedulerResult<()> {
        self.inner.core.lock().await.touch_worker(node_id, now)
    }

    pub async fn set_worker_status(
        &self,
        node_id: &str,
        status: WorkerStatus,
    ) -> SchedulerResult<()> {
        self.inner
            .core
            .lock()
            .await
            .set_worker_status(node_id, status)
    }

    pub async fn workers(&self) -> Vec<WorkerNode> {
        self.inner.core.lock().await.balancer().nodes()
    }

    pub async fn set_quota(&self, quota: ResourceQuota) {
        self.inner.core.lock().await.set_quota(quota);
    }

    pub async fn quota(&self, owner: &str) -> Option<ResourceQuota> {
        self.inner.core.lock().await.quota(owner)
    }

    // 统计

    pub async fn stats(&self) -> SchedulerStats {
        let running = self.is_running();
        self.inner.core.lock().await.stats(running)
    }

    pub async fn queue_stats(&self) -> QueueStats {
        self.inner.core.lock().await.queue().stats()
    }

    pub async fn load_distribution(&self) -> LoadDistribution {
        self.inner.core.lock().await.balancer().load_distribution()
    }

    // 检查点

    pub async fn serialize_state(&self) -> SchedulerResult<String> {
        let checkpoint: SchedulerCheckpoint =
            self.inner.core.lock().await.checkpoint(Utc::now());
        Ok(serde_json::to_string_pretty(&checkpoint)?)
    }

    pub async fn load_state(&self, state: &str) -> SchedulerResult<()> {
        let checkpoint: SchedulerCheckpoint = serde_json::from_str(state)?;
        self.inner
            .core
            .lock()
            .await
            .restore(checkpoint, Utc::now())
    }

    // 调度循环

    pub async fn tick(&self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// 执行一轮调度：释放到期重试、触发周期任务、分发、超时扫描
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        async {
            let (report, launches) = self.inner.core.lock().await.tick(now);
            for launch in launches {
                self.launch(launch).await;
            }
            report
        }
        .instrument(info_span!("scheduler_tick"))
        .await
    }

    async fn launch(&self, launch: Launch) {
        let Launch { task_type, context } = launch;
        let completion_tx = self.inner.completion_tx.clone();
        let task_id = context.task_id.clone();
        let execution_id = context.execution_id.clone();

        let Some(executor) = self.inner.executors.get(&task_type).await else {
            warn!("未注册任务类型 {} 的执行器，任务 {} 执行失败", task_type, task_id);
            let _ = completion_tx.send(ExecutionOutcome {
                task_id,
                execution_id,
                result: Err(SchedulerError::ExecutorNotFound { task_type }),
            });
            return;
        };

        let span = info_span!(
            "task_execution",
            task_id = %task_id,
            execution_id = %execution_id,
            worker_id = %context.worker_id,
        );

        tokio::spawn(
            async move {
                debug!("执行器 {} 开始执行", executor.name());
                let result = match AssertUnwindSafe(executor.execute(context))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(panic) => Err(SchedulerError::execution(format!(
                        "执行器异常终止: {}",
                        panic_message(panic.as_ref())
                    ))),
                };

                let outcome = ExecutionOutcome {
                    task_id,
                    execution_id,
                    result,
                };
                if completion_tx.send(outcome).is_err() {
                    debug!("调度器已释放，丢弃执行结果");
                }
            }
            .instrument(span),
        );
    }

    pub async fn process_next_completion(&self) -> bool {
        self.process_next_completion_at(Utc::now()).await
    }

    /// 等待并应用下一个执行结果
    ///
    /// 调度循环运行期间结果由循环处理，此时直接返回false。
    pub async fn process_next_completion_at(&self, now: DateTime<Utc>) -> bool {
        let mut receiver = self.inner.completion_rx.lock().await;
        let Some(rx) = receiver.as_mut() else {
            return false;
        };
        let Some(outcome) = rx.recv().await else {
            return false;
        };
        drop(receiver);
        self.apply_outcome(outcome, now).await
    }

    /// 应用所有已经到达的执行结果，不等待
    pub async fn drain_completions_at(&self, now: DateTime<Utc>) -> usize {
        let mut outcomes = Vec::new();
        {
            let mut receiver = self.inner.completion_rx.lock().await;
            if let Some(rx) = receiver.as_mut() {
                while let Ok(outcome) = rx.try_recv() {
                    outcomes.push(outcome);
                }
            }
        }

        let mut applied = 0;
        for outcome in outcomes {
            if self.apply_outcome(outcome, now).await {
                applied += 1;
            }
        }
        applied
    }

    async fn apply_outcome(&self, outcome: ExecutionOutcome, now: DateTime<Utc>) -> bool {
        self.inner.core.lock().await.apply_outcome(outcome, now)
    }

    /// 启动后台调度循环
    pub async fn start(&self) -> SchedulerResult<()> {
        let mut loop_handle = self.inner.loop_handle.lock().await;
        if loop_handle.is_some() {
            warn!("调度器已在运行");
            return Ok(());
        }

        let mut completion_rx = self
            .inner
            .completion_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| SchedulerError::Internal("执行结果通道已被占用".to_string()))?;
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let check_interval = self.inner.check_interval;
        let scheduler = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("调度循环已启动，检查间隔: {:?}", check_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        scheduler.tick_at(Utc::now()).await;
                    }
                    Some(outcome) = completion_rx.recv() => {
                        scheduler.apply_outcome(outcome, Utc::now()).await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("收到停止信号，调度循环退出");
                        break;
                    }
                }
            }
            completion_rx
        });

        *loop_handle = Some(LoopHandle {
            shutdown_tx,
            handle,
        });
        self.inner.running.store(true, Ordering::SeqCst);
        info!("调度器已启动");
        Ok(())
    }

    /// 停止后台调度循环，运行中的执行器不会被中断
    pub async fn stop(&self) -> SchedulerResult<()> {
        let taken = self.inner.loop_handle.lock().await.take();
        let Some(LoopHandle {
            shutdown_tx,
            handle,
        }) = taken
        else {
            debug!("调度器未运行");
            return Ok(());
        };

        let _ = shutdown_tx.send(());
        let completion_rx = handle
            .await
            .map_err(|e| SchedulerError::Internal(format!("调度循环异常退出: {e}")))?;
        *self.inner.completion_rx.lock().await = Some(completion_rx);
        self.inner.running.store(false, Ordering::SeqCst);
        info!("调度器已停止");
        Ok(())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
