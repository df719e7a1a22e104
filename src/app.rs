use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use commander_config::AppConfig;
use commander_core::{ExecutorRegistry, WorkerNode};
use commander_dispatcher::Scheduler;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::executors::register_builtin_executors;

/// 未配置Worker时本地节点的并发容量
const LOCAL_WORKER_CAPACITY: u32 = 4;

/// 主应用程序
///
/// 根据配置组装调度器：注册内置执行器、Worker节点、配额和启动任务。
pub struct Application {
    config: AppConfig,
    scheduler: Scheduler,
    /// 本进程内运行的Worker，由应用自己上报心跳
    worker_ids: Vec<String>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化应用程序");

        let executors = ExecutorRegistry::new();
        register_builtin_executors(&executors).await;
        let scheduler = Scheduler::new(&config, executors.clone());

        let workers = if config.workers.is_empty() {
            let node = local_worker(executors.task_types().await);
            info!("未配置Worker节点，使用本地节点 {}", node.node_id);
            vec![node]
        } else {
            config.workers.clone()
        };
        let mut worker_ids = Vec::with_capacity(workers.len());
        for worker in workers {
            info!(
                "注册Worker节点: {} (容量: {}, 任务类型: {:?})",
                worker.node_id, worker.max_concurrent_tasks, worker.supported_task_types
            );
            worker_ids.push(worker.node_id.clone());
            scheduler.register_worker(worker).await;
        }

        for quota in &config.quotas {
            scheduler.set_quota(quota.clone()).await;
        }

        for task in &config.tasks {
            if !executors.contains(&task.task_type).await {
                warn!(
                    "任务 {} 的类型 {} 没有注册执行器，执行时将失败",
                    task.task_id, task.task_type
                );
            }
            scheduler
                .schedule_task(task.clone())
                .await
                .with_context(|| format!("注册任务失败: {}", task.task_id))?;
        }

        Ok(Self {
            config,
            scheduler,
            worker_ids,
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn worker_ids(&self) -> &[String] {
        &self.worker_ids
    }

    /// 为本进程的Worker刷新心跳，返回成功刷新的节点数
    pub async fn send_heartbeats_at(&self, now: DateTime<Utc>) -> usize {
        send_heartbeats(&self.scheduler, &self.worker_ids, now).await
    }

    /// 心跳间隔为超时时间的三分之一，至少1秒
    fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs((self.config.load_balancer.heartbeat_timeout_seconds / 3).max(1))
    }

    fn spawn_heartbeat_loop(&self, mut stop_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let scheduler = self.scheduler.clone();
        let worker_ids = self.worker_ids.clone();
        let period = self.heartbeat_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("Worker心跳循环已启动，间隔: {:?}", period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        send_heartbeats(&scheduler, &worker_ids, Utc::now()).await;
                    }
                    _ = stop_rx.recv() => {
                        debug!("Worker心跳循环退出");
                        break;
                    }
                }
            }
        })
    }

    /// 运行调度器直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.scheduler
            .start()
            .await
            .context("启动调度器失败")?;
        info!(
            "调度器运行中，检查间隔: {}秒",
            self.config.scheduler.check_interval_seconds
        );

        let (heartbeat_tx, heartbeat_rx) = broadcast::channel(1);
        let heartbeat = self.spawn_heartbeat_loop(heartbeat_rx);

        let _ = shutdown_rx.recv().await;
        info!("收到关闭信号，停止调度器");

        let _ = heartbeat_tx.send(());
        if let Err(e) = heartbeat.await {
            warn!("Worker心跳循环异常退出: {e}");
        }

        self.scheduler.stop().await.context("停止调度器失败")?;

        let stats = self.scheduler.stats().await;
        info!(
            "调度器已停止: 任务 {}, 完成 {}, 失败 {}, 取消 {}, 排队 {}, 运行中 {}",
            stats.total_tasks,
            stats.completed_tasks,
            stats.failed_tasks,
            stats.cancelled_tasks,
            stats.queued_tasks,
            stats.running_tasks
        );
        Ok(())
    }
}

async fn send_heartbeats(scheduler: &Scheduler, worker_ids: &[String], now: DateTime<Utc>) -> usize {
    let mut refreshed = 0;
    for node_id in worker_ids {
        match scheduler.touch_worker_at(node_id, now).await {
            Ok(()) => refreshed += 1,
            Err(e) => warn!("Worker节点 {} 心跳刷新失败: {}", node_id, e),
        }
    }
    refreshed
}

/// 以本机主机名构造的本地Worker节点
fn local_worker(task_types: Vec<String>) -> WorkerNode {
    let hostname = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());

    let mut node = WorkerNode::new(format!("{hostname}-local"), LOCAL_WORKER_CAPACITY, task_types);
    node.hostname = hostname;
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use commander_core::TaskDefinition;

    #[test]
    fn test_local_worker_uses_hostname() {
        let node = local_worker(vec!["echo".to_string()]);
        assert!(node.node_id.ends_with("-local"));
        assert!(node.node_id.starts_with(&node.hostname));
        assert_eq!(node.max_concurrent_tasks, LOCAL_WORKER_CAPACITY);
        assert!(node.supports("echo"));
    }

    #[tokio::test]
    async fn test_application_registers_local_worker() {
        let app = Application::new(AppConfig::default()).await.unwrap();
        let workers = app.scheduler().workers().await;
        assert_eq!(workers.len(), 1);
        assert!(workers[0].supports("echo"));
        assert!(workers[0].supports("delay"));
        assert_eq!(app.worker_ids(), [workers[0].node_id.clone()]);
    }

    #[test]
    fn test_heartbeat_interval_is_third_of_timeout() {
        let mut config = AppConfig::default();
        config.load_balancer.heartbeat_timeout_seconds = 90;
        let app = Application {
            config: config.clone(),
            scheduler: Scheduler::new(&config, ExecutorRegistry::new()),
            worker_ids: Vec::new(),
        };
        assert_eq!(app.heartbeat_interval(), Duration::from_secs(30));

        let mut config = AppConfig::default();
        config.load_balancer.heartbeat_timeout_seconds = 2;
        let app = Application {
            config: config.clone(),
            scheduler: Scheduler::new(&config, ExecutorRegistry::new()),
            worker_ids: Vec::new(),
        };
        assert_eq!(app.heartbeat_interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_local_worker_keeps_dispatching_past_heartbeat_timeout() {
        let app = Application::new(AppConfig::default()).await.unwrap();
        let scheduler = app.scheduler();
        let start = Utc::now();

        let task = TaskDefinition::new("a", "回显", "echo");
        scheduler.schedule_task_at(task, start).await.unwrap();
        assert_eq!(scheduler.tick_at(start + chrono::Duration::seconds(10)).await.dispatched, 1);

        let later = start + chrono::Duration::seconds(120);
        let task = TaskDefinition::new("b", "回显", "echo");
        scheduler.schedule_task_at(task, later).await.unwrap();
        assert_eq!(scheduler.tick_at(later).await.dispatched, 0);

        assert_eq!(app.send_heartbeats_at(later).await, 1);
        assert_eq!(scheduler.tick_at(later).await.dispatched, 1);
    }
}
