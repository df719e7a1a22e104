use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use commander_config::AppConfig;
use commander_config::SchedulerConfig;
use commander_core::{
    seconds_to_duration, CancellationFlag, ResourceQuota, SchedulerCheckpoint, SchedulerError,
    SchedulerResult, SchedulerStats, TaskDefinition, TaskExecution, TaskExecutionContext,
    TaskSchedule, TaskStatus, TaskStatusSnapshot, WorkerHeartbeat, WorkerNode, WorkerStatus,
};

use crate::cron_utils::{CronExpressionParser, CronSchedule};
use crate::dependency_graph::DependencyGraph;
use crate::load_balancer::LoadBalancer;
use crate::metrics::MetricsCollector;
use crate::retry_policy::RetryPolicy;
use crate::task_queue::{QueueEntry, TaskQueue};

/// 单次调度循环的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// 到期并入队的周期任务数
    pub triggered: usize,
    pub dispatched: usize,
    pub timed_out: usize,
    /// 退避结束重新入队的重试数
    pub retries_released: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == TickReport::default()
    }
}

/// 执行器返回的结果，经由通道回到调度器
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub task_id: String,
    pub execution_id: String,
    pub result: SchedulerResult<serde_json::Value>,
}

/// 已完成分发、等待启动执行器的执行
#[derive(Debug, Clone)]
pub(crate) struct Launch {
    pub task_type: String,
    pub context: TaskExecutionContext,
}

struct TaskEntry {
    definition: TaskDefinition,
    cron: Option<CronSchedule>,
    status: TaskStatus,
    registered_at: DateTime<Utc>,
    last_trigger: Option<DateTime<Utc>>,
    last_execution_time: Option<DateTime<Utc>>,
    execution_count: u64,
    executions: VecDeque<TaskExecution>,
    /// 等待分发的重试记录
    pending_execution: Option<String>,
    cancelled: bool,
}

impl TaskEntry {
    fn new(definition: TaskDefinition, cron: Option<CronSchedule>, now: DateTime<Utc>) -> Self {
        Self {
            definition,
            cron,
            status: TaskStatus::Pending,
            registered_at: now,
            last_trigger: None,
            last_execution_time: None,
            execution_count: 0,
            executions: VecDeque::new(),
            pending_execution: None,
            cancelled: false,
        }
    }

    /// cron任务只在到点时入队，其余任务就绪即入队
    fn enqueue_when_ready(&self) -> bool {
        !matches!(self.definition.schedule, Some(TaskSchedule::Cron { .. }))
    }

    fn execution_mut(&mut self, execution_id: &str) -> Option<&mut TaskExecution> {
        self.executions
            .iter_mut()
            .rev()
            .find(|execution| execution.execution_id == execution_id)
    }

    fn retry_due(&self, now: DateTime<Utc>) -> bool {
        let Some(pending_id) = &self.pending_execution else {
            return false;
        };
        self.executions
            .iter()
            .rev()
            .find(|execution| &execution.execution_id == pending_id)
            .map(|execution| execution.scheduled_at.map_or(true, |at| at <= now))
            .unwrap_or(true)
    }

    fn push_execution(&mut self, execution: TaskExecution, history_limit: usize) {
        self.executions.push_back(execution);
        while self.executions.len() > history_limit.max(1) {
            self.executions.pop_front();
        }
    }

    /// 取出等待中的重试记录，没有则新建一条
    fn prepare_execution(&mut self, now: DateTime<Utc>, history_limit: usize) -> &mut TaskExecution {
        if let Some(pending_id) = self.pending_execution.take() {
            if let Some(index) = self
                .executions
                .iter()
                .rposition(|execution| execution.execution_id == pending_id)
            {
                return &mut self.executions[index];
            }
        }

        let execution = TaskExecution::new(&self.definition.task_id, 0, now);
        self.push_execution(execution, history_limit);
        let last = self.executions.len() - 1;
        &mut self.executions[last]
    }
}

struct RunningExecution {
    task_id: String,
    worker_id: String,
    owner: String,
    started_at: DateTime<Utc>,
    timeout_seconds: u64,
    cancellation: CancellationFlag,
}

#[derive(Default)]
struct OwnerUsage {
    running: u32,
    day: Option<NaiveDate>,
    dispatched_today: u32,
}

impl OwnerUsage {
    fn roll(&mut self, today: NaiveDate) {
        if self.day != Some(today) {
            self.day = Some(today);
            self.dispatched_today = 0;
        }
    }
}

/// 调度状态机，所有修改都在调度器的互斥锁内进行
pub(crate) struct SchedulerCore {
    tasks: HashMap<String, TaskEntry>,
    registration_order: Vec<String>,
    graph: DependencyGraph,
    queue: TaskQueue,
    balancer: LoadBalancer,
    retry_policy: RetryPolicy,
    quotas: HashMap<String, ResourceQuota>,
    usage: HashMap<String, OwnerUsage>,
    running: HashMap<String, RunningExecution>,
    stale_nodes: HashSet<String>,
    settings: SchedulerConfig,
    metrics: Arc<MetricsCollector>,
}

impl SchedulerCore {
    pub(crate) fn new(config: &AppConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            tasks: HashMap::new(),
            registration_order: Vec::new(),
            graph: DependencyGraph::new(),
            queue: TaskQueue::new(),
            balancer: LoadBalancer::new(
                config.load_balancer.strategy,
                config.load_balancer.heartbeat_timeout_seconds,
            ),
            retry_policy: RetryPolicy::new(config.retry.clone()),
            quotas: HashMap::new(),
            usage: HashMap::new(),
            running: HashMap::new(),
            stale_nodes: HashSet::new(),
            settings: config.scheduler.clone(),
            metrics,
        }
    }

    // 任务注册

    pub(crate) fn register_task(
        &mut self,
        definition: TaskDefinition,
        now: DateTime<Utc>,
    ) -> SchedulerResult<String> {
        let task_id = self.insert_task(definition, now, true)?;
        self.metrics.record_task_scheduled();
        Ok(task_id)
    }

    /// 校验并登记任务，任何校验失败都不会留下部分状态
    fn insert_task(
        &mut self,
        definition: TaskDefinition,
        now: DateTime<Utc>,
        enqueue: bool,
    ) -> SchedulerResult<String> {
        definition.validate()?;

        if self.tasks.contains_key(&definition.task_id) {
            warn!("任务 {} 已存在，拒绝重复注册", definition.task_id);
            return Err(SchedulerError::DuplicateTask {
                id: definition.task_id,
            });
        }

        let cron = match definition.cron_expression() {
            Some(expr) => Some(
                CronExpressionParser::parse(expr)
                    .map_err(|e| SchedulerError::invalid_cron(expr, e))?,
            ),
            None => None,
        };

        let dependencies: Vec<String> = definition
            .dependencies
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if let Some(dependency_id) = dependencies
            .iter()
            .find(|dep| self.graph.detect_cycle(&definition.task_id, dep))
        {
            warn!(
                "任务 {} 依赖 {} 会形成循环，拒绝注册",
                definition.task_id, dependency_id
            );
            return Err(SchedulerError::CircularDependency {
                task_id: definition.task_id.clone(),
                dependency_id: dependency_id.clone(),
            });
        }

        let task_id = definition.task_id.clone();
        self.graph.add_task(&task_id);
        self.graph.add_dependencies(&task_id, &dependencies)?;

        let entry = TaskEntry::new(definition, cron, now);
        let enqueue_now = enqueue && entry.enqueue_when_ready();
        info!(
            "任务已注册: {} ({}), 类型: {}, 优先级: {:?}",
            entry.definition.name, task_id, entry.definition.task_type, entry.definition.priority
        );
        self.tasks.insert(task_id.clone(), entry);
        self.registration_order.push(task_id.clone());

        if !self.graph.is_ready(&task_id) {
            debug!(
                "任务 {} 等待依赖完成: {:?}",
                task_id,
                self.graph.pending_dependencies(&task_id)
            );
        } else if enqueue_now {
            self.enqueue(&task_id, now, true);
        }

        Ok(task_id)
    }

    /// 按任务优先级和owner配额加成入队
    fn enqueue(&mut self, task_id: &str, now: DateTime<Utc>, trigger: bool) -> bool {
        let Some(entry) = self.tasks.get_mut(task_id) else {
            return false;
        };
        let bonus = self
            .quotas
            .get(&entry.definition.owner)
            .map_or(0, ResourceQuota::priority_bonus);
        let priority = entry.definition.priority.value() + bonus;

        if !self.queue.push(&entry.definition, priority, now) {
            return false;
        }
        entry.status = TaskStatus::Pending;
        if trigger && entry.definition.is_recurring() {
            entry.last_trigger = Some(now);
        }
        true
    }

    // 调度循环

    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> (TickReport, Vec<Launch>) {
        let retries_released = self.release_retries(now);
        let triggered = self.trigger_due(now);
        let launches = self.dispatch(now);
        let timed_out = self.sweep_timeouts(now);
        self.check_stale_nodes(now);
        self.update_gauges();

        let report = TickReport {
            triggered,
            dispatched: launches.len(),
            timed_out,
            retries_released,
        };
        if !report.is_idle() {
            debug!(
                "调度循环完成: 触发 {}, 分发 {}, 超时 {}, 重试 {}",
                report.triggered, report.dispatched, report.timed_out, report.retries_released
            );
        }
        (report, launches)
    }

    fn release_retries(&mut self, now: DateTime<Utc>) -> usize {
        let due: Vec<String> = self
            .registration_order
            .iter()
            .filter(|task_id| {
                self.tasks.get(*task_id).is_some_and(|entry| {
                    entry.status == TaskStatus::Retrying && !entry.cancelled && entry.retry_due(now)
                })
            })
            .cloned()
            .collect();

        let mut released = 0;
        for task_id in due {
            if let Some(entry) = self.tasks.get_mut(&task_id) {
                if let Some(pending_id) = entry.pending_execution.clone() {
                    if let Some(execution) = entry.execution_mut(&pending_id) {
                        execution.status = TaskStatus::Pending;
                    }
                }
            }
            if self.enqueue(&task_id, now, false) {
                debug!("任务 {} 退避结束，重新入队", task_id);
                released += 1;
            }
        }
        released
    }

    fn is_due(&self, task_id: &str, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.tasks.get(task_id) else {
            return false;
        };
        let Some(schedule) = &entry.definition.schedule else {
            return false;
        };
        if entry.cancelled
            || matches!(entry.status, TaskStatus::Running | TaskStatus::Retrying)
            || self.queue.contains(task_id)
            || !self.graph.is_ready(task_id)
        {
            return false;
        }

        match schedule {
            TaskSchedule::Interval { seconds } => match entry.last_trigger {
                Some(last) => now - last >= seconds_to_duration(*seconds),
                None => true,
            },
            TaskSchedule::Cron { .. } => {
                let Some(cron) = &entry.cron else {
                    return false;
                };
                let anchor = entry
                    .last_trigger
                    .unwrap_or(entry.registered_at)
                    .max(now - Duration::hours(24));
                cron.next_after(anchor).is_some_and(|next| next <= now)
            }
        }
    }

    fn trigger_due(&mut self, now: DateTime<Utc>) -> usize {
        let due: Vec<String> = self
            .registration_order
            .iter()
            .filter(|task_id| self.is_due(task_id, now))
            .cloned()
            .collect();

        let mut triggered = 0;
        for task_id in due {
            if self.enqueue(&task_id, now, true) {
                info!("周期任务 {} 到达调度时间，已入队", task_id);
                triggered += 1;
            }
        }
        triggered
    }

    /// 配额已满时返回true，条目留在队列中等待下一轮
    fn quota_blocked(&mut self, owner: &str, now: DateTime<Utc>) -> bool {
        let Some(quota) = self.quotas.get(owner) else {
            return false;
        };
        let usage = self.usage.entry(owner.to_string()).or_default();
        usage.roll(now.date_naive());

        if usage.running >= quota.max_concurrent_tasks {
            debug!(
                "owner {} 并发任务数已达上限 {}",
                owner, quota.max_concurrent_tasks
            );
            return true;
        }
        if usage.dispatched_today >= quota.max_tasks_per_day {
            debug!(
                "owner {} 今日任务数已达上限 {}",
                owner, quota.max_tasks_per_day
            );
            return true;
        }
        false
    }

    fn effective_timeout(&self, definition: &TaskDefinition) -> u64 {
        let timeout = definition
            .timeout_seconds
            .unwrap_or(self.settings.default_timeout_seconds);
        match self.quotas.get(&definition.owner) {
            Some(quota) => timeout.min(quota.max_execution_time_per_task),
            None => timeout,
        }
    }

    fn dispatch(&mut self, now: DateTime<Utc>) -> Vec<Launch> {
        let mut launches = Vec::new();
        let mut deferred: Vec<QueueEntry> = Vec::new();

        while launches.len() < self.settings.max_dispatch_per_tick {
            let capabilities = self.balancer.capabilities(now);
            if capabilities.is_empty() {
                break;
            }
            let Some(queued) = self.queue.pop_for(&capabilities, now) else {
                break;
            };

            if !self
                .tasks
                .get(&queued.task_id)
                .is_some_and(|entry| !entry.cancelled)
            {
                debug!("丢弃已取消任务 {} 的队列条目", queued.task_id);
                continue;
            }

            if self.quota_blocked(&queued.owner, now) {
                deferred.push(queued);
                continue;
            }

            let Some(worker) = self.balancer.select(&queued.task_type, now) else {
                deferred.push(queued);
                continue;
            };

            match self.start_execution(&queued, &worker.node_id, now) {
                Ok(launch) => launches.push(launch),
                Err(e) => {
                    warn!("任务 {} 分发失败: {}", queued.task_id, e);
                    deferred.push(queued);
                }
            }
        }

        for queued in deferred {
            self.queue.requeue(queued);
        }
        launches
    }

    fn start_execution(
        &mut self,
        queued: &QueueEntry,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Launch> {
        let timeout_seconds = match self.tasks.get(&queued.task_id) {
            Some(entry) => self.effective_timeout(&entry.definition),
            None => return Err(SchedulerError::task_not_found(&queued.task_id)),
        };
        self.balancer.acquire(worker_id)?;

        let history_limit = self.settings.execution_history_limit;
        let entry = self
            .tasks
            .get_mut(&queued.task_id)
            .ok_or_else(|| SchedulerError::task_not_found(&queued.task_id))?;

        let execution = entry.prepare_execution(now, history_limit);
        execution.mark_running(worker_id, now);
        let execution_id = execution.execution_id.clone();
        let retry_count = execution.retry_count;

        entry.status = TaskStatus::Running;
        entry.execution_count += 1;
        entry.last_execution_time = Some(now);

        let cancellation = CancellationFlag::new();
        let definition = &entry.definition;
        self.running.insert(
            execution_id.clone(),
            RunningExecution {
                task_id: definition.task_id.clone(),
                worker_id: worker_id.to_string(),
                owner: definition.owner.clone(),
                started_at: now,
                timeout_seconds,
                cancellation: cancellation.clone(),
            },
        );

        let usage = self.usage.entry(definition.owner.clone()).or_default();
        usage.roll(now.date_naive());
        usage.running += 1;
        usage.dispatched_today += 1;

        self.metrics.record_task_dispatched();
        info!(
            "任务 {} 分发到Worker {} (执行ID: {}, 重试次数: {})",
            definition.task_id, worker_id, execution_id, retry_count
        );

        Ok(Launch {
            task_type: definition.task_type.clone(),
            context: TaskExecutionContext {
                execution_id,
                task_id: definition.task_id.clone(),
                task_name: definition.name.clone(),
                task_type: definition.task_type.clone(),
                config: definition.config.clone(),
                retry_count,
                worker_id: worker_id.to_string(),
                timeout_seconds,
                cancellation,
            },
        })
    }

    fn sweep_timeouts(&mut self, now: DateTime<Utc>) -> usize {
        let mut overdue: Vec<String> = self
            .running
            .iter()
            .filter(|(_, running)| {
                now - running.started_at > seconds_to_duration(running.timeout_seconds)
            })
            .map(|(execution_id, _)| execution_id.clone())
            .collect();
        overdue.sort();

        for execution_id in &overdue {
            let Some(running) = self.running.remove(execution_id) else {
                continue;
            };
            running.cancellation.cancel();
            self.finish_running(&running);

            warn!(
                "任务 {} 执行超时 (执行ID: {}, 超时: {}秒)",
                running.task_id, execution_id, running.timeout_seconds
            );
            self.metrics.record_task_timeout();
            let error = SchedulerError::ExecutionTimeout {
                timeout_seconds: running.timeout_seconds,
            };
            self.record_failure(
                &running.task_id,
                execution_id,
                TaskStatus::Timeout,
                error.to_string(),
                now,
            );
        }
        overdue.len()
    }

    fn check_stale_nodes(&mut self, now: DateTime<Utc>) {
        let stale: HashSet<String> = self.balancer.stale_nodes(now).into_iter().collect();
        for node_id in stale.difference(&self.stale_nodes) {
            warn!("Worker节点 {} 心跳超时，暂停向其分发任务", node_id);
        }
        for node_id in self.stale_nodes.difference(&stale) {
            info!("Worker节点 {} 心跳恢复", node_id);
        }
        self.stale_nodes = stale;
    }

    fn update_gauges(&self) {
        let active_workers = self
            .balancer
            .nodes()
            .iter()
            .filter(|node| node.status == WorkerStatus::Active)
            .count();
        self.metrics
            .update_gauges(self.queue.len(), self.running.len(), active_workers);
    }

    // 执行结果

    fn finish_running(&mut self, running: &RunningExecution) {
        self.balancer.release(&running.worker_id);
        if let Some(usage) = self.usage.get_mut(&running.owner) {
            usage.running = usage.running.saturating_sub(1);
        }
    }

    /// 应用执行结果，已经结束（超时或重复上报）的执行会被忽略
    pub(crate) fn apply_outcome(&mut self, outcome: ExecutionOutcome, now: DateTime<Utc>) -> bool {
        let Some(running) = self.running.remove(&outcome.execution_id) else {
            debug!(
                "执行 {} 已不在运行中，忽略任务 {} 的执行结果",
                outcome.execution_id, outcome.task_id
            );
            return false;
        };
        self.finish_running(&running);
        let cancel_requested = running.cancellation.is_cancelled();

        match outcome.result {
            Ok(result) => self.record_success(&running.task_id, &outcome.execution_id, result, now),
            Err(e) if cancel_requested => {
                self.record_cancelled(&running.task_id, &outcome.execution_id, e.to_string(), now)
            }
            Err(e) => {
                warn!(
                    "任务 {} 执行失败 (执行ID: {}): {}",
                    running.task_id, outcome.execution_id, e
                );
                self.record_failure(
                    &running.task_id,
                    &outcome.execution_id,
                    TaskStatus::Failed,
                    e.to_string(),
                    now,
                );
            }
        }
        true
    }

    fn record_success(
        &mut self,
        task_id: &str,
        execution_id: &str,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let Some(entry) = self.tasks.get_mut(task_id) else {
            return;
        };
        let duration = entry.execution_mut(execution_id).and_then(|execution| {
            execution.complete(result, now);
            execution.duration_seconds()
        });
        entry.status = TaskStatus::Completed;
        self.metrics.record_task_completed(duration);
        info!("任务 {} 执行完成 (执行ID: {})", task_id, execution_id);

        for dependent in self.graph.mark_completed(task_id) {
            let should_enqueue = self.tasks.get(&dependent).is_some_and(|entry| {
                !entry.cancelled && entry.status == TaskStatus::Pending && entry.enqueue_when_ready()
            });
            if should_enqueue && self.enqueue(&dependent, now, true) {
                info!("任务 {} 的依赖已全部完成，已入队", dependent);
            }
        }
    }

    fn record_cancelled(
        &mut self,
        task_id: &str,
        execution_id: &str,
        message: String,
        now: DateTime<Utc>,
    ) {
        let Some(entry) = self.tasks.get_mut(task_id) else {
            return;
        };
        if let Some(execution) = entry.execution_mut(execution_id) {
            execution.fail(TaskStatus::Cancelled, message, now);
        }
        entry.status = TaskStatus::Cancelled;
        self.metrics.record_task_cancelled();
        info!("任务 {} 已在执行中取消 (执行ID: {})", task_id, execution_id);
    }

    /// 失败或超时：未用尽重试次数时创建新的重试记录，否则进入FAILED
    fn record_failure(
        &mut self,
        task_id: &str,
        execution_id: &str,
        status: TaskStatus,
        message: String,
        now: DateTime<Utc>,
    ) {
        let history_limit = self.settings.execution_history_limit;
        let Some(entry) = self.tasks.get_mut(task_id) else {
            return;
        };
        let Some(execution) = entry.execution_mut(execution_id) else {
            warn!("任务 {} 的执行记录 {} 已被清理", task_id, execution_id);
            entry.status = TaskStatus::Failed;
            return;
        };
        execution.fail(status, message, now);
        let attempt = execution.clone();

        if entry.cancelled {
            entry.status = TaskStatus::Cancelled;
            self.metrics.record_task_cancelled();
            return;
        }

        if self
            .retry_policy
            .should_retry(attempt.retry_count, entry.definition.max_retries)
        {
            let run_at = self.retry_policy.next_retry_time(
                entry.definition.retry_delay_seconds,
                attempt.retry_count,
                now,
            );
            let retry = TaskExecution::retry_of(&attempt, run_at, now);
            info!(
                "任务 {} 将在 {} 进行第 {}/{} 次重试",
                task_id,
                run_at.format("%Y-%m-%d %H:%M:%S UTC"),
                retry.retry_count,
                entry.definition.max_retries
            );
            entry.pending_execution = Some(retry.execution_id.clone());
            entry.push_execution(retry, history_limit);
            entry.status = TaskStatus::Retrying;
            self.metrics.record_task_retry();
        } else {
            error!(
                "任务 {} 已达到最大重试次数 {}，最终状态: FAILED",
                task_id, entry.definition.max_retries
            );
            entry.status = TaskStatus::Failed;
            self.metrics.record_task_failed();
        }
    }

    // 取消

    pub(crate) fn cancel(&mut self, task_id: &str, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.tasks.get_mut(task_id) else {
            return false;
        };
        if entry.cancelled {
            return false;
        }

        match entry.status {
            TaskStatus::Pending | TaskStatus::Retrying => {
                self.queue.remove(task_id);
                if let Some(pending_id) = entry.pending_execution.take() {
                    if let Some(execution) = entry.execution_mut(&pending_id) {
                        execution.fail(TaskStatus::Cancelled, "任务已取消".to_string(), now);
                    }
                }
                entry.status = TaskStatus::Cancelled;
                entry.cancelled = true;
                self.metrics.record_task_cancelled();
                info!("任务 {} 已取消", task_id);
                true
            }
            TaskStatus::Running => {
                for running in self.running.values().filter(|r| r.task_id == task_id) {
                    running.cancellation.cancel();
                }
                entry.cancelled = true;
                info!("任务 {} 正在运行，已设置取消标记", task_id);
                true
            }
            _ if entry.definition.is_recurring() => {
                entry.status = TaskStatus::Cancelled;
                entry.cancelled = true;
                self.metrics.record_task_cancelled();
                info!("周期任务 {} 已停止调度", task_id);
                true
            }
            _ => false,
        }
    }

    // 查询

    pub(crate) fn snapshot(&self, task_id: &str) -> Option<TaskStatusSnapshot> {
        let entry = self.tasks.get(task_id)?;
        Some(TaskStatusSnapshot {
            task_id: task_id.to_string(),
            name: entry.definition.name.clone(),
            status: entry.status,
            created_at: entry.definition.created_at,
            last_execution_time: entry.last_execution_time,
            execution_count: entry.execution_count,
            dependencies: self.graph.dependencies_of(task_id),
            pending_dependencies: self.graph.pending_dependencies(task_id),
            ready: self.graph.is_ready(task_id),
            definition: entry.definition.clone(),
            latest_execution: entry.executions.back().cloned(),
        })
    }

    pub(crate) fn executions(&self, task_id: &str) -> Vec<TaskExecution> {
        self.tasks
            .get(task_id)
            .map(|entry| entry.executions.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub(crate) fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub(crate) fn balancer(&self) -> &LoadBalancer {
        &self.balancer
    }

    pub(crate) fn stats(&self, is_running: bool) -> SchedulerStats {
        let count = |status: TaskStatus| {
            self.tasks
                .values()
                .filter(|entry| entry.status == status)
                .count()
        };
        SchedulerStats {
            is_running,
            total_tasks: self.tasks.len(),
            queued_tasks: self.queue.len(),
            running_tasks: self.running.len(),
            completed_tasks: count(TaskStatus::Completed),
            failed_tasks: count(TaskStatus::Failed) + count(TaskStatus::Timeout),
            cancelled_tasks: count(TaskStatus::Cancelled),
            retrying_tasks: count(TaskStatus::Retrying),
            queue: self.queue.stats(),
            load: self.balancer.load_distribution(),
        }
    }

    // Worker与配额

    pub(crate) fn register_worker(&mut self, node: WorkerNode) {
        self.balancer.register(node);
    }

    pub(crate) fn unregister_worker(&mut self, node_id: &str) -> bool {
        self.stale_nodes.remove(node_id);
        self.balancer.unregister(node_id).is_some()
    }

    pub(crate) fn apply_heartbeat(&mut self, heartbeat: &WorkerHeartbeat) -> SchedulerResult<()> {
        self.balancer.apply_heartbeat(heartbeat)
    }

    pub(crate) fn update_worker_status(
        &mut self,
        node_id: &str,
        task_count: u32,
        load_average: f64,
        now: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        self.balancer
            .update_status(node_id, task_count, load_average, now)
    }

    pub(crate) fn touch_worker(&mut self, node_id: &str, now: DateTime<Utc>) -> SchedulerResult<()> {
        self.balancer.touch(node_id, now)
    }

    pub(crate) fn set_worker_status(
        &mut self,
        node_id: &str,
        status: WorkerStatus,
    ) -> SchedulerResult<()> {
        self.balancer.set_status(node_id, status)
    }

    pub(crate) fn set_quota(&mut self, quota: ResourceQuota) {
        info!(
            "设置owner {} 的资源配额: 并发 {}, 每日 {}",
            quota.owner, quota.max_concurrent_tasks, quota.max_tasks_per_day
        );
        self.quotas.insert(quota.owner.clone(), quota);
    }

    pub(crate) fn quota(&self, owner: &str) -> Option<ResourceQuota> {
        self.quotas.get(owner).cloned()
    }

    // 检查点

    pub(crate) fn checkpoint(&self, now: DateTime<Utc>) -> SchedulerCheckpoint {
        SchedulerCheckpoint {
            tasks: self
                .registration_order
                .iter()
                .filter_map(|task_id| self.tasks.get(task_id))
                .map(|entry| entry.definition.clone())
                .collect(),
            executions: self
                .tasks
                .iter()
                .map(|(task_id, entry)| (task_id.clone(), entry.executions.iter().cloned().collect()))
                .collect(),
            completed: self.graph.completed_tasks(),
            workers: self.balancer.nodes(),
            created_at: Some(now),
        }
    }

    /// 恢复到空的调度器，执行记录只作为历史保留
    pub(crate) fn restore(
        &mut self,
        checkpoint: SchedulerCheckpoint,
        now: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        if !self.tasks.is_empty() {
            return Err(SchedulerError::Internal(
                "只能向空的调度器恢复状态".to_string(),
            ));
        }

        let SchedulerCheckpoint {
            tasks,
            mut executions,
            completed,
            workers,
            ..
        } = checkpoint;

        for worker in workers {
            self.balancer.register(worker);
        }
        for task_id in &completed {
            self.graph.mark_completed(task_id);
        }

        let history_limit = self.settings.execution_history_limit;
        for definition in tasks {
            let history = executions.remove(&definition.task_id).unwrap_or_default();
            let finished = history
                .last()
                .map(|execution| execution.status)
                .filter(|status| status.is_terminal())
                .or_else(|| {
                    self.graph
                        .is_completed(&definition.task_id)
                        .then_some(TaskStatus::Completed)
                });
            let restore_finished = !definition.is_recurring() && finished.is_some();
            // 尚未分发的重试记录继续沿用，保留重试次数
            let resume = history
                .last()
                .filter(|execution| {
                    matches!(execution.status, TaskStatus::Retrying | TaskStatus::Pending)
                })
                .map(|execution| (execution.execution_id.clone(), execution.status));
            let awaiting_retry = matches!(resume, Some((_, TaskStatus::Retrying)));

            let task_id =
                self.insert_task(definition, now, !restore_finished && !awaiting_retry)?;
            if let Some(entry) = self.tasks.get_mut(&task_id) {
                entry.execution_count = history.len() as u64;
                entry.last_execution_time = history.iter().filter_map(|e| e.start_time).max();
                for execution in history {
                    entry.push_execution(execution, history_limit);
                }
                if restore_finished {
                    if let Some(status) = finished {
                        entry.status = status;
                    }
                } else if let Some((execution_id, status)) = resume {
                    entry.pending_execution = Some(execution_id);
                    if status == TaskStatus::Retrying {
                        entry.status = TaskStatus::Retrying;
                    }
                }
            }
        }

        info!(
            "已恢复调度器状态: {} 个任务, {} 个Worker",
            self.tasks.len(),
            self.balancer.len()
        );
        Ok(())
    }
}
