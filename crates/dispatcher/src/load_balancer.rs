use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use commander_core::{
    LoadBalanceStrategy, LoadDistribution, NodeLoad, SchedulerError, SchedulerResult,
    WorkerHeartbeat, WorkerNode, WorkerStatus,
};

use crate::strategies::{strategy_for, SelectionStrategy};

/// Worker节点注册表与选择器
pub struct LoadBalancer {
    nodes: BTreeMap<String, WorkerNode>,
    strategy: Box<dyn SelectionStrategy>,
    heartbeat_timeout_seconds: u64,
}

impl LoadBalancer {
    pub fn new(strategy: LoadBalanceStrategy, heartbeat_timeout_seconds: u64) -> Self {
        Self::with_strategy(strategy_for(strategy), heartbeat_timeout_seconds)
    }

    pub fn with_strategy(
        strategy: Box<dyn SelectionStrategy>,
        heartbeat_timeout_seconds: u64,
    ) -> Self {
        Self {
            nodes: BTreeMap::new(),
            strategy,
            heartbeat_timeout_seconds,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// 注册节点，同ID节点会被替换
    pub fn register(&mut self, node: WorkerNode) {
        let node_id = node.node_id.clone();
        if self.nodes.insert(node_id.clone(), node).is_some() {
            warn!("Worker节点 {} 重新注册，旧信息已被替换", node_id);
        } else {
            info!("注册Worker节点: {}", node_id);
        }
    }

    pub fn unregister(&mut self, node_id: &str) -> Option<WorkerNode> {
        let removed = self.nodes.remove(node_id);
        if removed.is_some() {
            info!("注销Worker节点: {}", node_id);
        }
        removed
    }

    pub fn get(&self, node_id: &str) -> Option<&WorkerNode> {
        self.nodes.get(node_id)
    }

    pub fn nodes(&self) -> Vec<WorkerNode> {
        self.nodes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn is_available(&self, node: &WorkerNode, now: DateTime<Utc>) -> bool {
        node.is_active()
            && node.has_capacity()
            && !node.is_heartbeat_expired(self.heartbeat_timeout_seconds, now)
    }

    /// 当前还有空闲容量的节点支持的任务类型并集
    pub fn capabilities(&self, now: DateTime<Utc>) -> HashSet<String> {
        self.nodes
            .values()
            .filter(|node| self.is_available(node, now))
            .flat_map(|node| node.supported_task_types.iter().cloned())
            .collect()
    }

    /// 可以接收该任务类型的节点
    pub fn eligible(&self, task_type: &str, now: DateTime<Utc>) -> Vec<&WorkerNode> {
        self.nodes
            .values()
            .filter(|node| self.is_available(node, now) && node.supports(task_type))
            .collect()
    }

    pub fn select(&self, task_type: &str, now: DateTime<Utc>) -> Option<WorkerNode> {
        let candidates = self.eligible(task_type, now);
        if candidates.is_empty() {
            debug!("没有支持任务类型 {} 的可用Worker", task_type);
            return None;
        }
        self.strategy.select(task_type, &candidates).cloned()
    }

    /// 分发成功后增加节点的任务计数
    pub fn acquire(&mut self, node_id: &str) -> SchedulerResult<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| SchedulerError::worker_not_found(node_id))?;
        node.current_task_count += 1;
        Ok(())
    }

    /// 执行结束后减少节点的任务计数，节点已注销时忽略
    pub fn release(&mut self, node_id: &str) {
        match self.nodes.get_mut(node_id) {
            Some(node) => node.current_task_count = node.current_task_count.saturating_sub(1),
            None => debug!("Worker节点 {} 已注销，忽略任务计数释放", node_id),
        }
    }

    /// 心跳上报的任务数和负载
    pub fn update_status(
        &mut self,
        node_id: &str,
        task_count: u32,
        load_average: f64,
        now: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| SchedulerError::worker_not_found(node_id))?;
        node.current_task_count = task_count;
        node.load_average = load_average;
        node.last_heartbeat = now;
        Ok(())
    }

    /// 只刷新心跳时间，任务计数仍以调度器的分配记录为准
    pub fn touch(&mut self, node_id: &str, now: DateTime<Utc>) -> SchedulerResult<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| SchedulerError::worker_not_found(node_id))?;
        node.last_heartbeat = now;
        Ok(())
    }

    pub fn apply_heartbeat(&mut self, heartbeat: &WorkerHeartbeat) -> SchedulerResult<()> {
        let node = self
            .nodes
            .get_mut(&heartbeat.node_id)
            .ok_or_else(|| SchedulerError::worker_not_found(&heartbeat.node_id))?;
        node.apply_heartbeat(heartbeat);
        debug!(
            "Worker节点 {} 心跳: 任务数 {}/{}, 负载 {:.2}",
            heartbeat.node_id,
            heartbeat.current_task_count,
            heartbeat.max_concurrent_tasks,
            heartbeat.load_average
        );
        Ok(())
    }

    pub fn set_status(&mut self, node_id: &str, status: WorkerStatus) -> SchedulerResult<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| SchedulerError::worker_not_found(node_id))?;
        if node.status != status {
            info!("Worker节点 {} 状态变更: {:?} -> {:?}", node_id, node.status, status);
            node.status = status;
        }
        Ok(())
    }

    /// 心跳超时的节点，只排除在选择之外，不会被移除
    pub fn stale_nodes(&self, now: DateTime<Utc>) -> Vec<String> {
        self.nodes
            .values()
            .filter(|node| node.is_heartbeat_expired(self.heartbeat_timeout_seconds, now))
            .map(|node| node.node_id.clone())
            .collect()
    }

    pub fn load_distribution(&self) -> LoadDistribution {
        let total_nodes = self.nodes.len();
        let active_nodes = self.nodes.values().filter(|node| node.is_active()).count();
        let total_running_tasks = self
            .nodes
            .values()
            .map(|node| node.current_task_count)
            .sum();
        let average_load = self
            .nodes
            .values()
            .map(|node| node.load_average)
            .sum::<f64>()
            / total_nodes.max(1) as f64;

        LoadDistribution {
            total_nodes,
            active_nodes,
            total_running_tasks,
            average_load,
            nodes: self
                .nodes
                .values()
                .map(|node| NodeLoad {
                    node_id: node.node_id.clone(),
                    status: node.status,
                    task_count: node.current_task_count,
                    max_concurrent_tasks: node.max_concurrent_tasks,
                    load: node.load_average,
                })
                .collect(),
        }
    }
}
