use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use tracing::debug;

use commander_core::{LoadBalanceStrategy, WorkerNode};

/// Worker选择策略
///
/// 候选列表已经由 `LoadBalancer` 过滤为可接收该任务类型的节点。
pub trait SelectionStrategy: Send + Sync {
    fn select<'a>(&self, task_type: &str, candidates: &[&'a WorkerNode])
        -> Option<&'a WorkerNode>;

    fn name(&self) -> &str;
}

pub fn strategy_for(kind: LoadBalanceStrategy) -> Box<dyn SelectionStrategy> {
    match kind {
        LoadBalanceStrategy::LeastLoaded => Box::new(LeastLoadedStrategy::new()),
        LoadBalanceStrategy::RoundRobin => Box::new(RoundRobinStrategy::new()),
        LoadBalanceStrategy::Random => Box::new(RandomStrategy::new()),
        LoadBalanceStrategy::TaskAffinity => Box::new(TaskAffinityStrategy::new()),
    }
}

fn compare_load(a: &WorkerNode, b: &WorkerNode) -> CmpOrdering {
    a.load_ratio()
        .partial_cmp(&b.load_ratio())
        .unwrap_or(CmpOrdering::Equal)
}

fn least_loaded<'a>(candidates: &[&'a WorkerNode]) -> Option<&'a WorkerNode> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| compare_load(a, b))
}

#[derive(Debug, Default)]
pub struct LeastLoadedStrategy;

impl LeastLoadedStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for LeastLoadedStrategy {
    fn select<'a>(
        &self,
        _task_type: &str,
        candidates: &[&'a WorkerNode],
    ) -> Option<&'a WorkerNode> {
        let selected = least_loaded(candidates)?;
        debug!(
            "最小负载策略选择Worker: {} (负载: {:.1}%)",
            selected.node_id,
            selected.load_ratio() * 100.0
        );
        Some(selected)
    }

    fn name(&self) -> &str {
        "LeastLoaded"
    }
}

#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    counter: AtomicUsize,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl SelectionStrategy for RoundRobinStrategy {
    fn select<'a>(
        &self,
        _task_type: &str,
        candidates: &[&'a WorkerNode],
    ) -> Option<&'a WorkerNode> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        let selected = candidates[index];

        debug!(
            "轮询策略选择Worker: {} (索引: {}/{})",
            selected.node_id,
            index,
            candidates.len()
        );
        Some(selected)
    }

    fn name(&self) -> &str {
        "RoundRobin"
    }
}

#[derive(Debug, Default)]
pub struct RandomStrategy;

impl RandomStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for RandomStrategy {
    fn select<'a>(
        &self,
        _task_type: &str,
        candidates: &[&'a WorkerNode],
    ) -> Option<&'a WorkerNode> {
        if candidates.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..candidates.len());
        let selected = candidates[index];
        debug!("随机策略选择Worker: {}", selected.node_id);
        Some(selected)
    }

    fn name(&self) -> &str {
        "Random"
    }
}

/// 优先选择只支持该任务类型的专用节点，再按负载挑选
#[derive(Debug, Default)]
pub struct TaskAffinityStrategy;

impl TaskAffinityStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for TaskAffinityStrategy {
    fn select<'a>(
        &self,
        task_type: &str,
        candidates: &[&'a WorkerNode],
    ) -> Option<&'a WorkerNode> {
        let specialized: Vec<&'a WorkerNode> = candidates
            .iter()
            .copied()
            .filter(|worker| {
                worker.supported_task_types.len() == 1
                    && worker.supported_task_types[0] == task_type
            })
            .collect();

        let selected = if specialized.is_empty() {
            least_loaded(candidates)?
        } else {
            debug!("找到专门支持任务类型 {} 的Worker", task_type);
            least_loaded(&specialized)?
        };

        debug!(
            "任务类型亲和策略选择Worker: {} (负载: {:.1}%, 支持类型: {:?})",
            selected.node_id,
            selected.load_ratio() * 100.0,
            selected.supported_task_types
        );
        Some(selected)
    }

    fn name(&self) -> &str {
        "TaskAffinity"
    }
}
