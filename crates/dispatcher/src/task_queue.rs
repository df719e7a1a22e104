use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use commander_core::{QueueStats, TaskDefinition};

/// 队列条目
///
/// 排序规则：优先级高的在前，同优先级按入队时间先后，再按入队序号。
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub task_id: String,
    pub task_type: String,
    pub owner: String,
    pub priority: u8,
    pub enqueued_at: DateTime<Utc>,
    sequence: u64,
    wait_seconds: f64,
}

impl QueueEntry {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// BinaryHeap是最大堆，较早入队的条目需要比较为“更大”
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// 就绪任务的优先级队列
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<QueueEntry>,
    queued: HashSet<String>,
    next_sequence: u64,
    total_enqueued: u64,
    total_dequeued: u64,
    total_wait_seconds: f64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队，任务已在队列中时返回false
    pub fn push(&mut self, task: &TaskDefinition, priority: u8, now: DateTime<Utc>) -> bool {
        if self.queued.contains(&task.task_id) {
            debug!("任务 {} 已在队列中，忽略重复入队", task.task_id);
            return false;
        }

        let entry = QueueEntry {
            task_id: task.task_id.clone(),
            task_type: task.task_type.clone(),
            owner: task.owner.clone(),
            priority,
            enqueued_at: now,
            sequence: self.next_sequence,
            wait_seconds: 0.0,
        };
        self.next_sequence += 1;
        self.total_enqueued += 1;
        self.queued.insert(entry.task_id.clone());
        self.heap.push(entry);

        debug!(
            "任务 {} 入队，优先级: {}，队列长度: {}",
            task.task_id,
            priority,
            self.heap.len()
        );
        true
    }

    /// 弹出任务类型在 `capabilities` 中的最高优先级条目
    ///
    /// 不匹配的条目暂存后原样放回，相对顺序不变。
    pub fn pop_for(
        &mut self,
        capabilities: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Option<QueueEntry> {
        let mut skipped = Vec::new();
        let mut found = None;

        while let Some(entry) = self.heap.pop() {
            if capabilities.contains(&entry.task_type) {
                found = Some(entry);
                break;
            }
            skipped.push(entry);
        }
        self.heap.extend(skipped);

        let mut entry = found?;
        self.queued.remove(&entry.task_id);

        let wait = (now - entry.enqueued_at).num_milliseconds().max(0) as f64 / 1000.0;
        entry.wait_seconds = wait;
        self.total_dequeued += 1;
        self.total_wait_seconds += wait;

        Some(entry)
    }

    /// 放回 `pop_for` 取出但未能分发的条目，保留原有的排序位置
    pub fn requeue(&mut self, mut entry: QueueEntry) {
        if !self.queued.insert(entry.task_id.clone()) {
            return;
        }
        self.total_dequeued = self.total_dequeued.saturating_sub(1);
        self.total_wait_seconds = (self.total_wait_seconds - entry.wait_seconds).max(0.0);
        entry.wait_seconds = 0.0;
        self.heap.push(entry);
    }

    /// 移除指定任务，用于取消
    pub fn remove(&mut self, task_id: &str) -> bool {
        if !self.queued.remove(task_id) {
            return false;
        }
        self.heap.retain(|entry| entry.task_id != task_id);
        debug!("任务 {} 已从队列移除", task_id);
        true
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.queued.contains(task_id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 按出队顺序列出当前条目
    pub fn entries(&self) -> Vec<QueueEntry> {
        let mut entries = self.heap.clone().into_sorted_vec();
        entries.reverse();
        entries
    }

    pub fn stats(&self) -> QueueStats {
        let avg_wait_seconds = if self.total_dequeued == 0 {
            0.0
        } else {
            self.total_wait_seconds / self.total_dequeued as f64
        };
        QueueStats {
            total_enqueued: self.total_enqueued,
            total_dequeued: self.total_dequeued,
            queue_length: self.heap.len(),
            avg_wait_seconds,
        }
    }
}
