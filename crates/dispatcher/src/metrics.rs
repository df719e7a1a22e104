//! 调度器指标
//!
//! 通过 `metrics` 门面记录，未安装recorder时所有操作都是空操作。

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};

/// 调度器指标收集器
pub struct MetricsCollector {
    enabled: bool,

    tasks_scheduled_total: Counter,
    tasks_dispatched_total: Counter,
    tasks_completed_total: Counter,
    tasks_failed_total: Counter,
    tasks_timed_out_total: Counter,
    tasks_retried_total: Counter,
    tasks_cancelled_total: Counter,
    task_execution_duration: Histogram,

    queue_depth: Gauge,
    running_tasks: Gauge,
    active_workers: Gauge,
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            tasks_scheduled_total: counter!("commander_tasks_scheduled_total"),
            tasks_dispatched_total: counter!("commander_tasks_dispatched_total"),
            tasks_completed_total: counter!("commander_tasks_completed_total"),
            tasks_failed_total: counter!("commander_tasks_failed_total"),
            tasks_timed_out_total: counter!("commander_tasks_timed_out_total"),
            tasks_retried_total: counter!("commander_tasks_retried_total"),
            tasks_cancelled_total: counter!("commander_tasks_cancelled_total"),
            task_execution_duration: histogram!("commander_task_execution_duration_seconds"),
            queue_depth: gauge!("commander_queue_depth"),
            running_tasks: gauge!("commander_running_tasks"),
            active_workers: gauge!("commander_active_workers"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_task_scheduled(&self) {
        if self.enabled {
            self.tasks_scheduled_total.increment(1);
        }
    }

    pub fn record_task_dispatched(&self) {
        if self.enabled {
            self.tasks_dispatched_total.increment(1);
        }
    }

    /// Record a finished execution and its duration
    pub fn record_task_completed(&self, duration_seconds: Option<f64>) {
        if self.enabled {
            self.tasks_completed_total.increment(1);
            if let Some(duration) = duration_seconds {
                self.task_execution_duration.record(duration);
            }
        }
    }

    pub fn record_task_failed(&self) {
        if self.enabled {
            self.tasks_failed_total.increment(1);
        }
    }

    pub fn record_task_timeout(&self) {
        if self.enabled {
            self.tasks_timed_out_total.increment(1);
        }
    }

    pub fn record_task_retry(&self) {
        if self.enabled {
            self.tasks_retried_total.increment(1);
        }
    }

    pub fn record_task_cancelled(&self) {
        if self.enabled {
            self.tasks_cancelled_total.increment(1);
        }
    }

    pub fn update_gauges(&self, queue_depth: usize, running_tasks: usize, active_workers: usize) {
        if self.enabled {
            self.queue_depth.set(queue_depth as f64);
            self.running_tasks.set(running_tasks as f64);
            self.active_workers.set(active_workers as f64);
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(true)
    }
}
