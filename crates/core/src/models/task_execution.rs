use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TaskStatus;
use crate::time_utils::seconds_to_duration;

/// 单次执行尝试的记录，每次重试都会产生新的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecution {
    pub execution_id: String,
    pub task_id: String,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub worker_id: Option<String>,
    /// 重试记录的最早可执行时间
    pub scheduled_at: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub result_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskExecution {
    pub fn new(task_id: &str, retry_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            status: TaskStatus::Pending,
            retry_count,
            worker_id: None,
            scheduled_at: None,
            start_time: None,
            end_time: None,
            result_data: None,
            error_message: None,
            created_at: now,
        }
    }

    /// 创建等待退避结束的重试记录
    pub fn retry_of(previous: &TaskExecution, run_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut retry = Self::new(&previous.task_id, previous.retry_count + 1, now);
        retry.status = TaskStatus::Retrying;
        retry.scheduled_at = Some(run_at);
        retry
    }

    pub fn mark_running(&mut self, worker_id: &str, now: DateTime<Utc>) {
        self.status = TaskStatus::Running;
        self.worker_id = Some(worker_id.to_string());
        self.start_time = Some(now);
    }

    pub fn complete(&mut self, result_data: serde_json::Value, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.result_data = Some(result_data);
        self.end_time = Some(now);
    }

    pub fn fail(&mut self, status: TaskStatus, error_message: String, now: DateTime<Utc>) {
        self.status = status;
        self.error_message = Some(error_message);
        self.end_time = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// 运行时长是否超过给定秒数
    pub fn is_overdue(&self, timeout_seconds: u64, now: DateTime<Utc>) -> bool {
        match self.start_time {
            Some(start) if self.is_running() => {
                now - start > seconds_to_duration(timeout_seconds)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_execution_lifecycle() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut execution = TaskExecution::new("t1", 0, now);
        assert_eq!(execution.status, TaskStatus::Pending);

        execution.mark_running("node-1", now);
        assert!(execution.is_running());
        assert!(!execution.is_overdue(60, now + Duration::seconds(60)));
        assert!(execution.is_overdue(60, now + Duration::seconds(61)));

        execution.complete(serde_json::json!({"records": 10}), now + Duration::seconds(5));
        assert!(execution.is_finished());
        assert_eq!(execution.duration_seconds(), Some(5.0));
        assert!(!execution.is_overdue(1, now + Duration::hours(1)));
    }

    #[test]
    fn test_huge_timeout_never_overdue() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut execution = TaskExecution::new("t1", 0, now);
        execution.mark_running("node-1", now);
        assert!(!execution.is_overdue(u64::MAX, now + Duration::days(365)));
    }

    #[test]
    fn test_retry_record() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut first = TaskExecution::new("t1", 0, now);
        first.fail(TaskStatus::Failed, "boom".to_string(), now);

        let retry = TaskExecution::retry_of(&first, now + Duration::seconds(2), now);
        assert_eq!(retry.retry_count, 1);
        assert_eq!(retry.status, TaskStatus::Retrying);
        assert_ne!(retry.execution_id, first.execution_id);
        assert_eq!(retry.scheduled_at, Some(now + Duration::seconds(2)));
    }
}
