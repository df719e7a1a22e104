use chrono::Duration;

/// 任务上可配置的最长时长（调度间隔、超时），约100年
pub const MAX_TASK_DURATION_SECONDS: u64 = 100 * 365 * 24 * 3600;

/// 把秒数转换为 `chrono::Duration`，超出范围时饱和为最大值
pub fn seconds_to_duration(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_duration_saturates() {
        assert_eq!(seconds_to_duration(90), Duration::seconds(90));
        assert_eq!(seconds_to_duration(u64::MAX), Duration::MAX);
        assert_eq!(seconds_to_duration(10_000_000_000_000_000), Duration::MAX);
        assert_eq!(
            seconds_to_duration(MAX_TASK_DURATION_SECONDS),
            Duration::seconds(MAX_TASK_DURATION_SECONDS as i64)
        );
    }
}
