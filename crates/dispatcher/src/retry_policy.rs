use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use commander_config::RetryConfig;

/// 失败重试的退避策略
///
/// 第n次失败（`retry_count` 从0开始）之后的等待时间为
/// `retry_delay_seconds * backoff_multiplier^retry_count`，上限为
/// `max_interval_seconds`，再叠加可选的随机抖动。
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn should_retry(&self, retry_count: u32, max_retries: u32) -> bool {
        retry_count < max_retries
    }

    pub fn retry_delay(&self, retry_delay_seconds: f64, retry_count: u32) -> Duration {
        let exponential =
            retry_delay_seconds * self.config.backoff_multiplier.powi(retry_count as i32);
        let capped = exponential.min(self.config.max_interval_seconds as f64);

        let jitter = if self.config.jitter_factor > 0.0 {
            capped * self.config.jitter_factor * (rand::random::<f64>() - 0.5) * 2.0
        } else {
            0.0
        };
        let seconds = (capped + jitter).max(0.0);

        Duration::milliseconds((seconds * 1000.0).round() as i64)
    }

    /// 计算下次重试时间
    pub fn next_retry_time(
        &self,
        retry_delay_seconds: f64,
        retry_count: u32,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let delay = self.retry_delay(retry_delay_seconds, retry_count);
        let next = now + delay;
        debug!(
            "第 {} 次重试将在 {} 后执行: {}",
            retry_count + 1,
            delay,
            next.format("%Y-%m-%d %H:%M:%S UTC")
        );
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_with_cap() {
        let policy = RetryPolicy::new(RetryConfig {
            backoff_multiplier: 2.0,
            max_interval_seconds: 10,
            jitter_factor: 0.0,
        });

        assert_eq!(policy.retry_delay(1.5, 0), Duration::milliseconds(1500));
        assert_eq!(policy.retry_delay(1.5, 1), Duration::seconds(3));
        assert_eq!(policy.retry_delay(1.5, 2), Duration::seconds(6));
        assert_eq!(policy.retry_delay(1.5, 3), Duration::seconds(10));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::new(RetryConfig {
            backoff_multiplier: 1.0,
            max_interval_seconds: 3600,
            jitter_factor: 0.5,
        });
        for _ in 0..50 {
            let delay = policy.retry_delay(10.0, 0).num_milliseconds();
            assert!((5000..=15000).contains(&delay));
        }
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, 2));
        assert!(policy.should_retry(1, 2));
        assert!(!policy.should_retry(2, 2));
        assert!(!policy.should_retry(0, 0));
    }
}
