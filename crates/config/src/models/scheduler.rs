use commander_core::LoadBalanceStrategy;
use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 调度循环的检查间隔
    pub check_interval_seconds: u64,
    /// 任务未设置timeout_seconds时使用的超时
    pub default_timeout_seconds: u64,
    /// 单次循环最多分发的任务数
    pub max_dispatch_per_tick: usize,
    /// 每个任务保留的执行记录数
    pub execution_history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 5,
            default_timeout_seconds: 1800,
            max_dispatch_per_tick: 100,
            execution_history_limit: 50,
        }
    }
}

impl ConfigValidator for SchedulerConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_seconds(
            self.check_interval_seconds,
            "scheduler.check_interval_seconds",
            3600,
        )?;
        ValidationUtils::validate_seconds(
            self.default_timeout_seconds,
            "scheduler.default_timeout_seconds",
            7 * 24 * 3600,
        )?;
        ValidationUtils::validate_count(
            self.max_dispatch_per_tick,
            "scheduler.max_dispatch_per_tick",
            10000,
        )?;
        ValidationUtils::validate_count(
            self.execution_history_limit,
            "scheduler.execution_history_limit",
            10000,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub strategy: LoadBalanceStrategy,
    /// 超过该时长没有心跳的节点不再参与选择
    pub heartbeat_timeout_seconds: u64,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            strategy: LoadBalanceStrategy::LeastLoaded,
            heartbeat_timeout_seconds: 90,
        }
    }
}

impl ConfigValidator for LoadBalancerConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_seconds(
            self.heartbeat_timeout_seconds,
            "load_balancer.heartbeat_timeout_seconds",
            24 * 3600,
        )
    }
}

/// 重试退避配置，单个任务的首次等待时间来自任务定义的retry_delay_seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 指数退避倍数
    pub backoff_multiplier: f64,
    /// 最大重试间隔（秒）
    pub max_interval_seconds: u64,
    /// 重试间隔的随机抖动范围（0.0-1.0）
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_multiplier: 2.0,
            max_interval_seconds: 3600,
            jitter_factor: 0.0,
        }
    }
}

impl ConfigValidator for RetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Validation(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        ValidationUtils::validate_seconds(
            self.max_interval_seconds,
            "retry.max_interval_seconds",
            7 * 24 * 3600,
        )?;
        ValidationUtils::validate_range(self.jitter_factor, "retry.jitter_factor", 0.0, 1.0)
    }
}
