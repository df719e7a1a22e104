use thiserror::Error;

/// CRON表达式解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("cron表达式必须有5或6个字段，得到{found}个")]
    BadFieldCount { found: usize },

    #[error("字段 {field} 的值 {value} 超出范围 {min}-{max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("字段 {field} 包含无效的值: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("字段 {field} 的起始值 {start} 不能大于结束值 {end}")]
    InvalidRange {
        field: &'static str,
        start: u32,
        end: u32,
    },

    #[error("字段 {field} 的步长无效: {step}")]
    InvalidStep { field: &'static str, step: String },

    #[error("秒字段 {value} 不包含0，按分钟扫描时永远不会触发")]
    UnreachableSeconds { value: String },
}

/// 错误所属的处理类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 注册阶段被拒绝，同步返回给调用方
    Scheduling,
    /// 暂时没有可用的Worker，任务保持排队
    Dispatch,
    /// 执行器返回失败，进入重试流程
    Execution,
    /// 超时扫描检测到的超时，与执行失败同等对待
    Timeout,
    Configuration,
    Internal,
}

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("任务已存在: {id}")]
    DuplicateTask { id: String },

    #[error("检测到循环依赖: 任务 {task_id} 依赖 {dependency_id}")]
    CircularDependency {
        task_id: String,
        dependency_id: String,
    },

    #[error("无效的CRON表达式: {expr} - {source}")]
    InvalidCron {
        expr: String,
        #[source]
        source: CronError,
    },

    #[error("无效的任务定义: {0}")]
    InvalidTask(String),

    #[error("任务未找到: {id}")]
    TaskNotFound { id: String },

    #[error("Worker未找到: {id}")]
    WorkerNotFound { id: String },

    #[error("没有支持任务类型 {task_type} 的可用Worker")]
    NoEligibleWorker { task_type: String },

    #[error("未注册任务类型 {task_type} 的执行器")]
    ExecutorNotFound { task_type: String },

    #[error("任务执行错误: {0}")]
    TaskExecution(String),

    #[error("任务执行超时: 超过 {timeout_seconds} 秒")]
    ExecutionTimeout { timeout_seconds: u64 },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl SchedulerError {
    pub fn task_not_found<S: Into<String>>(id: S) -> Self {
        Self::TaskNotFound { id: id.into() }
    }
    pub fn worker_not_found<S: Into<String>>(id: S) -> Self {
        Self::WorkerNotFound { id: id.into() }
    }
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::TaskExecution(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn invalid_cron<S: Into<String>>(expr: S, source: CronError) -> Self {
        Self::InvalidCron {
            expr: expr.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SchedulerError::DuplicateTask { .. }
            | SchedulerError::CircularDependency { .. }
            | SchedulerError::InvalidCron { .. }
            | SchedulerError::InvalidTask(_)
            | SchedulerError::TaskNotFound { .. } => ErrorCategory::Scheduling,
            SchedulerError::WorkerNotFound { .. } | SchedulerError::NoEligibleWorker { .. } => {
                ErrorCategory::Dispatch
            }
            SchedulerError::ExecutorNotFound { .. } | SchedulerError::TaskExecution(_) => {
                ErrorCategory::Execution
            }
            SchedulerError::ExecutionTimeout { .. } => ErrorCategory::Timeout,
            SchedulerError::Configuration(_) => ErrorCategory::Configuration,
            SchedulerError::Serialization(_) | SchedulerError::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// 执行类和超时类错误会计入重试次数
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Execution | ErrorCategory::Timeout
        )
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

/// 统一的Result类型
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
