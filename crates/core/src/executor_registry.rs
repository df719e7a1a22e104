use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::traits::TaskExecutor;

/// 按任务类型显式注册的执行器表
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: Arc<RwLock<HashMap<String, Arc<dyn TaskExecutor>>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register<S: Into<String>>(&self, task_type: S, executor: Arc<dyn TaskExecutor>) {
        let task_type = task_type.into();
        let mut registry = self.executors.write().await;
        if registry.insert(task_type.clone(), executor).is_some() {
            warn!("任务类型 {} 的执行器已被替换", task_type);
        } else {
            info!("注册任务类型 {} 的执行器", task_type);
        }
    }

    pub async fn register_batch(&self, executors: Vec<(String, Arc<dyn TaskExecutor>)>) {
        for (task_type, executor) in executors {
            self.register(task_type, executor).await;
        }
    }

    pub async fn unregister(&self, task_type: &str) -> bool {
        self.executors.write().await.remove(task_type).is_some()
    }

    pub async fn get(&self, task_type: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.read().await.get(task_type).cloned()
    }

    pub async fn contains(&self, task_type: &str) -> bool {
        self.executors.read().await.contains_key(task_type)
    }

    pub async fn task_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.executors.read().await.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TaskExecutionContext;
    use crate::SchedulerResult;
    use async_trait::async_trait;

    struct NoopExecutor;

    #[async_trait]
    impl TaskExecutor for NoopExecutor {
        async fn execute(&self, _context: TaskExecutionContext) -> SchedulerResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ExecutorRegistry::new();
        registry.register("crawler", Arc::new(NoopExecutor)).await;

        assert!(registry.contains("crawler").await);
        assert!(registry.get("cleaner").await.is_none());
        assert_eq!(registry.get("crawler").await.unwrap().name(), "noop");

        assert!(registry.unregister("crawler").await);
        assert!(!registry.unregister("crawler").await);
        assert!(registry.task_types().await.is_empty());
    }
}
