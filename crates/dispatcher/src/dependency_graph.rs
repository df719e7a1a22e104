use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use commander_core::{SchedulerError, SchedulerResult};

/// 任务依赖图（DAG）
///
/// 边 `task -> dep` 表示 `task` 依赖 `dep`。依赖可以引用尚未注册的任务，
/// 该任务完成之前依赖方一直处于未就绪状态。
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    dependencies: HashMap<String, BTreeSet<String>>,
    dependents: HashMap<String, BTreeSet<String>>,
    completed: HashSet<String>,
    registration: HashMap<String, u64>,
    next_sequence: u64,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记任务节点，记录注册顺序
    pub fn add_task(&mut self, task_id: &str) {
        if !self.registration.contains_key(task_id) {
            self.registration
                .insert(task_id.to_string(), self.next_sequence);
            self.next_sequence += 1;
        }
        self.dependencies.entry(task_id.to_string()).or_default();
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.registration.contains_key(task_id)
    }

    /// 添加单条依赖边，形成环时拒绝
    pub fn add_dependency(&mut self, task_id: &str, dependency_id: &str) -> SchedulerResult<()> {
        self.add_dependencies(task_id, &[dependency_id.to_string()])
    }

    /// 原子地添加一组依赖：任何一条边形成环都不会写入任何边
    pub fn add_dependencies(
        &mut self,
        task_id: &str,
        dependency_ids: &[String],
    ) -> SchedulerResult<()> {
        if let Some(dependency_id) = dependency_ids
            .iter()
            .find(|dep| self.detect_cycle(task_id, dep))
        {
            warn!("检测到循环依赖: 任务 {} 依赖 {}", task_id, dependency_id);
            return Err(SchedulerError::CircularDependency {
                task_id: task_id.to_string(),
                dependency_id: dependency_id.clone(),
            });
        }

        for dependency_id in dependency_ids {
            self.dependencies
                .entry(task_id.to_string())
                .or_default()
                .insert(dependency_id.clone());
            self.dependents
                .entry(dependency_id.clone())
                .or_default()
                .insert(task_id.to_string());
            debug!("添加依赖: {} -> {}", task_id, dependency_id);
        }
        Ok(())
    }

    /// 检查添加 `task_id -> dependency_id` 后是否成环
    ///
    /// 从 `dependency_id` 出发沿已有的依赖边做迭代DFS，能到达 `task_id` 即成环。
    pub fn detect_cycle(&self, task_id: &str, dependency_id: &str) -> bool {
        if task_id == dependency_id {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![dependency_id];

        while let Some(current) = stack.pop() {
            if current == task_id {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(deps) = self.dependencies.get(current) {
                stack.extend(
                    deps.iter()
                        .map(String::as_str)
                        .filter(|dep| !visited.contains(dep)),
                );
            }
        }
        false
    }

    pub fn is_ready(&self, task_id: &str) -> bool {
        self.dependencies
            .get(task_id)
            .map(|deps| deps.iter().all(|dep| self.completed.contains(dep)))
            .unwrap_or(true)
    }

    pub fn is_completed(&self, task_id: &str) -> bool {
        self.completed.contains(task_id)
    }

    /// 标记任务完成，返回因此变为就绪的依赖方（按注册顺序）
    ///
    /// 重复标记返回空列表。
    pub fn mark_completed(&mut self, task_id: &str) -> Vec<String> {
        if !self.completed.insert(task_id.to_string()) {
            return Vec::new();
        }

        let mut newly_ready: Vec<String> = self
            .dependents
            .get(task_id)
            .into_iter()
            .flatten()
            .filter(|dependent| !self.completed.contains(*dependent) && self.is_ready(dependent))
            .cloned()
            .collect();

        newly_ready.sort_by_key(|dependent| {
            (
                self.registration.get(dependent).copied().unwrap_or(u64::MAX),
                dependent.clone(),
            )
        });

        if !newly_ready.is_empty() {
            debug!("任务 {} 完成，释放依赖方: {:?}", task_id, newly_ready);
        }
        newly_ready
    }

    /// 尚未完成的依赖
    pub fn pending_dependencies(&self, task_id: &str) -> Vec<String> {
        self.dependencies
            .get(task_id)
            .into_iter()
            .flatten()
            .filter(|dep| !self.completed.contains(*dep))
            .cloned()
            .collect()
    }

    pub fn dependencies_of(&self, task_id: &str) -> Vec<String> {
        self.dependencies
            .get(task_id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn dependents_of(&self, task_id: &str) -> Vec<String> {
        self.dependents
            .get(task_id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 所有直接和间接依赖，按BFS层次排序
    pub fn transitive_dependencies(&self, task_id: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([task_id]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            if let Some(deps) = self.dependencies.get(current) {
                for dep in deps {
                    if dep != task_id && visited.insert(dep.as_str()) {
                        result.push(dep.clone());
                        queue.push_back(dep.as_str());
                    }
                }
            }
        }
        result
    }

    /// 整图检查是否存在环（Kahn算法）
    pub fn has_cycle(&self) -> bool {
        let mut nodes: HashSet<&str> = self.dependencies.keys().map(String::as_str).collect();
        nodes.extend(self.dependents.keys().map(String::as_str));

        let mut remaining: HashMap<&str, usize> = nodes
            .iter()
            .map(|node| {
                let count = self.dependencies.get(*node).map_or(0, BTreeSet::len);
                (*node, count)
            })
            .collect();

        let mut queue: VecDeque<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut visited = 0usize;

        while let Some(node) = queue.pop_front() {
            visited += 1;
            for dependent in self.dependents.get(node).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        visited != nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(BTreeSet::len).sum()
    }

    pub fn completed_tasks(&self) -> Vec<String> {
        let mut completed: Vec<String> = self.completed.iter().cloned().collect();
        completed.sort();
        completed
    }
}
