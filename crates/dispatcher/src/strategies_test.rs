#[cfg(test)]
mod strategies_tests {
    use crate::strategies::*;
    use commander_core::{LoadBalanceStrategy, WorkerNode};

    fn create_test_worker(id: &str, task_types: Vec<&str>, current: u32, max: u32) -> WorkerNode {
        let mut worker = WorkerNode::new(
            id,
            max,
            task_types.iter().map(|s| s.to_string()).collect(),
        );
        worker.current_task_count = current;
        worker
    }

    #[test]
    fn test_round_robin_strategy() {
        let strategy = RoundRobinStrategy::new();
        let workers = [
            create_test_worker("worker1", vec!["shell"], 0, 5),
            create_test_worker("worker2", vec!["shell"], 1, 5),
            create_test_worker("worker3", vec!["shell"], 2, 5),
        ];
        let candidates: Vec<&WorkerNode> = workers.iter().collect();

        let picks: Vec<String> = (0..4)
            .map(|_| strategy.select("shell", &candidates).unwrap().node_id.clone())
            .collect();

        // 第四次选择回到第一个Worker
        assert_eq!(picks, vec!["worker1", "worker2", "worker3", "worker1"]);
    }

    #[test]
    fn test_strategies_without_candidates() {
        for kind in [
            LoadBalanceStrategy::LeastLoaded,
            LoadBalanceStrategy::RoundRobin,
            LoadBalanceStrategy::Random,
            LoadBalanceStrategy::TaskAffinity,
        ] {
            assert!(strategy_for(kind).select("shell", &[]).is_none());
        }
    }

    #[test]
    fn test_least_loaded_strategy() {
        let strategy = LeastLoadedStrategy::new();
        let workers = [
            create_test_worker("busy", vec!["shell"], 4, 5),
            create_test_worker("idle", vec!["shell"], 1, 10),
            create_test_worker("half", vec!["shell"], 1, 2),
        ];
        let candidates: Vec<&WorkerNode> = workers.iter().collect();
        assert_eq!(
            strategy.select("shell", &candidates).unwrap().node_id,
            "idle"
        );
    }

    #[test]
    fn test_random_strategy_picks_candidate() {
        let strategy = RandomStrategy::new();
        let workers = [
            create_test_worker("a", vec!["shell"], 0, 5),
            create_test_worker("b", vec!["shell"], 0, 5),
        ];
        let candidates: Vec<&WorkerNode> = workers.iter().collect();
        for _ in 0..20 {
            let selected = strategy.select("shell", &candidates).unwrap();
            assert!(selected.node_id == "a" || selected.node_id == "b");
        }
    }

    #[test]
    fn test_task_affinity_prefers_specialized_worker() {
        let strategy = TaskAffinityStrategy::new();
        let workers = [
            create_test_worker("generalist", vec!["shell", "http"], 0, 10),
            create_test_worker("specialist", vec!["shell"], 3, 10),
        ];
        let candidates: Vec<&WorkerNode> = workers.iter().collect();

        assert_eq!(
            strategy.select("shell", &candidates).unwrap().node_id,
            "specialist"
        );
        assert_eq!(
            strategy.select("http", &candidates).unwrap().node_id,
            "generalist"
        );
        assert_eq!(strategy.name(), "TaskAffinity");
    }
}
