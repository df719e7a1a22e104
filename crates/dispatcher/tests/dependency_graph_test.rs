use commander_core::SchedulerError;
use commander_dispatcher::DependencyGraph;

fn graph_with(edges: &[(&str, &str)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (task, dep) in edges {
        graph.add_task(task);
        graph.add_task(dep);
        graph.add_dependency(task, dep).unwrap();
    }
    graph
}

#[test]
fn test_dependent_becomes_ready_after_all_dependencies_complete() {
    let mut graph = graph_with(&[("report", "crawl"), ("report", "clean")]);
    assert!(!graph.is_ready("report"));
    assert_eq!(graph.pending_dependencies("report"), vec!["clean", "crawl"]);

    assert!(graph.mark_completed("crawl").is_empty());
    assert!(!graph.is_ready("report"));

    assert_eq!(graph.mark_completed("clean"), vec!["report".to_string()]);
    assert!(graph.is_ready("report"));
    assert!(graph.pending_dependencies("report").is_empty());
}

#[test]
fn test_repeated_completion_releases_nothing() {
    let mut graph = graph_with(&[("b", "a")]);
    assert_eq!(graph.mark_completed("a"), vec!["b".to_string()]);
    assert!(graph.mark_completed("a").is_empty());
}

#[test]
fn test_newly_ready_follow_registration_order() {
    let mut graph = DependencyGraph::new();
    graph.add_task("root");
    for task in ["zeta", "alpha", "mid"] {
        graph.add_task(task);
        graph.add_dependency(task, "root").unwrap();
    }

    assert_eq!(graph.mark_completed("root"), vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_cycle_rejected_without_partial_edges() {
    let mut graph = graph_with(&[("b", "a"), ("c", "b")]);
    let edges_before = graph.edge_count();

    assert!(graph.detect_cycle("a", "c"));
    let result = graph.add_dependencies("a", &["x".to_string(), "c".to_string()]);
    assert!(matches!(
        result,
        Err(SchedulerError::CircularDependency { ref task_id, ref dependency_id })
            if task_id == "a" && dependency_id == "c"
    ));

    assert_eq!(graph.edge_count(), edges_before);
    assert!(graph.dependents_of("x").is_empty());
    assert!(!graph.has_cycle());
}

#[test]
fn test_self_dependency_rejected() {
    let mut graph = DependencyGraph::new();
    graph.add_task("a");
    assert!(graph.add_dependency("a", "a").is_err());
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_forward_reference_blocks_until_completed() {
    let mut graph = DependencyGraph::new();
    graph.add_task("late");
    graph.add_dependency("late", "not-yet-registered").unwrap();
    assert!(!graph.is_ready("late"));
    assert!(!graph.contains("not-yet-registered"));

    assert_eq!(
        graph.mark_completed("not-yet-registered"),
        vec!["late".to_string()]
    );
}

#[test]
fn test_transitive_dependencies_and_dependents() {
    let graph = graph_with(&[("d", "c"), ("c", "b"), ("c", "a"), ("b", "a")]);

    assert_eq!(graph.transitive_dependencies("d"), vec!["c", "a", "b"]);
    assert_eq!(graph.dependents_of("a"), vec!["b", "c"]);
    assert_eq!(graph.dependencies_of("c"), vec!["a", "b"]);
    assert!(graph.transitive_dependencies("a").is_empty());
}

#[test]
fn test_unknown_task_is_ready() {
    let graph = DependencyGraph::new();
    assert!(graph.is_ready("ghost"));
    assert!(!graph.is_completed("ghost"));
}
