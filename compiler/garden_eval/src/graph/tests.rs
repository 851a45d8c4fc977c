use super::*;
use pretty_assertions::assert_eq;

fn id(byte: u8) -> NodeId {
    NodeId::from_bytes([byte; 32])
}

#[test]
fn test_record_edge_both_directions() {
    let graph = DependencyGraph::new();
    graph.record_edge(id(1), id(2), EdgeKind::Structural);
    graph.record_edge(id(1), id(2), EdgeKind::Structural);

    assert_eq!(graph.dependencies_of(id(1)), vec![(id(2), EdgeKind::Structural)]);
    assert_eq!(graph.dependents_of(id(2)), BTreeSet::from([id(1)]));
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_commit_replaces_outgoing_edges() {
    let graph = DependencyGraph::new();
    graph.commit(id(1), 1, [(id(2), EdgeKind::Structural), (id(3), EdgeKind::Symbolic)]);
    graph.commit(id(1), 2, [(id(3), EdgeKind::Symbolic), (id(4), EdgeKind::Structural)]);

    assert_eq!(
        graph.dependencies_of(id(1)),
        vec![(id(3), EdgeKind::Symbolic), (id(4), EdgeKind::Structural)]
    );
    assert!(graph.dependents_of(id(2)).is_empty());
    assert_eq!(graph.dependents_of(id(3)), BTreeSet::from([id(1)]));
}

#[test]
fn test_commit_merges_within_pass() {
    let graph = DependencyGraph::new();
    graph.commit(id(1), 1, [(id(2), EdgeKind::Symbolic)]);
    graph.commit(id(1), 1, [(id(3), EdgeKind::Symbolic), (id(2), EdgeKind::Symbolic)]);

    assert_eq!(
        graph.dependencies_of(id(1)),
        vec![(id(2), EdgeKind::Symbolic), (id(3), EdgeKind::Symbolic)]
    );
    assert_eq!(graph.dependents_of(id(2)), BTreeSet::from([id(1)]));
    assert_eq!(graph.dependents_of(id(3)), BTreeSet::from([id(1)]));

    graph.commit(id(1), 2, [(id(3), EdgeKind::Symbolic)]);
    assert!(graph.dependents_of(id(2)).is_empty());
}

#[test]
fn test_commit_empty_clears() {
    let graph = DependencyGraph::new();
    graph.commit(id(1), 1, [(id(2), EdgeKind::Structural)]);
    graph.commit(id(1), 2, Vec::new());
    assert!(graph.dependencies_of(id(1)).is_empty());
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_mark_dirty_transitive_chain() {
    // a <- sym_a <- def_b <- sym_b <- def_c
    let graph = DependencyGraph::new();
    graph.commit(id(2), 1, [(id(1), EdgeKind::Symbolic)]);
    graph.commit(id(3), 1, [(id(2), EdgeKind::Structural)]);
    graph.commit(id(4), 1, [(id(3), EdgeKind::Symbolic)]);
    graph.commit(id(5), 1, [(id(4), EdgeKind::Structural)]);
    graph.commit(id(9), 1, [(id(8), EdgeKind::Structural)]);

    assert_eq!(
        graph.mark_dirty_transitive(id(1)),
        vec![id(2), id(3), id(4), id(5)]
    );
    assert!(graph.mark_dirty_transitive(id(5)).is_empty());
}

#[test]
fn test_mark_dirty_diamond_visits_once() {
    let graph = DependencyGraph::new();
    graph.commit(id(2), 1, [(id(1), EdgeKind::Structural)]);
    graph.commit(id(3), 1, [(id(1), EdgeKind::Structural)]);
    graph.commit(id(4), 1, [(id(2), EdgeKind::Structural), (id(3), EdgeKind::Structural)]);

    assert_eq!(graph.mark_dirty_transitive(id(1)), vec![id(2), id(3), id(4)]);
}

#[test]
fn test_mark_dirty_terminates_on_cycle() {
    let graph = DependencyGraph::new();
    graph.commit(id(1), 1, [(id(2), EdgeKind::Symbolic)]);
    graph.commit(id(2), 1, [(id(1), EdgeKind::Structural)]);
    assert_eq!(graph.mark_dirty_transitive(id(1)), vec![id(2)]);
}

#[test]
fn test_remove_node() {
    let graph = DependencyGraph::new();
    graph.commit(id(1), 1, [(id(2), EdgeKind::Structural)]);
    graph.commit(id(2), 1, [(id(3), EdgeKind::Structural)]);
    graph.remove_node(id(2));

    assert!(graph.dependencies_of(id(1)).is_empty());
    assert!(graph.dependents_of(id(3)).is_empty());
    assert_eq!(graph.edge_count(), 0);
}
