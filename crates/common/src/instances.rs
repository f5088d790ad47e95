//! Graph generators shared by tests and benchmarks.

use petgraph::graph::{NodeIndex, UnGraph};

pub fn empty_graph(n: usize) -> UnGraph<(), ()> {
    let mut graph = UnGraph::new_undirected();
    for _ in 0..n {
        graph.add_node(());
    }
    graph
}

pub fn path_graph(n: usize) -> UnGraph<(), ()> {
    let mut graph = empty_graph(n);
    for u in 1..n {
        graph.add_edge(NodeIndex::new(u - 1), NodeIndex::new(u), ());
    }
    graph
}

pub fn cycle_graph(n: usize) -> UnGraph<(), ()> {
    assert!(n >= 3);
    let mut graph = path_graph(n);
    graph.add_edge(NodeIndex::new(n - 1), NodeIndex::new(0), ());
    graph
}

pub fn complete_graph(n: usize) -> UnGraph<(), ()> {
    let mut graph = empty_graph(n);
    for u in 0..n {
        for v in u + 1..n {
            graph.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
        }
    }
    graph
}

/// Two complete graphs on `k` vertices each, joined by a single edge. The
/// bridge is the unique low-conductance cut.
pub fn dumbbell_graph(k: usize) -> UnGraph<(), ()> {
    assert!(k >= 2);
    let mut graph = empty_graph(2 * k);
    for offset in [0, k] {
        for u in 0..k {
            for v in u + 1..k {
                graph.add_edge(NodeIndex::new(offset + u), NodeIndex::new(offset + v), ());
            }
        }
    }
    graph.add_edge(NodeIndex::new(0), NodeIndex::new(k), ());
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(empty_graph(5).node_count(), 5);
        assert_eq!(path_graph(5).edge_count(), 4);
        assert_eq!(cycle_graph(5).edge_count(), 5);
        assert_eq!(complete_graph(5).edge_count(), 10);
        assert_eq!(dumbbell_graph(4).edge_count(), 13);
    }
}
