//! Trimming: turning a near-expander into an expander.
//!
//! Every vertex with edges leaving the current alive set injects `2/phi`
//! units per boundary edge; every vertex can absorb its internal degree.
//! While the flow engine fails to route everything, the level cut is shaved
//! off and the injection repeats on the remainder.

use tracing::{debug, trace};

use crate::graph::{Flow, UnitFlowGraph, Vertex};

pub struct Solver<'a> {
    graph: &'a mut UnitFlowGraph,
    phi: f64,
}

impl<'a> Solver<'a> {
    pub fn new(graph: &'a mut UnitFlowGraph, phi: f64) -> Self {
        Self { graph, phi }
    }

    /// Shaves the current alive set down to an expander. Returns the removed
    /// vertices; the remainder stays alive in the graph.
    pub fn compute(mut self) -> Vec<Vertex> {
        let m = self.graph.global_edge_count();
        let height_bound = (2.0 * ((2 * m + 1) as f64).ln() / self.phi).ceil() as usize;
        let capacity = (2.0 / self.phi).ceil() as Flow;

        let mut removed = Vec::new();
        loop {
            self.graph.reset();
            for i in 0..self.graph.size() {
                let u = self.graph.alive_at(i);
                for j in 0..self.graph.degree(u) {
                    self.graph.edge_data_mut(u, j).capacity = capacity;
                }
                let boundary = (self.graph.global_degree(u) - self.graph.degree(u)) as Flow;
                if boundary > 0 {
                    let supply = (2.0 * boundary as f64 / self.phi).ceil() as Flow;
                    self.graph.add_source(u, supply);
                }
                let internal = self.graph.degree(u) as Flow;
                self.graph.add_sink(u, internal);
            }

            let has_excess = self.graph.compute(height_bound);
            if has_excess.is_empty() {
                break;
            }

            let cut = self.graph.level_cut(height_bound);
            debug_assert!(!cut.is_empty());
            trace!(excess = has_excess.len(), cut = cut.len(), "trimming level cut");
            for &u in &cut {
                self.graph.remove(u);
            }
            removed.extend(cut);
        }

        debug!(removed = removed.len(), alive = self.graph.size(), "trimming finished");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A complete graph on `k` vertices, plus `extra` vertices that are only
    /// there to hold boundary edges, restricted to the clique.
    fn clique_with_boundary(k: usize, boundary_edges: &[(usize, usize)]) -> UnitFlowGraph {
        let outside = boundary_edges.iter().map(|&(_, v)| v + 1).max().unwrap_or(k).max(k);
        let mut g = UnitFlowGraph::new(outside);
        for u in 0..k {
            for v in u + 1..k {
                g.add_edge(Vertex::new(u), Vertex::new(v), 0);
            }
        }
        for &(u, v) in boundary_edges {
            g.add_edge(Vertex::new(u), Vertex::new(v), 0);
        }
        g.subgraph((0..k).map(Vertex::new));
        g
    }

    #[test]
    fn well_connected_subset_is_kept_whole() {
        // K5 with a single boundary edge; the injected supply routes into
        // the clique's ample sink capacity.
        let mut g = clique_with_boundary(5, &[(0, 5)]);
        let removed = Solver::new(&mut g, 0.25).compute();
        assert!(removed.is_empty());
        assert_eq!(g.size(), 5);
    }

    #[test]
    fn boundary_heavy_pendant_is_shaved() {
        // K5 plus a pendant vertex 5 attached by one internal edge; the
        // pendant carries three boundary edges, far more supply than its
        // single internal edge can drain.
        let mut g = {
            let mut g = UnitFlowGraph::new(9);
            for u in 0..5 {
                for v in u + 1..5 {
                    g.add_edge(Vertex::new(u), Vertex::new(v), 0);
                }
            }
            g.add_edge(Vertex::new(0), Vertex::new(5), 0);
            for outside in 6..9 {
                g.add_edge(Vertex::new(5), Vertex::new(outside), 0);
            }
            g.subgraph((0..6).map(Vertex::new));
            g
        };

        let removed = Solver::new(&mut g, 0.25).compute();
        assert!(!removed.is_empty());
        assert!(removed.contains(&Vertex::new(5)));
        // Whatever was shaved is exactly what is no longer alive.
        let alive: Vec<_> = g.vertices().collect();
        assert_eq!(alive.len() + removed.len(), 6);
        for u in &removed {
            assert!(!alive.contains(u));
        }
    }
}
