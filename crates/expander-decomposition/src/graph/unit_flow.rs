//! Push-relabel flow engine on top of the subset graph.
//!
//! Vertices carry source/sink mass and a height label, edges carry
//! capacity, signed flow, and accumulated congestion. `compute` routes the
//! injected mass with height-bounded preflow-push; leftover excess signals
//! that a level cut exists.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::graph::{SubsetGraph, Vertex};

pub type Flow = i64;

#[derive(Clone, Debug, Default)]
pub struct FlowVertex {
    pub absorbed: Flow,
    pub sink: Flow,
    pub height: u32,
    next_edge: u32,
}

#[derive(Clone, Debug, Default)]
pub struct FlowEdge {
    pub capacity: Flow,
    pub flow: Flow,
    pub congestion: Flow,
}

impl FlowEdge {
    #[inline]
    pub fn residual(&self) -> Flow {
        self.capacity - self.flow
    }
}

/// How `matching` walks the flow decomposition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchingMethod {
    /// Follow half-edges in adjacency-list order.
    Dfs,
    /// Shuffle the half-edge order at every visited vertex.
    Random,
}

pub type UnitFlowGraph = SubsetGraph<FlowVertex, FlowEdge>;

struct SearchFrame {
    vertex: Vertex,
    order: Vec<u32>,
    cursor: usize,
}

impl UnitFlowGraph {
    pub fn new(n: usize) -> Self {
        Self::with_vertices(n)
    }

    pub fn add_edge(&mut self, u: Vertex, v: Vertex, capacity: Flow) {
        self.add_edge_with(
            u,
            v,
            FlowEdge { capacity, ..FlowEdge::default() },
            FlowEdge { capacity, ..FlowEdge::default() },
        );
    }

    /// Routable surplus at `u`. Unabsorbed sink capacity does not count as
    /// negative surplus.
    #[inline]
    pub fn excess(&self, u: Vertex) -> Flow {
        (self.vertex(u).absorbed - self.vertex(u).sink).max(0)
    }

    pub fn add_source(&mut self, u: Vertex, amount: Flow) {
        debug_assert!(amount >= 0);
        self.vertex_mut(u).absorbed += amount;
    }

    pub fn add_sink(&mut self, u: Vertex, amount: Flow) {
        debug_assert!(amount >= 0);
        self.vertex_mut(u).sink += amount;
    }

    /// Incoming flow at `u`, read off the twin half-edges. `matching`
    /// consumes flow one half-edge at a time, so the twins are the
    /// authoritative side here.
    pub fn flow_in(&self, u: Vertex) -> Flow {
        (0..self.degree(u)).map(|i| self.reverse(u, i).data.flow.max(0)).sum()
    }

    /// Zeroes flow state (flow, congestion, absorbed, sink, heights, edge
    /// cursors) on the alive part of the graph. Capacities and the topology
    /// stay.
    pub fn reset(&mut self) {
        for i in 0..self.size() {
            let u = self.alive_at(i);
            *self.vertex_mut(u) = FlowVertex::default();
            for j in 0..self.degree(u) {
                let e = self.edge_data_mut(u, j);
                e.flow = 0;
                e.congestion = 0;
            }
        }
    }

    /// Height-bounded preflow-push. Returns the vertices that still carry
    /// excess; a non-empty result means a level cut is present, not an error.
    pub fn compute(&mut self, max_height: usize) -> Vec<Vertex> {
        let max_h = max_height.min(2 * self.size() + 1) as u32;

        let mut queue: BinaryHeap<Reverse<(u32, Vertex)>> = BinaryHeap::new();
        for i in 0..self.size() {
            let u = self.alive_at(i);
            if self.excess(u) > 0 {
                queue.push(Reverse((self.vertex(u).height, u)));
            }
        }

        while let Some(&Reverse((_, u))) = queue.peek() {
            if self.degree(u) == 0 {
                queue.pop();
                continue;
            }

            let i = self.vertex(u).next_edge as usize;
            debug_assert!(i < self.degree(u));
            let (v, residual) = {
                let e = self.edge(u, i);
                (e.to, e.data.residual())
            };
            let hu = self.vertex(u).height;
            let hv = self.vertex(v).height;

            if self.excess(u) > 0 && residual > 0 && hu == hv + 1 {
                assert_eq!(self.excess(v), 0, "pushing to vertex with non-zero excess");
                let delta = self.excess(u).min(residual).min(self.degree(v) as Flow);
                debug_assert!(delta > 0);

                let rev = self.edge(u, i).rev_idx();
                {
                    let e = self.edge_data_mut(u, i);
                    e.flow += delta;
                    e.congestion += delta;
                }
                self.edge_data_mut(v, rev).flow -= delta;
                self.vertex_mut(u).absorbed -= delta;
                self.vertex_mut(v).absorbed += delta;

                if hu >= max_h || self.excess(u) == 0 {
                    queue.pop();
                }
                if hv < max_h && self.excess(v) > 0 {
                    queue.push(Reverse((hv, v)));
                }
            } else if i == self.degree(u) - 1 {
                // every admissible edge has been tried, relabel
                queue.pop();
                let vertex = self.vertex_mut(u);
                vertex.height += 1;
                vertex.next_edge = 0;
                let h = vertex.height;
                if h < max_h {
                    queue.push(Reverse((h, u)));
                }
            } else {
                self.vertex_mut(u).next_edge += 1;
            }
        }

        self.vertices().filter(|&u| self.excess(u) > 0).collect()
    }

    /// The sparsest level cut of the final height labels: among the prefixes
    /// "all vertices of height at least h", the one minimizing crossing
    /// capacity over the smaller side's volume. Ties go to the smaller
    /// prefix.
    pub fn level_cut(&self, max_height: usize) -> Vec<Vertex> {
        let max_h = max_height.min(2 * self.size() + 1);

        let mut buckets: Vec<Vec<Vertex>> = vec![Vec::new(); max_h + 1];
        for u in self.vertices() {
            let h = self.vertex(u).height as usize;
            debug_assert!(h <= max_h);
            buckets[h].push(u);
        }

        let total_volume = self.volume(self.vertices());
        let mut crossing: Flow = 0;
        let mut prefix_volume = 0;
        let mut best: Option<(f64, usize)> = None;

        for h in (1..=max_h).rev() {
            for &u in &buckets[h] {
                for e in self.edges(u) {
                    let other = self.vertex(e.to).height as usize;
                    if other < h {
                        crossing += e.data.capacity;
                    } else if other > h {
                        crossing -= e.data.capacity;
                    }
                }
                prefix_volume += self.degree(u);
            }
            let smaller = prefix_volume.min(total_volume - prefix_volume);
            if smaller == 0 {
                continue;
            }
            let ratio = crossing as f64 / smaller as f64;
            if best.is_none() || ratio < best.map_or(f64::INFINITY, |(r, _)| r) {
                best = Some((ratio, h));
            }
        }

        match best {
            Some((_, level)) => {
                (level..=max_h).flat_map(|h| buckets[h].iter().copied()).collect()
            }
            // Degenerate labels (all candidate prefixes volume-free); fall
            // back to the excess vertices themselves.
            None => self.vertices().filter(|&u| self.excess(u) > 0).collect(),
        }
    }

    /// Extracts a matching from source vertices to the sinks their routed
    /// units reached, walking positive-flow half-edges and consuming one
    /// unit of flow along each used path. Every returned pair has a distinct
    /// source and a distinct sink.
    pub fn matching<R: Rng>(
        &mut self,
        sources: &[Vertex],
        method: MatchingMethod,
        rng: &mut R,
    ) -> Vec<(Vertex, Vertex)> {
        let mut matches = Vec::new();
        let mut visited = vec![0u32; self.vertex_bound()];
        let mut epoch = 0u32;
        let mut stack: Vec<SearchFrame> = Vec::new();

        let frame = |graph: &Self, rng: &mut R, u: Vertex| {
            let mut order: Vec<u32> = (0..graph.degree(u) as u32).collect();
            if method == MatchingMethod::Random {
                order.shuffle(rng);
            }
            SearchFrame { vertex: u, order, cursor: 0 }
        };

        for &source in sources {
            epoch += 1;
            stack.clear();
            visited[source.index()] = epoch;
            stack.push(frame(self, rng, source));

            let mut matched: Option<Vertex> = None;
            while let Some(top) = stack.last_mut() {
                if top.cursor == top.order.len() {
                    stack.pop();
                    continue;
                }
                let u = top.vertex;
                let i = top.order[top.cursor] as usize;
                top.cursor += 1;

                let (v, flow) = {
                    let e = self.edge(u, i);
                    (e.to, e.data.flow)
                };
                if flow <= 0 {
                    continue;
                }
                if self.flow_in(v) > 0 && self.vertex(v).sink > 0 {
                    matched = Some(v);
                    break;
                }
                if visited[v.index()] != epoch {
                    visited[v.index()] = epoch;
                    let next = frame(self, rng, v);
                    stack.push(next);
                }
            }

            if let Some(sink) = matched {
                for used in &stack {
                    let i = used.order[used.cursor - 1] as usize;
                    self.edge_data_mut(used.vertex, i).flow -= 1;
                }
                self.vertex_mut(sink).absorbed -= 1;
                matches.push((source, sink));
            }
        }

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn single_edge_routes_and_matches() {
        let mut g = UnitFlowGraph::new(2);
        g.add_edge(Vertex::new(0), Vertex::new(1), 1);
        g.add_source(Vertex::new(0), 1);
        g.add_sink(Vertex::new(1), 1);

        let has_excess = g.compute(10);
        assert!(has_excess.is_empty());

        let matches = g.matching(&[Vertex::new(0)], MatchingMethod::Dfs, &mut rng());
        assert_eq!(matches, vec![(Vertex::new(0), Vertex::new(1))]);
    }

    #[test]
    fn reset_zeroes_flow_state_and_keeps_capacities() {
        let mut g = UnitFlowGraph::new(3);
        g.add_edge(Vertex::new(0), Vertex::new(1), 5);
        g.add_edge(Vertex::new(1), Vertex::new(2), 7);
        g.add_source(Vertex::new(0), 3);
        g.add_sink(Vertex::new(2), 3);
        g.compute(10);

        g.reset();

        for u in g.vertices() {
            assert_eq!(g.vertex(u).absorbed, 0);
            assert_eq!(g.vertex(u).sink, 0);
            assert_eq!(g.vertex(u).height, 0);
            assert_eq!(g.excess(u), 0);
            for e in g.edges(u) {
                assert_eq!(e.data.flow, 0);
                assert_eq!(e.data.congestion, 0);
            }
        }
        assert_eq!(g.edge(Vertex::new(0), 0).data.capacity, 5);
        assert_eq!(g.edge(Vertex::new(2), 0).data.capacity, 7);
    }

    #[test]
    fn antisymmetric_flow_after_compute() {
        let mut g = UnitFlowGraph::new(4);
        for (u, v) in [(0, 1), (1, 2), (2, 3), (0, 3)] {
            g.add_edge(Vertex::new(u), Vertex::new(v), 2);
        }
        g.add_source(Vertex::new(0), 4);
        g.add_sink(Vertex::new(2), 4);
        g.compute(20);

        for u in g.vertices() {
            for i in 0..g.degree(u) {
                let e = g.edge(u, i);
                let re = g.reverse(u, i);
                assert_eq!(e.data.flow + re.data.flow, 0);
                assert!(e.data.flow <= e.data.capacity);
            }
        }
    }

    #[test]
    fn bottleneck_leaves_excess_and_level_cut_isolates_source() {
        let mut g = UnitFlowGraph::new(4);
        for (u, v) in [(0, 1), (1, 2), (2, 3)] {
            g.add_edge(Vertex::new(u), Vertex::new(v), 1);
        }
        g.add_source(Vertex::new(0), 2);
        g.add_sink(Vertex::new(3), 1);

        let has_excess = g.compute(5);
        assert_eq!(has_excess, vec![Vertex::new(0)]);

        let cut = g.level_cut(5);
        assert_eq!(cut, vec![Vertex::new(0)]);

        let matches = g.matching(&[Vertex::new(0)], MatchingMethod::Dfs, &mut rng());
        assert_eq!(matches, vec![(Vertex::new(0), Vertex::new(3))]);
    }

    #[test]
    fn matching_pairs_are_disjoint() {
        // Star: center 0, leaves 1..=4. Sources at two leaves, sinks at the
        // other two.
        let mut g = UnitFlowGraph::new(5);
        for v in 1..5 {
            g.add_edge(Vertex::new(0), Vertex::new(v), 2);
        }
        g.add_source(Vertex::new(1), 1);
        g.add_source(Vertex::new(2), 1);
        g.add_sink(Vertex::new(3), 1);
        g.add_sink(Vertex::new(4), 1);

        let has_excess = g.compute(20);
        assert!(has_excess.is_empty());

        let matches = g.matching(&[Vertex::new(1), Vertex::new(2)], MatchingMethod::Dfs, &mut rng());
        assert_eq!(matches.len(), 2);
        let sources: Vec<_> = matches.iter().map(|&(s, _)| s).collect();
        let mut sinks: Vec<_> = matches.iter().map(|&(_, t)| t).collect();
        sinks.sort();
        assert_eq!(sources, vec![Vertex::new(1), Vertex::new(2)]);
        assert_eq!(sinks, vec![Vertex::new(3), Vertex::new(4)]);
    }

    #[test]
    fn random_matching_method_matches_all_sources() {
        let mut g = UnitFlowGraph::new(5);
        for v in 1..5 {
            g.add_edge(Vertex::new(0), Vertex::new(v), 2);
        }
        g.add_source(Vertex::new(1), 1);
        g.add_source(Vertex::new(2), 1);
        g.add_sink(Vertex::new(3), 1);
        g.add_sink(Vertex::new(4), 1);
        g.compute(20);

        let matches = g.matching(&[Vertex::new(1), Vertex::new(2)], MatchingMethod::Random, &mut rng());
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn excess_ignores_unabsorbed_sink_capacity() {
        let mut g = UnitFlowGraph::new(2);
        g.add_edge(Vertex::new(0), Vertex::new(1), 1);
        g.add_sink(Vertex::new(1), 3);
        assert_eq!(g.excess(Vertex::new(1)), 0);
        g.add_source(Vertex::new(1), 5);
        assert_eq!(g.excess(Vertex::new(1)), 2);
    }
}
