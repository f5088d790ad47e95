//! The recursive decomposition driver.
//!
//! Builds the flow graph and the subdivision flow graph once, then runs the
//! cut-matching game on recursively shrinking subsets. Balanced cuts recurse
//! on both sides, near-expanders are trimmed and the shaved part recursed
//! on, expanders keep their partition id.

use std::collections::BTreeSet;
use std::fmt;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use common::make_index;

use crate::cut_matching::{self, CutResult, Parameters, ResultKind};
use crate::graph::{UnitFlowGraph, Vertex};
use crate::trimming;

make_index!(pub PartitionId);

/// A parameter outside its documented domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InvalidParameterError {
    Conductance(f64),
    MinBalance(f64),
}

impl fmt::Display for InvalidParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidParameterError::Conductance(phi) => write!(f, "conductance must lie in (0, 1), got {phi}"),
            InvalidParameterError::MinBalance(balance) => {
                write!(f, "minimum balance must lie in [0, 0.5], got {balance}")
            }
        }
    }
}

impl std::error::Error for InvalidParameterError {}

/// Partition id of every vertex of the input graph. Id 0 covers the whole
/// graph until cuts split fresh ids off.
#[derive(Clone, Debug)]
pub struct Partitions {
    ids: Vec<PartitionId>,
    count: usize,
}

impl Partitions {
    fn new(n: usize) -> Self {
        Self { ids: vec![PartitionId::new(0); n], count: usize::from(n > 0) }
    }

    /// Allocates a fresh id and assigns it to every vertex of `subset`.
    pub fn new_partition(&mut self, subset: &[Vertex]) -> PartitionId {
        let id = PartitionId::new(self.count);
        self.count += 1;
        for &u in subset {
            self.ids[u.index()] = id;
        }
        id
    }

    pub fn id(&self, u: Vertex) -> PartitionId {
        self.ids[u.index()]
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// The input's edge list with self-loops and duplicate edges dropped.
pub(crate) fn simple_edges(graph: &UnGraph<(), ()>) -> Vec<(usize, usize)> {
    let mut edges = BTreeSet::new();
    for e in graph.edge_references() {
        let (u, v) = (e.source().index(), e.target().index());
        if u != v {
            edges.insert((u.min(v), u.max(v)));
        }
    }
    edges.into_iter().collect()
}

pub(crate) fn construct_flow_graph(n: usize, edges: &[(usize, usize)]) -> UnitFlowGraph {
    let mut graph = UnitFlowGraph::new(n);
    for &(u, v) in edges {
        graph.add_edge(Vertex::new(u), Vertex::new(v), 0);
    }
    graph
}

/// Replaces each edge by a path through a fresh split vertex. The split
/// vertex of the i-th edge sits at index `n + i`, so a vertex is a split
/// vertex exactly if its index is at least `n`.
pub(crate) fn construct_subdivision_flow_graph(n: usize, edges: &[(usize, usize)]) -> UnitFlowGraph {
    let mut graph = UnitFlowGraph::new(n + edges.len());
    for (i, &(u, v)) in edges.iter().enumerate() {
        let split = Vertex::new(n + i);
        graph.add_edge(Vertex::new(u), split, 0);
        graph.add_edge(Vertex::new(v), split, 0);
    }
    graph
}

pub struct Solver {
    flow_graph: UnitFlowGraph,
    subdiv_graph: UnitFlowGraph,
    subdiv_idx: Vec<Option<u32>>,
    from_subdiv_idx: Vec<Vertex>,
    partitions: Partitions,
    rng: StdRng,
    phi: f64,
    params: Parameters,
    n: usize,
}

impl Solver {
    pub fn new(graph: &UnGraph<(), ()>, phi: f64, params: Parameters, seed: u64) -> Self {
        let n = graph.node_count();
        let edges = simple_edges(graph);
        let m = edges.len();
        info!(n, m, phi, "preparing expander decomposition");

        let mut subdiv_idx = vec![None; n + m];
        for (i, slot) in subdiv_idx[n..].iter_mut().enumerate() {
            *slot = Some(i as u32);
        }

        Self {
            flow_graph: construct_flow_graph(n, &edges),
            subdiv_graph: construct_subdivision_flow_graph(n, &edges),
            subdiv_idx,
            from_subdiv_idx: vec![Vertex::invalid(); m],
            partitions: Partitions::new(n),
            rng: StdRng::seed_from_u64(seed),
            phi,
            params,
            n,
        }
    }

    /// Runs the decomposition over the whole vertex set.
    pub fn compute(&mut self) {
        let xs: Vec<Vertex> = (0..self.n).map(Vertex::new).collect();
        self.compute_subset(&xs, PartitionId::new(0));
    }

    /// Runs a single cut-matching game over the whole vertex set, restoring
    /// the graphs afterwards.
    pub fn cut(&mut self) -> CutResult {
        let xs: Vec<Vertex> = (0..self.n).map(Vertex::new).collect();
        if xs.is_empty() {
            return CutResult::default();
        }
        let result = self.run_cut_matching(&xs);
        self.subdiv_graph.restore_subgraph();
        self.flow_graph.restore_subgraph();
        result
    }

    /// Restricts both graphs to the subproblem of `xs` and plays the game.
    /// The caller pops the two frames when it is done with the result.
    fn run_cut_matching(&mut self, xs: &[Vertex]) -> CutResult {
        let subdivision_vertices = self.subdiv_graph.subdivision_vertices(xs);
        self.flow_graph.subgraph(xs.iter().copied());
        self.subdiv_graph.subgraph(subdivision_vertices);
        cut_matching::Solver::new(
            &mut self.flow_graph,
            &mut self.subdiv_graph,
            &mut self.rng,
            &mut self.subdiv_idx,
            &mut self.from_subdiv_idx,
            self.phi,
            self.params,
        )
        .compute()
    }

    fn compute_subset(&mut self, xs: &[Vertex], partition: PartitionId) {
        if xs.is_empty() {
            return;
        }
        debug!(partition = partition.index(), size = xs.len(), "searching for a sparse cut");

        let result = self.run_cut_matching(xs);
        match result.kind {
            ResultKind::Balanced => {
                assert!(!result.a.is_empty(), "balanced cut with an empty alive side");
                assert!(!result.r.is_empty(), "balanced cut with an empty removed side");
                self.subdiv_graph.restore_subgraph();
                self.flow_graph.restore_subgraph();

                let new_partition = self.partitions.new_partition(&result.a);
                self.compute_subset(&result.a, new_partition);
                self.compute_subset(&result.r, partition);
            }
            ResultKind::NearExpander => {
                let mut r = result.r;
                let trimmed = trimming::Solver::new(&mut self.flow_graph, self.phi).compute();
                r.extend(trimmed);
                self.subdiv_graph.restore_subgraph();
                self.flow_graph.restore_subgraph();

                if !r.is_empty() && r.len() < xs.len() {
                    let new_partition = self.partitions.new_partition(&r);
                    self.compute_subset(&r, new_partition);
                }
            }
            ResultKind::Expander => {
                self.subdiv_graph.restore_subgraph();
                self.flow_graph.restore_subgraph();
            }
        }
    }

    /// The final partition: for each id, the input vertices carrying it.
    pub fn partitions(&self) -> Vec<Vec<NodeIndex>> {
        let mut result = vec![Vec::new(); self.partitions.count()];
        for u in 0..self.n {
            result[self.partitions.id(Vertex::new(u)).index()].push(NodeIndex::new(u));
        }
        result
    }
}

/// Decomposes `graph` into clusters whose induced subgraphs are
/// `phi`-expanders, with `O(phi m log^2 m)` inter-cluster edges.
pub fn expander_decomposition(
    graph: &UnGraph<(), ()>,
    phi: f64,
    params: Parameters,
    seed: u64,
) -> Result<Vec<Vec<NodeIndex>>, InvalidParameterError> {
    if !(0.0 < phi && phi < 1.0) {
        return Err(InvalidParameterError::Conductance(phi));
    }
    if !(0.0..=0.5).contains(&params.min_balance) {
        return Err(InvalidParameterError::MinBalance(params.min_balance));
    }
    let mut solver = Solver::new(graph, phi, params, seed);
    solver.compute();
    Ok(solver.partitions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::instances;

    fn flatten_sorted(partitions: &[Vec<NodeIndex>]) -> Vec<usize> {
        let mut all: Vec<usize> = partitions.iter().flatten().map(|u| u.index()).collect();
        all.sort();
        all
    }

    fn inter_cluster_edges(graph: &UnGraph<(), ()>, partitions: &[Vec<NodeIndex>]) -> usize {
        let mut id = vec![usize::MAX; graph.node_count()];
        for (i, partition) in partitions.iter().enumerate() {
            for u in partition {
                id[u.index()] = i;
            }
        }
        graph.edge_references().filter(|e| id[e.source().index()] != id[e.target().index()]).count()
    }

    #[test]
    fn empty_graph() {
        let graph = instances::empty_graph(0);
        let partitions = expander_decomposition(&graph, 0.5, Parameters::default(), 0).unwrap();
        assert!(partitions.is_empty());
    }

    #[test]
    fn single_vertex() {
        let graph = instances::empty_graph(1);
        let partitions = expander_decomposition(&graph, 0.5, Parameters::default(), 0).unwrap();
        assert_eq!(partitions, vec![vec![NodeIndex::new(0)]]);
    }

    #[test]
    fn complete_graph_is_one_partition() {
        let graph = instances::complete_graph(8);
        let partitions = expander_decomposition(&graph, 0.01, Parameters::default(), 0).unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(flatten_sorted(&partitions), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn cycle_is_one_partition_for_tiny_phi() {
        // Conductance of a cycle is about 2/m; for phi far below that every
        // round routes fully and nothing gets cut.
        let graph = instances::cycle_graph(12);
        let partitions = expander_decomposition(&graph, 0.01, Parameters::default(), 5).unwrap();
        assert_eq!(partitions.len(), 1);
    }

    #[test]
    fn output_is_a_partition_of_the_vertices() {
        let graph = instances::dumbbell_graph(8);
        for seed in 0..4 {
            let partitions = expander_decomposition(&graph, 0.4, Parameters::default(), seed).unwrap();
            assert!(!partitions.is_empty());
            for partition in &partitions {
                assert!(!partition.is_empty());
            }
            assert_eq!(flatten_sorted(&partitions), (0..16).collect::<Vec<_>>());
        }
    }

    #[test]
    fn balanced_cut_strategy_also_yields_a_partition() {
        let graph = instances::dumbbell_graph(6);
        let params = Parameters { balanced_cut_strategy: true, ..Parameters::default() };
        let partitions = expander_decomposition(&graph, 0.3, params, 1).unwrap();
        assert_eq!(flatten_sorted(&partitions), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn resampled_unit_vectors_also_yield_a_partition() {
        let graph = instances::dumbbell_graph(6);
        let params =
            Parameters { resample_unit_vector: true, random_walk_steps: 3, ..Parameters::default() };
        let partitions = expander_decomposition(&graph, 0.3, params, 1).unwrap();
        assert_eq!(flatten_sorted(&partitions), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn deterministic_given_seed() {
        let graph = instances::dumbbell_graph(8);
        let first = expander_decomposition(&graph, 0.4, Parameters::default(), 12).unwrap();
        let second = expander_decomposition(&graph, 0.4, Parameters::default(), 12).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn inter_cluster_edges_stay_bounded() {
        let phi = 0.3;
        for k in [6, 8] {
            let graph = instances::dumbbell_graph(k);
            let partitions = expander_decomposition(&graph, phi, Parameters::default(), 0).unwrap();
            let m = graph.edge_count() as f64;
            let bound = 8.0 * phi * m * m.log10() * m.log10();
            assert!((inter_cluster_edges(&graph, &partitions) as f64) <= bound);
        }
    }

    #[test]
    fn rejects_out_of_range_conductance() {
        let graph = instances::complete_graph(4);
        assert_eq!(
            expander_decomposition(&graph, 0.0, Parameters::default(), 0),
            Err(InvalidParameterError::Conductance(0.0))
        );
        assert_eq!(
            expander_decomposition(&graph, 1.5, Parameters::default(), 0),
            Err(InvalidParameterError::Conductance(1.5))
        );
    }

    #[test]
    fn rejects_out_of_range_balance() {
        let graph = instances::complete_graph(4);
        let params = Parameters { min_balance: 0.7, ..Parameters::default() };
        assert_eq!(
            expander_decomposition(&graph, 0.5, params, 0),
            Err(InvalidParameterError::MinBalance(0.7))
        );
    }

    #[test]
    fn single_cut_on_a_complete_graph() {
        let graph = instances::complete_graph(8);
        let mut solver = Solver::new(&graph, 0.01, Parameters::default(), 0);
        let result = solver.cut();
        assert_eq!(result.kind, ResultKind::Expander);
        // The graphs are restored; a full decomposition still works.
        solver.compute();
        assert_eq!(solver.partitions().len(), 1);
    }
}
