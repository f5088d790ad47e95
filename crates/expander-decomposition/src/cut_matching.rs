//! The cut-matching game.
//!
//! Each round, the cut player proposes a bisection of the alive split
//! vertices from a projected flow vector, the matching player routes unit
//! demands between the two sides on the subdivision flow graph, and the
//! resulting matching averages the flow vector. Rounds where flow fails to
//! route fully shave a level cut off the graph. After `T` rounds (or once
//! the shaved volume is large) the subset is classified as an expander, a
//! near-expander, or a balanced cut.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace};

use crate::graph::{Flow, MatchingMethod, UnitFlowGraph, Vertex};
use crate::util::square;

/// Parameters configuring how the cut-matching game runs.
#[derive(Copy, Clone, Debug)]
pub struct Parameters {
    /// `t1` in `T = t1 + ceil(t2 * log10(m)^2)`.
    pub t_const: u32,
    /// `t2` in `T = t1 + ceil(t2 * log10(m)^2)`.
    pub t_factor: f64,
    /// Forces at least this many rounds. Running past `T` weakens the
    /// congestion certificate; useful for experiments.
    pub min_iterations: u32,
    /// Volume balance in `[0, 0.5]` to reach before stopping with a sparse
    /// cut.
    pub min_balance: f64,
    /// Sample the potential function every round. Maintains the full flow
    /// matrix, `O(m^2)` memory; diagnostics only.
    pub sample_potential: bool,
    /// Propose perfectly balanced cuts instead of potential-drop cuts.
    pub balanced_cut_strategy: bool,
    /// Draw a fresh random unit vector each round and re-project it through
    /// the matchings played so far.
    pub resample_unit_vector: bool,
    /// How often the stored matchings are applied under
    /// `resample_unit_vector`.
    pub random_walk_steps: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            t_const: 22,
            t_factor: 5.0,
            min_iterations: 0,
            min_balance: 0.0,
            sample_potential: false,
            balanced_cut_strategy: false,
            resample_unit_vector: false,
            random_walk_steps: 1,
        }
    }
}

/// Classification of the subset after the game.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResultKind {
    /// Both sides have substantial volume; recurse on each.
    Balanced,
    /// The whole subset certifies as an expander.
    Expander,
    /// The alive side is an expander after trimming its boundary.
    NearExpander,
}

/// Outcome of one cut-matching game.
#[derive(Clone, Debug)]
pub struct CutResult {
    pub kind: ResultKind,
    pub iterations: u32,
    /// `max_e congestion(e) * iterations`; an `Expander` result certifies
    /// conductance `1 / congestion`.
    pub congestion: Flow,
    /// Potential before every round and after the last one, when sampled.
    pub sampled_potentials: Vec<f64>,
    /// Alive vertices of the outer graph.
    pub a: Vec<Vertex>,
    /// Vertices removed from the outer graph during the game.
    pub r: Vec<Vertex>,
}

impl Default for CutResult {
    fn default() -> Self {
        Self {
            kind: ResultKind::Expander,
            iterations: 0,
            congestion: 1,
            sampled_potentials: Vec::new(),
            a: Vec::new(),
            r: Vec::new(),
        }
    }
}

/// One round's matching over dense subdivision indices.
pub type Matching = Vec<(u32, u32)>;

/// Applies the matching rounds to `values` in place, replacing each matched
/// pair by its average. Preserves the sum of `values` and never increases
/// the spread around the mean.
pub fn project_flow(rounds: &[Matching], values: &mut [f64]) {
    for round in rounds {
        for &(i, j) in round {
            let avg = 0.5 * (values[i as usize] + values[j as usize]);
            values[i as usize] = avg;
            values[j as usize] = avg;
        }
    }
}

pub struct Solver<'a> {
    graph: &'a mut UnitFlowGraph,
    subdiv_graph: &'a mut UnitFlowGraph,
    rng: &'a mut StdRng,
    /// `Some` exactly on split vertices; the value is the dense flow-vector
    /// index assigned below.
    subdiv_idx: &'a mut [Option<u32>],
    from_subdiv_idx: &'a mut [Vertex],
    phi: f64,
    t: u32,
    /// Number of alive split vertices when the game started.
    num_split_nodes: usize,
    /// Multi-commodity flow matrix, identity at the start. Only maintained
    /// under `sample_potential`.
    flow_matrix: Vec<Vec<f64>>,
    params: Parameters,
}

impl<'a> Solver<'a> {
    pub fn new(
        graph: &'a mut UnitFlowGraph,
        subdiv_graph: &'a mut UnitFlowGraph,
        rng: &'a mut StdRng,
        subdiv_idx: &'a mut [Option<u32>],
        from_subdiv_idx: &'a mut [Vertex],
        phi: f64,
        params: Parameters,
    ) -> Self {
        assert!(graph.size() != 0, "cut-matching expects a non-empty subset");

        let m = graph.edge_count().max(1);
        let rounds = params.t_const as i64 + (params.t_factor * square((m as f64).log10())).ceil() as i64;
        let t = rounds.max(1) as u32;

        // Give the alive split vertices dense indices in `[0, m')`.
        let mut count = 0u32;
        for i in 0..subdiv_graph.size() {
            let u = subdiv_graph.alive_at(i);
            if subdiv_idx[u.index()].is_some() {
                subdiv_idx[u.index()] = Some(count);
                from_subdiv_idx[count as usize] = u;
                count += 1;
            }
        }
        let num_split_nodes = count as usize;

        // Every subdivision edge gets the same capacity; congestion counters
        // start fresh.
        let capacity = (1.0 / phi / t as f64).ceil() as Flow;
        for i in 0..subdiv_graph.size() {
            let u = subdiv_graph.alive_at(i);
            if subdiv_idx[u.index()].is_some() {
                continue;
            }
            for j in 0..subdiv_graph.degree(u) {
                let (v, rev) = {
                    let e = subdiv_graph.edge(u, j);
                    (e.to, e.rev_idx())
                };
                let e = subdiv_graph.edge_data_mut(u, j);
                e.capacity = capacity;
                e.congestion = 0;
                let re = subdiv_graph.edge_data_mut(v, rev);
                re.capacity = capacity;
                re.congestion = 0;
            }
        }

        let flow_matrix = if params.sample_potential {
            let mut matrix = vec![vec![0.0; num_split_nodes]; num_split_nodes];
            for (i, row) in matrix.iter_mut().enumerate() {
                row[i] = 1.0;
            }
            matrix
        } else {
            Vec::new()
        };

        Self { graph, subdiv_graph, rng, subdiv_idx, from_subdiv_idx, phi, t, num_split_nodes, flow_matrix, params }
    }

    fn idx(&self, u: Vertex) -> usize {
        self.subdiv_idx[u.index()].expect("vertex is not a subdivision vertex") as usize
    }

    fn alive_split_count(&self) -> usize {
        self.subdiv_graph.size() - self.graph.size()
    }

    fn alive_split_vertices(&self) -> Vec<Vertex> {
        (0..self.subdiv_graph.size())
            .map(|i| self.subdiv_graph.alive_at(i))
            .filter(|&u| self.subdiv_idx[u.index()].is_some())
            .collect()
    }

    fn removed_subdivision_volume(&self) -> usize {
        self.subdiv_graph.global_volume(self.subdiv_graph.removed_vertices().iter().copied())
    }

    /// A semi-random +-1 vector over the alive split vertices, normalized by
    /// their count. Entries of dead indices stay zero.
    fn random_unit_vector(&mut self) -> Vec<f64> {
        let mut result = vec![0.0; self.num_split_nodes];
        let mut count = 0usize;
        for i in 0..self.subdiv_graph.size() {
            let u = self.subdiv_graph.alive_at(i);
            if let Some(idx) = self.subdiv_idx[u.index()] {
                count += 1;
                result[idx as usize] = if self.rng.gen_range(0..2) == 0 { -1.0 } else { 1.0 };
            }
        }
        debug_assert!(count > 0);
        for value in &mut result {
            *value /= count as f64;
        }
        result
    }

    /// Potential of the flow matrix restricted to the alive split vertices.
    fn sample_potential(&self) -> f64 {
        let alive: Vec<usize> = self.alive_split_vertices().iter().map(|&u| self.idx(u)).collect();

        let mut mean = vec![0.0; self.num_split_nodes];
        for &u in &alive {
            for &v in &alive {
                mean[v] += self.flow_matrix[u][v];
            }
        }
        for value in &mut mean {
            *value /= alive.len() as f64;
        }

        let mut result = 0.0;
        for &u in &alive {
            for &v in &alive {
                result += square(self.flow_matrix[u][v] - mean[v]);
            }
        }
        result
    }

    /// The cut player: partition the alive split vertices around the mean of
    /// the flow vector and carve out a source side whose potential is
    /// guaranteed to drop.
    fn propose_cut(&self, flow: &[f64]) -> (Vec<Vertex>, Vec<Vertex>) {
        let split_count = self.alive_split_count();
        let split = self.alive_split_vertices();
        debug_assert_eq!(split.len(), split_count);

        let mean = split.iter().map(|&u| flow[self.idx(u)]).sum::<f64>() / split_count as f64;

        let mut ax_left: Vec<Vertex> = Vec::new();
        let mut ax_right: Vec<Vertex> = Vec::new();
        for &u in &split {
            if flow[self.idx(u)] < mean {
                ax_left.push(u);
            } else {
                ax_right.push(u);
            }
        }
        let left_larger = ax_left.len() > ax_right.len();
        if left_larger {
            std::mem::swap(&mut ax_left, &mut ax_right);
        }

        let total_potential: f64 = split.iter().map(|&u| square(flow[self.idx(u)] - mean)).sum();
        let left_potential: f64 = ax_left.iter().map(|&u| square(flow[self.idx(u)] - mean)).sum();

        ax_left.sort_by(|&a, &b| flow[self.idx(a)].total_cmp(&flow[self.idx(b)]));
        ax_right.sort_by(|&a, &b| flow[self.idx(a)].total_cmp(&flow[self.idx(b)]));

        if ax_left.is_empty() {
            // Floating-point collapse onto the mean; split the right side in
            // half instead.
            while ax_left.len() < ax_right.len() {
                let u = ax_right.pop().expect("right side cannot be empty here");
                ax_left.push(u);
            }
            if ax_left.len() > ax_right.len() {
                std::mem::swap(&mut ax_left, &mut ax_right);
            }
        } else if left_potential > total_potential / 20.0 {
            // Both sides carry potential. If the small side is the original
            // left, the discards below must come from the low-flow end.
            if !left_larger {
                ax_right.reverse();
            }
        } else {
            let l: f64 = ax_left.iter().map(|&u| (flow[self.idx(u)] - mean).abs()).sum();
            let mu = mean + 4.0 * l / split_count as f64;
            let threshold = mean + 6.0 * l / split_count as f64;

            ax_left.clear();
            ax_right.clear();
            for &u in &split {
                let f = flow[self.idx(u)];
                if f < mu {
                    ax_right.push(u);
                } else if f >= threshold {
                    ax_left.push(u);
                }
            }
            ax_right.reverse();
        }

        assert!(!ax_left.is_empty(), "left side of the proposed cut cannot be empty");

        if self.params.balanced_cut_strategy {
            while ax_right.len() > ax_left.len() {
                ax_right.pop();
            }
            assert_eq!(ax_left.len(), ax_right.len(), "proposed cut should be perfectly balanced");
        } else {
            // If the original left was larger the sides were swapped above
            // and the drops must come from the low-flow tail.
            if left_larger {
                ax_left.reverse();
            }
            while ax_left.len() * 8 > split_count {
                ax_left.pop();
            }
            assert!(ax_left.len() <= ax_right.len(), "left side of the cut cannot be larger");
        }

        (ax_left, ax_right)
    }

    pub fn compute(mut self) -> CutResult {
        let mut result = CutResult::default();
        if self.num_split_nodes <= 1 {
            trace!(split_nodes = self.num_split_nodes, "cut-matching exited early");
            result.a = self.graph.vertices().collect();
            return result;
        }

        let lower_volume_balance = self.num_split_nodes / 10 / self.t as usize;
        let global_volume = self.subdiv_graph.global_volume(self.subdiv_graph.vertices());
        let target_volume_balance = lower_volume_balance.max((self.params.min_balance * global_volume as f64) as usize);

        let mut rounds: Vec<Matching> = Vec::new();
        let mut flow = self.random_unit_vector();

        let round_budget = self.t.max(self.params.min_iterations);
        let mut iterations = 0;
        while iterations < round_budget && self.removed_subdivision_volume() <= target_volume_balance {
            if self.alive_split_count() <= 1 {
                break;
            }
            trace!(iteration = iterations, budget = round_budget, "cut-matching round");

            if self.params.sample_potential {
                let potential = self.sample_potential();
                result.sampled_potentials.push(potential);
            }

            if self.params.resample_unit_vector {
                flow = self.random_unit_vector();
                for _ in 0..self.params.random_walk_steps {
                    project_flow(&rounds, &mut flow);
                }
            }

            let (mut ax_left, mut ax_right) = self.propose_cut(&flow);

            self.subdiv_graph.reset();
            for &u in &ax_left {
                self.subdiv_graph.add_source(u, 1);
            }
            for &u in &ax_right {
                self.subdiv_graph.add_sink(u, 1);
            }

            let split_count = self.alive_split_count() as f64;
            let height = ((1.0 / self.phi / split_count.log10()).ceil() as usize)
                .max(split_count.log10().ceil() as usize);
            trace!(sources = ax_left.len(), sinks = ax_right.len(), height, "routing flow");
            let has_excess = self.subdiv_graph.compute(height);

            let mut removed_flag = vec![false; self.subdiv_graph.vertex_bound()];
            let mut removed: Vec<Vertex> = Vec::new();
            if !has_excess.is_empty() {
                let level_cut = self.subdiv_graph.level_cut(height);
                trace!(excess = has_excess.len(), level_cut = level_cut.len(), "removing level cut");
                for u in level_cut {
                    removed_flag[u.index()] = true;
                    removed.push(u);
                }
                for &u in &removed {
                    if self.subdiv_idx[u.index()].is_none() {
                        self.graph.remove(u);
                    }
                    self.subdiv_graph.remove(u);
                }
            }

            // Cascade: vertices that lost their last alive edge go too.
            loop {
                let zero_degree: Vec<Vertex> =
                    self.subdiv_graph.vertices().filter(|&u| self.subdiv_graph.degree(u) == 0).collect();
                if zero_degree.is_empty() {
                    break;
                }
                for u in zero_degree {
                    removed_flag[u.index()] = true;
                    removed.push(u);
                    if self.subdiv_idx[u.index()].is_none() {
                        self.graph.remove(u);
                    }
                    self.subdiv_graph.remove(u);
                }
            }

            if !removed.is_empty() {
                ax_left.retain(|u| !removed_flag[u.index()]);
                ax_right.retain(|u| !removed_flag[u.index()]);
                if self.params.resample_unit_vector {
                    for round in &mut rounds {
                        round.retain(|&(i, j)| {
                            !removed_flag[self.from_subdiv_idx[i as usize].index()]
                                && !removed_flag[self.from_subdiv_idx[j as usize].index()]
                        });
                    }
                }
            }

            let matching = self.subdiv_graph.matching(&ax_left, MatchingMethod::Dfs, &mut *self.rng);
            if matching.len() < ax_left.len() {
                // A source whose routed unit ended up behind the level cut
                // stays unmatched this round.
                trace!(matched = matching.len(), sources = ax_left.len(), "partially matched round");
            }

            for &(u, v) in &matching {
                let ui = self.idx(u);
                let vi = self.idx(v);
                let avg = 0.5 * (flow[ui] + flow[vi]);
                flow[ui] = avg;
                flow[vi] = avg;

                if self.params.sample_potential {
                    for w in 0..self.num_split_nodes {
                        let avg = 0.5 * (self.flow_matrix[ui][w] + self.flow_matrix[vi][w]);
                        self.flow_matrix[ui][w] = avg;
                        self.flow_matrix[vi][w] = avg;
                    }
                }
            }

            if self.params.resample_unit_vector {
                rounds.push(matching.iter().map(|&(u, v)| (self.idx(u) as u32, self.idx(v) as u32)).collect());
            }

            iterations += 1;
        }

        result.iterations = iterations;
        result.congestion = 1;
        for u in self.subdiv_graph.vertices() {
            for e in self.subdiv_graph.edges(u) {
                result.congestion = result.congestion.max(e.data.congestion * iterations as Flow);
            }
        }

        if self.params.sample_potential {
            let potential = self.sample_potential();
            result.sampled_potentials.push(potential);
        }

        let alive = self.graph.size();
        let removed = self.graph.removed_vertices().len();
        result.kind = if alive != 0 && removed != 0 && self.removed_subdivision_volume() > lower_volume_balance {
            ResultKind::Balanced
        } else if removed == 0 {
            ResultKind::Expander
        } else if alive == 0 {
            // Everything was shaved; undo and certify the whole subset.
            self.graph.restore_removes();
            ResultKind::Expander
        } else {
            ResultKind::NearExpander
        };

        result.a = self.graph.vertices().collect();
        result.r = self.graph.removed_vertices().to_vec();

        match result.kind {
            ResultKind::Balanced => {
                debug!(iterations, alive = result.a.len(), removed = result.r.len(), "balanced cut")
            }
            ResultKind::Expander => debug!(iterations, congestion = result.congestion, "expander"),
            ResultKind::NearExpander => debug!(iterations, alive = result.a.len(), "near-expander"),
        }

        result
    }
}
