//! An adjacency-list graph over a fixed vertex set supporting reversible
//! `remove` and a stack of `subgraph` restrictions.
//!
//! Removed and excluded vertices stay in memory. Each adjacency list is kept
//! partitioned so that half-edges leading to hidden neighbors sit beyond a
//! per-vertex `degree` watermark, and every mutation pushes an undo record so
//! that `restore_removes`/`restore_subgraph` rebuild the previous state
//! exactly, including half-edge order.

use crate::graph::Vertex;

/// A half-edge. Each undirected edge is represented once in the adjacency
/// list of either endpoint; `rev` is the position of the twin half-edge in
/// `to`'s list.
#[derive(Clone, Debug)]
pub struct Edge<E> {
    pub from: Vertex,
    pub to: Vertex,
    rev: u32,
    pub data: E,
}

impl<E> Edge<E> {
    /// Position of the twin half-edge in `to`'s adjacency list.
    pub fn rev_idx(&self) -> usize {
        self.rev as usize
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Status {
    Alive,
    Removed,
    Excluded,
}

/// Undo record for one `remove` or one subgraph exclusion. The positions of
/// the neighbors' twin half-edges before their watermark swaps live in a
/// separate flat stack, `prev_degree` entries per record.
#[derive(Clone, Debug)]
struct UndoRecord {
    vertex: Vertex,
    prev_degree: u32,
    alive_pos: u32,
}

#[derive(Clone, Debug)]
struct Frame {
    remove_mark: usize,
    exclude_mark: usize,
}

/// Undirected graph over vertices `0..n` with per-vertex payload `V` and
/// per-half-edge payload `E`.
#[derive(Clone, Debug)]
pub struct SubsetGraph<V, E> {
    adj: Vec<Vec<Edge<E>>>,
    data: Vec<V>,
    degree: Vec<u32>,
    status: Vec<Status>,
    alive: Vec<Vertex>,
    alive_pos: Vec<u32>,
    removed: Vec<Vertex>,
    excluded: Vec<Vertex>,
    remove_log: Vec<UndoRecord>,
    remove_slots: Vec<u32>,
    exclude_log: Vec<UndoRecord>,
    exclude_slots: Vec<u32>,
    frames: Vec<Frame>,
    mark: Vec<bool>,
}

/// A plain subset graph without flow annotations.
pub type UndirectedGraph = SubsetGraph<(), ()>;

impl UndirectedGraph {
    pub fn new(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut graph = Self::with_vertices(n);
        for &(u, v) in edges {
            graph.add_edge(Vertex::new(u), Vertex::new(v));
        }
        graph
    }

    pub fn add_edge(&mut self, u: Vertex, v: Vertex) {
        self.add_edge_with(u, v, (), ());
    }
}

impl<V: Default, E> SubsetGraph<V, E> {
    pub fn with_vertices(n: usize) -> Self {
        Self {
            adj: (0..n).map(|_| Vec::new()).collect(),
            data: (0..n).map(|_| V::default()).collect(),
            degree: vec![0; n],
            status: vec![Status::Alive; n],
            alive: (0..n).map(Vertex::new).collect(),
            alive_pos: (0..n).map(|i| i as u32).collect(),
            removed: Vec::new(),
            excluded: Vec::new(),
            remove_log: Vec::new(),
            remove_slots: Vec::new(),
            exclude_log: Vec::new(),
            exclude_slots: Vec::new(),
            frames: Vec::new(),
            mark: vec![false; n],
        }
    }
}

impl<V, E> SubsetGraph<V, E> {
    /// Appends the two half-edges of an undirected edge. Self-loops are
    /// dropped. Only valid while both endpoints are alive and unrestricted.
    pub fn add_edge_with(&mut self, u: Vertex, v: Vertex, uv: E, vu: E) {
        if u == v {
            return;
        }
        debug_assert_eq!(self.status[u.index()], Status::Alive);
        debug_assert_eq!(self.status[v.index()], Status::Alive);
        let u_pos = self.adj[u.index()].len();
        let v_pos = self.adj[v.index()].len();
        self.adj[u.index()].push(Edge { from: u, to: v, rev: v_pos as u32, data: uv });
        self.adj[v.index()].push(Edge { from: v, to: u, rev: u_pos as u32, data: vu });
        self.degree[u.index()] += 1;
        self.degree[v.index()] += 1;
    }

    /// Number of alive vertices.
    pub fn size(&self) -> usize {
        self.alive.len()
    }

    /// Total number of vertices, including hidden ones.
    pub fn vertex_bound(&self) -> usize {
        self.adj.len()
    }

    pub fn is_alive(&self, u: Vertex) -> bool {
        self.status[u.index()] == Status::Alive
    }

    pub fn is_removed(&self, u: Vertex) -> bool {
        self.status[u.index()] == Status::Removed
    }

    /// Alive vertices in internal order.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.alive.iter().copied()
    }

    /// The alive vertex at position `i` of the internal order.
    #[inline]
    pub fn alive_at(&self, i: usize) -> Vertex {
        self.alive[i]
    }

    /// Vertices removed since the innermost `subgraph` call, in removal order.
    pub fn removed_vertices(&self) -> &[Vertex] {
        let mark = self.frames.last().map_or(0, |f| f.remove_mark);
        &self.removed[mark..]
    }

    /// Number of half-edges from `u` to alive neighbors.
    #[inline]
    pub fn degree(&self, u: Vertex) -> usize {
        self.degree[u.index()] as usize
    }

    /// Degree of `u` in the unrestricted graph.
    #[inline]
    pub fn global_degree(&self, u: Vertex) -> usize {
        self.adj[u.index()].len()
    }

    /// Half-edges from `u` to alive neighbors.
    pub fn edges(&self, u: Vertex) -> impl Iterator<Item = &Edge<E>> {
        self.adj[u.index()][..self.degree(u)].iter()
    }

    #[inline]
    pub fn edge(&self, u: Vertex, i: usize) -> &Edge<E> {
        &self.adj[u.index()][i]
    }

    #[inline]
    pub fn edge_data_mut(&mut self, u: Vertex, i: usize) -> &mut E {
        &mut self.adj[u.index()][i].data
    }

    /// The twin of the half-edge at position `i` of `u`'s list.
    pub fn reverse(&self, u: Vertex, i: usize) -> &Edge<E> {
        let e = self.edge(u, i);
        self.edge(e.to, e.rev_idx())
    }

    pub fn vertex(&self, u: Vertex) -> &V {
        &self.data[u.index()]
    }

    pub fn vertex_mut(&mut self, u: Vertex) -> &mut V {
        &mut self.data[u.index()]
    }

    /// Sum of alive degrees over `vertices`.
    pub fn volume<I: IntoIterator<Item = Vertex>>(&self, vertices: I) -> usize {
        vertices.into_iter().map(|u| self.degree(u)).sum()
    }

    /// Sum of unrestricted degrees over `vertices`.
    pub fn global_volume<I: IntoIterator<Item = Vertex>>(&self, vertices: I) -> usize {
        vertices.into_iter().map(|u| self.global_degree(u)).sum()
    }

    /// Number of alive edges.
    pub fn edge_count(&self) -> usize {
        self.volume(self.vertices()) / 2
    }

    /// Number of edges in the unrestricted graph.
    pub fn global_edge_count(&self) -> usize {
        self.adj.iter().map(Vec::len).sum::<usize>() / 2
    }

    fn fix_twin(&mut self, u: Vertex, pos: usize) {
        let (to, rev) = {
            let e = &self.adj[u.index()][pos];
            (e.to, e.rev_idx())
        };
        self.adj[to.index()][rev].rev = pos as u32;
    }

    /// Swaps the half-edges at positions `a` and `b` of `u`'s list and
    /// repairs the twin positions.
    fn swap_half_edges(&mut self, u: Vertex, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.adj[u.index()].swap(a, b);
        self.fix_twin(u, a);
        self.fix_twin(u, b);
    }

    /// Hides `u`: drops it from the alive list and swaps each alive
    /// neighbor's twin half-edge behind that neighbor's watermark. The twin
    /// positions go onto the chosen slot stack for exact restoration.
    fn detach(&mut self, u: Vertex, exclude: bool) -> UndoRecord {
        debug_assert_eq!(self.status[u.index()], Status::Alive);
        let pos = self.alive_pos[u.index()] as usize;
        let last = self.alive.len() - 1;
        let moved = self.alive[last];
        self.alive[pos] = moved;
        self.alive_pos[moved.index()] = pos as u32;
        self.alive.pop();

        let d = self.degree(u);
        for i in 0..d {
            let (v, j) = {
                let e = &self.adj[u.index()][i];
                (e.to, e.rev_idx())
            };
            let v_last = self.degree(v) - 1;
            if exclude {
                self.exclude_slots.push(j as u32);
            } else {
                self.remove_slots.push(j as u32);
            }
            self.swap_half_edges(v, j, v_last);
            self.degree[v.index()] = v_last as u32;
        }
        self.degree[u.index()] = 0;
        UndoRecord { vertex: u, prev_degree: d as u32, alive_pos: pos as u32 }
    }

    /// Exact inverse of `detach`.
    fn reattach(&mut self, record: UndoRecord, exclude: bool) {
        let u = record.vertex;
        let d = record.prev_degree as usize;
        self.degree[u.index()] = record.prev_degree;
        for i in (0..d).rev() {
            let v = self.adj[u.index()][i].to;
            let j = if exclude { self.exclude_slots.pop() } else { self.remove_slots.pop() };
            let j = j.expect("slot stack must match the undo log") as usize;
            let v_deg = self.degree(v);
            self.swap_half_edges(v, j, v_deg);
            self.degree[v.index()] = (v_deg + 1) as u32;
        }

        let pos = record.alive_pos as usize;
        if pos == self.alive.len() {
            self.alive.push(u);
        } else {
            let moved = self.alive[pos];
            self.alive.push(moved);
            self.alive_pos[moved.index()] = self.alive.len() as u32 - 1;
            self.alive[pos] = u;
        }
        self.alive_pos[u.index()] = pos as u32;
        self.status[u.index()] = Status::Alive;
    }

    /// Marks `u` removed and hides its half-edges. O(deg u).
    pub fn remove(&mut self, u: Vertex) {
        let record = self.detach(u, false);
        self.remove_log.push(record);
        self.removed.push(u);
        self.status[u.index()] = Status::Removed;
    }

    fn undo_remove(&mut self) {
        let record = self.remove_log.pop().expect("no remove to undo");
        let u = self.removed.pop().expect("removed list must match the undo log");
        debug_assert_eq!(u, record.vertex);
        self.reattach(record, false);
    }

    /// Undoes all `remove`s performed since the innermost `subgraph` call,
    /// in reverse order.
    pub fn restore_removes(&mut self) {
        let mark = self.frames.last().map_or(0, |f| f.remove_mark);
        while self.remove_log.len() > mark {
            self.undo_remove();
        }
    }

    /// Pushes a restriction frame and hides every alive vertex not in
    /// `subset`.
    pub fn subgraph<I: IntoIterator<Item = Vertex>>(&mut self, subset: I) {
        for u in subset {
            if self.is_alive(u) {
                self.mark[u.index()] = true;
            }
        }
        let hide: Vec<Vertex> = self.alive.iter().copied().filter(|u| !self.mark[u.index()]).collect();
        self.frames.push(Frame { remove_mark: self.remove_log.len(), exclude_mark: self.exclude_log.len() });
        for &u in &hide {
            let record = self.detach(u, true);
            self.exclude_log.push(record);
            self.excluded.push(u);
            self.status[u.index()] = Status::Excluded;
        }
        for i in 0..self.alive.len() {
            let u = self.alive[i];
            self.mark[u.index()] = false;
        }
    }

    /// Pops one restriction frame: undoes the removes performed inside it,
    /// then reinstates the excluded vertices and their half-edges.
    pub fn restore_subgraph(&mut self) {
        self.restore_removes();
        let frame = self.frames.pop().expect("no subgraph frame to restore");
        while self.exclude_log.len() > frame.exclude_mark {
            let record = self.exclude_log.pop().expect("exclude log under mark");
            let u = self.excluded.pop().expect("excluded list must match the undo log");
            debug_assert_eq!(u, record.vertex);
            self.reattach(record, true);
        }
    }

    /// Connected components of the alive graph.
    pub fn connected_components(&self) -> Vec<Vec<Vertex>> {
        let mut visited = vec![false; self.vertex_bound()];
        let mut components = Vec::new();
        for &s in &self.alive {
            if visited[s.index()] {
                continue;
            }
            visited[s.index()] = true;
            let mut component = vec![s];
            let mut head = 0;
            while head < component.len() {
                let u = component[head];
                head += 1;
                for e in self.edges(u) {
                    if !visited[e.to.index()] {
                        visited[e.to.index()] = true;
                        component.push(e.to);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// The closed neighborhood of `subset` in the current view. On a
    /// subdivision graph this is `subset` together with the split vertices of
    /// its incident edges, the vertex set of the recursive subproblem.
    pub fn subdivision_vertices(&self, subset: &[Vertex]) -> Vec<Vertex> {
        let mut seen = vec![false; self.vertex_bound()];
        let mut result = Vec::new();
        for &u in subset {
            debug_assert!(self.is_alive(u));
            if !seen[u.index()] {
                seen[u.index()] = true;
                result.push(u);
            }
            for e in self.edges(u) {
                if !seen[e.to.index()] {
                    seen[e.to.index()] = true;
                    result.push(e.to);
                }
            }
        }
        result
    }
}
