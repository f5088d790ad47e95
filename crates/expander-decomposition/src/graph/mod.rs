//! Mutable graph structures with reversible vertex removal.

use common::make_index;

make_index!(pub Vertex);

pub mod subset_graph;
pub mod unit_flow;

pub use subset_graph::{Edge, SubsetGraph, UndirectedGraph};
pub use unit_flow::{Flow, FlowEdge, FlowVertex, MatchingMethod, UnitFlowGraph};
