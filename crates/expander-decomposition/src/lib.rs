//! Expander decomposition of simple, undirected graphs.
//!
//! Given a conductance parameter `phi` in `(0, 1)`, the decomposition
//! partitions the vertex set into clusters V₁, …, Vₖ such that every induced
//! subgraph G\[Vᵢ\] is a `phi`-expander while only `O(phi · m · log² m)`
//! edges run between clusters. Cuts are found by the cut-matching game of
//! Räcke, Shah, and Täubig, played with a height-bounded unit-flow
//! push-relabel engine on the subdivision graph; near-expanders are repaired
//! by trimming.
//!
//! # Examples
//!
//! ```rust
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use expander_decomposition::{expander_decomposition, Parameters};
//! use petgraph::graph::UnGraph;
//!
//! // a complete graph is an expander; nothing gets cut
//! let graph = UnGraph::<(), ()>::from_edges([(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
//! let partitions = expander_decomposition(&graph, 0.01, Parameters::default(), 0)?;
//!
//! assert_eq!(partitions.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! Runs are deterministic for a fixed seed; the randomness of the cut player
//! flows through an injected generator.
//!
//! # References
//! + \[RST14\]: Harald Räcke, Chintan Shah, and Hanjo Täubig. "Computing
//!   Cut-Based Hierarchical Decompositions in Almost Linear Time".
//! + \[SW19\]: Thatchaphol Saranurak and Di Wang. "Expander Decomposition and
//!   Pruning: Faster, Stronger, and Simpler".

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unreachable_pub)]

pub mod cut_matching;
pub mod decomposition;
pub mod graph;
pub mod trimming;
mod util;

pub use cut_matching::{CutResult, Parameters, ResultKind};
pub use decomposition::{expander_decomposition, InvalidParameterError, PartitionId, Solver};
