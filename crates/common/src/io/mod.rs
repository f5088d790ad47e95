mod edge_list;
mod metis;

use clap::ValueEnum;
pub use edge_list::{read_edge_list, ReadEdgeListError};
pub use metis::{read_metis, ReadMetisError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum GraphFileType {
    EdgeList,
    Metis,
}
