use petgraph::graph::{NodeIndex, UnGraph};
use std::fs::File;
use std::io::BufRead;
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadEdgeListError {
    #[error("missing header")]
    MissingHeader,
    #[error("invalid header (expected '(n) (m)', got {0})")]
    WrongHeader(String),
    #[error("invalid line (got {0})")]
    InvalidLine(String),
    #[error("vertex {vertex} out of range (n = {n})")]
    VertexOutOfRange { vertex: usize, n: usize },
    #[error("wrong number of edges (expected {expected}, got {actual})")]
    WrongM { expected: usize, actual: usize },
    #[error("parse int error")]
    ParseInt(#[from] ParseIntError),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}

/// Reads an edge-list file with a `(n) (m)` header followed by `m` lines
/// `(u) (v)` with 0-indexed endpoints.
///
/// Self-loops and duplicate edges are allowed in the file; consumers drop
/// them when building their working graphs.
pub fn read_edge_list<P>(path: P) -> Result<UnGraph<(), ()>, ReadEdgeListError>
where
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    let mut lines = std::io::BufReader::new(file).lines();

    let header = lines.next().ok_or(ReadEdgeListError::MissingHeader)??;
    let (n, m) = {
        let err = || ReadEdgeListError::WrongHeader(header.clone());
        let mut tokens = header.split_ascii_whitespace();
        let n: usize = tokens.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let m: usize = tokens.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        if tokens.next().is_some() {
            return Err(err());
        }
        (n, m)
    };

    let mut graph = UnGraph::with_capacity(n, m);
    for _ in 0..n {
        graph.add_node(());
    }

    let mut edges = 0;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_ascii_whitespace();
        let (Some(a), Some(b), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(ReadEdgeListError::InvalidLine(line));
        };
        let u: usize = a.parse()?;
        let v: usize = b.parse()?;
        for w in [u, v] {
            if w >= n {
                return Err(ReadEdgeListError::VertexOutOfRange { vertex: w, n });
            }
        }
        graph.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
        edges += 1;
    }

    if edges != m {
        return Err(ReadEdgeListError::WrongM { expected: m, actual: edges });
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("edge_list_test_{}_{:?}", std::process::id(), std::thread::current().id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn small_graph() {
        let path = write_temp("4 3\n0 1\n1 2\n2 3\n");
        let graph = read_edge_list(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn missing_edges() {
        let path = write_temp("4 3\n0 1\n");
        let result = read_edge_list(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ReadEdgeListError::WrongM { expected: 3, actual: 1 })));
    }

    #[test]
    fn out_of_range_vertex() {
        let path = write_temp("2 1\n0 5\n");
        let result = read_edge_list(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ReadEdgeListError::VertexOutOfRange { vertex: 5, n: 2 })));
    }

    #[test]
    fn bad_header() {
        let path = write_temp("banana\n");
        let result = read_edge_list(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ReadEdgeListError::WrongHeader(_))));
    }
}
