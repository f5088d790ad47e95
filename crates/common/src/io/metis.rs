use petgraph::graph::{NodeIndex, UnGraph};
use std::fs::File;
use std::io::BufRead;
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadMetisError {
    #[error("missing header")]
    MissingHeader,
    #[error("invalid header (expected '(n) (m)', got {0})")]
    WrongHeader(String),
    #[error("found zero index (indices must be at least 1)")]
    ZeroIndex,
    #[error("more adjacency lines than vertices")]
    TooManyLines,
    #[error("parse int error")]
    ParseInt(#[from] ParseIntError),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}

/// Reads the unweighted subset of the metis graph format: a `(n) (m)` header
/// followed by one adjacency line per vertex with 1-indexed neighbors.
/// Comment lines start with `%`. Each undirected edge appears in both
/// endpoint lines; only the `u < v` occurrence creates an edge.
pub fn read_metis<P>(path: P) -> Result<UnGraph<(), ()>, ReadMetisError>
where
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    let mut lines = std::io::BufReader::new(file).lines();

    let header = loop {
        let line = lines.next().ok_or(ReadMetisError::MissingHeader)??;
        if !line.starts_with('%') {
            break line;
        }
    };
    let (n, m) = {
        let err = || ReadMetisError::WrongHeader(header.clone());
        let mut tokens = header.split_ascii_whitespace();
        let n: usize = tokens.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let m: usize = tokens.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        (n, m)
    };

    let mut graph = UnGraph::with_capacity(n, m);
    for _ in 0..n {
        graph.add_node(());
    }

    let mut u = 0;
    for line in lines {
        let line = line?;
        if line.starts_with('%') {
            continue;
        }
        if u >= n {
            if line.trim().is_empty() {
                continue;
            }
            return Err(ReadMetisError::TooManyLines);
        }
        for token in line.split_ascii_whitespace() {
            let v: usize = token.parse()?;
            if v == 0 {
                return Err(ReadMetisError::ZeroIndex);
            }
            if u < v - 1 {
                graph.add_edge(NodeIndex::new(u), NodeIndex::new(v - 1), ());
            }
        }
        u += 1;
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn triangle() {
        let mut path = std::env::temp_dir();
        path.push(format!("metis_test_{}", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(b"% a triangle\n3 3\n2 3\n1 3\n1 2\n").unwrap();
        drop(file);

        let graph = read_metis(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
    }
}
