use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use petgraph::graph::UnGraph;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use common::io::{read_edge_list, read_metis, GraphFileType};
use expander_decomposition::{expander_decomposition, Parameters};

/// Expander decomposition via the cut-matching game.
///
/// Writes one line per cluster to stdout, the space-separated vertices of
/// that cluster.
#[derive(Debug, Parser)]
#[command(name = "edc")]
struct Cli {
    /// Input graph file.
    input: PathBuf,
    #[arg(long, value_enum, default_value_t = GraphFileType::EdgeList)]
    input_type: GraphFileType,
    /// Conductance parameter in (0, 1).
    #[arg(long)]
    phi: f64,
    /// `t1` in the round count `T = t1 + ceil(t2 * log10(m)^2)`.
    #[arg(long = "t1", default_value_t = 22)]
    t_const: u32,
    /// `t2` in the round count `T = t1 + ceil(t2 * log10(m)^2)`.
    #[arg(long = "t2", default_value_t = 5.0)]
    t_factor: f64,
    /// Force at least this many cut-matching rounds.
    #[arg(long, default_value_t = 0)]
    min_iterations: u32,
    /// Volume balance in [0, 0.5] to reach before stopping with a sparse
    /// cut.
    #[arg(long, default_value_t = 0.0)]
    min_balance: f64,
    /// Propose perfectly balanced cuts.
    #[arg(long = "balanced-cut")]
    balanced_cut: bool,
    /// Sample the potential function every round (O(m^2) memory).
    #[arg(long)]
    sample_potential: bool,
    /// Redraw the random unit vector every round.
    #[arg(long)]
    resample_unit_vector: bool,
    /// Projection steps per round under --resample-unit-vector.
    #[arg(long, default_value_t = 1)]
    random_walk_steps: u32,
    /// Seed for the random generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long)]
    log_level: Option<Level>,
}

fn read_graph(cli: &Cli) -> Result<UnGraph<(), ()>, Box<dyn std::error::Error>> {
    Ok(match cli.input_type {
        GraphFileType::EdgeList => read_edge_list(&cli.input)?,
        GraphFileType::Metis => read_metis(&cli.input)?,
    })
}

fn write_partitions(partitions: &[Vec<petgraph::graph::NodeIndex>]) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for partition in partitions {
        let mut first = true;
        for u in partition {
            if first {
                first = false;
            } else {
                write!(out, " ")?;
            }
            write!(out, "{}", u.index())?;
        }
        writeln!(out)?;
    }
    out.flush()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(level) = cli.log_level {
        FmtSubscriber::builder().with_max_level(level).init();
    }

    let graph = match read_graph(&cli) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("edc: {err}");
            return ExitCode::from(1);
        }
    };

    let params = Parameters {
        t_const: cli.t_const,
        t_factor: cli.t_factor,
        min_iterations: cli.min_iterations,
        min_balance: cli.min_balance,
        sample_potential: cli.sample_potential,
        balanced_cut_strategy: cli.balanced_cut,
        resample_unit_vector: cli.resample_unit_vector,
        random_walk_steps: cli.random_walk_steps,
    };

    let partitions = match expander_decomposition(&graph, cli.phi, params, cli.seed) {
        Ok(partitions) => partitions,
        Err(err) => {
            eprintln!("edc: {err}");
            return ExitCode::from(2);
        }
    };

    match write_partitions(&partitions) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("edc: {err}");
            ExitCode::from(1)
        }
    }
}
