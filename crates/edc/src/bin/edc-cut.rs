use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use petgraph::graph::UnGraph;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use common::io::{read_edge_list, read_metis, GraphFileType};
use expander_decomposition::graph::Vertex;
use expander_decomposition::{CutResult, Parameters, ResultKind, Solver};

/// Runs a single cut-matching game over the whole graph.
///
/// Prints the result kind with the number of rounds and the congestion,
/// followed by the two sides of the cut (each prefixed by its size), and the
/// sampled potentials when requested.
#[derive(Debug, Parser)]
#[command(name = "edc-cut")]
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

fn write_side(out: &mut impl Write, side: &[Vertex]) -> std::io::Result<()> {
    write!(out, "{}", side.len())?;
    for u in side {
        write!(out, " {}", u.index())?;
    }
    writeln!(out)
}

fn write_result(result: &CutResult) -> std::io::Result<()> {
    let kind = match result.kind {
        ResultKind::Balanced => "balanced_cut",
        ResultKind::Expander => "expander",
        ResultKind::NearExpander => "near_expander",
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "{} {} {}", kind, result.iterations, result.congestion)?;
    write_side(&mut out, &result.a)?;
    write_side(&mut out, &result.r)?;
    if !result.sampled_potentials.is_empty() {
        let mut first = true;
        for potential in &result.sampled_potentials {
            if first {
                first = false;
            } else {
                write!(out, " ")?;
            }
            write!(out, "{potential}")?;
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

    if !(0.0 < cli.phi && cli.phi < 1.0) {
        eprintln!("edc-cut: conductance must lie in (0, 1), got {}", cli.phi);
        return ExitCode::from(2);
    }
    if !(0.0..=0.5).contains(&cli.min_balance) {
        eprintln!("edc-cut: minimum balance must lie in [0, 0.5], got {}", cli.min_balance);
        return ExitCode::from(2);
    }

    let graph = match read_graph(&cli) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("edc-cut: {err}");
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

    let mut solver = Solver::new(&graph, cli.phi, params, cli.seed);
    let result = solver.cut();

    match write_result(&result) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("edc-cut: {err}");
            ExitCode::from(1)
        }
    }
}
