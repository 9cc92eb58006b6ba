//! pullseq: line-oriented sequence tools
//!
//! Usage: pullseq <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use pullseq::io::buffers::output_buffer_size;
use pullseq::io::{lines_from_reader, read_lines, write_to};
use pullseq::{Result, SeqError, Sequence, ToLine};

#[derive(Parser)]
#[command(name = "pullseq")]
#[command(version)]
#[command(about = "pullseq: lazy line-oriented sequence tools", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Use smaller I/O buffers
    #[arg(long, global = true)]
    low_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a uniform random sample of k lines
    Sample {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Sample size
        #[arg(short = 'k', long)]
        size: usize,

        /// Seed for a reproducible sample
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Collapse runs of equal lines in sorted input
    Dedup {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Lines of sorted A that are absent from sorted B
    Diff {
        /// Sorted input A
        #[arg(short = 'a', long)]
        a: PathBuf,

        /// Sorted input B
        #[arg(short = 'b', long)]
        b: PathBuf,
    },

    /// Lines present in both sorted inputs
    Intersect {
        /// Sorted input A
        #[arg(short = 'a', long)]
        a: PathBuf,

        /// Sorted input B
        #[arg(short = 'b', long)]
        b: PathBuf,
    },

    /// Merge any number of sorted inputs into one sorted stream
    Merge {
        /// Sorted input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Group consecutive lines into windows, one window per output line
    Window {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Window size
        #[arg(short = 'n', long, default_value = "2")]
        size: usize,

        /// Slide by one line instead of emitting disjoint chunks
        #[arg(long)]
        overlap: bool,

        /// Drop the trailing short windows
        #[arg(long)]
        strict: bool,

        /// Separator between window members
        #[arg(long, default_value = "\t")]
        separator: String,
    },

    /// Stream lines through a shell command
    Pipe {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Shell command, run with `sh -c`
        #[arg(short, long)]
        command: String,

        /// Print the command's exit status to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.low_memory {
        pullseq::config::set_low_memory(true);
    }

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Sample { input, size, seed } => run_sample(input, size, seed),
        Commands::Dedup { input } => open_input(input.as_deref())
            .and_then(|lines| emit(lines.dedup_sorted())),
        Commands::Diff { a, b } => {
            open_pair(&a, &b).and_then(|(a, b)| emit(a.diff_sorted(b)))
        }
        Commands::Intersect { a, b } => {
            open_pair(&a, &b).and_then(|(a, b)| emit(a.intersect_sorted(b)))
        }
        Commands::Merge { inputs } => run_merge(&inputs),
        Commands::Window {
            input,
            size,
            overlap,
            strict,
            separator,
        } => run_window(input, size, overlap, strict, separator),
        Commands::Pipe {
            input,
            command,
            stats,
        } => run_pipe(input, &command, stats),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Lines of `path`, or of stdin when `path` is absent or `-`.
fn open_input(path: Option<&Path>) -> Result<Sequence<String>> {
    match path {
        Some(p) if p.to_string_lossy() != "-" => read_lines(p),
        _ => Ok(lines_from_reader(io::stdin(), "stdin")),
    }
}

fn open_pair(a: &Path, b: &Path) -> Result<(Sequence<String>, Sequence<String>)> {
    let a = read_lines(a)?;
    let b = read_lines(b)?;
    Ok((a, b))
}

fn emit<T: ToLine + Send + 'static>(mut lines: Sequence<T>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(output_buffer_size(), stdout.lock());
    write_to(&mut lines, &mut out)?;
    out.flush()?;
    Ok(())
}

fn run_sample(input: Option<PathBuf>, size: usize, seed: Option<u64>) -> Result<()> {
    let lines = open_input(input.as_deref())?;
    let sample = match seed {
        Some(seed) => lines.sample_with_rng(size, &mut SmallRng::seed_from_u64(seed)),
        None => lines.sample(size),
    };
    emit(Sequence::from_vec(sample))
}

fn run_merge(inputs: &[PathBuf]) -> Result<()> {
    let mut sources = inputs
        .iter()
        .map(read_lines)
        .collect::<Result<Vec<_>>>()?;
    if sources.is_empty() {
        return Err(SeqError::InvalidArgument("no inputs to merge".to_string()));
    }
    let first = sources.remove(0);
    emit(first.merge_sorted(sources))
}

fn run_window(
    input: Option<PathBuf>,
    size: usize,
    overlap: bool,
    strict: bool,
    separator: String,
) -> Result<()> {
    if size == 0 {
        return Err(SeqError::InvalidArgument(
            "window size must be greater than zero".to_string(),
        ));
    }
    let lines = open_input(input.as_deref())?;
    let windows = match (overlap, strict) {
        (true, true) => lines.overlapping_window_with_strict_length(size),
        (true, false) => lines.overlapping_window(size),
        (false, true) => lines.non_overlapping_window_with_strict_length(size),
        (false, false) => lines.non_overlapping_window(size),
    };
    emit(windows.map(move |window| window.join(separator.as_str())))
}

fn run_pipe(input: Option<PathBuf>, command: &str, stats: bool) -> Result<()> {
    let lines = open_input(input.as_deref())?;
    let (output, monitor) = lines.pipe_monitored(command)?;
    emit(output)?;

    if stats {
        match monitor.exit_status() {
            Some(status) => eprintln!("{} (pid {}): {}", monitor.command(), monitor.pid(), status),
            None => eprintln!("{} (pid {}): still running", monitor.command(), monitor.pid()),
        }
    }
    Ok(())
}
