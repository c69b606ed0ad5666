//! Command-line interface for lattice reduction algorithms

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;

use lattice_reducer::utils::file_io::{format_basis_brackets, format_basis_json, load_bracket_basis};
use lattice_reducer::{
    features, progressive_reduce_with, reduce_variant, BKZParams, BKZReducer, LLLParams,
    LLLVariant, MLLLReducer, Matrix, NativeBkz, ProgressiveParams, ProgressiveSession, Real,
};

/// Lattice basis reduction CLI
#[derive(Parser, Debug)]
#[clap(name = "lattice_reducer")]
#[clap(about = "LLL, DeepLLL, MLLL, BKZ and DeepBKZ lattice basis reduction")]
#[clap(version)]
struct Args {
    /// Input file containing the basis as bracketed rows
    #[clap(short, long)]
    input: PathBuf,

    /// Number of rows to read
    #[clap(long)]
    dim: usize,

    /// Number of columns to read (defaults to --dim)
    #[clap(long)]
    cols: Option<usize>,

    /// Output file for the reduced basis (stdout if omitted)
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[clap(long, value_enum, default_value = "plain")]
    format: OutputFormat,

    /// Algorithm to use
    #[clap(subcommand)]
    command: Commands,

    /// Log progress at info level from inside the reducers
    #[clap(short, long)]
    verbose: bool,

    /// Set logging level (error, warn, info, debug, trace)
    #[clap(long, default_value = "info")]
    log_level: String,

    /// Use 256-bit MPFR floats for Gram-Schmidt data
    #[clap(long)]
    high_precision: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// LLL reduction
    Lll {
        /// Lovász parameter (0.25 < delta < 1)
        #[clap(long, default_value = "0.99")]
        delta: f64,
    },
    /// DeepLLL reduction
    DeepLll {
        #[clap(long, default_value = "0.99")]
        delta: f64,
    },
    /// MLLL on a possibly dependent generating set
    Mlll {
        #[clap(long, default_value = "0.99")]
        delta: f64,
    },
    /// BKZ reduction
    Bkz {
        /// Block size
        #[clap(long, default_value = "20")]
        beta: usize,
        #[clap(long, default_value = "0.99")]
        delta: f64,
    },
    /// DeepBKZ reduction
    DeepBkz {
        #[clap(long, default_value = "20")]
        beta: usize,
        #[clap(long, default_value = "0.99")]
        delta: f64,
    },
    /// Randomized progressive DeepBKZ
    Progressive {
        /// JSON file with progressive parameters
        #[clap(long)]
        config: Option<PathBuf>,
        #[clap(long)]
        start_beta: Option<usize>,
        #[clap(long)]
        max_beta: Option<usize>,
        #[clap(long)]
        delta: Option<f64>,
        /// Stop once ||b_0|| reaches this length
        #[clap(long)]
        target_norm: Option<f64>,
        #[clap(long)]
        max_retries: Option<usize>,
        #[clap(long)]
        seed: Option<u64>,
        /// Prefix for state snapshot files
        #[clap(long)]
        snapshot_prefix: Option<String>,
        /// Skip the preprocessing BKZ pass
        #[clap(long)]
        no_preprocess: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OutputFormat {
    Plain,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(&args);

    let compile_time_hp = features::high_precision_enabled();
    if args.high_precision && !compile_time_hp {
        log::warn!("--high-precision requested but binary lacks the 'high-precision' feature; using f64");
    }

    let cols = args.cols.unwrap_or(args.dim);
    let mut basis = load_bracket_basis(&args.input, args.dim, cols)?;
    log::info!("Loaded {}x{} basis from {}", args.dim, cols, args.input.display());

    let start = Instant::now();
    run(&args, &mut basis)?;
    log::info!(
        "{:?} finished in {:.2?}, ||b_0||^2 = {}",
        args.command,
        start.elapsed(),
        basis.row_norm_squared(0)
    );

    write_output(&args, &basis)
}

fn run(args: &Args, basis: &mut Matrix) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "high-precision")]
    if args.high_precision {
        return run_with::<lattice_reducer::BigFloat<256>>(args, basis);
    }
    run_with::<f64>(args, basis)
}

fn run_with<R: Real>(args: &Args, basis: &mut Matrix) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("Gram-Schmidt backend: {}", R::name());
    let lll_params = |delta: f64| {
        let mut params = LLLParams::new(delta);
        params.algorithm_params.verbose = args.verbose;
        params
    };
    let bkz_params = |beta: usize, delta: f64| {
        let mut params = BKZParams::new(beta).with_delta(delta);
        params.algorithm_params.verbose = args.verbose;
        params
    };

    match &args.command {
        Commands::Lll { delta } => {
            let stats = reduce_variant::<R>(LLLVariant::Standard, &lll_params(*delta), basis)?;
            log::info!("LLL: {} swaps", stats.swaps);
        }
        Commands::DeepLll { delta } => {
            let stats = reduce_variant::<R>(LLLVariant::Deep, &lll_params(*delta), basis)?;
            log::info!("DeepLLL: {} insertions", stats.swaps);
        }
        Commands::Mlll { delta } => {
            let outcome = MLLLReducer::with_params(lll_params(*delta)).reduce_with::<R>(basis)?;
            log::info!("MLLL: rank {}", outcome.rank);
        }
        Commands::Bkz { beta, delta } => {
            let stats = BKZReducer::with_params(bkz_params(*beta, *delta)).reduce_with::<R>(basis)?;
            log::info!("BKZ-{}: {} tours, {} improvements", beta, stats.tours, stats.improvements);
        }
        Commands::DeepBkz { beta, delta } => {
            let stats = BKZReducer::deep(bkz_params(*beta, *delta)).reduce_with::<R>(basis)?;
            log::info!("DeepBKZ-{}: {} tours, {} improvements", beta, stats.tours, stats.improvements);
        }
        Commands::Progressive {
            config,
            start_beta,
            max_beta,
            delta,
            target_norm,
            max_retries,
            seed,
            snapshot_prefix,
            no_preprocess,
        } => {
            let mut params: ProgressiveParams = match config {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                None => ProgressiveParams::default(),
            };
            if let Some(v) = start_beta {
                params.start_beta = *v;
            }
            if let Some(v) = max_beta {
                params.max_beta = *v;
            }
            if let Some(v) = delta {
                params.delta = *v;
            }
            if target_norm.is_some() {
                params.target_norm = *target_norm;
            }
            if let Some(v) = max_retries {
                params.max_retries = *v;
            }
            if seed.is_some() {
                params.seed = *seed;
            }
            if snapshot_prefix.is_some() {
                params.snapshot_prefix = snapshot_prefix.clone();
            }
            if *no_preprocess {
                params.preprocess = false;
            }
            params.algorithm_params.verbose = args.verbose;

            let backend = NativeBkz {
                deep: false,
                high_precision: args.high_precision,
                algorithm_params: params.algorithm_params.clone(),
            };
            let mut session = ProgressiveSession::new();
            let report = progressive_reduce_with::<R>(basis, &params, &mut session, Some(&backend))?;
            log::info!(
                "Progressive: {} phases, best ||b_0||^2 = {}, target reached: {}",
                report.phases.len(),
                report.best_norm_squared,
                report.target_reached
            );
        }
    }
    Ok(())
}

fn write_output(args: &Args, basis: &Matrix) -> Result<(), Box<dyn std::error::Error>> {
    let text = match args.format {
        OutputFormat::Plain => format_basis_brackets(basis),
        OutputFormat::Json => format_basis_json(basis)?,
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, text)?;
            log::info!("Wrote reduced basis to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn setup_logging(args: &Args) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level_filter = match args.log_level.as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    Builder::from_default_env().filter_level(level_filter).init();
}
