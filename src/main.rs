use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fusion_planner::stats::{self, Summary};
use fusion_planner::{
    AnalysisConfig, BucketedSamples, DepthCostModel, FitStrategy, FusionDepth, LatencyPredictor,
    PartitionConfig, Profile, Table, DEFAULT_MAX_TREE_LEAF_SIZE,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fusion-planner",
    about = "Latency planning for partition-fusion trees"
)]
struct Cli {
    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SkipArg {
    /// Leading cold-start entries to discard (default: FUSION_PLANNER_SKIP or 20).
    #[arg(long)]
    skip: Option<usize>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Rounds per leaf in the calibration profile.
    #[arg(long)]
    observed_delta_t: Option<f64>,
    /// Rounds per leaf in the trees being planned.
    #[arg(long)]
    target_delta_t: Option<f64>,
    /// Regress over every fusion bucket instead of the two endpoints.
    #[arg(long)]
    least_squares: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print parent, depth, and children count of every unit.
    Tree {
        /// Partition layout (single JSON object).
        layout: PathBuf,
    },
    /// Aggregate statistics over a profile.
    Stats {
        /// Newline-delimited JSON profile.
        profile: PathBuf,
        #[command(flatten)]
        skip: SkipArg,
        /// Time at which the last input became available, for stream latency.
        #[arg(long, default_value_t = 0.0)]
        syndrome_ready_time: f64,
    },
    /// Per-children-count duration table.
    Buckets {
        /// Newline-delimited JSON profile of a calibration tree.
        profile: PathBuf,
        #[command(flatten)]
        skip: SkipArg,
    },
    /// Fit the depth-cost model and print it as JSON.
    Fit {
        /// Calibration profile.
        profile: PathBuf,
        #[command(flatten)]
        skip: SkipArg,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Predict the latency of a candidate tree.
    Predict {
        /// Partition layout of the candidate tree.
        layout: PathBuf,
        /// Calibration profile to fit the model from.
        #[arg(long, required_unless_present = "table", conflicts_with = "table")]
        calibration: Option<PathBuf>,
        /// Saved `buckets` table to fit the model from.
        #[arg(long)]
        table: Option<PathBuf>,
        #[command(flatten)]
        skip: SkipArg,
        #[command(flatten)]
        model: ModelArgs,
        /// Seconds per measurement round.
        #[arg(long)]
        measurement_cycle: Option<f64>,
        /// Evaluate fusion time at this depth for every leaf.
        #[arg(long, conflicts_with = "max_tree_leaf_size")]
        fixed_depth: Option<f64>,
        /// Evaluate fusion time at the average depth of a balanced subtree of this size.
        #[arg(long, default_value_t = DEFAULT_MAX_TREE_LEAF_SIZE)]
        max_tree_leaf_size: usize,
        /// Evaluate fusion time at each leaf's own depth instead.
        #[arg(long, conflicts_with_all = ["fixed_depth", "max_tree_leaf_size"])]
        at_leaf_depth: bool,
        /// Print the full prediction as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AnalysisConfig::from_env();

    match cli.command {
        Commands::Tree { layout } => run_tree(&layout)?,
        Commands::Stats {
            profile,
            skip,
            syndrome_ready_time,
        } => {
            apply_skip(&mut config, &skip);
            run_stats(&profile, &config, syndrome_ready_time)?
        }
        Commands::Buckets { profile, skip } => {
            apply_skip(&mut config, &skip);
            run_buckets(&profile, &config)?
        }
        Commands::Fit {
            profile,
            skip,
            model,
        } => {
            apply_skip(&mut config, &skip);
            let strategy = apply_model_args(&mut config, &model);
            config.validate()?;
            let samples = load_samples(&profile, &config)?;
            let model = DepthCostModel::fit_with(
                &samples,
                config.observed_delta_t,
                config.target_delta_t,
                strategy,
            )
            .context("failed to fit depth-cost model")?;
            println!("{}", serde_json::to_string_pretty(&model)?);
        }
        Commands::Predict {
            layout,
            calibration,
            table,
            skip,
            model,
            measurement_cycle,
            fixed_depth,
            max_tree_leaf_size,
            at_leaf_depth,
            json,
        } => {
            apply_skip(&mut config, &skip);
            let strategy = apply_model_args(&mut config, &model);
            if let Some(cycle) = measurement_cycle {
                config.measurement_cycle = cycle;
            }
            config.validate()?;

            let model = match (calibration, table) {
                (Some(path), _) => {
                    let samples = load_samples(&path, &config)?;
                    DepthCostModel::fit_with(
                        &samples,
                        config.observed_delta_t,
                        config.target_delta_t,
                        strategy,
                    )
                }
                (None, Some(path)) => {
                    let table = Table::from_path(&path)
                        .with_context(|| format!("failed to read table {}", path.display()))?;
                    DepthCostModel::from_table(
                        &table,
                        config.observed_delta_t,
                        config.target_delta_t,
                        strategy,
                    )
                }
                (None, None) => anyhow::bail!("either --calibration or --table is required"),
            }
            .context("failed to fit depth-cost model")?;

            let fusion_depth = match fixed_depth {
                _ if at_leaf_depth => FusionDepth::AtLeafDepth,
                Some(depth) => FusionDepth::Fixed(depth),
                None => FusionDepth::balanced_subtree(max_tree_leaf_size),
            };

            let tree = load_tree(&layout)?;
            let prediction = LatencyPredictor::new(&model, config.measurement_cycle)
                .with_fusion_depth(fusion_depth)
                .predict(&tree, tree.partition_count())
                .context("latency prediction failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                println!("predicted_latency: {:.6e} s", prediction.predicted_latency);
                println!(
                    "bottleneck: leaf {} (reverse position {})",
                    prediction.bottleneck_unit, prediction.bottleneck
                );
                println!("tree_height: {}", tree.height());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "fusion_planner=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_skip(config: &mut AnalysisConfig, arg: &SkipArg) {
    if let Some(skip) = arg.skip {
        config.skip = skip;
    }
}

fn apply_model_args(config: &mut AnalysisConfig, args: &ModelArgs) -> FitStrategy {
    if let Some(observed) = args.observed_delta_t {
        config.observed_delta_t = observed;
    }
    if let Some(target) = args.target_delta_t {
        config.target_delta_t = target;
    }
    if args.least_squares {
        FitStrategy::LeastSquares
    } else {
        FitStrategy::Endpoints
    }
}

fn load_tree(path: &Path) -> Result<PartitionConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read layout {}", path.display()))?;
    PartitionConfig::from_json(&text)
        .with_context(|| format!("invalid partition layout in {}", path.display()))
}

fn load_profile(path: &Path, config: &AnalysisConfig) -> Result<Profile> {
    Profile::from_path(path, config.skip)
        .with_context(|| format!("failed to load profile {}", path.display()))
}

fn load_samples(path: &Path, config: &AnalysisConfig) -> Result<BucketedSamples> {
    let profile = load_profile(path, config)?;
    BucketedSamples::from_profile(&profile)
        .with_context(|| format!("failed to bucket unit durations from {}", path.display()))
}

fn run_tree(path: &Path) -> Result<()> {
    let tree = load_tree(path)?;
    println!(
        "partitions: {}  units: {}  height: {}  fingerprint: {}",
        tree.partition_count(),
        tree.unit_count(),
        tree.height(),
        tree.fingerprint().to_hex()
    );
    println!("unit\tparent\tdepth\tchildren_count\tspan");
    let depths = tree.depths();
    for unit in 0..tree.unit_count() {
        let parent = tree.parents()[unit].map_or_else(|| "-".to_string(), |p| p.to_string());
        let span = match tree.children(unit)? {
            Some((left, right)) => format!("fuse({left}, {right})"),
            None => tree.partitions()[unit].to_string(),
        };
        println!(
            "{unit}\t{parent}\t{}\t{}\t{span}",
            depths[unit],
            tree.children_counts()[unit]
        );
    }
    Ok(())
}

fn print_optional(label: &str, value: fusion_planner::Result<f64>) {
    match value {
        Ok(v) => println!("{label}: {v:.6e}"),
        Err(e) => println!("{label}: n/a ({e})"),
    }
}

fn run_stats(path: &Path, config: &AnalysisConfig, syndrome_ready_time: f64) -> Result<()> {
    let profile = load_profile(path, config)?;
    println!("entries: {} (skipped {})", profile.len(), profile.skipped());

    let average = stats::average_decoding_time(&profile).context("no decode times to aggregate")?;
    println!("average_decoding_time: {average:.6e}");
    print_optional(
        "decoding_time_relative_dev",
        stats::decoding_time_relative_dev(&profile),
    );
    print_optional(
        "average_decoding_time_per_defect",
        stats::average_decoding_time_per_defect(&profile),
    );
    if let Some(noisy_measurements) = profile.noisy_measurements() {
        print_optional(
            "average_decoding_time_per_round",
            stats::average_decoding_time_per_round(&profile, noisy_measurements),
        );
    }
    print_optional(
        "average_computation_cpu_seconds",
        stats::average_computation_cpu_seconds(&profile),
    );

    match stats::stream_latencies(&profile, syndrome_ready_time)
        .and_then(|latencies| Summary::from_samples(&latencies))
    {
        Ok(summary) => println!(
            "stream_latency: median {:.6e}  average {:.6e}  stddev {:.6e}",
            summary.median, summary.mean, summary.stddev
        ),
        Err(e) => println!("stream_latency: n/a ({e})"),
    }
    Ok(())
}

fn run_buckets(path: &Path, config: &AnalysisConfig) -> Result<()> {
    let samples = load_samples(path, config)?;
    let table = samples.to_table().context("no unit durations to summarize")?;
    print!("{table}");
    Ok(())
}
