//! ecsample CLI - hard-negative mining and tuple sampling from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Mine shortlists of the 10 nearest classes per class
//! ecsample mine distances.json -o mined.json --knn 10
//!
//! # Binary output (fast loading)
//! ecsample mine distances.json -o mined.bin
//!
//! # Summarize an annotation table
//! ecsample stats split100.tsv
//!
//! # Emit anchor/positive/negative triplets
//! ecsample triplets split100.tsv mined.json --count 256 --seed 42
//!
//! # Emit anchor + 4 positives + 30 negatives per fully-specified class
//! ecsample multi split100.tsv mined.json --n-pos 4 --n-neg 30
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ecsample_core::{
    Annotations, Dataset, DistanceMap, HardNegativeMiner, InMemoryStore, MinerConfig,
    MiningResult, MultiPosNegConfig, MultiPosNegProvider, PoolStrategy, SamplingConfig,
    TripletConfig, TripletProvider,
};
use indicatif::ProgressBar;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ecsample")]
#[command(about = "Hard-negative mining and triplet sampling for EC-labelled sequences", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine per-class hard-negative shortlists from a distance map
    Mine {
        /// Distance map (JSON: {class: {class: distance}})
        input: PathBuf,

        /// Output file (.json, or .bin for bincode)
        #[arg(short, long)]
        output: PathBuf,

        /// Shortlist size per class
        #[arg(long, default_value = "10")]
        knn: usize,
    },

    /// Show statistics about an annotation table
    Stats {
        /// Annotation table (tab-separated, header row)
        input: PathBuf,
    },

    /// Sample anchor/positive/negative triplets
    Triplets {
        /// Annotation table (tab-separated, header row)
        annotations: PathBuf,

        /// Mined shortlists (.json or .bin)
        mined: PathBuf,

        /// Number of triplets (pool size)
        #[arg(short, long, default_value = "256")]
        count: usize,

        /// How anchor classes are drawn
        #[arg(long, default_value = "entity")]
        pool: PoolArg,

        /// Draws allowed per rejection loop
        #[arg(long, default_value = "100")]
        max_attempts: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Sample one anchor with several positives and negatives per class
    Multi {
        /// Annotation table (tab-separated, header row)
        annotations: PathBuf,

        /// Mined shortlists (.json or .bin)
        mined: PathBuf,

        /// Positives per anchor
        #[arg(long, default_value = "1")]
        n_pos: usize,

        /// Negatives per anchor
        #[arg(long, default_value = "1")]
        n_neg: usize,

        /// Draws allowed per rejection loop
        #[arg(long, default_value = "100")]
        max_attempts: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PoolArg {
    /// Uniform entity, then one of its classes
    Entity,
    /// Uniform over fully-specified classes
    Class,
    /// Every fully-specified class once
    Full,
}

impl From<PoolArg> for PoolStrategy {
    fn from(arg: PoolArg) -> Self {
        match arg {
            PoolArg::Entity => PoolStrategy::EntityWeighted,
            PoolArg::Class => PoolStrategy::UniformClasses,
            PoolArg::Full => PoolStrategy::FullySpecified,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    match cli.command {
        Commands::Mine { input, output, knn } => cmd_mine(&input, &output, knn),
        Commands::Stats { input } => cmd_stats(&input),
        Commands::Triplets {
            annotations,
            mined,
            count,
            pool,
            max_attempts,
            seed,
        } => cmd_triplets(&annotations, &mined, count, pool, max_attempts, seed),
        Commands::Multi {
            annotations,
            mined,
            n_pos,
            n_neg,
            max_attempts,
            seed,
        } => cmd_multi(&annotations, &mined, n_pos, n_neg, max_attempts, seed),
    }
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

fn load_annotations(path: &Path) -> Result<Annotations> {
    Annotations::from_tsv_file(path)
        .with_context(|| format!("Failed to load annotations {}", path.display()))
}

fn load_mined(path: &Path) -> Result<MiningResult> {
    if is_binary(path) {
        MiningResult::from_binary_file(path)
            .with_context(|| format!("Failed to load binary file {}", path.display()))
    } else {
        MiningResult::from_json_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))
    }
}

fn cmd_mine(input: &Path, output: &Path, knn: usize) -> Result<()> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", input.display()));

    let distances = DistanceMap::from_json_file(input)
        .with_context(|| format!("Failed to load distance map {}", input.display()))?;

    pb.set_message(format!("Mining {} classes (knn={})...", distances.len(), knn));
    let miner = HardNegativeMiner::new(MinerConfig::default().with_knn(knn));
    let mined = miner.mine(&distances).context("Mining failed")?;

    if is_binary(output) {
        mined.to_binary_file(output)?;
    } else {
        mined.to_json_file(output)?;
    }
    pb.finish_with_message(format!("Mined in {:.2?}", start.elapsed()));

    println!("Mined {} classes -> {}", mined.len(), output.display());
    Ok(())
}

fn cmd_stats(input: &Path) -> Result<()> {
    let annotations = load_annotations(input)?;
    let stats = annotations.stats();

    println!("Annotation Statistics");
    println!("=====================");
    println!("Entities:            {}", stats.entity_count);
    println!("Classes:             {}", stats.class_count);
    println!("Fully specified:     {}", stats.fully_specified_count);
    println!("Singleton classes:   {}", stats.singleton_class_count);
    println!("Multi-class entries: {}", stats.multi_class_entity_count);

    Ok(())
}

fn cmd_triplets(
    annotations: &Path,
    mined: &Path,
    count: usize,
    pool: PoolArg,
    max_attempts: usize,
    seed: u64,
) -> Result<()> {
    let annotations = load_annotations(annotations)?;
    let mined = load_mined(mined)?;
    let mut rng = XorShiftRng::seed_from_u64(seed);

    let config = TripletConfig::default()
        .with_pool_size(count)
        .with_pool_strategy(pool.into())
        .with_sampling(SamplingConfig::default().with_max_attempts(max_attempts));
    let provider = TripletProvider::new(&annotations, &mined, InMemoryStore::new(), config, &mut rng)?;

    let mut out = BufWriter::new(io::stdout().lock());
    for index in 0..provider.len() {
        let triplet = provider
            .sample_ids(index, &mut rng)
            .with_context(|| format!("Failed to sample triplet {}", index))?;
        writeln!(out, "{}\t{}\t{}", triplet.anchor, triplet.positive, triplet.negative)?;
    }
    out.flush()?;

    Ok(())
}

fn cmd_multi(
    annotations: &Path,
    mined: &Path,
    n_pos: usize,
    n_neg: usize,
    max_attempts: usize,
    seed: u64,
) -> Result<()> {
    let annotations = load_annotations(annotations)?;
    let mined = load_mined(mined)?;
    let mut rng = XorShiftRng::seed_from_u64(seed);

    let config = MultiPosNegConfig::default()
        .with_n_pos(n_pos)
        .with_n_neg(n_neg)
        .with_sampling(SamplingConfig::default().with_max_attempts(max_attempts));
    let provider = MultiPosNegProvider::new(&annotations, &mined, InMemoryStore::new(), config)?;

    let mut out = BufWriter::new(io::stdout().lock());
    for (index, class) in provider.classes().iter().enumerate() {
        let ids = provider
            .sample_ids(index, &mut rng)
            .with_context(|| format!("Failed to sample class {}", class))?;
        let line: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    out.flush()?;

    Ok(())
}
