//! isr-expgen CLI
//!
//! # Commands
//!
//! - `generate`: expand a grid file into configurations and batch scripts
//! - `show`: print a configuration file with its parent merged in
//! - `catalog`: print a `[datasets]` table scanned from fold files
//! - `normalize`: min-max normalize train/test folds
//! - `strip-zero-columns`: drop attributes that are zero in any fold
//! - `synthesize`: sample a synthetic regression dataset
//!
//! Exit code 1 on error; the message carries the full error chain.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use isr_expgen::config::GridConfig;
use isr_expgen::dataset::{
    drop_zero_columns, normalize_fold, Dataset, DatasetCatalog, FoldSet, Sampling,
    SyntheticFunction, DEFAULT_MAX_FOLDS, DEFAULT_SEED,
};
use isr_expgen::experiment::resolve_config_file;

/// Experiment grid generator for instance-weighted GP regression
#[derive(Parser)]
#[command(name = "isr-expgen")]
#[command(version)]
#[command(about = "Expand experiment grids into engine configurations and batch scripts")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate configuration files and batch scripts from a grid file
    Generate {
        /// Grid file (TOML)
        grid: PathBuf,
        /// Print the plan instead of writing files
        #[arg(long)]
        dry_run: bool,
        /// Override `[experiment] output_dir`
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// Print a configuration file with its parent resolved
    Show {
        /// Configuration file
        config: PathBuf,
    },
    /// Print a `[datasets]` table built from `<name>-train-0.csv` files
    Catalog {
        /// Directory with fold files
        dir: PathBuf,
    },
    /// Min-max normalize every fold using training-fold statistics
    Normalize {
        /// Directory with the original folds
        #[arg(long)]
        input_dir: PathBuf,
        /// Directory receiving normalized folds (same file names)
        #[arg(long)]
        output_dir: PathBuf,
        /// Maximum number of folds per dataset
        #[arg(long, default_value_t = DEFAULT_MAX_FOLDS)]
        folds: usize,
        /// Dataset names
        #[arg(required = true)]
        datasets: Vec<String>,
    },
    /// Drop attributes that are zero in every row of any fold
    StripZeroColumns {
        /// Directory with the folds
        #[arg(long)]
        input_dir: PathBuf,
        /// Dataset name
        #[arg(long)]
        dataset: String,
        /// Name of the stripped dataset (written next to the input)
        #[arg(long)]
        output_name: String,
        /// Maximum number of folds
        #[arg(long, default_value_t = DEFAULT_MAX_FOLDS)]
        folds: usize,
    },
    /// Sample a synthetic regression dataset into a CSV file
    Synthesize {
        /// Function name (e.g. `kotanchek`, `sinc-4`)
        #[arg(long)]
        function: SyntheticFunction,
        /// Sampling scheme
        #[arg(long, value_enum, default_value_t = SamplingKind::Grid)]
        sampling: SamplingKind,
        /// Lower bound per dimension
        #[arg(long, allow_negative_numbers = true)]
        lower: f64,
        /// Upper bound per dimension
        #[arg(long, allow_negative_numbers = true)]
        upper: f64,
        /// Total grid points, or samples per dimension for uniform sampling
        #[arg(long)]
        points: usize,
        /// RNG seed for uniform sampling
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Output CSV file
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SamplingKind {
    Grid,
    Uniform,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Generate {
            grid,
            dry_run,
            output_dir,
        } => generate(&grid, dry_run, output_dir),
        Commands::Show { config } => {
            let record = resolve_config_file(&config)
                .with_context(|| format!("cannot resolve {}", config.display()))?;
            print!("{}", record.render());
            Ok(())
        }
        Commands::Catalog { dir } => {
            let catalog = DatasetCatalog::scan_dir(&dir)?;
            if catalog.is_empty() {
                bail!("no '*-train-0.csv' files in {}", dir.display());
            }
            print!("{}", catalog.to_toml()?);
            Ok(())
        }
        Commands::Normalize {
            input_dir,
            output_dir,
            folds,
            datasets,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("cannot create {}", output_dir.display()))?;
            for name in &datasets {
                normalize(&input_dir, &output_dir, name, folds)
                    .with_context(|| format!("normalizing '{name}'"))?;
            }
            Ok(())
        }
        Commands::StripZeroColumns {
            input_dir,
            dataset,
            output_name,
            folds,
        } => strip(&input_dir, &dataset, &output_name, folds),
        Commands::Synthesize {
            function,
            sampling,
            lower,
            upper,
            points,
            seed,
            output,
        } => {
            let sampling = match sampling {
                SamplingKind::Grid => Sampling::Grid {
                    lower,
                    upper,
                    points,
                },
                SamplingKind::Uniform => Sampling::Uniform {
                    lower,
                    upper,
                    per_axis: points,
                    seed,
                },
            };
            let data = function.sample(&sampling)?;
            data.write_csv(&output)?;
            tracing::info!(
                function = %function,
                instances = data.num_instances(),
                output = %output.display(),
                "Wrote synthetic dataset"
            );
            Ok(())
        }
    }
}

fn generate(grid: &Path, dry_run: bool, output_dir: Option<String>) -> anyhow::Result<()> {
    let mut config = GridConfig::from_file(grid)?;
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }
    let generator = config
        .into_generator()
        .with_context(|| format!("invalid grid {}", grid.display()))?;

    if dry_run {
        let plan = generator.plan()?;
        for group in plan.groups() {
            println!("# {}", group.batch_path().display());
            for job in group.script().jobs() {
                println!("{job}");
            }
        }
        println!(
            "# {} configurations ({} of {} combinations excluded), {} batch script(s)",
            plan.len(),
            plan.excluded(),
            plan.total_combinations(),
            plan.groups().len()
        );
        return Ok(());
    }

    let report = generator.generate()?;
    println!(
        "{} configurations written, {} excluded",
        report.configs_written, report.excluded
    );
    for script in &report.batch_scripts {
        println!("{}", script.display());
    }
    Ok(())
}

fn normalize(input_dir: &Path, output_dir: &Path, name: &str, max_folds: usize) -> anyhow::Result<()> {
    let folds = FoldSet::discover(input_dir, name, max_folds)?;
    for (train_path, test_path) in folds.folds() {
        let mut train = Dataset::load_csv(train_path)?;
        let mut test = Dataset::load_csv(test_path)?;
        normalize_fold(&mut train, &mut test)
            .with_context(|| format!("fold {}", train_path.display()))?;
        for (data, path) in [(&train, train_path), (&test, test_path)] {
            let file_name = path
                .file_name()
                .with_context(|| format!("{} has no file name", path.display()))?;
            data.write_csv(output_dir.join(file_name))?;
        }
    }
    tracing::info!(dataset = name, folds = folds.folds().len(), "Normalized");
    Ok(())
}

fn strip(input_dir: &Path, name: &str, output_name: &str, max_folds: usize) -> anyhow::Result<()> {
    if name == output_name {
        bail!("output name must differ from '{name}'");
    }
    let folds = FoldSet::discover(input_dir, name, max_folds)?;
    let mut datasets = folds
        .files()
        .map(Dataset::load_csv)
        .collect::<isr_expgen::Result<Vec<_>>>()?;
    let removed = drop_zero_columns(&mut datasets)?;

    let mut data = datasets.iter();
    for index in 0..folds.folds().len() {
        for kind in ["train", "test"] {
            let path = input_dir.join(FoldSet::fold_file_name(output_name, kind, index));
            let dataset = data.next().context("fold count changed while stripping")?;
            dataset.write_csv(&path)?;
        }
    }
    println!("removed columns {removed:?} from '{name}' into '{output_name}'");
    Ok(())
}
