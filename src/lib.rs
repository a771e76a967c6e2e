//! Cocomerge: merge and split COCO annotation collections.
//!
//! Every collection keeps its own id space. Cocomerge renumbers licenses,
//! images, categories and annotations into one fresh, contiguous id space
//! while rewriting every cross-reference, so that merged and split outputs
//! stay referentially consistent.
//!
//! # Modules
//!
//! - [`ir`]: Typed records, ids and the COCO JSON reader/writer
//! - [`remap`]: Id mapping tables and the dedup-aware record buffer
//! - [`merge`]: Merging several collections into one
//! - [`split`]: Partitioning one collection into named subsets
//! - [`validation`]: Dataset validation and error reporting
//! - [`error`]: Error types for cocomerge operations

pub mod error;
pub mod ir;
pub mod merge;
pub mod remap;
pub mod split;
pub mod validation;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::CocomergeError;

use merge::{MergeOptions, MergeSource};
use remap::ConflictPolicy;
use split::{SplitOptions, SplitOrder, SubsetSpec};

/// The cocomerge CLI application.
#[derive(Parser)]
#[command(name = "cocomerge")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Merge several COCO files into one, renumbering every id.
    Merge(MergeArgs),
    /// Split a COCO file into named subsets by image.
    Split(SplitArgs),
    /// Validate a COCO file for errors and warnings.
    Validate(ValidateArgs),
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// Input files, merged in the order given.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file.
    #[arg(short, long)]
    output: PathBuf,

    /// On a category schema conflict keep the first definition instead of failing.
    #[arg(long)]
    first_wins: bool,

    /// Also write the old-to-new id mapping of every record to this file.
    #[arg(long, value_name = "PATH")]
    id_map: Option<PathBuf>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    report: String,
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    /// Input file to split.
    input: PathBuf,

    /// A subset as NAME=RATIO; repeat for each subset.
    #[arg(long = "subset", value_name = "NAME=RATIO", required = true, value_parser = split::parse_subset_spec)]
    subsets: Vec<SubsetSpec>,

    /// Directory that receives one `<NAME>.json` per subset.
    #[arg(long)]
    out_dir: PathBuf,

    /// Seed for the image shuffle.
    #[arg(long, env = "COCOMERGE_SEED", default_value_t = 42)]
    seed: u64,

    /// Deal images in file order instead of shuffling.
    #[arg(long)]
    no_shuffle: bool,

    /// On a category schema conflict keep the first definition instead of failing.
    #[arg(long)]
    first_wins: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    report: String,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Input file to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Require ids of every kind to be exactly 0..n.
    #[arg(long)]
    require_contiguous: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    output: String,
}

/// Run the cocomerge CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CocomergeError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Merge(args)) => run_merge(args),
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("cocomerge {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Merge and split COCO annotation files with consistent ids.");
            println!();
            println!("Run 'cocomerge --help' for usage information.");
            Ok(())
        }
    }
}

fn conflict_policy(first_wins: bool) -> ConflictPolicy {
    if first_wins {
        ConflictPolicy::FirstWins
    } else {
        ConflictPolicy::Reject
    }
}

/// Execute the merge subcommand.
fn run_merge(args: MergeArgs) -> Result<(), CocomergeError> {
    let sources = args
        .inputs
        .iter()
        .map(|path| {
            let dataset = ir::io_coco_json::read_coco_json(path)?;
            Ok(MergeSource::new(path.display().to_string(), dataset))
        })
        .collect::<Result<Vec<_>, CocomergeError>>()?;

    let opts = MergeOptions {
        conflict_policy: conflict_policy(args.first_wins),
        ..Default::default()
    };
    let out = merge::merge_datasets(&sources, &opts)?;

    ir::io_coco_json::write_coco_json(&args.output, &out.dataset)?;
    if let Some(path) = &args.id_map {
        write_id_map(path, &out.registry)?;
    }

    print_report(&out.report, &args.report)
}

/// Execute the split subcommand.
fn run_split(args: SplitArgs) -> Result<(), CocomergeError> {
    let parent = ir::io_coco_json::read_coco_json(&args.input)?;

    let opts = SplitOptions {
        parent_key: args.input.display().to_string(),
        subsets: args.subsets,
        order: if args.no_shuffle {
            SplitOrder::AsGiven
        } else {
            SplitOrder::Seeded(args.seed)
        },
        conflict_policy: conflict_policy(args.first_wins),
    };
    let out = split::split_dataset(&parent, &opts)?;

    fs::create_dir_all(&args.out_dir).map_err(|source| CocomergeError::Write {
        path: args.out_dir.clone(),
        source,
    })?;
    for subset in &out.subsets {
        let path = args.out_dir.join(format!("{}.json", subset.name));
        ir::io_coco_json::write_coco_json(&path, &subset.dataset)?;
    }

    print_report(&out.report, &args.report)
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), CocomergeError> {
    let dataset = ir::io_coco_json::read_coco_json(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
        require_contiguous_ids: args.require_contiguous,
    };
    let report = validation::validate_dataset(&dataset, &opts);

    print_report(&report, &args.output)?;

    if report.fails(opts.strict) {
        Err(CocomergeError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn print_report<R>(report: &R, format: &str) -> Result<(), CocomergeError>
where
    R: std::fmt::Display + Serialize,
{
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(report).map_err(|e| {
                CocomergeError::InvalidArgument(format!("failed to serialize report: {e}"))
            })?;
            println!("{json}");
        }
        _ => print!("{report}"),
    }
    Ok(())
}

fn write_id_map(path: &Path, registry: &remap::MapperRegistry) -> Result<(), CocomergeError> {
    let file = File::create(path).map_err(|source| CocomergeError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, registry).map_err(|source| CocomergeError::IdMapWrite {
        path: path.to_path_buf(),
        source,
    })
}
