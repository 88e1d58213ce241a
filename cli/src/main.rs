use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use schema_inherit_core::{Mapping, MappingMode, SequenceMode};
use schema_inherit_loader::{FragmentSet, MergeConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: &str = "1.0";

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliSequenceMode {
    Replace,
    Merge,
}

impl From<CliSequenceMode> for SequenceMode {
    fn from(mode: CliSequenceMode) -> Self {
        match mode {
            CliSequenceMode::Replace => Self::Replace,
            CliSequenceMode::Merge => Self::Merge,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliMappingMode {
    Merge,
    Replace,
}

impl From<CliMappingMode> for MappingMode {
    fn from(mode: CliMappingMode) -> Self {
        match mode {
            CliMappingMode::Merge => Self::Merge,
            CliMappingMode::Replace => Self::Replace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "schema-inherit")]
#[command(about = "Resolve multiple inheritance across schema fragments")]
struct Cli {
    /// Log resolution steps to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every fragment merged over its ancestry.
    Merge(MergeArgs),
    /// Print fragment identifiers with ancestors first.
    Order(SourceArgs),
    /// Resolve and sort fragments without printing them.
    Check(SourceArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Fragment files and/or directories with one fragment per file.
    inputs: Vec<PathBuf>,
    /// Path to a run configuration YAML file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct MergeArgs {
    #[command(flatten)]
    sources: SourceArgs,
    /// How sequences under the same key are combined.
    #[arg(long)]
    sequences: Option<CliSequenceMode>,
    /// How nested mappings under the same key are combined.
    #[arg(long)]
    mappings: Option<CliMappingMode>,
    /// Emit each fragment's identifier as its first key.
    #[arg(long)]
    keep_id: bool,
    /// Only emit these fragments (repeatable).
    #[arg(long = "only", value_name = "ID")]
    only: Vec<String>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Write output to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let result = match cli.command {
        Command::Merge(args) => run_merge(args),
        Command::Order(args) => run_order(args),
        Command::Check(args) => run_check(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn setup_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_merge(args: MergeArgs) -> Result<(), String> {
    let (set, mut config) = load_sources(&args.sources)?;

    if let Some(sequences) = args.sequences {
        config.merge.policy.sequences = sequences.into();
    }
    if let Some(mappings) = args.mappings {
        config.merge.policy.mappings = mappings.into();
    }
    if args.keep_id {
        config.merge.omit_id = false;
    }

    for id in &args.only {
        if !set.contains(id) {
            return Err(format!("unknown fragment '{id}'"));
        }
    }

    let merged = set.merge(&config.merge).map_err(|e| e.to_string())?;
    let selected: IndexMap<String, Mapping> = merged
        .into_iter()
        .filter(|(id, _)| !config.is_excluded(id))
        .filter(|(id, _)| args.only.is_empty() || args.only.contains(id))
        .collect();
    debug!(fragments = selected.len(), "emitting merged fragments");

    let rendered = format_merged(&selected, args.format)?;
    match args.output {
        Some(path) => {
            fs::write(&path, rendered)
                .map_err(|e| format!("failed to write '{}': {e}", path.display()))?;
            println!(
                "Wrote {} fragment(s) to {}",
                selected.len(),
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run_order(args: SourceArgs) -> Result<(), String> {
    let (set, config) = load_sources(&args)?;
    let order = set.order().map_err(|e| e.to_string())?;
    for id in order.iter().filter(|id| !config.is_excluded(id)) {
        println!("{id}");
    }
    Ok(())
}

fn run_check(args: SourceArgs) -> Result<(), String> {
    let (set, _) = load_sources(&args)?;
    let order = set.order().map_err(|e| e.to_string())?;
    println!("Resolved {} fragment(s).", order.len());
    Ok(())
}

/// Loads the run configuration (if any) and every source it names, followed
/// by the positional inputs.
fn load_sources(args: &SourceArgs) -> Result<(FragmentSet, MergeConfig), String> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::load(path)
            .map_err(|e| format!("failed to load config '{}': {e}", path.display()))?,
        None => MergeConfig::new(CONFIG_VERSION),
    };
    config.sources.extend(args.inputs.iter().cloned());

    if config.sources.is_empty() {
        return Err("no fragment sources given; pass files, directories or --config".to_string());
    }

    let set = config.builder().build().map_err(|e| e.to_string())?;
    debug!(
        sources = config.sources.len(),
        fragments = set.len(),
        "loaded fragment sources"
    );
    Ok((set, config))
}

fn format_merged(
    merged: &IndexMap<String, Mapping>,
    format: CliOutputFormat,
) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(merged)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|e| e.to_string()),
        CliOutputFormat::Yaml => serde_yaml::to_string(merged).map_err(|e| e.to_string()),
    }
}
