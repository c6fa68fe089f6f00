use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use firmclust::input::{InputSpec, read_inputs};
use firmclust::{FirmclustConfig, GroupMember, LogFormat, Pipeline};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "firmclust")]
#[command(about = "Deduplicate firm names into firm ids", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `firmclust=debug`; overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format (text, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Run blocking and verification on the rayon pool
    #[arg(long, global = true)]
    parallel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DbArgs {
    /// SQLite database holding the pipeline tables
    #[arg(long)]
    db: PathBuf,
}

#[derive(Args)]
struct InputArgs {
    /// Tab-separated `record_id<TAB>name` file, as SOURCE=PATH; repeatable
    #[arg(long = "input", required = true)]
    inputs: Vec<InputSpec>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all four stages
    Run {
        #[command(flatten)]
        db: DbArgs,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Build the name table from raw records
    Names {
        #[command(flatten)]
        db: DbArgs,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Block names into candidate pairs
    Pairs {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Verify pairs and number the grouped firms
    Groups {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Assign every name and record a firm
    Firms {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Print grouped firms with their member names
    Show {
        #[command(flatten)]
        db: DbArgs,
        /// Number of firms to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl Commands {
    fn db(&self) -> &PathBuf {
        match self {
            Commands::Run { db, .. }
            | Commands::Names { db, .. }
            | Commands::Pairs { db }
            | Commands::Groups { db }
            | Commands::Firms { db }
            | Commands::Show { db, .. } => &db.db,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => FirmclustConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FirmclustConfig::default(),
    };
    if cli.parallel {
        cfg = cfg.with_parallel(true);
    }
    cfg = cfg.with_sqlite(cli.command.db());

    init_tracing(&cli, &cfg)?;
    info!(
        config = cfg.name.as_deref().unwrap_or("default"),
        db = %cli.command.db().display(),
        "firmclust_start"
    );

    let pipeline = Pipeline::from_config(&cfg)?;
    match &cli.command {
        Commands::Run { input, .. } => {
            let records = read_inputs(&input.inputs)?;
            print_json(&pipeline.run(records)?)?;
        }
        Commands::Names { input, .. } => {
            let records = read_inputs(&input.inputs)?;
            print_json(&pipeline.unique_names(records)?)?;
        }
        Commands::Pairs { .. } => print_json(&pipeline.filter_pairs()?)?,
        Commands::Groups { .. } => print_json(&pipeline.find_groups()?)?,
        Commands::Firms { .. } => print_json(&pipeline.merge_firms()?)?,
        Commands::Show { limit, .. } => show_groups(&pipeline.groups()?, *limit),
    }
    pipeline.store().flush()?;
    Ok(())
}

fn init_tracing(cli: &Cli, cfg: &FirmclustConfig) -> Result<()> {
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&cfg.logging.level))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format.unwrap_or(cfg.logging.format) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_groups(members: &[GroupMember], limit: usize) {
    let mut firms: BTreeMap<u64, Vec<&GroupMember>> = BTreeMap::new();
    for member in members {
        firms.entry(member.firm_num).or_default().push(member);
    }
    let total = firms.len();
    for (firm_num, members) in firms.into_iter().take(limit) {
        println!("firm {firm_num} ({} names)", members.len());
        for member in members {
            println!("  {:>10}  {}", member.id, member.name);
        }
    }
    if total > limit {
        println!("... {} more grouped firms", total - limit);
    }
}
