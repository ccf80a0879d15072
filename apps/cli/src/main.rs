use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "plasmidoro")]
#[command(version)]
#[command(about = "Plasmid inventory import and sequence search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (TOML)
    #[arg(long, global = true, env = "PLASMIDORO_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database, overriding the config file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import or update plasmids from a directory of map files
    ImportPlasmids(commands::import::TreeArgs),

    /// Import or update plasmid records from an xlsx file
    ImportPlasmidsTable(commands::import::TableArgs),

    /// Import or update strain records from an xlsx file
    ImportStrainsTable(commands::import::TableArgs),

    /// Import or update oligo records from an xlsx file
    ImportOligosTable(commands::import::TableArgs),

    /// Import magic pool part types and vector designs
    ImportMagicPoolTypes(commands::import::WorkbookArgs),

    /// Import magic pools from the summary sheet
    ImportMagicPools(commands::import::WorkbookArgs),

    /// Export sequences and rebuild the BLAST databases
    MakeBlastDatabases,

    /// Sync the data directory and re-import everything
    Refresh(commands::import::RefreshArgs),

    /// Search plasmids, oligos and proteins with BLAST
    Search(commands::search::SearchArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "plasmidoro=debug,info"
    } else {
        "plasmidoro=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let ctx = Context::new(cli.config.as_deref(), cli.database, cli.format)?;

    match cli.command {
        Command::ImportPlasmids(args) => commands::import::plasmids(&ctx, args),
        Command::ImportPlasmidsTable(args) => {
            commands::import::table(&ctx, args, &plasmidoro_import::table::PLASMIDS)
        }
        Command::ImportStrainsTable(args) => {
            commands::import::table(&ctx, args, &plasmidoro_import::table::STRAINS)
        }
        Command::ImportOligosTable(args) => {
            commands::import::table(&ctx, args, &plasmidoro_import::table::OLIGOS)
        }
        Command::ImportMagicPoolTypes(args) => commands::import::magic_pool_types(&ctx, args),
        Command::ImportMagicPools(args) => commands::import::magic_pools(&ctx, args),
        Command::MakeBlastDatabases => commands::import::blast_databases(&ctx),
        Command::Refresh(args) => commands::import::refresh(&ctx, args),
        Command::Search(args) => commands::search::run(&ctx, args),
    }
}
