pub mod import;
pub mod search;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use plasmidoro_import::Config;
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::OutputFormat;

/// Config file picked up from the working directory when `--config` is absent.
const LOCAL_CONFIG: &str = "plasmidoro.toml";

/// Settings shared by every subcommand.
pub struct Context {
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(
        config_path: Option<&Path>,
        database: Option<PathBuf>,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let mut config = match config_path {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None if Path::new(LOCAL_CONFIG).is_file() => Config::load(Path::new(LOCAL_CONFIG))
                .with_context(|| format!("Failed to load config {}", LOCAL_CONFIG))?,
            None => Config::default(),
        };
        if let Some(database) = database {
            config.database = database;
        }
        debug!(
            database = %config.database.display(),
            data_dir = %config.data_dir.display(),
            "configuration loaded"
        );
        Ok(Self { config, format })
    }

    pub fn open_db(&self) -> anyhow::Result<Connection> {
        plasmidoro_store::open(&self.config.database).with_context(|| {
            format!("Failed to open database {}", self.config.database.display())
        })
    }

    /// Print `value` as JSON, or as the given text lines.
    pub fn emit<T: Serialize>(&self, value: &T, lines: Vec<String>) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => {
                for line in lines {
                    println!("{}", line);
                }
            }
        }
        Ok(())
    }
}
