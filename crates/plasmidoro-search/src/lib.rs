//! Sequence search against the inventory's BLAST databases.
//!
//! A request is validated and sanitized, handed to a [`SearchRunner`], and
//! the tabular output is resolved back to plasmids and oligos.

pub mod blast;
pub mod normalize;

use plasmidoro_core::search::{
    prepare_query, validate_params, SearchParams, SearchRequest, SearchTool, ValidationError,
};
use plasmidoro_store::StoreError;
use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

pub use blast::{BlastDatabases, BlastRunner, Invocation, SearchRunner};
pub use normalize::{normalize, DisplayHit, SearchOutcome, NO_HITS};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{} finished with error:\n{message}", .tool.as_str().to_uppercase())]
    Tool { tool: SearchTool, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Run a search with already validated parameters.
pub fn run_search(
    conn: &Connection,
    runner: &dyn SearchRunner,
    dbs: &BlastDatabases,
    params: &SearchParams,
) -> Result<SearchOutcome> {
    let query = prepare_query(params)?;
    let invocation = Invocation::new(params, &query, dbs);
    let output = runner.run(&invocation)?;
    let outcome = normalize(
        conn,
        &output,
        params.tool,
        &query.id,
        query.sequence.len(),
        params.hit_cap,
    )?;
    info!(
        "{} search for {} ({} letters): {} hits",
        params.tool,
        query.id,
        query.sequence.len(),
        outcome.hits.len()
    );
    Ok(outcome)
}

/// Validate a raw request, then search.
pub fn search(
    conn: &Connection,
    runner: &dyn SearchRunner,
    dbs: &BlastDatabases,
    request: &SearchRequest,
) -> Result<SearchOutcome> {
    let params = validate_params(request)?;
    run_search(conn, runner, dbs, &params)
}
