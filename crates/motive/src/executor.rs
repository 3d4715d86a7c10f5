//! Datastore seam. The compiler never talks to a database itself; a
//! [`QueryExecutor`] implementation carries rows back for scoring.

use tracing::info;

use crate::error::Result;
use crate::score::{score_rows, Aggregation, MatchCandidate, Row};
use crate::CompiledQuery;

/// Runs compiled query text against an event-graph datastore.
pub trait QueryExecutor {
    fn execute(&self, query: &str) -> Result<Vec<Row>>;
}

/// Execute a compiled query once and return scored, ranked candidates.
pub fn search(
    executor: &dyn QueryExecutor,
    compiled: &CompiledQuery,
    aggregation: Aggregation,
) -> Result<Vec<MatchCandidate>> {
    let rows = executor.execute(compiled.text())?;
    info!(rows = rows.len(), "query executed");
    score_rows(&compiled.plan, &compiled.tolerances, &rows, aggregation)
}
