pub mod postgres;
pub mod sql;

use crate::error::Result;
use crate::table::Table;
use async_trait::async_trait;
use indexmap::IndexMap;

pub use postgres::PgStore;

/// per-table load outcome in input order; error markers have no entry
pub type LoadResults = IndexMap<String, Result<()>>;

/// relational database holding generated tables
#[async_trait]
pub trait TableStore: Send + Sync {
    /// replace same-named tables with the given data; error markers are skipped
    /// and a failing table does not stop the ones after it
    async fn load_tables(&self, tables: &IndexMap<String, Table>) -> LoadResults;

    /// ddl-like description of the named tables as the database sees them
    async fn describe_tables(&self, names: &[String]) -> Result<String>;

    async fn run_query(&self, sql: &str) -> Result<Table>;
}
