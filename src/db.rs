//! Backend capabilities consumed by the gateway.
//!
//! The gateway never talks to a driver directly; it is handed something that
//! can prepare and execute CQL. `session::ScyllaBackend` is the production
//! implementation, tests use in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;
use scylla_cql::frame::response::result::{ColumnType, CqlValue, Row};

/// Rows returned by one backend call, with their column names in order.
#[derive(Debug, Default)]
pub struct ResultSet {
    pub col_names: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(col_names: Vec<String>, rows: Vec<Row>) -> Self {
        Self { col_names, rows }
    }

    /// Result of a statement that produced no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Positional bound values for one execution; `None` binds null.
pub type BoundValues = Vec<Option<CqlValue>>;

/// Compilation capability used by the prepared statement cache.
#[async_trait]
pub trait Prepare: Send + Sync + 'static {
    type Prepared: Clone + Send + Sync + 'static;

    async fn prepare(&self, cql: &str) -> Result<Self::Prepared>;
}

/// Full execution capability.
#[async_trait]
pub trait Backend: Prepare {
    /// Declared types of the statement's bind markers, in order. May be
    /// empty when the backend does not expose metadata.
    fn parameter_types(&self, prepared: &Self::Prepared) -> Vec<ColumnType>;

    async fn query(&self, cql: &str) -> Result<ResultSet>;

    /// Run raw statements as one logged batch.
    async fn batch(&self, statements: Vec<String>) -> Result<ResultSet>;

    async fn execute(&self, prepared: &Self::Prepared, values: BoundValues) -> Result<ResultSet>;

    /// Run bound prepared statements as one logged batch.
    async fn execute_batch(&self, items: Vec<(Self::Prepared, BoundValues)>) -> Result<ResultSet>;
}

/// Lexical read/mutation classification.
pub fn is_read_statement(cql: &str) -> bool {
    let trimmed = cql.trim_start();
    trimmed
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}
