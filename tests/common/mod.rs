#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use scylla_cql::frame::response::result::{ColumnType, CqlValue, Row};
use scylla_gateway::db::{Backend, BoundValues, Prepare, ResultSet, is_read_statement};

/// Handle issued by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct FakePrepared {
    pub cql: Arc<str>,
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Prepare(String),
    Query(String),
    Batch(Vec<String>),
    Execute(String, BoundValues),
    ExecuteBatch(Vec<(String, BoundValues)>),
}

/// In-memory backend.
///
/// - statements containing `BAD` fail to prepare
/// - statements containing `FAIL` fail to execute
/// - bound values containing the text `fail` fail to execute
/// - reads return the rows registered for their text; prepared reads without
///   registered rows echo their bound values as columns `p0..pn`
#[derive(Default)]
pub struct FakeBackend {
    prepares: AtomicUsize,
    prepare_delay: Option<Duration>,
    rows: HashMap<String, Table>,
    types: HashMap<String, Vec<ColumnType>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, cql: &str, table: Table) -> Self {
        self.rows.insert(cql.to_string(), table);
        self
    }

    pub fn with_types(mut self, cql: &str, types: Vec<ColumnType>) -> Self {
        self.types.insert(cql.to_string(), types);
        self
    }

    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = Some(delay);
        self
    }

    pub fn prepare_count(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_values(values: &BoundValues) -> Result<()> {
        if values
            .iter()
            .any(|v| matches!(v, Some(CqlValue::Text(t)) if t == "fail"))
        {
            bail!("rejected bound value");
        }
        Ok(())
    }
}

/// Canned rows for one statement.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub col_names: Vec<String>,
    pub rows: Vec<Vec<Option<CqlValue>>>,
}

impl Table {
    pub fn new(col_names: &[&str]) -> Self {
        Self {
            col_names: col_names.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, cells: Vec<Option<CqlValue>>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn result_set(&self) -> ResultSet {
        ResultSet::new(
            self.col_names.clone(),
            self.rows
                .iter()
                .map(|columns| Row {
                    columns: columns.clone(),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl Prepare for FakeBackend {
    type Prepared = FakePrepared;

    async fn prepare(&self, cql: &str) -> Result<FakePrepared> {
        self.record(Call::Prepare(cql.to_string()));
        if let Some(delay) = self.prepare_delay {
            tokio::time::sleep(delay).await;
        }
        if cql.contains("BAD") {
            bail!("line 1:0 no viable alternative at input '{cql}'");
        }
        let id = self.prepares.fetch_add(1, Ordering::SeqCst);
        Ok(FakePrepared {
            cql: Arc::from(cql),
            id,
        })
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn parameter_types(&self, prepared: &FakePrepared) -> Vec<ColumnType> {
        self.types.get(&*prepared.cql).cloned().unwrap_or_default()
    }

    async fn query(&self, cql: &str) -> Result<ResultSet> {
        self.record(Call::Query(cql.to_string()));
        if cql.contains("FAIL") {
            bail!("query failed: {cql}");
        }
        Ok(self.rows.get(cql).map(Table::result_set).unwrap_or_default())
    }

    async fn batch(&self, statements: Vec<String>) -> Result<ResultSet> {
        self.record(Call::Batch(statements.clone()));
        if statements.iter().any(|s| s.contains("FAIL")) {
            bail!("batch failed");
        }
        Ok(ResultSet::empty())
    }

    async fn execute(&self, prepared: &FakePrepared, values: BoundValues) -> Result<ResultSet> {
        self.record(Call::Execute(prepared.cql.to_string(), values.clone()));
        if prepared.cql.contains("FAIL") {
            bail!("execution failed");
        }
        Self::check_values(&values)?;
        if let Some(table) = self.rows.get(&*prepared.cql) {
            return Ok(table.result_set());
        }
        if !is_read_statement(&prepared.cql) {
            return Ok(ResultSet::empty());
        }
        let col_names = (0..values.len()).map(|i| format!("p{i}")).collect();
        Ok(ResultSet::new(col_names, vec![Row { columns: values }]))
    }

    async fn execute_batch(&self, items: Vec<(FakePrepared, BoundValues)>) -> Result<ResultSet> {
        self.record(Call::ExecuteBatch(
            items
                .iter()
                .map(|(p, v)| (p.cql.to_string(), v.clone()))
                .collect(),
        ));
        for (prepared, values) in &items {
            if prepared.cql.contains("FAIL") {
                bail!("batch failed");
            }
            Self::check_values(values)?;
        }
        Ok(ResultSet::empty())
    }
}
