//! ScyllaDB / Cassandra implementation of [`Backend`].

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scylla::batch::{Batch, BatchType};
use scylla::prepared_statement::PreparedStatement;
use scylla::query::Query;
use scylla::statement::{PagingState, PagingStateResponse};
use scylla::transport::Compression;
use scylla::{QueryResult, Session, SessionBuilder};
use scylla_cql::frame::response::result::{ColumnType, Row};
use tracing::{debug, info};

use crate::config::{CompressionKind, GatewayConfig};
use crate::db::{Backend, BoundValues, Prepare, ResultSet};

pub struct ScyllaBackend {
    session: Session,
    /// `None` runs reads unpaged.
    page_size: Option<i32>,
}

impl ScyllaBackend {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            page_size: None,
        }
    }

    /// Fetch reads `page_size` rows per round trip. Non-positive sizes mean unpaged.
    pub fn with_page_size(mut self, page_size: Option<i32>) -> Self {
        self.page_size = page_size.filter(|n| *n > 0);
        self
    }
}

fn col_names(result: &QueryResult) -> Vec<String> {
    result
        .col_specs()
        .iter()
        .map(|spec| spec.name.clone())
        .collect()
}

fn into_result_set(result: QueryResult) -> ResultSet {
    let col_names = col_names(&result);
    ResultSet::new(col_names, result.rows_or_empty())
}

/// Rows gathered across every page of one statement.
#[derive(Default)]
struct Pages {
    col_names: Option<Vec<String>>,
    rows: Vec<Row>,
    fetched: usize,
}

impl Pages {
    fn push(&mut self, result: QueryResult) {
        if self.col_names.is_none() {
            self.col_names = Some(col_names(&result));
        }
        self.fetched += 1;
        self.rows.extend(result.rows_or_empty());
    }

    fn finish(self) -> ResultSet {
        debug!(pages = self.fetched, rows = self.rows.len(), "paged read complete");
        ResultSet::new(self.col_names.unwrap_or_default(), self.rows)
    }
}

#[async_trait]
impl Prepare for ScyllaBackend {
    type Prepared = Arc<PreparedStatement>;

    async fn prepare(&self, cql: &str) -> Result<Self::Prepared> {
        let mut prepared = self.session.prepare(cql).await?;
        if let Some(page_size) = self.page_size {
            prepared.set_page_size(page_size);
        }
        Ok(Arc::new(prepared))
    }
}

#[async_trait]
impl Backend for ScyllaBackend {
    fn parameter_types(&self, prepared: &Self::Prepared) -> Vec<ColumnType> {
        prepared
            .get_variable_col_specs()
            .iter()
            .map(|spec| spec.typ.clone())
            .collect()
    }

    async fn query(&self, cql: &str) -> Result<ResultSet> {
        let Some(page_size) = self.page_size else {
            let result = self.session.query_unpaged(cql, &[]).await?;
            return Ok(into_result_set(result));
        };
        let mut query = Query::new(cql);
        query.set_page_size(page_size);
        let mut pages = Pages::default();
        let mut state = PagingState::start();
        loop {
            let (result, response) = self
                .session
                .query_single_page(query.clone(), (), state)
                .await?;
            pages.push(result);
            match response {
                PagingStateResponse::HasMorePages { state: next } => state = next,
                PagingStateResponse::NoMorePages => break,
            }
        }
        Ok(pages.finish())
    }

    async fn batch(&self, statements: Vec<String>) -> Result<ResultSet> {
        let mut batch = Batch::new(BatchType::Logged);
        for cql in &statements {
            batch.append_statement(cql.as_str());
        }
        let values = vec![(); statements.len()];
        let result = self.session.batch(&batch, values).await?;
        Ok(into_result_set(result))
    }

    async fn execute(&self, prepared: &Self::Prepared, values: BoundValues) -> Result<ResultSet> {
        if self.page_size.is_none() {
            let result = self.session.execute_unpaged(prepared.as_ref(), values).await?;
            return Ok(into_result_set(result));
        }
        // page size was set on the statement when it was prepared
        let mut pages = Pages::default();
        let mut state = PagingState::start();
        loop {
            let (result, response) = self
                .session
                .execute_single_page(prepared.as_ref(), &values, state)
                .await?;
            pages.push(result);
            match response {
                PagingStateResponse::HasMorePages { state: next } => state = next,
                PagingStateResponse::NoMorePages => break,
            }
        }
        Ok(pages.finish())
    }

    async fn execute_batch(&self, items: Vec<(Self::Prepared, BoundValues)>) -> Result<ResultSet> {
        let mut batch = Batch::new(BatchType::Logged);
        let mut values = Vec::with_capacity(items.len());
        for (prepared, bound) in items {
            batch.append_statement(prepared.as_ref().clone());
            values.push(bound);
        }
        let result = self.session.batch(&batch, values).await?;
        Ok(into_result_set(result))
    }
}

/// Build a session from configuration.
pub async fn connect(config: &GatewayConfig) -> Result<ScyllaBackend> {
    let nodes = config.contact_points();
    info!(hosts = ?nodes, "connecting to scylla");

    let mut sb = SessionBuilder::new().known_nodes(&nodes);
    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        sb = sb.user(user, pass);
    }
    if config.ssl {
        use openssl::ssl::{SslContext, SslMethod, SslVerifyMode};
        let mut ctx = SslContext::builder(SslMethod::tls()).context("ssl context")?;
        if let Some(ca_file) = &config.ssl_ca_bundle {
            ctx.set_ca_file(ca_file)
                .with_context(|| format!("loading CA bundle {ca_file}"))?;
        }
        ctx.set_verify(if config.ssl_insecure {
            SslVerifyMode::NONE
        } else {
            SslVerifyMode::PEER
        });
        sb = sb.ssl_context(Some(ctx.build()));
    }
    sb = sb.compression(match config.compression {
        CompressionKind::None => None,
        CompressionKind::Lz4 => Some(Compression::Lz4),
        CompressionKind::Snappy => Some(Compression::Snappy),
    });
    if let Some(ks) = &config.keyspace {
        sb = sb.use_keyspace(ks, false);
    }

    let session = sb
        .build()
        .await
        .with_context(|| format!("failed to connect to {}", nodes.join(",")))?;
    info!(hosts = ?nodes, keyspace = ?config.keyspace, "connected");
    Ok(ScyllaBackend::new(session).with_page_size(config.page_size()))
}
