//! Request router: the `raw`, `prepared` and `prepare` actions.
//!
//! Every backend failure is caught here and turned into a [`Reply::Error`]
//! or a per-statement error entry; nothing escapes to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{Instrument, debug, info_span, warn};

use crate::bus::MessageHandler;
use crate::cache::PreparedStatementCache;
use crate::config::GatewayConfig;
use crate::db::{Backend, BoundValues, ResultSet, is_read_statement};
use crate::error::{GatewayError, GatewayResult};
use crate::marshal::Marshaler;
use crate::schema::{GenericValue, Reply};

pub struct Gateway<B: Backend> {
    backend: Arc<B>,
    cache: PreparedStatementCache<B>,
    marshaler: Marshaler,
}

/// Rows and error entries gathered across several statements.
#[derive(Default)]
struct Collected {
    entries: Vec<GenericValue>,
    failures: Vec<String>,
    attempted: usize,
}

impl Collected {
    fn absorb(&mut self, reply: Reply) {
        self.attempted += 1;
        match reply {
            Reply::Rows(rows) => self.entries.extend(rows),
            Reply::Ok => {}
            Reply::Error(message) => {
                self.entries.push(Reply::error_entry(&message));
                self.failures.push(message);
            }
        }
    }

    fn finish(self) -> Reply {
        if self.attempted > 0 && self.failures.len() == self.attempted {
            return Reply::Error(self.failures.join("; "));
        }
        if self.entries.is_empty() {
            Reply::Ok
        } else {
            Reply::Rows(self.entries)
        }
    }
}

impl<B: Backend> Gateway<B> {
    pub fn new(backend: Arc<B>, marshaler: Marshaler, cache_capacity: usize) -> Self {
        let cache = PreparedStatementCache::new(backend.clone(), cache_capacity);
        Self {
            backend,
            cache,
            marshaler,
        }
    }

    pub fn from_config(backend: Arc<B>, config: &GatewayConfig) -> Self {
        Self::new(backend, Marshaler::from_config(config), config.cache_capacity)
    }

    pub fn cache(&self) -> &PreparedStatementCache<B> {
        &self.cache
    }

    /// Route one request. Never fails; errors come back as [`Reply::Error`].
    pub async fn handle(&self, request: &Value) -> Reply {
        let Some(action) = request.get("action").and_then(Value::as_str) else {
            return Reply::Error(GatewayError::MissingAction.to_string());
        };
        let span = info_span!("request", action = %action);
        let outcome = async {
            match action {
                "raw" => self.raw(request).await,
                "prepared" => self.prepared(request).await,
                "prepare" => self.prepare(request).await,
                other => Err(GatewayError::UnknownAction(other.to_string())),
            }
        }
        .instrument(span)
        .await;
        match outcome {
            Ok(reply) => reply,
            Err(err) => {
                debug!(%action, error = %err, "request failed");
                Reply::Error(err.to_string())
            }
        }
    }

    async fn raw(&self, request: &Value) -> GatewayResult<Reply> {
        let statements = statements(request)?;
        if let [single] = statements.as_slice() {
            return Ok(self.raw_one(single).await);
        }
        if !statements.iter().any(|s| is_read_statement(s)) {
            return Ok(match self.backend.batch(statements).await {
                Ok(result) => self.rows_or_ok(&result),
                Err(err) => Reply::Error(GatewayError::execution(err).to_string()),
            });
        }
        // reads present: issue one by one in submission order
        let mut collected = Collected::default();
        for cql in &statements {
            collected.absorb(self.raw_one(cql).await);
        }
        Ok(collected.finish())
    }

    async fn raw_one(&self, cql: &str) -> Reply {
        match self.backend.query(cql).await {
            Ok(result) => self.rows_or_ok(&result),
            Err(err) => {
                warn!(statement = %cql, error = %format!("{err:#}"), "statement failed");
                Reply::Error(GatewayError::execution(err).to_string())
            }
        }
    }

    async fn prepared(&self, request: &Value) -> GatewayResult<Reply> {
        if let Some(cql) = request.get("statement").and_then(Value::as_str) {
            let tuples = tuples(request.get("values"))?;
            return Ok(self.prepared_one(cql, &tuples).await);
        }
        let statements = statements(request)?;
        let per_statement = match request.get("values") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(lists)) => lists.iter().collect(),
            Some(_) => {
                return Err(GatewayError::Invalid(
                    "'values' must be a list with one tuple list per statement".into(),
                ));
            }
        };
        let mut collected = Collected::default();
        for (i, cql) in statements.iter().enumerate() {
            let tuples = tuples(per_statement.get(i).copied())?;
            collected.absorb(self.prepared_one(cql, &tuples).await);
        }
        Ok(collected.finish())
    }

    /// One template, one execution per tuple. Reads flatten their rows,
    /// mutations run as a single logged batch.
    async fn prepared_one(&self, cql: &str, tuples: &[Vec<GenericValue>]) -> Reply {
        let handle = match self.cache.get_or_create(cql).await {
            Ok(handle) => handle,
            Err(err) => return Reply::Error(err.to_string()),
        };
        let types = self.backend.parameter_types(&handle);

        if is_read_statement(cql) {
            let mut rows = Vec::new();
            let mut failures = Vec::new();
            for tuple in tuples {
                let outcome = match self.marshaler.bind_tuple(tuple, &types) {
                    Ok(bound) => self
                        .backend
                        .execute(&handle, bound)
                        .await
                        .map_err(GatewayError::execution),
                    Err(err) => Err(err),
                };
                match outcome {
                    Ok(result) => rows.extend(self.generic_rows(&result)),
                    Err(err) => {
                        let message = err.to_string();
                        rows.push(Reply::error_entry(&message));
                        failures.push(message);
                    }
                }
            }
            if !failures.is_empty() && failures.len() == tuples.len() {
                return Reply::Error(failures.join("; "));
            }
            return Reply::Rows(rows);
        }

        let mut items: Vec<(B::Prepared, BoundValues)> = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            match self.marshaler.bind_tuple(tuple, &types) {
                Ok(bound) => items.push((handle.clone(), bound)),
                Err(err) => return Reply::Error(err.to_string()),
            }
        }
        let outcome = if items.len() == 1 {
            let (handle, bound) = items.remove(0);
            self.backend.execute(&handle, bound).await
        } else {
            self.backend.execute_batch(items).await
        };
        match outcome {
            Ok(result) => self.rows_or_ok(&result),
            Err(err) => Reply::Error(GatewayError::execution(err).to_string()),
        }
    }

    async fn prepare(&self, request: &Value) -> GatewayResult<Reply> {
        let statements = statements(request)?;
        self.cache.warm(&statements).await?;
        debug!(count = statements.len(), "warmed statement cache");
        Ok(Reply::Ok)
    }

    fn generic_rows(&self, result: &ResultSet) -> Vec<GenericValue> {
        self.marshaler
            .marshal_rows(result)
            .into_iter()
            .map(GenericValue::Map)
            .collect()
    }

    fn rows_or_ok(&self, result: &ResultSet) -> Reply {
        if result.is_empty() {
            Reply::Ok
        } else {
            Reply::Rows(self.generic_rows(result))
        }
    }
}

/// `statement` (string) or `statements` (non-empty list of strings).
fn statements(request: &Value) -> GatewayResult<Vec<String>> {
    if let Some(cql) = request.get("statement").and_then(Value::as_str) {
        return Ok(vec![cql.to_string()]);
    }
    let Some(list) = request.get("statements").and_then(Value::as_array) else {
        return Err(GatewayError::Invalid(
            "expected 'statement' or 'statements'".into(),
        ));
    };
    if list.is_empty() {
        return Err(GatewayError::Invalid("'statements' is empty".into()));
    }
    list.iter()
        .map(|s| {
            s.as_str()
                .map(str::to_string)
                .ok_or_else(|| GatewayError::Invalid("'statements' must hold strings".into()))
        })
        .collect()
}

/// Parameter tuples for one template. Missing or empty means one execution
/// with no parameters.
fn tuples(values: Option<&Value>) -> GatewayResult<Vec<Vec<GenericValue>>> {
    let list = match values {
        None | Some(Value::Null) => return Ok(vec![Vec::new()]),
        Some(Value::Array(list)) => list,
        Some(_) => return Err(GatewayError::Invalid("'values' must be a list of lists".into())),
    };
    if list.is_empty() {
        return Ok(vec![Vec::new()]);
    }
    list.iter()
        .map(|tuple| match tuple {
            Value::Array(items) => Ok(items.iter().cloned().map(GenericValue::from).collect()),
            _ => Err(GatewayError::Invalid(
                "each entry of 'values' must be a list".into(),
            )),
        })
        .collect()
}

#[async_trait]
impl<B: Backend> MessageHandler for Gateway<B> {
    async fn handle(&self, body: Value) -> GatewayResult<Value> {
        match Gateway::handle(self, &body).await {
            Reply::Error(message) => Err(GatewayError::Failed(message)),
            reply => Ok(reply.into_value()),
        }
    }
}
