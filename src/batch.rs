//! Batch fan-out / fan-in.
//!
//! Every sub-request runs on its own task under its own timeout. Completions
//! are consumed as they arrive, and the single reply goes out through a
//! `oneshot` sender that is consumed when the last completion lands.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, info_span, warn};

use crate::bus::{EventBus, MessageHandler};
use crate::error::{GatewayError, GatewayResult};
use crate::schema::{Reply, is_error_body};

pub const NO_RESULTS_MESSAGE: &str = "received no results";

/// Anything a sub-request can be sent to.
#[async_trait]
pub trait Downstream: Send + Sync + 'static {
    async fn call(&self, body: Value) -> GatewayResult<Value>;
}

/// Sends sub-requests over the bus.
///
/// A sub-request shaped `{"address": .., "body": ..}` goes to its own
/// address, anything else to the default one. Replies with an error status
/// count as failures.
#[derive(Clone)]
pub struct BusTarget {
    bus: EventBus,
    address: String,
}

impl BusTarget {
    pub fn new(bus: EventBus, address: impl Into<String>) -> Self {
        Self {
            bus,
            address: address.into(),
        }
    }
}

#[async_trait]
impl Downstream for BusTarget {
    async fn call(&self, body: Value) -> GatewayResult<Value> {
        let (address, body) = match body {
            Value::Object(mut m) if m.contains_key("address") && m.contains_key("body") => {
                let address = m
                    .remove("address")
                    .and_then(|a| a.as_str().map(str::to_string))
                    .unwrap_or_else(|| self.address.clone());
                (address, m.remove("body").unwrap_or(Value::Null))
            }
            other => (self.address.clone(), other),
        };
        reject_error_reply(self.bus.send(&address, body).await?)
    }
}

/// Calls a handler directly, without a bus in between.
pub struct HandlerTarget(pub Arc<dyn MessageHandler>);

#[async_trait]
impl Downstream for HandlerTarget {
    async fn call(&self, body: Value) -> GatewayResult<Value> {
        reject_error_reply(self.0.handle(body).await?)
    }
}

/// A reply carrying `status: "error"` counts as a failed sub-request.
fn reject_error_reply(reply: Value) -> GatewayResult<Value> {
    if is_error_body(&reply) {
        let message = reply
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("error reply");
        return Err(GatewayError::Failed(message.to_string()));
    }
    Ok(reply)
}

/// Completion bookkeeping for one batch.
pub struct BatchRequest {
    remaining: usize,
    results: Vec<Value>,
    reply: Option<oneshot::Sender<Vec<Value>>>,
}

impl BatchRequest {
    pub fn new(len: usize) -> (Self, oneshot::Receiver<Vec<Value>>) {
        let (tx, rx) = oneshot::channel();
        let mut request = Self {
            remaining: len,
            results: Vec::with_capacity(len),
            reply: Some(tx),
        };
        if len == 0 {
            request.finish();
        }
        (request, rx)
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_replied(&self) -> bool {
        self.reply.is_none()
    }

    /// Record one completion; `None` is a failure or a timeout.
    pub fn complete(&mut self, outcome: Option<Value>) {
        if self.is_replied() {
            // late completion after the reply shipped
            return;
        }
        if let Some(value) = outcome {
            self.results.push(value);
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.finish();
        }
    }

    fn finish(&mut self) {
        let Some(tx) = self.reply.take() else {
            return;
        };
        if self.results.is_empty() {
            self.results.push(Reply::error_body(NO_RESULTS_MESSAGE));
        }
        let _ = tx.send(std::mem::take(&mut self.results));
    }
}

/// Send every sub-request concurrently and gather the successes in
/// completion order.
pub async fn dispatch<D: Downstream>(
    downstream: Arc<D>,
    sub_requests: Vec<Value>,
    per_item_timeout: Duration,
) -> Vec<Value> {
    let (mut request, rx) = BatchRequest::new(sub_requests.len());

    let mut pending: FuturesUnordered<_> = sub_requests
        .into_iter()
        .enumerate()
        .map(|(index, body)| {
            let downstream = downstream.clone();
            let task = tokio::spawn(
                async move { downstream.call(body).await }
                    .instrument(info_span!("sub_request", index)),
            );
            async move { (index, tokio::time::timeout(per_item_timeout, task).await) }
        })
        .collect();

    while let Some((index, outcome)) = pending.next().await {
        let value = match outcome {
            Ok(Ok(Ok(value))) => Some(value),
            Ok(Ok(Err(err))) => {
                debug!(index, error = %err, "sub-request failed");
                None
            }
            Ok(Err(join)) => {
                warn!(index, error = %join, "sub-request task aborted");
                None
            }
            Err(_) => {
                // the spawned task is detached and its late result dropped
                warn!(index, timeout_ms = per_item_timeout.as_millis() as u64, "sub-request timed out");
                None
            }
        };
        request.complete(value);
    }

    rx.await
        .unwrap_or_else(|_| vec![Reply::error_body(NO_RESULTS_MESSAGE)])
}

/// Handler for the batch address: forwards each element of a list body.
pub struct BatchProcessor<D: Downstream> {
    downstream: Arc<D>,
    timeout: Duration,
}

impl<D: Downstream> BatchProcessor<D> {
    pub fn new(downstream: Arc<D>, timeout: Duration) -> Self {
        Self {
            downstream,
            timeout,
        }
    }
}

#[async_trait]
impl<D: Downstream> MessageHandler for BatchProcessor<D> {
    async fn handle(&self, body: Value) -> GatewayResult<Value> {
        let Value::Array(sub_requests) = body else {
            return Err(GatewayError::Invalid(
                "batch body must be a list of requests".into(),
            ));
        };
        debug!(count = sub_requests.len(), "dispatching batch");
        let results = dispatch(self.downstream.clone(), sub_requests, self.timeout).await;
        Ok(Value::Array(results))
    }
}
