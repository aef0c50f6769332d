//! In-process addressable message bus.
//!
//! Handlers register under a string address; senders reach them by address
//! and get exactly one reply back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, body: Value) -> GatewayResult<Value>;
}

#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn MessageHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` at `address`, replacing any previous one.
    pub async fn register(&self, address: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        let address = address.into();
        debug!(%address, "registering handler");
        if self
            .handlers
            .write()
            .await
            .insert(address.clone(), handler)
            .is_some()
        {
            warn!(%address, "replaced existing handler");
        }
    }

    pub async fn unregister(&self, address: &str) -> bool {
        self.handlers.write().await.remove(address).is_some()
    }

    pub async fn is_registered(&self, address: &str) -> bool {
        self.handlers.read().await.contains_key(address)
    }

    async fn handler(&self, address: &str) -> GatewayResult<Arc<dyn MessageHandler>> {
        self.handlers
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or_else(|| GatewayError::NoHandler(address.to_string()))
    }

    pub async fn send(&self, address: &str, body: Value) -> GatewayResult<Value> {
        let handler = self.handler(address).await?;
        handler.handle(body).await
    }

    /// Like [`send`](Self::send) but the handler runs on its own task and the
    /// caller stops waiting after `timeout`. A late reply is dropped.
    pub async fn send_with_timeout(
        &self,
        address: &str,
        body: Value,
        timeout: Duration,
    ) -> GatewayResult<Value> {
        let handler = self.handler(address).await?;
        let task = tokio::spawn(async move { handler.handle(body).await });
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(join)) => Err(GatewayError::Failed(format!("handler task failed: {join}"))),
            Err(_) => Err(GatewayError::Timeout(timeout)),
        }
    }
}
