//! Error taxonomy for the gateway.

use std::time::Duration;

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the router, the cache, the bus and the aggregator.
///
/// Backend failures arrive as `anyhow::Error` and are flattened into the
/// `Prepare` / `Execution` variants at the router boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// Request carried no `action` field
    #[error("please specify an action")]
    MissingAction,

    /// Request carried an action the router does not know
    #[error("action '{0}' unknown")]
    UnknownAction(String),

    /// Malformed payload (missing statement, wrong shapes, ...)
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Statement could not be compiled by the backend
    #[error("could not prepare statement: {0}")]
    Prepare(String),

    /// Backend execution raised
    #[error("execution failed: {0}")]
    Execution(String),

    /// A parameter value does not fit its placeholder
    #[error("could not bind value: {0}")]
    Bind(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("no handler registered at '{0}'")]
    NoHandler(String),

    /// A handler replied with an error status
    #[error("{0}")]
    Failed(String),
}

impl GatewayError {
    pub(crate) fn prepare(err: anyhow::Error) -> Self {
        GatewayError::Prepare(format!("{err:#}"))
    }

    pub(crate) fn execution(err: anyhow::Error) -> Self {
        GatewayError::Execution(format!("{err:#}"))
    }
}
