pub mod batch;
pub mod bus;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod marshal;
pub mod schema;
pub mod server;
#[cfg(feature = "session")]
pub mod session;
pub mod stdio;
pub mod telemetry;

pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use schema::{GenericValue, Number, Reply};
