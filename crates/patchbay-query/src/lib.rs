//! # patchbay-query
//!
//! Core abstractions for pluggable datasource connection pooling and query
//! execution in Patchbay.
//!
//! Independently developed datasource plugins (one per external system: a
//! spreadsheet API, a database, a mock test double, ...) share a uniform
//! lifecycle:
//!
//! 1. resolve raw configuration into a validated, typed descriptor
//! 2. obtain a pooled connection keyed by that descriptor's identity
//! 3. execute a single query inside a context built specifically for the call
//!
//! ## Architecture
//!
//! - **DatasourcePlugin**: the contract every plugin implements (resolve,
//!   validate, test, create/destroy connection, build context, execute)
//! - **ConnectionPool**: concurrency-safe identity → handle cache with
//!   single-flight creation and a diagnostics counter
//! - **PluginRegistry / QueryExecutor**: plugin lookup plus the end-to-end
//!   control flow for one query invocation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use patchbay_query::{ConnectionPool, PluginRegistry, QueryExecutor, QueryVisitorContext};
//!
//! # async fn example(plugin: Arc<dyn patchbay_query::DatasourcePlugin>) -> patchbay_query::Result<()> {
//! let registry = Arc::new(PluginRegistry::new());
//! registry.register(plugin).await;
//!
//! let executor = QueryExecutor::new(registry, Arc::new(ConnectionPool::new()));
//!
//! let raw_config = serde_json::from_value(serde_json::json!({
//!     "serviceAccount": "{\"client_email\": \"svc@example.test\"}"
//! })).unwrap();
//! let query_config = serde_json::from_value(serde_json::json!({
//!     "commandType": "readData",
//!     "command": { "spreadsheetId": "s1", "range": "A1:B2" }
//! })).unwrap();
//!
//! let visitor = QueryVisitorContext::new("visitor-1");
//! let _result = executor
//!     .execute("sheets", &raw_config, &query_config, &Default::default(), &visitor)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Implementing a plugin
//!
//! 1. Define a config type implementing `DatasourceConfig` (its `cache_key`
//!    decides pooling identity)
//! 2. Define a connection handle implementing `Connection` and a per-call
//!    context implementing `QueryContext`
//! 3. Implement `DatasourcePlugin`, dispatching `execute_query` over the
//!    plugin's closed action set
//! 4. Register the plugin with `PluginRegistry`
//!
//! Example plugin crates:
//! - `patchbay-query-sheets` - spreadsheet datasource implementation

pub mod error;
pub mod pool;
pub mod registry;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{QueryError, Result};
pub use pool::ConnectionPool;
pub use registry::{PluginRegistry, QueryExecutor};
pub use traits::{Connection, DatasourceConfig, DatasourcePlugin, QueryContext};
pub use types::{
    ConfigMap, ConnectionIdentity, ExecutionFailure, ExecutionResult, QueryVisitorContext,
    TestResult,
};
