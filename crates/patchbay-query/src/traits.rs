use crate::error::Result;
use crate::types::{ConfigMap, ConnectionIdentity, ExecutionResult, QueryVisitorContext, TestResult};
use async_trait::async_trait;
use downcast_rs::{impl_downcast, Downcast};
use std::collections::HashSet;
use std::sync::Arc;

/// A resolved, typed datasource configuration.
///
/// Produced once per saved datasource definition by
/// [`DatasourcePlugin::resolve_config`] and immutable afterwards. The pool
/// only ever sees it through [`cache_key`](DatasourceConfig::cache_key).
pub trait DatasourceConfig: Send + Sync + std::fmt::Debug + Downcast {
    /// Derive the pooling key for this configuration.
    ///
    /// Must be deterministic and cover every field that affects connection
    /// behavior, so semantically identical configurations share a pool entry
    /// and differing ones never collide.
    fn cache_key(&self) -> ConnectionIdentity;
}

impl_downcast!(DatasourceConfig);

/// A live connection handle.
///
/// Entirely plugin-defined; the pool treats it as an opaque token and never
/// inspects its contents. Thread-safety of concurrent use is the owning
/// plugin's responsibility.
pub trait Connection: Send + Sync + Downcast {}

impl_downcast!(Connection);

/// Per-invocation execution context.
///
/// Built fresh immediately before a query runs and consumed exactly once;
/// never stored in the pool or shared across invocations.
pub trait QueryContext: Send + Downcast {
    /// Discriminator selecting the execution strategy within the plugin.
    fn action_type(&self) -> &str;

    /// Identifier of the visitor this invocation runs on behalf of.
    fn visitor_id(&self) -> &str;
}

impl_downcast!(QueryContext);

/// Contract every datasource plugin implements.
///
/// One implementation per supported external system, registered under
/// [`plugin_id`](DatasourcePlugin::plugin_id) with the
/// [`PluginRegistry`](crate::registry::PluginRegistry). Concrete
/// config/connection/context types live behind the erased traits above and
/// are recovered via downcasting inside the plugin.
#[async_trait]
pub trait DatasourcePlugin: Send + Sync {
    /// Identifier this plugin registers under (e.g. "sheets").
    fn plugin_id(&self) -> &'static str;

    /// Pure transform from an untyped map to the plugin's typed
    /// configuration. Fails with [`QueryError::Config`](crate::QueryError)
    /// if required fields are absent or malformed. Never performs I/O.
    fn resolve_config(&self, raw: &ConfigMap) -> Result<Arc<dyn DatasourceConfig>>;

    /// Semantic validation of a resolved configuration.
    ///
    /// Returns an empty set when valid, one code per distinct violation
    /// otherwise. Merely invalid configurations never error here.
    fn validate_config(&self, config: &dyn DatasourceConfig) -> HashSet<String>;

    /// Lightweight connectivity/auth check. Never installs anything into the
    /// pool.
    async fn test_connection(&self, config: &dyn DatasourceConfig) -> Result<TestResult>;

    /// Establish a connection. Possibly expensive and I/O-bound; invoked by
    /// the pool only on a cache miss, and must be safe to retry after a
    /// prior failure.
    async fn create_connection(&self, config: &dyn DatasourceConfig)
        -> Result<Arc<dyn Connection>>;

    /// Release resources held by a handle. Must tolerate resources already
    /// having been released.
    async fn destroy_connection(&self, connection: Arc<dyn Connection>) -> Result<()>;

    /// Build the per-invocation execution context: parse the action-type
    /// discriminator and action parameters from `query_config`, substitute
    /// runtime `request_params` into templated fields, and derive any
    /// per-call credentials.
    ///
    /// Fails with [`QueryError::QueryParam`](crate::QueryError) if the
    /// action type is unrecognized or required parameters remain unset after
    /// substitution, so dispatch never sees an invalid context. Credential
    /// derivation may block and should run via `spawn_blocking`.
    async fn build_execution_context(
        &self,
        config: &dyn DatasourceConfig,
        query_config: &ConfigMap,
        request_params: &ConfigMap,
        visitor: &QueryVisitorContext,
    ) -> Result<Box<dyn QueryContext>>;

    /// Execute one query against a pooled connection.
    ///
    /// Dispatches to the action handler selected by the context's action
    /// type. Every failure raised upstream or during dispatch is caught and
    /// converted into a structured failure result; this operation never
    /// raises.
    async fn execute_query(
        &self,
        connection: Arc<dyn Connection>,
        context: Box<dyn QueryContext>,
    ) -> ExecutionResult;
}
