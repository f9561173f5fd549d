use crate::error::{QueryError, Result};
use crate::pool::ConnectionPool;
use crate::traits::DatasourcePlugin;
use crate::types::{ConfigMap, ExecutionResult, QueryVisitorContext, TestResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Registry of datasource plugins, keyed by plugin identifier.
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<dyn DatasourcePlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
        }
    }

    /// Register a plugin under its identifier.
    pub async fn register(&self, plugin: Arc<dyn DatasourcePlugin>) {
        let id = plugin.plugin_id();
        let mut plugins = self.plugins.write().await;

        if plugins.contains_key(id) {
            warn!("Overwriting existing plugin registration: {}", id);
        }

        plugins.insert(id.to_string(), plugin);
        debug!("Registered datasource plugin: {}", id);
    }

    /// Look up a plugin by identifier.
    pub async fn get(&self, plugin_id: &str) -> Result<Arc<dyn DatasourcePlugin>> {
        let plugins = self.plugins.read().await;
        plugins
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| QueryError::PluginNotFound(plugin_id.to_string()))
    }

    /// List registered plugin identifiers.
    pub async fn plugin_ids(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        plugins.keys().cloned().collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// End-to-end query execution facade over the registry and the pool.
///
/// Drives the full lifecycle for one query: resolve configuration, validate
/// it, acquire the pooled connection, build the per-call context, execute,
/// and hand back the normalized result. Configuration- and parameter-level
/// errors fail fast before any connection is touched.
pub struct QueryExecutor {
    registry: Arc<PluginRegistry>,
    pool: Arc<ConnectionPool>,
}

impl QueryExecutor {
    pub fn new(registry: Arc<PluginRegistry>, pool: Arc<ConnectionPool>) -> Self {
        Self { registry, pool }
    }

    /// The pool backing this executor, for diagnostics and invalidation.
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Execute one query against the datasource described by `raw_config`.
    pub async fn execute(
        &self,
        plugin_id: &str,
        raw_config: &ConfigMap,
        query_config: &ConfigMap,
        request_params: &ConfigMap,
        visitor: &QueryVisitorContext,
    ) -> Result<ExecutionResult> {
        let plugin = self.registry.get(plugin_id).await?;

        let config = plugin.resolve_config(raw_config)?;
        let violations = plugin.validate_config(config.as_ref());
        if !violations.is_empty() {
            let mut codes: Vec<String> = violations.into_iter().collect();
            codes.sort();
            return Err(QueryError::Config(format!(
                "configuration invalid: {}",
                codes.join(", ")
            )));
        }

        let connection = self.pool.get(plugin.as_ref(), config.as_ref()).await?;

        let context = plugin
            .build_execution_context(config.as_ref(), query_config, request_params, visitor)
            .await?;

        debug!(
            "Executing {} action for visitor {} via plugin {}",
            context.action_type(),
            visitor.visitor_id,
            plugin_id
        );

        Ok(plugin.execute_query(connection, context).await)
    }

    /// Resolve and semantically validate a raw configuration.
    ///
    /// Returns the violation codes; an empty set means valid.
    pub async fn validate_datasource(
        &self,
        plugin_id: &str,
        raw_config: &ConfigMap,
    ) -> Result<HashSet<String>> {
        let plugin = self.registry.get(plugin_id).await?;
        let config = plugin.resolve_config(raw_config)?;
        Ok(plugin.validate_config(config.as_ref()))
    }

    /// Run the plugin's lightweight connectivity check. Nothing is installed
    /// into the pool.
    pub async fn test_datasource(
        &self,
        plugin_id: &str,
        raw_config: &ConfigMap,
    ) -> Result<TestResult> {
        let plugin = self.registry.get(plugin_id).await?;
        let config = plugin.resolve_config(raw_config)?;
        plugin.test_connection(config.as_ref()).await
    }
}
