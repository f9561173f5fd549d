//! Mock datasource plugin shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use patchbay_query::{
    ConfigMap, Connection, ConnectionIdentity, DatasourceConfig, DatasourcePlugin, ExecutionResult,
    QueryContext, QueryError, QueryVisitorContext, Result, TestResult,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock configuration: `host` affects connection behavior, `label` does not.
#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    pub host: String,
    pub label: Option<String>,
}

impl DatasourceConfig for MockConfig {
    fn cache_key(&self) -> ConnectionIdentity {
        // `label` is display-only and deliberately excluded.
        ConnectionIdentity::new("mock", self.host.clone())
    }
}

pub struct MockConnection {
    pub serial: u64,
    closed: AtomicBool,
}

impl MockConnection {
    /// Returns true on the first close, false afterwards. Never panics on a
    /// double close.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connection for MockConnection {}

pub struct MockContext {
    pub action: String,
    pub visitor: String,
    pub params: ConfigMap,
}

impl QueryContext for MockContext {
    fn action_type(&self) -> &str {
        &self.action
    }

    fn visitor_id(&self) -> &str {
        &self.visitor
    }
}

/// Test double implementing the full plugin contract.
///
/// Supports the actions `echo` (returns its own params back) and `fail`
/// (simulates an upstream failure during dispatch).
pub struct MockPlugin {
    created: AtomicU64,
    attempts: AtomicU64,
    /// Number of upcoming creations that fail before succeeding again.
    fail_next_creations: AtomicU64,
    /// Widens the race window in concurrency tests.
    create_delay: Option<Duration>,
}

impl MockPlugin {
    pub fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            fail_next_creations: AtomicU64::new(0),
            create_delay: None,
        }
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn fail_next_creations(&self, n: u64) {
        self.fail_next_creations.store(n, Ordering::SeqCst);
    }

    /// Total successful `create_connection` calls across all identities.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    /// Total `create_connection` calls, including failed ones.
    pub fn create_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasourcePlugin for MockPlugin {
    fn plugin_id(&self) -> &'static str {
        "mock"
    }

    fn resolve_config(&self, raw: &ConfigMap) -> Result<Arc<dyn DatasourceConfig>> {
        let host = raw
            .get("host")
            .and_then(|v| v.as_str())
            .ok_or_else(|| QueryError::config("missing required field: host"))?;
        let label = raw
            .get("label")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        Ok(Arc::new(MockConfig {
            host: host.to_string(),
            label,
        }))
    }

    fn validate_config(&self, config: &dyn DatasourceConfig) -> HashSet<String> {
        let mut violations = HashSet::new();
        if let Some(config) = config.downcast_ref::<MockConfig>() {
            if config.host.is_empty() {
                violations.insert("MOCK_EMPTY_HOST".to_string());
            }
        }
        violations
    }

    async fn test_connection(&self, _config: &dyn DatasourceConfig) -> Result<TestResult> {
        Err(QueryError::unsupported(
            "mock datasource does not support connection tests",
        ))
    }

    async fn create_connection(
        &self,
        _config: &dyn DatasourceConfig,
    ) -> Result<Arc<dyn Connection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.fail_next_creations.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next_creations.store(remaining - 1, Ordering::SeqCst);
            return Err(QueryError::connection("mock creation failure"));
        }

        let serial = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(MockConnection {
            serial,
            closed: AtomicBool::new(false),
        }))
    }

    async fn destroy_connection(&self, connection: Arc<dyn Connection>) -> Result<()> {
        if let Some(connection) = connection.downcast_ref::<MockConnection>() {
            connection.close();
        }
        Ok(())
    }

    async fn build_execution_context(
        &self,
        _config: &dyn DatasourceConfig,
        query_config: &ConfigMap,
        request_params: &ConfigMap,
        visitor: &QueryVisitorContext,
    ) -> Result<Box<dyn QueryContext>> {
        let action = query_config
            .get("commandType")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        match action {
            "echo" | "fail" => Ok(Box::new(MockContext {
                action: action.to_string(),
                visitor: visitor.visitor_id.clone(),
                params: request_params.clone(),
            })),
            other => Err(QueryError::query_param(format!(
                "unknown commandType: {other}"
            ))),
        }
    }

    async fn execute_query(
        &self,
        connection: Arc<dyn Connection>,
        context: Box<dyn QueryContext>,
    ) -> ExecutionResult {
        let Some(context) = context.downcast_ref::<MockContext>() else {
            return ExecutionResult::error("MOCK_BAD_CONTEXT", "context type mismatch");
        };
        let Some(connection) = connection.downcast_ref::<MockConnection>() else {
            return ExecutionResult::error("MOCK_BAD_CONNECTION", "connection type mismatch");
        };

        match context.action_type() {
            "echo" => ExecutionResult::ok(serde_json::json!({
                "connection": connection.serial,
                "visitor": context.visitor,
                "params": context.params,
            })),
            "fail" => ExecutionResult::error_with_cause(
                "MOCK_REQUEST_ERROR",
                "upstream call failed",
                "simulated upstream outage",
            ),
            // Unreachable: unknown actions are rejected at context build.
            other => ExecutionResult::error(
                "MOCK_REQUEST_ERROR",
                format!("unhandled action: {other}"),
            ),
        }
    }
}

/// Raw configuration map for a mock datasource.
pub fn raw_config(host: &str) -> ConfigMap {
    let mut map = ConfigMap::new();
    map.insert("host".to_string(), serde_json::json!(host));
    map
}
