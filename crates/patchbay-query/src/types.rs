use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Untyped string-keyed map, as delivered by the request layer.
///
/// Used for raw datasource configuration, query descriptors, and runtime
/// request parameters alike.
pub type ConfigMap = HashMap<String, serde_json::Value>;

/// Pooling key derived deterministically from a resolved datasource
/// configuration.
///
/// Two semantically identical configurations must produce equal identities;
/// two configurations differing in any connection-relevant field must not.
/// The key material is plugin-defined and opaque to the pool.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    /// Plugin identifier, so identities from different plugins never collide.
    pub plugin: String,
    /// Plugin-defined key material covering every field that affects
    /// connection behavior.
    pub key: String,
}

impl ConnectionIdentity {
    pub fn new(plugin: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin, self.key)
    }
}

/// Outcome of a lightweight connectivity/auth check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    pub message: String,
}

impl TestResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Structured failure description inside an [`ExecutionResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Error taxonomy code (e.g. "SHEETS_REQUEST_ERROR").
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional upstream cause, stringified.
    pub cause: Option<String>,
}

/// Uniform result of one query execution.
///
/// Exactly one of success/failure is populated; upstream failures are always
/// captured and converted into the `Error` variant rather than raised out of
/// the contract boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionResult {
    Ok { data: serde_json::Value },
    Error(ExecutionFailure),
}

impl ExecutionResult {
    /// Create a success result with a plugin-defined payload.
    pub fn ok(data: serde_json::Value) -> Self {
        ExecutionResult::Ok { data }
    }

    /// Create a failure result with a taxonomy code and message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ExecutionResult::Error(ExecutionFailure {
            code: code.into(),
            message: message.into(),
            cause: None,
        })
    }

    /// Create a failure result carrying the stringified upstream cause.
    pub fn error_with_cause(
        code: impl Into<String>,
        message: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        ExecutionResult::Error(ExecutionFailure {
            code: code.into(),
            message: message.into(),
            cause: Some(cause.into()),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExecutionResult::Ok { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionResult::Error(_))
    }

    /// Success payload, if this is a success result.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            ExecutionResult::Ok { data } => Some(data),
            ExecutionResult::Error(_) => None,
        }
    }

    /// Failure description, if this is a failure result.
    pub fn failure(&self) -> Option<&ExecutionFailure> {
        match self {
            ExecutionResult::Ok { .. } => None,
            ExecutionResult::Error(f) => Some(f),
        }
    }
}

/// Caller identity carried into query context construction.
///
/// Owned by the request layer; this core only reads it while building a
/// [`QueryContext`](crate::traits::QueryContext).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryVisitorContext {
    /// Identifier of the visitor issuing the query.
    pub visitor_id: String,
    /// Organization the owning application belongs to, when known.
    pub org_id: Option<String>,
}

impl QueryVisitorContext {
    pub fn new(visitor_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            org_id: None,
        }
    }

    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }
}
