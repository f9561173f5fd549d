use thiserror::Error;

/// Unified error type for all datasource framework operations.
///
/// This is the closed taxonomy surfaced at the plugin contract boundary.
/// Validation violations are not errors (see
/// [`DatasourcePlugin::validate_config`](crate::traits::DatasourcePlugin::validate_config))
/// and execution-time failures are normalized into
/// [`ExecutionResult`](crate::types::ExecutionResult) instead of raised.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Raw configuration cannot be resolved into a typed configuration
    /// (missing or malformed required field).
    #[error("Invalid datasource configuration: {0}")]
    Config(String),

    /// Connection creation or test failed against the upstream system.
    #[error("Connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query configuration references an unknown action, or required
    /// parameters remain unset after runtime-parameter substitution.
    /// Detected during context construction, before any upstream call.
    #[error("Invalid query parameters: {0}")]
    QueryParam(String),

    /// No plugin registered under the requested identifier.
    #[error("No plugin registered for: {0}")]
    PluginNotFound(String),

    /// Operation is not applicable for this plugin.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// Framework invariant breakage.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Create a configuration error with a custom message.
    pub fn config(msg: impl Into<String>) -> Self {
        QueryError::Config(msg.into())
    }

    /// Create a connection error without an upstream cause.
    pub fn connection(msg: impl Into<String>) -> Self {
        QueryError::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error wrapping the upstream cause.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        QueryError::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query parameter error.
    pub fn query_param(msg: impl Into<String>) -> Self {
        QueryError::QueryParam(msg.into())
    }

    /// Create an operation not supported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        QueryError::Unsupported(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
