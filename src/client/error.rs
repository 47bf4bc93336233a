// ABOUTME: Error type shared by all control-plane client traits.
// ABOUTME: Implementations map their SDK errors onto these variants.

/// Errors surfaced by a control-plane client. Calls are never retried by the
/// engine; transient failures reach the caller as `Api`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("{operation} rejected: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },
}

impl ClientError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        ClientError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn rejected(operation: &'static str, message: impl Into<String>) -> Self {
        ClientError::Rejected {
            operation,
            message: message.into(),
        }
    }

    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        ClientError::Api {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}
