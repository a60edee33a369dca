use std::fmt;
use thiserror::Error;

/// Unified error type for the coordination kernel
#[derive(Debug, Error)]
pub enum KernelError {
    /// A fork was acquired while already held, or released while free.
    /// Always a bug in the acquisition protocol, never a runtime condition.
    #[error("Protocol violation on {resource}: {message}")]
    ProtocolViolation { resource: String, message: String },

    /// Watchdog expired before the guarded operation finished
    #[error("Operation timed out: {operation} (timeout: {timeout_ms}ms)")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Watchdog expired and the wait-for graph contains a cycle
    #[error("Deadlock detected: {cycle}")]
    Deadlock { cycle: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// A blocking wait was interrupted by a shutdown signal
    #[error("Operation was cancelled: {operation}")]
    Cancelled { operation: String },

    /// The producer of a future went away without delivering its value
    #[error("Future {source_index} was abandoned before delivering a value")]
    Abandoned { source_index: usize },

    /// A supervised task panicked or was aborted
    #[error("Task {task} failed to join: {message}")]
    Join { task: String, message: String },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl KernelError {
    /// Create a protocol violation error
    pub fn protocol_violation<S: Into<String>, M: Into<String>>(resource: S, message: M) -> Self {
        Self::ProtocolViolation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn deadlock<S: Into<String>>(cycle: S) -> Self {
        Self::Deadlock {
            cycle: cycle.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error tied to a specific field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn abandoned(source_index: usize) -> Self {
        Self::Abandoned { source_index }
    }

    /// Create a join error
    pub fn join<S: Into<String>, M: fmt::Display>(task: S, message: M) -> Self {
        Self::Join {
            task: task.into(),
            message: message.to_string(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Protocol violations and deadlocks are defects; everything else can be
    /// reported and the caller may decide to run again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Cancelled { .. } | Self::Abandoned { .. } => true,
            Self::ProtocolViolation { .. } | Self::Deadlock { .. } => false,
            Self::Configuration { .. } | Self::Serialization { .. } => false,
            Self::Join { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::ProtocolViolation { .. } => "protocol",
            Self::Timeout { .. } => "timeout",
            Self::Deadlock { .. } => "deadlock",
            Self::Configuration { .. } => "configuration",
            Self::Cancelled { .. } => "cancelled",
            Self::Abandoned { .. } => "abandoned",
            Self::Join { .. } => "join",
            Self::Serialization { .. } => "serialization",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, KernelError>;

impl From<serde_yaml::Error> for KernelError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

impl From<tokio::task::JoinError> for KernelError {
    fn from(err: tokio::task::JoinError) -> Self {
        let task = if err.is_cancelled() { "aborted" } else { "panicked" };
        Self::join(task, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = KernelError::protocol_violation("fork 3", "released while free");
        assert!(matches!(err, KernelError::ProtocolViolation { .. }));
        assert_eq!(err.category(), "protocol");
        assert_eq!(
            err.to_string(),
            "Protocol violation on fork 3: released while free"
        );
    }

    #[test]
    fn test_error_recoverability() {
        assert!(KernelError::timeout("dining", 1000).is_recoverable());
        assert!(KernelError::abandoned(2).is_recoverable());
        assert!(!KernelError::deadlock("p0 -> f1 -> p1 -> f0 -> p0").is_recoverable());
        assert!(!KernelError::protocol_violation("fork 0", "double acquire").is_recoverable());
        assert!(!KernelError::configuration("bad").is_recoverable());
    }

    #[test]
    fn test_configuration_field() {
        let err = KernelError::configuration_field("must be positive", "rounds");
        if let KernelError::Configuration { field, .. } = err {
            assert_eq!(field.as_deref(), Some("rounds"));
        } else {
            panic!("Expected configuration error");
        }
    }

    #[test]
    fn test_yaml_error_conversion() {
        let parse: std::result::Result<u32, _> = serde_yaml::from_str("[not, a, number]");
        let err: KernelError = parse.unwrap_err().into();
        assert_eq!(err.category(), "serialization");
    }
}
