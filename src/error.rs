use thiserror::Error;

/// Main error type for AeroTrack
#[derive(Error, Debug)]
pub enum AeroTrackError {
    #[error("Document store operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Document encoding failed: {context}")]
    Encoding {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request to {service} failed: {message}")]
    Transport {
        service: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("File I/O error: {path}")]
    FileIO {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
}

impl AeroTrackError {
    /// Create a document store error
    pub fn database(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Database {
            operation: operation.into(),
            source,
        }
    }

    pub fn encoding(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encoding {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error with the underlying HTTP failure
    pub fn transport(service: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            service: service.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a transport error from a bad status or unreadable body
    pub fn transport_message(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a file I/O error
    pub fn file_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileIO {
            path: path.into(),
            source,
        }
    }

    /// Check if error is recoverable (the caller can keep going)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AeroTrackError::Transport { .. } => true,
            AeroTrackError::Encoding { .. } => true,
            AeroTrackError::InvalidInput { .. } => true,
            AeroTrackError::NotFound { .. } => true,
            AeroTrackError::Database { .. } => false,
            AeroTrackError::Configuration { .. } => false,
            _ => true,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AeroTrackError::Database { .. } => {
                "💾 Could not reach the maintenance database. Your change was not saved.".to_string()
            }
            AeroTrackError::Transport { service, .. } => {
                format!("📡 {} is not responding right now. Please try again later.", service)
            }
            AeroTrackError::Auth { message } => format!("🔒 {}", message),
            AeroTrackError::NotAuthenticated => {
                "🔒 Please sign in first (aerotrack login).".to_string()
            }
            AeroTrackError::NotFound { kind, id } => format!("🔍 No {} with id {}", kind, id),
            AeroTrackError::InvalidInput { message } => format!("✋ {}", message),
            AeroTrackError::Configuration { message } => format!("⚙️  {}", message),
            _ => "✈️  Something went wrong. Check the logs for details.".to_string(),
        }
    }
}

/// Result type alias for convenience
pub type AeroResult<T> = Result<T, AeroTrackError>;

/// Error context for adding additional information
pub trait ErrorContext<T> {
    fn with_store_context(self, operation: &str) -> AeroResult<T>;
}

impl<T> ErrorContext<T> for Result<T, sqlx::Error> {
    fn with_store_context(self, operation: &str) -> AeroResult<T> {
        self.map_err(|e| AeroTrackError::database(operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(AeroTrackError::invalid_input("empty query").is_recoverable());
        assert!(AeroTrackError::transport_message("dialog agent", "HTTP 502").is_recoverable());
        assert!(!AeroTrackError::configuration("missing url").is_recoverable());
    }

    #[test]
    fn test_user_message_names_service() {
        let err = AeroTrackError::transport_message("Dialog agent", "HTTP 503");
        assert!(err.user_message().contains("Dialog agent"));
    }
}
