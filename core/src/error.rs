use thiserror::Error;

/// Failure raised by a tool operation while talking to the Dokploy API.
///
/// Backends that know the HTTP status report it through [`ExecutionError::Api`],
/// so classification does not have to guess from the message text.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The API answered with a non-success status
    #[error("Request failed with status code {status}: {message}")]
    Api { status: u16, message: String },
    /// No API key was configured for an authenticated call
    #[error("Unauthorized: no Dokploy API key configured")]
    MissingCredentials,
    /// The API could not be reached at all
    #[error("Failed to reach Dokploy API at {url}: {message}")]
    Transport { url: String, message: String },
    /// The API answered but the body could not be read
    #[error("Failed to decode Dokploy API response: {0}")]
    Decode(String),
    /// Anything else, carried as free text
    #[error("{0}")]
    Other(String),
}

impl ExecutionError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// HTTP status of the failed call, when the backend reported one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Coarse failure classes the invocation wrapper turns into structured errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Authentication,
    NotFound,
    Server,
    Unknown,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Authentication => "authentication",
            FailureKind::NotFound => "not_found",
            FailureKind::Server => "server",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Maps a structured status code. Returns `None` for statuses without a
    /// dedicated class so callers can fall back to [`FailureKind::from_message`].
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            401 | 403 => Some(FailureKind::Authentication),
            404 => Some(FailureKind::NotFound),
            500..=599 => Some(FailureKind::Server),
            _ => None,
        }
    }

    /// Substring markers in priority order: auth, then not-found, then server.
    pub fn from_message(message: &str) -> Self {
        if message.contains("401") || message.contains("Unauthorized") {
            FailureKind::Authentication
        } else if message.contains("404") || message.contains("Not Found") {
            FailureKind::NotFound
        } else if message.contains("500") || message.contains("Internal Server Error") {
            FailureKind::Server
        } else {
            FailureKind::Unknown
        }
    }
}
