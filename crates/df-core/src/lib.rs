//! Shared primitives used across domify crates.

/// Result alias used across the workspace.
pub type DomifyResult<T> = Result<T, DomifyError>;

/// Top-level error type surfaced by the lifecycle and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomifyError {
    /// The DOM provider could not be constructed from the given seed.
    #[error("provider initialization failed: {reason}")]
    ProviderInitialization { reason: String },
    /// An operation that needs an active DOM instance ran while idle.
    #[error("{operation} requires an active DOM instance")]
    NotInitialized { operation: &'static str },
    /// The global namespace refused a write or delete.
    #[error("global `{key}` could not be updated: {message}")]
    Namespace { key: String, message: String },
    /// Script evaluation or a DOM method call failed.
    #[error("script `{origin}` failed: {message}")]
    Script { origin: String, message: String },
}

impl DomifyError {
    pub fn provider_initialization(reason: impl Into<String>) -> Self {
        Self::ProviderInitialization {
            reason: reason.into(),
        }
    }

    pub fn not_initialized(operation: &'static str) -> Self {
        Self::NotInitialized { operation }
    }

    pub fn namespace(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Namespace {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn script(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Script {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProviderInitialization { .. } => "provider-initialization",
            Self::NotInitialized { .. } => "not-initialized",
            Self::Namespace { .. } => "namespace",
            Self::Script { .. } => "script",
        }
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized { .. })
    }

    pub fn is_provider_initialization(&self) -> bool {
        matches!(self, Self::ProviderInitialization { .. })
    }

    /// Folds any failure raised while building a provider into the
    /// provider-initialization class, keeping the original message.
    pub fn into_provider_initialization(self) -> Self {
        match self {
            Self::ProviderInitialization { .. } => self,
            other => Self::ProviderInitialization {
                reason: other.to_string(),
            },
        }
    }
}
