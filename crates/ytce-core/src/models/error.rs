use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ModelErrorKind {
    RateLimited,
    Timeout,
    AuthFailure,
    TransportError,
    InvalidResponse,
}

impl ModelErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::AuthFailure => "auth_failure",
            Self::TransportError => "transport_error",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

/// Failure reported by a model adapter for a single `generate` call.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    Config,
    Validation,
    Model(ModelErrorKind),
    Checkpoint,
    Cancelled,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub task: Option<String>,
    pub comment: Option<String>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            task: None,
            comment: None,
            kind,
            message: message.into(),
        }
    }

    pub fn config(task: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            task: task.map(str::to_string),
            comment: None,
            kind: CoreErrorKind::Config,
            message: message.into(),
        }
    }

    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Checkpoint, message)
    }

    pub fn for_task(mut self, task_id: &str) -> Self {
        if self.task.is_none() {
            self.task = Some(task_id.to_string());
        }
        self
    }

    /// Errors that must stop the whole run rather than degrade a batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CoreErrorKind::Config
                | CoreErrorKind::Checkpoint
                | CoreErrorKind::Model(ModelErrorKind::AuthFailure)
        )
    }
}

impl From<ModelError> for CoreError {
    fn from(error: ModelError) -> Self {
        Self::new(CoreErrorKind::Model(error.kind), error.message)
    }
}
