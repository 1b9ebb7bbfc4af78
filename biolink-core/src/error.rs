use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Why a messaging platform call failed.
///
/// None of these are fatal to a moderation event. `ChatUnavailable` is the
/// one class that changes stored state: it means the bot can no longer act in
/// the chat at all, and the chat's records get cleaned up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network failure, timeout, rate limit or platform-side error. Retryable.
    #[error("{method} failed transiently: {message}")]
    Transient {
        method: &'static str,
        message: String,
    },

    /// The bot lacks the rights for this call (e.g. not an admin, target is an admin).
    #[error("{method} was refused: {message}")]
    Permission {
        method: &'static str,
        message: String,
    },

    /// The target user or message no longer exists.
    #[error("{method} target not found: {message}")]
    TargetNotFound {
        method: &'static str,
        message: String,
    },

    /// The bot was removed from, or blocked in, the chat.
    #[error("{method} chat unavailable: {message}")]
    ChatUnavailable {
        method: &'static str,
        message: String,
    },
}

impl GatewayError {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Transient { method, .. }
            | Self::Permission { method, .. }
            | Self::TargetNotFound { method, .. }
            | Self::ChatUnavailable { method, .. } => method,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_chat_unavailable(&self) -> bool {
        matches!(self, Self::ChatUnavailable { .. })
    }

    pub fn timed_out(method: &'static str, after: std::time::Duration) -> Self {
        Self::Transient {
            method,
            message: format!("no response after {}ms", after.as_millis()),
        }
    }
}
