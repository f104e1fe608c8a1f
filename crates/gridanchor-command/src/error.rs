use thiserror::Error;

/// Errors surfaced by [`CommandBus`](crate::CommandBus) dispatch.
///
/// A handler that merely declines returns `Ok(false)`; these variants are for
/// hard failures only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no handler registered for command '{0}'")]
    HandlerMissing(String),
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),
    #[error("invalid parameters for '{id}': {reason}")]
    InvalidParams { id: String, reason: String },
    #[error("command '{id}' failed: {reason}")]
    Failed { id: String, reason: String },
}

impl CommandError {
    pub fn invalid_params(id: &str, reason: impl ToString) -> Self {
        CommandError::InvalidParams {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}
