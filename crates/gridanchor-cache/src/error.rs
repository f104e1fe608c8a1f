use thiserror::Error;

/// Why a backing resource could not be loaded. Recorded in the entry's
/// [`LoadState::Failed`](crate::LoadState::Failed) and never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("no content behind reference '{0}'")]
    NotFound(String),
    #[error("content transport failed: {0}")]
    Transport(String),
    #[error("load task aborted: {0}")]
    Aborted(String),
}
