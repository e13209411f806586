use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("`{key}` is read-only")]
    ReadOnly { key: String },
    #[error("invariant violated: {message}")]
    InvariantViolation { message: String },
    #[error("cannot commit changes while an auto-save is in flight")]
    CommitDuringAutoSave,
    #[error("`{key}` expects a {expected} value, got {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("failed to schedule auto-save: {0}")]
    Spawn(#[from] futures::task::SpawnError),
}

impl FormError {
    pub(crate) fn detached(key: &str) -> Self {
        let message = format!("`{key}` was used after its owning object was dropped or before it was built");
        tracing::error!(key, "{message}");
        FormError::InvariantViolation { message }
    }
}

pub type Result<T> = std::result::Result<T, FormError>;
