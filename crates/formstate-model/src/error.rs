use std::path::PathBuf;

use thiserror::Error;

use crate::spec::FieldRole;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("object `{object}` declares more than one {role:?} field")]
    DuplicateRole { object: String, role: FieldRole },
}

pub type Result<T> = std::result::Result<T, ModelError>;
