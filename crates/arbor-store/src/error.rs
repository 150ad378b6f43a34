use arbor_graph::GraphError;

/// Errors from the storage facade, its adapters and backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An operation other than `load` was called before `load`.
    #[error("storage is not loaded")]
    NotLoaded,

    /// `load` was called on storage that is already loaded.
    #[error("storage is already loaded")]
    AlreadyLoaded,

    /// The storage has been closed; no further operations are possible.
    #[error("storage is closed")]
    Closed,

    /// A named tree or map was reopened with a translator of a different
    /// concrete kind than the one it was first opened with.
    #[error("{role} translator mismatch for '{name}': opened with {expected}, got {found}")]
    TranslatorMismatch {
        name: String,
        role: &'static str,
        expected: String,
        found: String,
    },

    /// A named tree or map was reopened with different key or value types.
    #[error("type mismatch for '{name}': expected {expected}")]
    TypeMismatch { name: String, expected: String },

    /// A tree or map name that cannot be stored.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A graph operation was rejected.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The backend could not produce the named tree or map.
    #[error("could not materialize '{name}': {reason}")]
    Materialize { name: String, reason: String },

    /// The backend could not save open trees and maps.
    #[error("could not persist: {reason}")]
    Persist { reason: String },

    /// The backend could not delete the named tree or map.
    #[error("could not delete '{name}': {reason}")]
    Delete { name: String, reason: String },

    /// A value could not be encoded or decoded by its translator.
    #[error("translation error: {0}")]
    Translation(String),

    /// Stored data failed its integrity check or could not be parsed.
    #[error("corrupt table '{name}': {reason}")]
    Corrupt { name: String, reason: String },

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// `true` for programmer errors that retrying cannot fix; `false` for
    /// failures of the environment or the backing store.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            StoreError::NotLoaded
                | StoreError::AlreadyLoaded
                | StoreError::Closed
                | StoreError::TranslatorMismatch { .. }
                | StoreError::TypeMismatch { .. }
                | StoreError::InvalidName { .. }
                | StoreError::InvalidConfig(_)
                | StoreError::Graph(_)
        )
    }

    pub(crate) fn materialize(name: &str, source: impl std::fmt::Display) -> Self {
        StoreError::Materialize {
            name: name.to_string(),
            reason: source.to_string(),
        }
    }

    pub(crate) fn persist(source: impl std::fmt::Display) -> Self {
        StoreError::Persist {
            reason: source.to_string(),
        }
    }

    pub(crate) fn delete(name: &str, source: impl std::fmt::Display) -> Self {
        StoreError::Delete {
            name: name.to_string(),
            reason: source.to_string(),
        }
    }
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
