use thiserror::Error;

/// Errors produced by graph operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A mapping was requested for the empty (root) path on a graph that
    /// does not allow one.
    #[error("the empty path cannot hold a mapping in this graph")]
    EmptyPath,

    /// A mutator was invoked through a read-only view.
    #[error("graph is read-only")]
    ReadOnly,

    /// An operation was invoked at a point where it is not valid, such as
    /// removing through a cursor that has no current element.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

/// Convenience type alias for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
