use json_pickle_wire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PickleError {
    /// A type identifier or Rust type is not known to the registry.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// A node has a shape no variant accepts.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The node table is inconsistent: a slot filled twice, a backreference
    /// past the end, or a cycle through an immutable container.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Raised by a type's own construction or state hooks.
    #[error("{0}")]
    Hook(String),

    #[error("object graph nests deeper than {0} levels")]
    DepthLimit(usize),

    #[error("invalid registration: {0}")]
    Registration(String),

    #[error(transparent)]
    Json(serde_json::Error),
}

impl PickleError {
    pub fn hook(message: impl Into<String>) -> Self {
        PickleError::Hook(message.into())
    }

    pub fn unknown_attribute(type_name: &str, attribute: &str) -> Self {
        PickleError::Hook(format!("`{type_name}` has no attribute `{attribute}`"))
    }
}

impl From<WireError> for PickleError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::OutOfBounds { .. } => PickleError::Integrity(e.to_string()),
            WireError::Json(e) => PickleError::Json(e),
            other => PickleError::Protocol(other.to_string()),
        }
    }
}
