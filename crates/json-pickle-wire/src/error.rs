use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    /// A value does not match the shape expected at its position.
    #[error("malformed {context}: {reason}")]
    Malformed {
        context: &'static str,
        reason: String,
    },

    /// A backreference points past the end of the node table.
    #[error("backreference {index} out of bounds for a table of {len} nodes")]
    OutOfBounds { index: usize, len: usize },

    #[error("non-finite float {0} has no JSON representation")]
    NonFinite(f64),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WireError {
    pub(crate) fn malformed(context: &'static str, reason: impl Into<String>) -> Self {
        WireError::Malformed {
            context,
            reason: reason.into(),
        }
    }
}
