/// Default bound on container nesting during encode and decode. Fits the
/// recursive walks on a 2 MiB debug-build thread stack.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Settings shared by [`Pickler`](crate::Pickler), [`Unpickler`](crate::Unpickler)
/// and the `dumps_with`/`loads_with` entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Nesting depth past which encode and decode fail with
    /// [`PickleError::DepthLimit`](crate::PickleError::DepthLimit) instead of
    /// exhausting the stack.
    pub max_depth: usize,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            pretty: false,
        }
    }
}

impl Options {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}
