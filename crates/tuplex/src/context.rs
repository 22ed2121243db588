//! Evaluation context configuration

/// Configuration for parsing and evaluation.
///
/// Owned by the [`Runtime`](crate::Runtime) and consulted by the expression
/// parser (sub-parse nesting) and the evaluator (node recursion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalContext {
    /// Maximum nesting depth (stack overflow protection)
    pub max_depth: usize,

    /// Whether to trace every node evaluation (for debugging)
    pub trace: bool,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            max_depth: 256,
            trace: false,
        }
    }
}

impl EvalContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a custom nesting limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    /// Enable or disable per-node evaluation tracing.
    pub fn traced(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Check whether `depth` is still inside the configured limit.
    pub fn allows(&self, depth: usize) -> bool {
        depth <= self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context() {
        let ctx = EvalContext::default();
        assert_eq!(ctx.max_depth, 256);
        assert!(!ctx.trace);
    }

    #[test]
    fn test_custom_depth_and_trace() {
        let ctx = EvalContext::with_max_depth(4).traced(true);
        assert!(ctx.allows(4));
        assert!(!ctx.allows(5));
        assert!(ctx.trace);
    }
}
