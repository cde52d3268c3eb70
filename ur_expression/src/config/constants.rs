//! Compile-time limits
//!
//! These bound the work a single field set can cause. Runtime preferences are
//! validated against them and can never raise them.

pub mod compile_time {
    pub mod evaluation {
        /// Generations allowed in one fixpoint loop before it is declared non-convergent
        pub const MAX_EVALUATION_ITERATIONS: usize = 50;

        /// Expression errors retained per node; older errors are dropped first
        pub const MAX_ERRORS_PER_NODE: usize = 16;
    }

    pub mod expressions {
        /// Maximum nesting depth while evaluating a single expression
        pub const MAX_EXPRESSION_DEPTH: usize = 64;

        /// Maximum elements a `map`/`filter` callback is applied to
        pub const MAX_CALLBACK_ELEMENTS: usize = 10_000;
    }

    pub mod targets {
        /// Maximum number of segments in a target path
        pub const MAX_PATH_DEPTH: usize = 32;

        /// Maximum length of a single path segment
        pub const MAX_SEGMENT_LENGTH: usize = 255;
    }

    pub mod graph {
        /// Maximum materialized nodes in a dependency graph
        pub const MAX_GRAPH_NODES: usize = 100_000;

        /// Maximum rows materialized for a single list
        pub const MAX_LIST_ROWS: usize = 10_000;

        /// Maximum cycles reported by build-time analysis
        pub const MAX_REPORTED_CYCLES: usize = 10;

        /// Maximum targets listed in one reported cycle
        pub const MAX_CYCLE_PATH_LENGTH: usize = 100;
    }

    pub mod logging {
        /// Messages longer than this are truncated before logging
        pub const MAX_LOG_MESSAGE_LENGTH: usize = 4096;
    }
}

#[cfg(test)]
mod tests {
    use super::compile_time::*;

    #[test]
    fn test_iteration_bound_is_fixed() {
        assert_eq!(evaluation::MAX_EVALUATION_ITERATIONS, 50);
    }

    #[test]
    fn test_limits_are_positive() {
        assert!(expressions::MAX_EXPRESSION_DEPTH > 0);
        assert!(targets::MAX_PATH_DEPTH > 0);
        assert!(graph::MAX_GRAPH_NODES >= graph::MAX_LIST_ROWS);
        assert!(graph::MAX_REPORTED_CYCLES > 0);
    }
}
