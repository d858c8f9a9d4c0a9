use thiserror::Error;

/// Fatal errors raised while loading and validating an instance. The
/// search itself never propagates errors; infeasibility is folded into
/// candidate rejection (see the move evaluator) or termination reasons.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{file}:{line}: {message}")]
    Format {
        file: String,
        line: usize,
        message: String,
    },

    #[error("unknown id {id} referenced by {context}")]
    Reference { id: i64, context: String },

    #[error("inconsistent input: {0}")]
    Inconsistency(String),

    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

impl InputError {
    pub fn format(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        InputError::Format {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn reference(id: i64, context: impl Into<String>) -> Self {
        InputError::Reference {
            id,
            context: context.into(),
        }
    }
}

/// Why the driver stopped. `Timeout` and `Cancelled` are non-error
/// terminations that still return the best solution seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Iterations,
    Patience,
    Timeout,
    Cancelled,
    /// Every candidate move in an iteration was rejected because the
    /// oracle had no entry for a required pair.
    Stuck,
}
