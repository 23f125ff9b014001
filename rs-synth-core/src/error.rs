use thiserror::Error;

/// Errors produced while building or sampling a probability tree.
///
/// Configuration errors are raised before any statistics are gathered.
/// Dead ends inside the tree are never surfaced unless the restart budget
/// of a generation call is exhausted.
#[derive(Error, Debug)]
pub enum SynthesisError {
	/// Quantization or training step is not a finite positive number.
	#[error("step must be finite and > 0, got {0}")]
	InvalidStep(f64),

	/// A generation was requested with a zero or oversized target length.
	#[error("max_length must be between 1 and {}", crate::model::generation_input::MAX_LENGTH)]
	InvalidLength,

	/// Any other generation parameter (e.g. batch size) out of its valid range.
	#[error("invalid parameter: {0}")]
	InvalidParameter(String),

	/// The tree root holds no statistics, nothing can be sampled.
	#[error("model has no data")]
	EmptyModel,

	/// Every attempt hit a dead end before reaching the target length.
	#[error("unreachable target length {max_length} after {restarts} restarts")]
	UnreachableLength { max_length: usize, restarts: usize },

	/// Refused to persist an empty sequence.
	#[error("no data to write")]
	EmptySequence,

	/// I/O failure in a corpus collaborator.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// Result type alias for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthesisError>;
