use crate::error::{Result, SynthesisError};

/// Default threshold under which a short final run may be stretched.
pub const DEFAULT_MAX_SUB_RUN: usize = 4;

/// Default number of restarts before a generation gives up.
pub const DEFAULT_MAX_RESTARTS: usize = 10_000;

/// Longest sequence a single generation may produce.
pub const MAX_LENGTH: usize = 1 << 24;

/// Largest number of sequences a single batch may produce.
pub const MAX_BATCH_COUNT: usize = 1 << 16;

/// Input parameters for sampling sequences from a probability tree.
///
/// # Responsibilities
/// - Track the target length of generated sequences (`max_length`)
/// - Track the tail-padding threshold (`max_sub_run`)
/// - Bound the number of restarts a single generation may perform
///
/// # Invariants
/// - `1 <= max_length <= MAX_LENGTH`
/// - `max_sub_run >= 1`
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationInput {
	/// Exact length of every generated sequence.
	max_length: usize,

	/// A final run shorter than this may be padded up to it to finish a
	/// sequence instead of restarting.
	max_sub_run: usize,

	/// Number of restarts from the root allowed per sequence.
	pub max_restarts: usize,

	/// When a node has no bucket leading further down the tree, sample
	/// among its own buckets and try to finish there (tail padding).
	/// When unset, such a node restarts generation from the root.
	pub settle_on_leaves: bool,
}

impl GenerationInput {
	/// Creates an input with default tuning for the given target length.
	///
	/// # Errors
	/// Returns [`SynthesisError::InvalidLength`] if `max_length` is zero or
	/// above [`MAX_LENGTH`].
	pub fn new(max_length: usize) -> Result<Self> {
		let mut input = Self {
			max_length: 1,
			max_sub_run: DEFAULT_MAX_SUB_RUN,
			max_restarts: DEFAULT_MAX_RESTARTS,
			settle_on_leaves: true,
		};
		input.set_max_length(max_length)?;
		Ok(input)
	}

	pub fn max_length(&self) -> usize {
		self.max_length
	}

	pub fn max_sub_run(&self) -> usize {
		self.max_sub_run
	}

	/// Sets the target length.
	///
	/// # Errors
	/// Returns an error if the value is zero or above [`MAX_LENGTH`].
	pub fn set_max_length(&mut self, max_length: usize) -> Result<()> {
		if max_length == 0 || max_length > MAX_LENGTH {
			return Err(SynthesisError::InvalidLength);
		}
		self.max_length = max_length;
		Ok(())
	}

	/// Sets the tail-padding threshold.
	///
	/// # Errors
	/// Returns an error if the value is zero.
	pub fn set_max_sub_run(&mut self, max_sub_run: usize) -> Result<()> {
		if max_sub_run == 0 {
			return Err(SynthesisError::InvalidParameter("max_sub_run must be >= 1".to_owned()));
		}
		self.max_sub_run = max_sub_run;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let input = GenerationInput::new(30).unwrap();
		assert_eq!(input.max_length(), 30);
		assert_eq!(input.max_sub_run(), DEFAULT_MAX_SUB_RUN);
		assert_eq!(input.max_restarts, DEFAULT_MAX_RESTARTS);
		assert!(input.settle_on_leaves);
	}

	#[test]
	fn rejects_zero() {
		assert!(matches!(GenerationInput::new(0), Err(SynthesisError::InvalidLength)));

		let mut input = GenerationInput::new(5).unwrap();
		assert!(input.set_max_sub_run(0).is_err());
		assert!(input.set_max_length(0).is_err());
		assert_eq!(input.max_length(), 5);
		input.set_max_sub_run(2).unwrap();
		assert_eq!(input.max_sub_run(), 2);
	}

	#[test]
	fn rejects_oversized_length() {
		assert!(matches!(GenerationInput::new(usize::MAX), Err(SynthesisError::InvalidLength)));
		assert!(matches!(GenerationInput::new(MAX_LENGTH + 1), Err(SynthesisError::InvalidLength)));
		assert_eq!(GenerationInput::new(MAX_LENGTH).unwrap().max_length(), MAX_LENGTH);

		let mut input = GenerationInput::new(5).unwrap();
		assert!(input.set_max_length(usize::MAX).is_err());
		assert_eq!(input.max_length(), 5);
	}
}
