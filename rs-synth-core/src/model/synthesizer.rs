use std::path::Path;
use std::sync::mpsc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::generation_input::{GenerationInput, MAX_BATCH_COUNT};
use super::generator::Generator;
use super::pattern::extract;
use super::quantizer::{quantize, validate_step};
use super::random::RandomSource;
use super::tree::{ProbabilityTree, TrainingStats};
use crate::error::{Result, SynthesisError};
use crate::io::{load_corpus, normalize_folder};

/// A trained model together with the parameters it was built with.
///
/// This struct manages:
/// - `tree`: the probability tree, immutable after construction
/// - `quantization_step`: grid step applied to the raw samples
/// - `sequences`: number of raw sequences the model was built from
///
/// Training runs once; generation can then be invoked any number of times,
/// from any number of threads.
#[derive(Debug, Clone)]
pub struct Synthesizer {
	tree: ProbabilityTree,
	quantization_step: f64,
	sequences: usize,
}

impl Synthesizer {
	/// Builds a model from raw sample sequences.
	///
	/// - quantizes each sequence on the `quantization_step` grid
	/// - run-length encodes them, dropping duplicates unless `allow_repeats`
	/// - trains a tree whose nodes bucket values by `train_step`
	///
	/// # Errors
	/// Returns an error if either step is not finite or `<= 0`; both are
	/// checked before any data is processed.
	pub fn from_sequences(
		sequences: &[Vec<f64>],
		quantization_step: f64,
		train_step: f64,
		allow_repeats: bool,
	) -> Result<Self> {
		validate_step(quantization_step)?;
		validate_step(train_step)?;

		let quantized = sequences
			.iter()
			.map(|s| quantize(s, quantization_step))
			.collect::<Result<Vec<_>>>()?;

		let patterns = extract(&quantized, allow_repeats);
		log::info!("{} patterns from {} sequences", patterns.len(), sequences.len());

		let tree = ProbabilityTree::train(&patterns, train_step)?;
		Ok(Self { tree, quantization_step, sequences: sequences.len() })
	}

	/// Builds a model from every sample file found under `folder`.
	///
	/// Both `"folder"` and `"folder/"` are accepted, `"."` is the working
	/// directory. See [`from_sequences`](Self::from_sequences) for the steps.
	///
	/// # Errors
	/// Returns an error if a step is invalid or the folder cannot be listed.
	pub fn from_directory<P: AsRef<Path>>(
		folder: P,
		quantization_step: f64,
		train_step: f64,
		allow_repeats: bool,
	) -> Result<Self> {
		validate_step(quantization_step)?;
		validate_step(train_step)?;

		let folder = match folder.as_ref().to_str() {
			Some(s) => normalize_folder(s),
			None => folder.as_ref().to_path_buf(),
		};
		let corpus = load_corpus(&folder)?;
		Self::from_sequences(&corpus, quantization_step, train_step, allow_repeats)
	}

	pub fn tree(&self) -> &ProbabilityTree {
		&self.tree
	}

	pub fn stats(&self) -> TrainingStats {
		self.tree.stats()
	}

	pub fn quantization_step(&self) -> f64 {
		self.quantization_step
	}

	/// Number of raw sequences used for training (before deduplication).
	pub fn sequences(&self) -> usize {
		self.sequences
	}

	/// Generates a single sequence with the caller's random source.
	pub fn generate<R>(&self, input: &GenerationInput, rng: &mut R) -> Result<Vec<f64>>
	where
		R: RandomSource + ?Sized,
	{
		Generator::new(&self.tree).generate(input, rng)
	}

	/// Generates `count` sequences in parallel.
	///
	/// # Behavior
	/// - Splits the indices into contiguous chunks (one per CPU at most).
	/// - Each worker borrows the shared tree; no locking is involved.
	/// - Sequence `i` is drawn from `StdRng::seed_from_u64(seed + i)`, so a
	///   fixed `seed` gives the same batch whatever the number of CPUs.
	/// - Without a seed, a random base seed is picked.
	///
	/// # Errors
	/// - [`SynthesisError::InvalidParameter`] if `count` exceeds [`MAX_BATCH_COUNT`].
	/// - Otherwise the first error reported for any index (in index order).
	pub fn generate_batch(&self, input: &GenerationInput, count: usize, seed: Option<u64>) -> Result<Vec<Vec<f64>>> {
		if count > MAX_BATCH_COUNT {
			return Err(SynthesisError::InvalidParameter(format!("count must be <= {MAX_BATCH_COUNT}, got {count}")));
		}
		if count == 0 {
			return Ok(Vec::new());
		}

		let base_seed = seed.unwrap_or_else(|| rand::rng().random());
		let workers = num_cpus::get().clamp(1, count);
		let chunk_size = count.div_ceil(workers);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for start in (0..count).step_by(chunk_size) {
				let tx = tx.clone();
				let end = (start + chunk_size).min(count);
				let generator = Generator::new(&self.tree);

				scope.spawn(move || {
					for index in start..end {
						let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(index as u64));
						if tx.send((index, generator.generate(input, &mut rng))).is_err() {
							break;
						}
					}
				});
			}
		});
		drop(tx);

		let mut results: Vec<Option<Result<Vec<f64>>>> = (0..count).map(|_| None).collect();
		for (index, result) in rx.iter() {
			results[index] = Some(result);
		}

		results.into_iter().flatten().collect()
	}
}
