use super::generation_input::GenerationInput;
use super::node::{NodeId, ProbabilityNode};
use super::random::{weighted_index, RandomSource};
use super::tree::ProbabilityTree;
use crate::error::{Result, SynthesisError};

const PREALLOCATED_SAMPLES: usize = 4096;

/// Outcome of expanding a single node.
#[derive(Debug, PartialEq)]
enum Step {
	/// The output reached the target length.
	Done,
	/// Continue at the next pattern position.
	Descend(NodeId),
	/// Dead end: drop the output and start again from the root.
	Restart,
}

/// Samples synthetic sequences from a trained [`ProbabilityTree`].
///
/// # Responsibilities
/// - Walk the tree from a start node, drawing one (value, run length) per level
/// - Stretch the last run when a branch ends close to the target length
/// - Restart from the root on dead ends, up to `max_restarts` times
///
/// The tree is only borrowed immutably, so several generators can share
/// the same tree across threads.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'a> {
	tree: &'a ProbabilityTree,
}

impl<'a> Generator<'a> {
	pub fn new(tree: &'a ProbabilityTree) -> Self {
		Self { tree }
	}

	/// Generates one sequence of exactly `input.max_length()` samples,
	/// starting from the tree root.
	///
	/// # Errors
	/// - [`SynthesisError::EmptyModel`] if the tree has no data at all.
	/// - [`SynthesisError::UnreachableLength`] if every attempt within the
	///   restart budget hit a dead end.
	pub fn generate<R>(&self, input: &GenerationInput, rng: &mut R) -> Result<Vec<f64>>
	where
		R: RandomSource + ?Sized,
	{
		self.generate_from(ProbabilityTree::ROOT, input, rng)
	}

	/// Same as [`generate`](Self::generate), but the first attempt starts at
	/// `start`. Restarts always go back to the root.
	pub fn generate_from<R>(&self, start: NodeId, input: &GenerationInput, rng: &mut R) -> Result<Vec<f64>>
	where
		R: RandomSource + ?Sized,
	{
		if self.tree.is_empty() {
			return Err(SynthesisError::EmptyModel);
		}

		let max_length = input.max_length();
		// Most attempts restart long before the target length
		let mut output = Vec::with_capacity(max_length.min(PREALLOCATED_SAMPLES));
		let mut current = start;
		let mut restarts = 0;

		loop {
			match self.expand(current, &mut output, input, rng) {
				Step::Done => return Ok(output),
				Step::Descend(child) => current = child,
				Step::Restart => {
					restarts += 1;
					if restarts > input.max_restarts {
						log::warn!("giving up after {} restarts (max_length {})", input.max_restarts, max_length);
						return Err(SynthesisError::UnreachableLength { max_length, restarts: input.max_restarts });
					}
					log::debug!("dead end at node {} with {} samples, restarting", current, output.len());
					output.clear();
					current = ProbabilityTree::ROOT;
				}
			}
		}
	}

	/// Draws one run at `id` and appends it to `output`.
	fn expand<R>(&self, id: NodeId, output: &mut Vec<f64>, input: &GenerationInput, rng: &mut R) -> Step
	where
		R: RandomSource + ?Sized,
	{
		let Some(node) = self.tree.node(id) else {
			return Step::Restart;
		};
		if node.is_empty() {
			return Step::Restart;
		}

		let Some(bucket) = self.select_bucket(node, input.settle_on_leaves, rng) else {
			return Step::Restart;
		};

		// Buckets created by smoothing have no length histogram: a single sample
		let run = weighted_index(node.length_counts(bucket).iter().copied().enumerate(), rng)
			.map_or(1, |index| index + 1);

		let value = Self::jitter(node, rng);

		let max_length = input.max_length();
		let take = run.min(max_length - output.len());
		output.extend(std::iter::repeat_n(value, take));
		if output.len() >= max_length {
			return Step::Done;
		}

		if let Some(child) = self.populated_child(node, bucket) {
			return Step::Descend(child);
		}

		let room = node.max_run(bucket).saturating_sub(run);
		let max_sub_run = input.max_sub_run();
		if output.len() + room >= max_length
			|| (run < max_sub_run && output.len() + (max_sub_run - run) >= max_length)
		{
			output.resize(max_length, value);
			return Step::Done;
		}

		Step::Restart
	}

	/// Weighted draw of the next value bucket.
	///
	/// Only buckets leading to a populated child are considered. When there
	/// are none and `settle_on_leaves` is set, falls back to buckets with a
	/// recorded run length, so the caller can try to finish the sequence here.
	fn select_bucket<R>(&self, node: &ProbabilityNode, settle_on_leaves: bool, rng: &mut R) -> Option<usize>
	where
		R: RandomSource + ?Sized,
	{
		let counts = node.value_counts();

		let onward = (0..counts.len()).map(|b| {
			let weight = if self.populated_child(node, b).is_some() { counts[b] } else { 0 };
			(b, weight)
		});
		if let Some(bucket) = weighted_index(onward, rng) {
			return Some(bucket);
		}

		if !settle_on_leaves {
			return None;
		}
		let settled = (0..counts.len()).map(|b| {
			let weight = if node.length_counts(b).is_empty() { 0 } else { counts[b] };
			(b, weight)
		});
		weighted_index(settled, rng)
	}

	fn populated_child(&self, node: &ProbabilityNode, bucket: usize) -> Option<NodeId> {
		node.child(bucket)
			.filter(|&child| self.tree.node(child).is_some_and(|n| !n.is_empty()))
	}

	/// `step + step/2 * N(0,1) + min_observed`, capped at `max_observed`.
	fn jitter<R>(node: &ProbabilityNode, rng: &mut R) -> f64
	where
		R: RandomSource + ?Sized,
	{
		let step = node.step();
		let value = step + (step / 2.0) * rng.standard_normal() + node.min_observed();
		value.min(node.max_observed())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::pattern::{Pattern, PatternUnit};
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn pattern(units: &[(f64, usize)]) -> Pattern {
		Pattern::from_units(units.iter().map(|&(v, l)| PatternUnit::new(v, l)).collect())
	}

	fn reference_tree() -> ProbabilityTree {
		let patterns = vec![
			pattern(&[(1.0, 3), (2.0, 2), (3.0, 1)]),
			pattern(&[(1.0, 2), (2.0, 3), (3.0, 1)]),
		];
		ProbabilityTree::train(&patterns, 1.0).unwrap()
	}

	#[test]
	fn fills_exact_length() {
		let tree = reference_tree();
		let generator = Generator::new(&tree);
		for seed in 0..200 {
			let mut rng = StdRng::seed_from_u64(seed);
			for max_length in 1..=6 {
				let input = GenerationInput::new(max_length).unwrap();
				let seq = generator.generate(&input, &mut rng).unwrap();
				assert_eq!(seq.len(), max_length);
			}
		}
	}

	#[test]
	fn values_capped_at_observed_max() {
		let tree = reference_tree();
		let generator = Generator::new(&tree);
		let mut rng = StdRng::seed_from_u64(11);
		let input = GenerationInput::new(6).unwrap();
		for _ in 0..200 {
			let seq = generator.generate(&input, &mut rng).unwrap();
			assert!(seq.iter().all(|&v| v <= 3.0));
			// root node range is [1, 1]
			assert!(seq[0] <= 1.0);
		}
	}

	#[test]
	fn strict_mode_still_reaches_length_mid_path() {
		let tree = reference_tree();
		let generator = Generator::new(&tree);
		let mut rng = StdRng::seed_from_u64(5);
		let mut input = GenerationInput::new(6).unwrap();
		input.settle_on_leaves = false;
		for _ in 0..50 {
			assert_eq!(generator.generate(&input, &mut rng).unwrap().len(), 6);
		}
	}

	#[test]
	fn pads_short_leaf_run() {
		let tree = ProbabilityTree::train(&[pattern(&[(1.0, 3)])], 1.0).unwrap();
		let generator = Generator::new(&tree);
		let mut rng = StdRng::seed_from_u64(9);
		let seq = generator.generate(&GenerationInput::new(4).unwrap(), &mut rng).unwrap();
		assert_eq!(seq.len(), 4);
		assert!(seq.iter().all(|&v| v == seq[0]));
	}

	#[test]
	fn pads_into_recorded_run_room() {
		// Leaf bucket with runs of 1 and 6: a drawn run of 1 leaves room for 5 more
		let patterns = vec![pattern(&[(1.0, 1)]), pattern(&[(1.0, 6)])];
		let tree = ProbabilityTree::train(&patterns, 1.0).unwrap();
		assert_eq!(tree.root().max_run(0), 6);

		let generator = Generator::new(&tree);
		let mut input = GenerationInput::new(6).unwrap();
		input.set_max_sub_run(1).unwrap();
		input.max_restarts = 0;

		for seed in 0..100 {
			let mut rng = StdRng::seed_from_u64(seed);
			let seq = generator.generate(&input, &mut rng).unwrap();
			assert_eq!(seq.len(), 6);
			assert!(seq.iter().all(|&v| v == seq[0]));
		}
	}

	#[test]
	fn large_target_length_does_not_preallocate() {
		let tree = ProbabilityTree::train(&[pattern(&[(1.0, 3)])], 1.0).unwrap();
		let generator = Generator::new(&tree);
		let mut rng = StdRng::seed_from_u64(4);
		let mut input = GenerationInput::new(crate::model::generation_input::MAX_LENGTH).unwrap();
		input.max_restarts = 0;
		assert!(matches!(
			generator.generate(&input, &mut rng),
			Err(SynthesisError::UnreachableLength { restarts: 0, .. })
		));
	}

	#[test]
	fn fails_when_length_unreachable() {
		let tree = reference_tree();
		let generator = Generator::new(&tree);
		let mut rng = StdRng::seed_from_u64(1);
		let mut input = GenerationInput::new(30).unwrap();
		input.max_restarts = 25;
		match generator.generate(&input, &mut rng) {
			Err(SynthesisError::UnreachableLength { max_length, restarts }) => {
				assert_eq!(max_length, 30);
				assert_eq!(restarts, 25);
			}
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn empty_model_is_an_error() {
		let tree = ProbabilityTree::train(&[Pattern::default()], 1.0).unwrap();
		let generator = Generator::new(&tree);
		let mut rng = StdRng::seed_from_u64(1);
		assert!(matches!(
			generator.generate(&GenerationInput::new(3).unwrap(), &mut rng),
			Err(SynthesisError::EmptyModel)
		));
	}

	#[test]
	fn starts_from_inner_node() {
		let tree = reference_tree();
		let second = tree.root().child(0).unwrap();
		let generator = Generator::new(&tree);
		let mut rng = StdRng::seed_from_u64(2);
		let seq = generator.generate_from(second, &GenerationInput::new(2).unwrap(), &mut rng).unwrap();
		assert_eq!(seq.len(), 2);
		assert!(seq.iter().all(|&v| v <= 2.0));
	}

	#[test]
	fn seeded_generation_is_reproducible() {
		let tree = reference_tree();
		let generator = Generator::new(&tree);
		let input = GenerationInput::new(6).unwrap();
		let a = generator.generate(&input, &mut StdRng::seed_from_u64(77)).unwrap();
		let b = generator.generate(&input, &mut StdRng::seed_from_u64(77)).unwrap();
		assert_eq!(a, b);
	}
}
