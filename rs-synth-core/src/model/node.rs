/// Index of a node inside a [`ProbabilityTree`](super::tree::ProbabilityTree) arena.
pub type NodeId = usize;

/// One node of the probability tree.
///
/// A node describes what happens at one pattern position, given the
/// value buckets chosen at every earlier position on the path from the
/// root. It stores:
/// - the empirical distribution of the next value bucket (`value_counts`)
/// - per bucket, the distribution of the run length (`length_counts`)
/// - per bucket, the node for the next position (`children`)
///
/// Buckets are numbered relative to the node's own `min_observed`, not the
/// corpus-wide grid.
///
/// ## Invariants
/// - `value_counts`, `length_counts` and `children` always have the same length
/// - `step` is finite, positive, and shared by every node of one tree
/// - counts only grow during training; nodes are read-only afterwards
#[derive(Clone, Debug)]
pub struct ProbabilityNode {
	min_observed: f64,
	max_observed: f64,
	step: f64,
	value_counts: Vec<usize>,
	/// `length_counts[b][l - 1]` counts runs of length `l` in bucket `b`.
	length_counts: Vec<Vec<usize>>,
	children: Vec<Option<NodeId>>,
}

impl ProbabilityNode {
	/// Creates an empty node; min/max start at the +inf/-inf sentinels.
	pub(crate) fn new(step: f64) -> Self {
		Self {
			min_observed: f64::INFINITY,
			max_observed: f64::NEG_INFINITY,
			step,
			value_counts: Vec::new(),
			length_counts: Vec::new(),
			children: Vec::new(),
		}
	}

	pub fn min_observed(&self) -> f64 {
		self.min_observed
	}

	pub fn max_observed(&self) -> f64 {
		self.max_observed
	}

	pub fn step(&self) -> f64 {
		self.step
	}

	pub fn value_counts(&self) -> &[usize] {
		&self.value_counts
	}

	pub fn length_counts(&self, bucket: usize) -> &[usize] {
		self.length_counts.get(bucket).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn child(&self, bucket: usize) -> Option<NodeId> {
		self.children.get(bucket).copied().flatten()
	}

	/// Number of bucket slots allocated so far.
	pub fn bucket_count(&self) -> usize {
		self.value_counts.len()
	}

	/// Sum of all value counts.
	pub fn total(&self) -> usize {
		self.value_counts.iter().sum()
	}

	/// True when the node carries no value statistics (a dead end).
	pub fn is_empty(&self) -> bool {
		self.total() == 0
	}

	/// Longest run length recorded for `bucket` (0 when none).
	pub fn max_run(&self, bucket: usize) -> usize {
		self.length_counts(bucket).len()
	}

	/// Maps a value to a bucket relative to this node's own range:
	/// `floor((value - min_observed) / step)`.
	///
	/// Returns `None` for values below `min_observed` (or when nothing was
	/// observed yet), since those cannot land in any bucket.
	pub fn bucket_index(&self, value: f64) -> Option<usize> {
		let index = ((value - self.min_observed) / self.step).floor();
		if index.is_finite() && index >= 0.0 {
			Some(index as usize)
		} else {
			None
		}
	}

	/// Widens the observed range to include `value`.
	pub(crate) fn update_min_max(&mut self, value: f64) {
		if value > self.max_observed {
			self.max_observed = value;
		}
		if value < self.min_observed {
			self.min_observed = value;
		}
	}

	/// Records one occurrence of `value` persisting for `length` samples.
	///
	/// Grows the three bucket-aligned vectors together when the value lands
	/// past the last allocated bucket. `update_min_max` must have seen
	/// `value` first.
	pub(crate) fn update_probability(&mut self, value: f64, length: usize) {
		let Some(bucket) = self.bucket_index(value) else {
			return;
		};
		if length == 0 {
			return;
		}

		if bucket >= self.value_counts.len() {
			self.value_counts.resize(bucket + 1, 0);
			self.length_counts.resize_with(bucket + 1, Vec::new);
			self.children.resize(bucket + 1, None);
		}
		self.value_counts[bucket] += 1;

		let lengths = &mut self.length_counts[bucket];
		if length > lengths.len() {
			lengths.resize(length, 0);
		}
		lengths[length - 1] += 1;
	}

	/// Fills interior gaps of the value histogram.
	///
	/// A zero bucket with non-zero neighbours on both sides takes the
	/// truncated mean of its neighbours. Boundary buckets are left alone.
	pub(crate) fn smooth_probability(&mut self) {
		smooth(&mut self.value_counts);
	}

	pub(crate) fn set_child(&mut self, bucket: usize, child: NodeId) {
		if let Some(slot) = self.children.get_mut(bucket) {
			*slot = Some(child);
		}
	}

	/// Checks the bucket alignment invariant.
	pub fn is_aligned(&self) -> bool {
		self.value_counts.len() == self.length_counts.len() && self.value_counts.len() == self.children.len()
	}
}

pub(crate) fn smooth(counts: &mut [usize]) {
	if counts.len() < 3 {
		return;
	}
	for i in 1..counts.len() - 1 {
		if counts[i] == 0 && counts[i - 1] != 0 && counts[i + 1] != 0 {
			counts[i] = (counts[i - 1] + counts[i + 1]) / 2;
		}
	}
}
