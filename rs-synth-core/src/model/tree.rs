use serde::{Deserialize, Serialize};

use super::node::{NodeId, ProbabilityNode};
use super::pattern::Pattern;
use super::quantizer::validate_step;
use crate::error::Result;

/// Counters collected while training a tree.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingStats {
	/// Number of patterns the tree was trained on.
	pub patterns: usize,
	/// Nodes examined, including those that gathered no data.
	pub visited_nodes: usize,
	/// Nodes that gathered data and were kept in the tree.
	pub populated_nodes: usize,
	/// Deepest pattern position that produced a populated node.
	pub max_depth: usize,
}

/// Position-conditioned empirical model of a pattern corpus.
///
/// Nodes live in a flat arena; children are referenced by index. Level `d`
/// of the tree describes pattern position `d`. The root is always present
/// at index 0, even when it gathered no data. Child slots are only filled
/// for nodes that gathered data, so every reachable non-root node is
/// non-empty.
///
/// The tree is immutable once trained and can be shared across threads.
#[derive(Clone, Debug)]
pub struct ProbabilityTree {
	nodes: Vec<ProbabilityNode>,
	step: f64,
	stats: TrainingStats,
}

/// Pending node: the bucket of `parent` it hangs from, and its position.
struct Task {
	parent: Option<(NodeId, usize)>,
	position: usize,
}

impl ProbabilityTree {
	pub const ROOT: NodeId = 0;

	/// Trains a tree over a pattern corpus.
	///
	/// Each level corresponds to one pattern position. A pattern contributes
	/// to a node when its unit at `position - 1` falls into the bucket of the
	/// parent that leads to this node (every pattern contributes to the root).
	/// Nodes are filled in depth-first order using an explicit work stack, so
	/// long patterns do not grow the call stack.
	///
	/// # Errors
	/// Returns [`SynthesisError::InvalidStep`](crate::error::SynthesisError::InvalidStep)
	/// if `initial_step` is not finite or `<= 0`.
	pub fn train(patterns: &[Pattern], initial_step: f64) -> Result<Self> {
		validate_step(initial_step)?;

		let mut nodes: Vec<ProbabilityNode> = Vec::new();
		let mut stats = TrainingStats { patterns: patterns.len(), ..TrainingStats::default() };
		let mut stack = vec![Task { parent: None, position: 0 }];

		while let Some(task) = stack.pop() {
			stats.visited_nodes += 1;

			let parent = task.parent.map(|(id, bucket)| (&nodes[id], bucket));
			let step = parent.map_or(initial_step, |(p, _)| p.step());
			let node = Self::fill_node(patterns, parent, task.position, step);

			let id = match task.parent {
				None => {
					nodes.push(node);
					Self::ROOT
				}
				// Leaf: this branch ends here
				Some(_) if node.bucket_count() == 0 => continue,
				Some((parent_id, bucket)) => {
					let id = nodes.len();
					nodes.push(node);
					nodes[parent_id].set_child(bucket, id);
					id
				}
			};

			let buckets = nodes[id].bucket_count();
			if buckets == 0 {
				continue;
			}
			stats.populated_nodes += 1;
			stats.max_depth = stats.max_depth.max(task.position);
			log::debug!("node {} at position {}: {} buckets", id, task.position, buckets);

			for bucket in (0..buckets).rev() {
				stack.push(Task { parent: Some((id, bucket)), position: task.position + 1 });
			}
		}

		log::info!(
			"trained tree: {} patterns, {} nodes visited, {} populated, depth {}",
			stats.patterns,
			stats.visited_nodes,
			stats.populated_nodes,
			stats.max_depth
		);

		Ok(Self { nodes, step: initial_step, stats })
	}

	/// Gathers the statistics of one node.
	///
	/// Min/max are widened before each count is recorded, so the bucket of
	/// a count is computed against the range seen so far.
	fn fill_node(
		patterns: &[Pattern],
		parent: Option<(&ProbabilityNode, usize)>,
		position: usize,
		step: f64,
	) -> ProbabilityNode {
		let mut node = ProbabilityNode::new(step);

		for pattern in patterns {
			let Some(unit) = pattern.get(position) else {
				continue;
			};

			if let Some((parent, bucket)) = parent {
				let previous = &pattern.units()[position - 1];
				if parent.bucket_index(previous.value) != Some(bucket) {
					continue;
				}
			}

			node.update_min_max(unit.value);
			node.update_probability(unit.value, unit.length);
		}

		if node.bucket_count() > 0 {
			node.smooth_probability();
		}
		node
	}

	pub fn root(&self) -> &ProbabilityNode {
		&self.nodes[Self::ROOT]
	}

	/// Node by arena index.
	pub fn node(&self, id: NodeId) -> Option<&ProbabilityNode> {
		self.nodes.get(id)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &ProbabilityNode> {
		self.nodes.iter()
	}

	/// Number of nodes stored in the arena (root included).
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// True when the root holds no data, so nothing can be generated.
	pub fn is_empty(&self) -> bool {
		self.root().is_empty()
	}

	pub fn step(&self) -> f64 {
		self.step
	}

	pub fn stats(&self) -> TrainingStats {
		self.stats
	}
}
