use rand::Rng;
use rand_distr::StandardNormal;

/// Random draws needed by the generator.
///
/// Implemented for every [`rand::Rng`], so `rand::rng()` or a seeded
/// `StdRng` can be passed directly.
pub trait RandomSource {
	/// Uniform integer in the inclusive range `[0, n]`.
	fn uniform_inclusive(&mut self, n: usize) -> usize;

	/// Standard normal variate (mean 0, variance 1).
	fn standard_normal(&mut self) -> f64;
}

impl<R: Rng + ?Sized> RandomSource for R {
	fn uniform_inclusive(&mut self, n: usize) -> usize {
		self.random_range(0..=n)
	}

	fn standard_normal(&mut self) -> f64 {
		self.sample(StandardNormal)
	}
}

/// Picks an index with probability proportional to its weight.
///
/// Zero weights are never selected. Returns `None` when every weight is
/// zero (or the input is empty).
///
/// This method performs:
/// - an O(n) scan to compute the total
/// - a cumulative subtraction to select a bucket
pub fn weighted_index<I, R>(weights: I, rng: &mut R) -> Option<usize>
where
	I: IntoIterator<Item = (usize, usize)>,
	I::IntoIter: Clone,
	R: RandomSource + ?Sized,
{
	let weights = weights.into_iter();
	let total: usize = weights.clone().map(|(_, w)| w).sum();
	if total == 0 {
		return None;
	}

	let mut r = rng.uniform_inclusive(total - 1);
	for (index, weight) in weights {
		if weight == 0 {
			continue;
		}
		if r < weight {
			return Some(index);
		}
		r -= weight;
	}

	// Unreachable while r < total
	None
}
