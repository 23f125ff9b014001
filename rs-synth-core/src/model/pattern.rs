use serde::{Deserialize, Serialize};

/// One run of a run-length-encoded sequence: `length` consecutive
/// occurrences of `value`.
///
/// ## Invariants
/// - `length >= 1`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PatternUnit {
	/// Quantized value of the run.
	pub value: f64,
	/// Number of consecutive samples (1-based).
	pub length: usize,
}

impl PatternUnit {
	pub fn new(value: f64, length: usize) -> Self {
		Self { value, length }
	}
}

/// Run-length encoding of one quantized sequence.
///
/// Two patterns are equal iff they have the same unit count and every unit
/// matches exactly in value and length.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Pattern {
	units: Vec<PatternUnit>,
}

impl Pattern {
	/// Run-length encodes a quantized sequence.
	///
	/// Scans left to right; a unit is emitted whenever the value changes and
	/// once more at the end of the sequence. An empty sequence gives an empty
	/// pattern.
	pub fn from_quantized(sequence: &[f64]) -> Self {
		let mut units = Vec::new();
		let mut iter = sequence.iter().copied();

		let Some(mut current) = iter.next() else {
			return Self { units };
		};
		let mut run = 1;
		for x in iter {
			if x != current {
				units.push(PatternUnit::new(current, run));
				current = x;
				run = 1;
			} else {
				run += 1;
			}
		}
		units.push(PatternUnit::new(current, run));

		Self { units }
	}

	pub fn from_units(units: Vec<PatternUnit>) -> Self {
		Self { units }
	}

	pub fn units(&self) -> &[PatternUnit] {
		&self.units
	}

	/// Unit at `position`, if the pattern is long enough.
	pub fn get(&self, position: usize) -> Option<&PatternUnit> {
		self.units.get(position)
	}

	/// Number of units (not samples).
	pub fn len(&self) -> usize {
		self.units.len()
	}

	pub fn is_empty(&self) -> bool {
		self.units.is_empty()
	}

	/// Total number of samples covered by the pattern.
	pub fn sample_count(&self) -> usize {
		self.units.iter().map(|u| u.length).sum()
	}

	/// Expands the pattern back into the quantized sequence it encodes.
	pub fn expand(&self) -> Vec<f64> {
		let mut out = Vec::with_capacity(self.sample_count());
		for unit in &self.units {
			out.extend(std::iter::repeat_n(unit.value, unit.length));
		}
		out
	}

	/// Sum of absolute differences over values and lengths, position by
	/// position. Only meaningful for patterns of the same unit count.
	fn distance(&self, other: &Self) -> f64 {
		self.units
			.iter()
			.zip(&other.units)
			.map(|(a, b)| (a.value - b.value).abs() + a.length.abs_diff(b.length) as f64)
			.sum()
	}
}

/// Extracts one pattern per quantized sequence.
///
/// When `allow_repeats` is false, a pattern identical to one already
/// collected is skipped. Each new pattern is compared against every
/// accepted pattern of the same unit count, which is quadratic in the
/// corpus size: fine for the small datasets this model targets.
pub fn extract(sequences: &[Vec<f64>], allow_repeats: bool) -> Vec<Pattern> {
	let mut patterns: Vec<Pattern> = Vec::with_capacity(sequences.len());

	for sequence in sequences {
		let pattern = Pattern::from_quantized(sequence);

		if !allow_repeats {
			let duplicate = patterns
				.iter()
				.filter(|p| p.len() == pattern.len())
				.any(|p| p.distance(&pattern) == 0.0);
			if duplicate {
				log::debug!("skipping duplicate pattern of {} units", pattern.len());
				continue;
			}
		}

		patterns.push(pattern);
	}

	patterns
}
