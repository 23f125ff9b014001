use crate::error::{Result, SynthesisError};

/// Checks that a grid step is usable (finite and strictly positive).
///
/// Every public entry point taking a step calls this before touching data.
pub fn validate_step(step: f64) -> Result<()> {
	if !step.is_finite() || step <= 0.0 {
		return Err(SynthesisError::InvalidStep(step));
	}
	Ok(())
}

/// Snaps a single raw sample onto the grid: `floor(raw / step) * step`.
///
/// The grid index is corrected by one step when the division rounds across
/// a grid line, so a value already on the grid always maps onto itself.
/// Callers must have validated `step` with [`validate_step`].
pub(crate) fn snap(raw: f64, step: f64) -> f64 {
	let mut k = (raw / step).floor();
	if k * step > raw {
		k -= 1.0;
	} else if (k + 1.0) * step <= raw {
		k += 1.0;
	}
	k * step
}

/// Quantizes a raw sample sequence onto a fixed-step grid.
///
/// # Errors
/// Returns [`SynthesisError::InvalidStep`] if `step` is not finite or `<= 0`.
pub fn quantize(raw: &[f64], step: f64) -> Result<Vec<f64>> {
	validate_step(step)?;
	Ok(raw.iter().map(|&x| snap(x, step)).collect())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn floors_onto_grid() {
		let q = quantize(&[0.0, 0.4, 0.99, 1.0, 1.7, -0.2, -1.0], 1.0).unwrap();
		assert_eq!(q, vec![0.0, 0.0, 0.0, 1.0, 1.0, -1.0, -1.0]);
	}

	#[test]
	fn fractional_step() {
		let q = quantize(&[0.25, 0.55, 0.35], 0.1).unwrap();
		assert!((q[0] - 0.2).abs() < 1e-12);
		assert!((q[1] - 0.5).abs() < 1e-12);
		assert!((q[2] - 0.3).abs() < 1e-12);
	}

	#[test]
	fn rejects_bad_step() {
		assert!(matches!(quantize(&[1.0], 0.0), Err(SynthesisError::InvalidStep(_))));
		assert!(matches!(quantize(&[1.0], -0.5), Err(SynthesisError::InvalidStep(_))));
		assert!(matches!(quantize(&[1.0], f64::NAN), Err(SynthesisError::InvalidStep(_))));
		assert!(quantize(&[1.0], f64::INFINITY).is_err());
	}

	#[test]
	fn empty_input() {
		assert!(quantize(&[], 0.5).unwrap().is_empty());
	}

	proptest! {
		#[test]
		fn idempotent(x in -1.0e6f64..1.0e6, step in 1.0e-3f64..1.0e3) {
			let once = quantize(&[x], step).unwrap();
			let twice = quantize(&once, step).unwrap();
			prop_assert_eq!(once, twice);
		}

		#[test]
		fn never_above_raw(x in -1.0e6f64..1.0e6, step in 1.0e-3f64..1.0e3) {
			let q = snap(x, step);
			prop_assert!(q <= x);
			prop_assert!(x - q < step * (1.0 + 1e-9) + 1e-9);
		}
	}
}
