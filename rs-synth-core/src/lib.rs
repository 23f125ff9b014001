//! Run-length synthesis of quantized signal sequences.
//!
//! This crate learns a position-conditioned empirical model of a small
//! corpus of numeric sequences and samples new sequences from it:
//! - Grid quantization and run-length pattern extraction
//! - A tree of value / run-length histograms, one level per pattern position
//! - Stochastic generation with tail padding and bounded restarts
//! - Corpus loading and sequence persistence helpers
//!
//! The trained model lives in memory only; it is rebuilt from raw data on
//! every run.

/// Core model: quantizer, patterns, probability tree, generator.
pub mod model;

/// Corpus I/O (sample files in, generated sequences out).
pub mod io;

/// Error type shared by every operation of the crate.
pub mod error;

pub use error::{Result, SynthesisError};
pub use model::generation_input::GenerationInput;
pub use model::synthesizer::Synthesizer;
