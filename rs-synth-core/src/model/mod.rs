//! Top-level module for the run-length sequence model.
//!
//! This module provides the whole pipeline, leaf first:
//! - Grid quantization of raw samples (`quantizer`)
//! - Run-length pattern extraction with deduplication (`pattern`)
//! - The probability tree and its trainer (`node`, `tree`)
//! - Sampling of new sequences (`generator`, `generation_input`, `random`)
//! - A high-level facade tying it all together (`Synthesizer`)

/// Snaps raw samples onto a fixed-step grid.
pub mod quantizer;

/// Run-length encoding of quantized sequences into patterns.
pub mod pattern;

/// A single node of the probability tree.
///
/// Holds the value and run-length histograms of one pattern position.
pub mod node;

/// Arena-backed probability tree and its recursive trainer.
pub mod tree;

/// Random draws used during generation.
pub mod random;

/// Generation parameters (target length, padding threshold, restart budget).
pub mod generation_input;

/// Samples synthetic sequences from a trained tree with bounded restarts.
pub mod generator;

/// Quantize, extract, train and generate in one place.
///
/// Supports loading a corpus from disk and parallel batch generation.
pub mod synthesizer;
