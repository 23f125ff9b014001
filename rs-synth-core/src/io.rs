use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::env;

use crate::error::{Result, SynthesisError};

/// Reads one raw sample sequence from a text file.
///
/// - Splits the contents on any whitespace
/// - Keeps tokens that parse as finite `f64`, skips everything else
pub fn read_samples<P: AsRef<Path>>(filename: P) -> Result<Vec<f64>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(parse_samples(&contents))
}

fn parse_samples(contents: &str) -> Vec<f64> {
	contents
		.split_whitespace()
		.filter_map(|token| token.parse::<f64>().ok())
		.filter(|x| x.is_finite())
		.collect()
}

/// Writes a sequence as one value per line.
///
/// # Errors
/// - [`SynthesisError::EmptySequence`] if `samples` is empty (nothing is created)
/// - [`SynthesisError::Io`] if the file cannot be created or written
pub fn save_samples<P: AsRef<Path>>(filename: P, samples: &[f64]) -> Result<()> {
	if samples.is_empty() {
		return Err(SynthesisError::EmptySequence);
	}

	let mut writer = BufWriter::new(File::create(filename)?);
	for x in samples {
		writeln!(writer, "{x}")?;
	}
	writer.flush()?;
	Ok(())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists every file under `dir`, descending into subdirectories.
///
/// Paths are sorted so corpus order does not depend on the filesystem.
pub fn list_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	let mut pending = vec![dir.as_ref().to_path_buf()];

	while let Some(current) = pending.pop() {
		for entry in fs::read_dir(&current)? {
			let path = entry?.path();
			if path.is_dir() {
				pending.push(path);
			} else if path.is_file() {
				files.push(path);
			}
		}
	}

	files.sort();
	Ok(files)
}

/// Loads one sample sequence per file found under `dir`.
///
/// Files that cannot be read are logged and skipped as a whole; files
/// holding no numeric token are discarded.
///
/// # Errors
/// Returns an error if `dir` itself cannot be listed.
pub fn load_corpus<P: AsRef<Path>>(dir: P) -> Result<Vec<Vec<f64>>> {
	let mut corpus = Vec::new();

	for path in list_files(&dir)? {
		match read_samples(&path) {
			Ok(samples) if samples.is_empty() => {
				log::debug!("no samples in {}", path.display());
			}
			Ok(samples) => corpus.push(samples),
			Err(e) => log::warn!("skipping {}: {}", path.display(), e),
		}
	}

	log::info!("loaded {} sequences from {}", corpus.len(), dir.as_ref().display());
	Ok(corpus)
}
