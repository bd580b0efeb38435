//! Language model boundary and the bundled n-gram engine.
//!
//! This module provides:
//! - The `LanguageModel` contract a corpus drives (`train`, `predict`,
//!   `query`, `windowed_query`, `release`)
//! - The `ModelBackend` factory that acquires live handles and wipes statistics
//! - A fixed-order n-gram engine (`NGramModel`) persisted per corpus (`NGramBackend`)

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::token::Token;

/// Fixed-order n-gram statistics over lexemes (`n >= 1`).
///
/// Handles sequence ingestion, smoothed probability estimation,
/// ranking of next-lexeme suggestions, cross-entropy and model merging.
pub mod ngram_model;

/// File-backed backend and live session for `NGramModel`.
///
/// A session loads the statistics on acquire and writes them back on release.
pub mod ngram_backend;

/// Internal representation of a single n-gram history.
///
/// Tracks outgoing transitions and their counts.
/// This module is not exposed publicly.
mod state;

/// One ranked next-token candidate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Suggestion {
	pub lexeme: String,
	pub probability: f64,
	/// `-log2 probability`, in bits.
	pub entropy: f64,
}

impl Suggestion {
	pub fn new(lexeme: &str, probability: f64) -> Self {
		Self {
			lexeme: lexeme.to_owned(),
			probability,
			entropy: -probability.log2(),
		}
	}
}

/// Result of a windowed cross-entropy query.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowedEntropy {
	/// Cross-entropy of each window, in sequence order.
	pub windows: Vec<f64>,
	/// The highest window entropy (the least natural stretch).
	pub worst: f64,
}

impl WindowedEntropy {
	/// Builds the result from per-window values.
	///
	/// # Errors
	/// Returns [`ModelError::EmptyInput`] if there are no windows.
	pub fn from_windows(windows: Vec<f64>) -> Result<Self, ModelError> {
		let worst = windows.iter().copied().reduce(f64::max).ok_or(ModelError::EmptyInput)?;
		Ok(Self { windows, worst })
	}
}

/// A live handle to a statistical language model of fixed order.
///
/// A handle is a stateful resource: it must never be driven by two
/// operations at once. Callers own it exclusively and end its life with
/// [`release`](LanguageModel::release), which commits the statistics.
pub trait LanguageModel: Send {
	/// The n-gram order; `predict` contexts must have exactly this length.
	fn order(&self) -> usize;

	/// Feeds a token sequence into the statistics.
	///
	/// Returns the number of tokens consumed.
	fn train(&mut self, tokens: &[Token]) -> Result<usize, ModelError>;

	/// Ranks next-token suggestions for a context of exactly `order` tokens.
	fn predict(&mut self, context: &[Token]) -> Result<Vec<Suggestion>, ModelError>;

	/// Cross-entropy of the whole sequence.
	fn query(&mut self, tokens: &[Token]) -> Result<f64, ModelError>;

	/// Cross-entropy over a sliding window.
	fn windowed_query(&mut self, tokens: &[Token]) -> Result<WindowedEntropy, ModelError>;

	/// Stops the handle, committing its statistics.
	fn release(self: Box<Self>) -> Result<(), ModelError>;
}

/// Acquires [`LanguageModel`] handles for one corpus.
pub trait ModelBackend: Send + Sync {
	/// The n-gram order every handle from this backend has.
	fn order(&self) -> usize;

	/// Name of the smoothing method the handles use.
	fn smoothing(&self) -> &str;

	/// Acquires a fresh live handle bound to the committed statistics.
	fn open(&self) -> Result<Box<dyn LanguageModel>, ModelError>;

	/// Whether [`wipe`](ModelBackend::wipe) is supported.
	fn supports_reset(&self) -> bool {
		false
	}

	/// Deletes the committed statistics.
	///
	/// Only called when [`supports_reset`](ModelBackend::supports_reset) is true.
	fn wipe(&self) -> Result<(), ModelError> {
		Ok(())
	}
}

/// Extracts the lexemes the statistics key on.
pub(crate) fn lexemes(tokens: &[Token]) -> Vec<String> {
	tokens.iter().map(|token| token.lexeme.clone()).collect()
}
