use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};

use super::Suggestion;
use super::state::State;
use crate::error::ModelError;
use crate::token::UNKNOWN_LEXEME;

/// Smoothing label reported for this model.
pub const SMOOTHING: &str = "WittenBell";

/// Below this many lexemes, training runs on the calling thread.
const PARALLEL_THRESHOLD: usize = 4096;

/// Represents an n-gram model over token lexemes.
///
/// The `NGramModel` stores one table of states per history length
/// (`0..n`) and estimates the probability of a lexeme given up to `n-1`
/// preceding lexemes, interpolating every order down to an add-one unigram
/// base (Witten-Bell).
///
/// # Responsibilities
/// - Count n-grams of every order from lexeme sequences
/// - Estimate smoothed conditional probabilities
/// - Rank next-lexeme suggestions for a context
/// - Compute (windowed) cross-entropy of a sequence
/// - Merge with another n-gram model of the same order `n`
///
/// # Invariants
/// - `n` is always >= 1
/// - `levels.len() == n`; `levels[k]` holds histories of exactly `k` lexemes
/// - No history and no counted lexeme is the unknown placeholder
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NGramModel {
	/// The order of the model (history length + 1)
	n: usize,

	/// Per history length, mapping from history to its state
	levels: Vec<HashMap<Vec<String>, State>>,
}

impl NGramModel {
	/// Creates a new, empty n-gram model of order `n`.
	///
	/// # Errors
	/// Returns an error if `n < 1`.
	pub fn new(n: usize) -> Result<Self, ModelError> {
		if n < 1 {
			return Err(ModelError::InvalidOrder);
		}
		Ok(Self { n, levels: vec![HashMap::new(); n] })
	}

	pub fn order(&self) -> usize {
		self.n
	}

	/// Number of distinct lexemes seen during training.
	pub fn vocabulary_size(&self) -> usize {
		self.unigrams().map_or(0, State::distinct)
	}

	fn unigrams(&self) -> Option<&State> {
		self.levels[0].get(&Vec::new())
	}

	/// Adds a lexeme sequence to the model, counting every n-gram order.
	///
	/// Large inputs are split into chunks; each chunk is counted into a
	/// partial model on its own thread and the partials are merged back.
	pub fn add_sequence(&mut self, lexemes: &[String]) -> Result<(), ModelError> {
		if lexemes.len() < PARALLEL_THRESHOLD {
			self.add_range(lexemes, 0, lexemes.len());
			return Ok(());
		}

		let chunks = num_cpus::get().max(1);
		let chunk_size = lexemes.len().div_ceil(chunks);
		let n = self.n;

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for start in (0..lexemes.len()).step_by(chunk_size) {
				let tx = tx.clone();
				let end = (start + chunk_size).min(lexemes.len());
				scope.spawn(move || {
					let mut partial = Self { n, levels: vec![HashMap::new(); n] };
					partial.add_range(lexemes, start, end);
					// The receiver outlives the scope, so this cannot fail.
					let _ = tx.send(partial);
				});
			}
		});
		drop(tx);

		for partial in rx.iter() {
			self.merge(&partial)?;
		}
		Ok(())
	}

	/// Counts n-grams whose final lexeme lies in `lexemes[start..end]`.
	///
	/// Histories may reach before `start`, so chunk boundaries never lose
	/// an n-gram.
	fn add_range(&mut self, lexemes: &[String], start: usize, end: usize) {
		for i in start..end {
			let next = &lexemes[i];
			if next == UNKNOWN_LEXEME {
				continue;
			}
			for k in 0..self.n.min(i + 1) {
				let history = &lexemes[i - k..i];
				// Histories never reach across an unknown token
				if k > 0 && history[0] == UNKNOWN_LEXEME {
					break;
				}
				self.levels[k]
					.entry(history.to_vec())
					.or_insert_with(|| State::new(history))
					.add_transition(next);
			}
		}
	}

	/// Trims a context to the usable history: at most `n-1` lexemes, none
	/// of them before (or equal to) the latest unknown placeholder.
	fn usable_history<'a>(&self, context: &'a [String]) -> &'a [String] {
		let keep = self.n - 1;
		let context = &context[context.len().saturating_sub(keep)..];
		match context.iter().rposition(|lexeme| lexeme == UNKNOWN_LEXEME) {
			Some(unk) => &context[unk + 1..],
			None => context,
		}
	}

	/// Smoothed probability of `next` following `context`.
	///
	/// # Notes
	/// - Always strictly positive, even for unseen lexemes.
	pub fn probability(&self, context: &[String], next: &str) -> f64 {
		let history = self.usable_history(context);

		// Add-one base so unseen lexemes keep some mass
		let (count, total, vocabulary) = match self.unigrams() {
			Some(unigrams) => (unigrams.count(next), unigrams.total(), unigrams.distinct()),
			None => (0, 0, 0),
		};
		let mut p = (count as f64 + 1.0) / (total as f64 + vocabulary as f64 + 1.0);

		for k in 1..=history.len() {
			let key = &history[history.len() - k..];
			let Some(state) = self.levels[k].get(key) else {
				// A longer history cannot exist if this one does not
				break;
			};
			let distinct = state.distinct() as f64;
			p = (state.count(next) as f64 + distinct * p) / (state.total() as f64 + distinct);
		}
		p
	}

	/// Ranks likely next lexemes for `context`.
	///
	/// Candidates are the continuations of every matching history plus the
	/// most frequent unigrams; they are scored with [`probability`](Self::probability).
	pub fn predict(&self, context: &[String], limit: usize) -> Vec<Suggestion> {
		let history = self.usable_history(context);

		let mut candidates: HashSet<&str> = HashSet::new();
		for k in 1..=history.len() {
			match self.levels[k].get(&history[history.len() - k..]) {
				Some(state) => candidates.extend(state.continuations()),
				None => break,
			}
		}
		if let Some(unigrams) = self.unigrams() {
			candidates.extend(unigrams.ranked().into_iter().take(limit).map(|(lexeme, _)| lexeme));
		}

		let mut suggestions: Vec<Suggestion> = candidates
			.into_iter()
			.map(|lexeme| Suggestion::new(lexeme, self.probability(history, lexeme)))
			.collect();
		suggestions.sort_by(|a, b| {
			b.probability
				.total_cmp(&a.probability)
				.then_with(|| a.lexeme.cmp(&b.lexeme))
		});
		suggestions.truncate(limit);
		suggestions
	}

	/// Mean `-log2 P` of each lexeme given the lexemes before it.
	///
	/// # Errors
	/// Returns [`ModelError::EmptyInput`] for an empty sequence.
	pub fn cross_entropy(&self, lexemes: &[String]) -> Result<f64, ModelError> {
		if lexemes.is_empty() {
			return Err(ModelError::EmptyInput);
		}
		let sum: f64 = lexemes
			.iter()
			.enumerate()
			.map(|(i, next)| -self.probability(&lexemes[..i], next).log2())
			.sum();
		Ok(sum / lexemes.len() as f64)
	}

	/// Cross-entropy of every `window`-wide slice (step 1).
	///
	/// A sequence no longer than `window` is a single window.
	pub fn windowed_cross_entropy(&self, lexemes: &[String], window: usize) -> Result<Vec<f64>, ModelError> {
		if lexemes.is_empty() {
			return Err(ModelError::EmptyInput);
		}
		let window = window.max(1);
		if lexemes.len() <= window {
			return Ok(vec![self.cross_entropy(lexemes)?]);
		}
		lexemes.windows(window).map(|slice| self.cross_entropy(slice)).collect()
	}

	/// Merges another n-gram model into this one.
	///
	/// # Notes
	/// - Both models must have the same order `n`.
	/// - Occurrence counts for matching states and transitions are summed.
	///
	/// # Errors
	/// Returns an error if the model orders do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), ModelError> {
		if self.n != other.n {
			return Err(ModelError::OrderMismatch(self.n, other.n));
		}

		for (level, other_level) in self.levels.iter_mut().zip(&other.levels) {
			for (key, state) in other_level {
				if let Some(existing) = level.get_mut(key) {
					existing.merge(state)?;
				} else {
					level.insert(key.clone(), state.clone());
				}
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lexemes(text: &str) -> Vec<String> {
		text.split_whitespace().map(str::to_owned).collect()
	}

	fn trained(n: usize, text: &str) -> NGramModel {
		let mut model = NGramModel::new(n).unwrap();
		model.add_sequence(&lexemes(text)).unwrap();
		model
	}

	#[test]
	fn test_rejects_zero_order() {
		assert!(NGramModel::new(0).is_err());
	}

	#[test]
	fn test_predict_follows_training() {
		let model = trained(3, "for i in range ( n ) : for j in range ( m ) :");
		let suggestions = model.predict(&lexemes("j in"), 3);
		assert_eq!(suggestions[0].lexeme, "range");
		assert!(suggestions.windows(2).all(|w| w[0].probability >= w[1].probability));
	}

	#[test]
	fn test_unknown_cuts_history() {
		let model = trained(3, "a b c a b c");
		let with_unk = model.probability(&lexemes("<unk> b"), "c");
		let without = model.probability(&lexemes("b"), "c");
		assert_eq!(with_unk, without);
	}

	#[test]
	fn test_probability_is_positive_for_unseen() {
		let model = trained(2, "x = 1");
		assert!(model.probability(&lexemes("x"), "never") > 0.0);
		let empty = NGramModel::new(2).unwrap();
		assert_eq!(empty.probability(&[], "anything"), 1.0);
	}

	#[test]
	fn test_seen_code_is_more_natural() {
		let model = trained(3, "import os import os import os import sys");
		let seen = model.cross_entropy(&lexemes("import os")).unwrap();
		let unseen = model.cross_entropy(&lexemes("goto fail")).unwrap();
		assert!(seen < unseen);
		assert!(matches!(model.cross_entropy(&[]), Err(ModelError::EmptyInput)));
	}

	#[test]
	fn test_windowed_cross_entropy() {
		let model = trained(2, "a b a b a b");
		assert_eq!(model.windowed_cross_entropy(&lexemes("a b"), 4).unwrap().len(), 1);
		assert_eq!(model.windowed_cross_entropy(&lexemes("a b a b a"), 2).unwrap().len(), 4);
	}

	#[test]
	fn test_parallel_matches_sequential() {
		let text: Vec<String> = (0..PARALLEL_THRESHOLD * 2).map(|i| format!("t{}", i % 7)).collect();

		let mut parallel = NGramModel::new(3).unwrap();
		parallel.add_sequence(&text).unwrap();

		let mut sequential = NGramModel::new(3).unwrap();
		sequential.add_range(&text, 0, text.len());

		assert_eq!(parallel, sequential);
	}

	#[test]
	fn test_merge_order_mismatch() {
		let mut left = NGramModel::new(2).unwrap();
		let right = NGramModel::new(3).unwrap();
		assert!(matches!(left.merge(&right), Err(ModelError::OrderMismatch(2, 3))));
	}
}
