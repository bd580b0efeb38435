use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Represents a history state in an n-gram model.
///
/// A `State` corresponds to a fixed sequence of preceding lexemes (`key`) and
/// stores every observed continuation of that history.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate continuation occurrences during training
/// - Expose the counts the smoothing step needs (`count`, `total`, `distinct`)
/// - Merge with another state having the same key (parallel training support)
///
/// ## Invariants
/// - All transitions belong to the same `key`
/// - Each transition occurrence count is strictly positive
/// - `total` is the sum of all transition counts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct State {
	/// Identifier of the state (the history lexemes, oldest first).
	key: Vec<String>,
	/// Outgoing transitions indexed by the next lexeme.
	/// Example: { "(" => 42, "." => 3 }
	transitions: HashMap<String, usize>,
	total: usize,
}

impl State {
	/// Creates a new empty state for the given history.
	pub fn new(key: &[String]) -> Self {
		Self {
			key: key.to_vec(),
			transitions: HashMap::new(),
			total: 0,
		}
	}

	/// Records an occurrence of a transition toward `next`.
	pub fn add_transition(&mut self, next: &str) {
		match self.transitions.get_mut(next) {
			Some(occurrence) => *occurrence += 1,
			None => {
				self.transitions.insert(next.to_owned(), 1);
			}
		}
		self.total += 1;
	}

	/// Number of times `next` followed this history.
	pub fn count(&self, next: &str) -> usize {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	/// Sum of all continuation counts.
	pub fn total(&self) -> usize {
		self.total
	}

	/// Number of distinct continuations.
	pub fn distinct(&self) -> usize {
		self.transitions.len()
	}

	/// Continuations ordered by decreasing occurrence, ties broken by lexeme.
	pub fn ranked(&self) -> Vec<(&str, usize)> {
		let mut ranked: Vec<(&str, usize)> = self
			.transitions
			.iter()
			.map(|(next, occurrence)| (next.as_str(), *occurrence))
			.collect();
		ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
		ranked
	}

	/// Iterates over continuation lexemes in no particular order.
	pub fn continuations(&self) -> impl Iterator<Item = &str> {
		self.transitions.keys().map(String::as_str)
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same history (`key`).
	/// Transition occurrence counts are summed.
	///
	/// # Errors
	/// Returns an error if the state keys do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), ModelError> {
		if self.key != other.key {
			return Err(ModelError::KeyMismatch);
		}

		for (next, occurrence) in &other.transitions {
			*self.transitions.entry(next.clone()).or_insert(0) += *occurrence;
		}
		self.total += other.total;

		Ok(())
	}
}
