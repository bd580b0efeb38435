use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, CorpusResult, ModelError};
use crate::model::{LanguageModel, ModelBackend, Suggestion};
use crate::token::Token;
use crate::tokenizer::Tokenizer;

/// Static description of a corpus.
#[derive(Clone, Debug)]
pub struct CorpusMetadata {
	pub identifier: String,
	pub name: String,
	pub description: String,
	pub language: String,
}

/// Public summary of a corpus, as reported to callers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CorpusSummary {
	pub name: String,
	pub description: String,
	pub language: String,
	pub order: usize,
	pub smoothing: String,
	pub last_updated: Option<DateTime<Utc>>,
}

/// Result of a prediction: the suggestions and the exact context used.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
	pub suggestions: Vec<Suggestion>,
	/// The padded/truncated window handed to the model.
	pub tokens: Vec<Token>,
}

/// Result of a training run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrainResult {
	/// Number of tokens consumed.
	pub tokens: usize,
}

/// Model-resource state of a corpus.
enum ModelState {
	/// A handle is held and ready.
	Live(Box<dyn LanguageModel>),
	/// No handle; the next operation needing one acquires it.
	Released,
}

/// An addressable unit pairing a tokenizer, a language model and metadata.
///
/// # Responsibilities
/// - Own the only handle to its language model, acquiring it lazily
/// - Normalize prediction contexts to exactly `order` tokens
/// - Serialize every operation touching the model behind one lock
/// - Track when the statistics were last trained
///
/// # Invariants
/// - `order >= 1` and never changes
/// - At most one live handle exists, and only inside `model`
/// - A failed model operation leaves the corpus `Released`
pub struct Corpus {
	metadata: CorpusMetadata,
	order: usize,
	smoothing: String,
	tokenizer: Arc<dyn Tokenizer>,
	backend: Box<dyn ModelBackend>,
	/// Held from "ensure live" until the operation completes.
	model: Mutex<ModelState>,
	/// Only written while `model` is locked.
	last_updated: RwLock<Option<DateTime<Utc>>>,
}

impl Corpus {
	/// Creates a corpus and eagerly acquires its model handle.
	///
	/// # Errors
	/// - [`CorpusError::InvalidOrder`] if the backend reports order 0.
	/// - [`CorpusError::Unavailable`] if the first handle cannot be acquired.
	pub fn new(metadata: CorpusMetadata, tokenizer: Arc<dyn Tokenizer>, backend: Box<dyn ModelBackend>) -> CorpusResult<Self> {
		let order = backend.order();
		if order < 1 {
			return Err(CorpusError::InvalidOrder);
		}
		let model = backend.open().map_err(CorpusError::Unavailable)?;
		debug!("corpus '{}' acquired its model (order {order})", metadata.identifier);

		Ok(Self {
			order,
			smoothing: backend.smoothing().to_owned(),
			metadata,
			tokenizer,
			backend,
			model: Mutex::new(ModelState::Live(model)),
			last_updated: RwLock::new(None),
		})
	}

	pub fn identifier(&self) -> &str {
		&self.metadata.identifier
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn last_updated(&self) -> Option<DateTime<Utc>> {
		*self.last_updated.read()
	}

	/// Whether a model handle is currently held.
	pub fn is_live(&self) -> bool {
		matches!(*self.model.lock(), ModelState::Live(_))
	}

	pub fn summary(&self) -> CorpusSummary {
		CorpusSummary {
			name: self.metadata.name.clone(),
			description: self.metadata.description.clone(),
			language: self.metadata.language.clone(),
			order: self.order,
			smoothing: self.smoothing.clone(),
			last_updated: self.last_updated(),
		}
	}

	/// Tokenizes `text` for this corpus's language.
	///
	/// Does not touch the model, so it never waits on the model lock.
	pub fn tokenize(&self, text: &str, mid_line: bool) -> CorpusResult<Vec<Token>> {
		Ok(self.tokenizer.tokenize(text, mid_line)?)
	}

	/// Suggests the next token after `tokens`.
	///
	/// The model sees exactly [`context_window`]`(tokens, order)`, which is
	/// also returned so callers can see the effective context.
	pub fn predict(&self, tokens: &[Token]) -> CorpusResult<Prediction> {
		let window = context_window(tokens, self.order);
		let suggestions = self.with_model(CorpusError::Prediction, |model| model.predict(&window))?;
		Ok(Prediction { suggestions, tokens: window })
	}

	/// Trains the model on `tokens`, then releases the handle so the
	/// statistics are committed. The next model operation reacquires.
	pub fn train(&self, tokens: &[Token]) -> CorpusResult<TrainResult> {
		let mut state = self.model.lock();
		let mut model = self.take_live(&mut state).map_err(CorpusError::Training)?;

		let consumed = match model.train(tokens) {
			Ok(consumed) => consumed,
			Err(e) => {
				warn!("corpus '{}' discarded its model after a training failure: {e}", self.identifier());
				return Err(CorpusError::Training(e));
			}
		};
		model.release().map_err(CorpusError::Training)?;

		let mut last_updated = self.last_updated.write();
		let now = Utc::now();
		*last_updated = Some(last_updated.map_or(now, |previous| previous.max(now)));
		info!("corpus '{}' trained on {consumed} tokens", self.identifier());

		Ok(TrainResult { tokens: consumed })
	}

	/// Cross-entropy of `tokens` as a whole. No padding is applied.
	pub fn cross_entropy(&self, tokens: &[Token]) -> CorpusResult<f64> {
		self.with_model(CorpusError::Scoring, |model| model.query(tokens))
	}

	/// Highest cross-entropy over the model's sliding windows.
	pub fn windowed_cross_entropy(&self, tokens: &[Token]) -> CorpusResult<f64> {
		self.with_model(CorpusError::Scoring, |model| model.windowed_query(tokens))
			.map(|result| result.worst)
	}

	/// Wipes the statistics and forgets `last_updated`.
	///
	/// Idempotent. The corpus stays addressable; the next model operation
	/// starts from empty statistics.
	///
	/// # Errors
	/// [`CorpusError::Unsupported`] if the backend cannot wipe.
	pub fn reset(&self) -> CorpusResult<()> {
		if !self.backend.supports_reset() {
			return Err(CorpusError::Unsupported { corpus: self.identifier().to_owned(), operation: "reset" });
		}

		let mut state = self.model.lock();
		// Dropping the handle discards it without committing
		*state = ModelState::Released;
		self.backend.wipe().map_err(CorpusError::Unavailable)?;
		*self.last_updated.write() = None;
		info!("corpus '{}' reset", self.identifier());
		Ok(())
	}

	/// Releases the live handle, if any, committing its statistics.
	pub fn shutdown(&self) -> CorpusResult<()> {
		let mut state = self.model.lock();
		if let ModelState::Live(model) = std::mem::replace(&mut *state, ModelState::Released) {
			debug!("corpus '{}' releasing its model", self.identifier());
			model.release().map_err(CorpusError::Unavailable)?;
		}
		Ok(())
	}

	/// Takes the live handle out of `state`, acquiring one if released.
	///
	/// `state` is left `Released`; the caller puts the handle back on success.
	fn take_live(&self, state: &mut ModelState) -> Result<Box<dyn LanguageModel>, ModelError> {
		match std::mem::replace(state, ModelState::Released) {
			ModelState::Live(model) => Ok(model),
			ModelState::Released => {
				debug!("corpus '{}' reacquiring its model", self.identifier());
				self.backend.open()
			}
		}
	}

	/// Runs `operation` against a live handle under the model lock.
	fn with_model<T>(
		&self,
		wrap: fn(ModelError) -> CorpusError,
		operation: impl FnOnce(&mut dyn LanguageModel) -> Result<T, ModelError>,
	) -> CorpusResult<T> {
		let mut state = self.model.lock();
		let mut model = self.take_live(&mut state).map_err(wrap)?;
		match operation(model.as_mut()) {
			Ok(value) => {
				*state = ModelState::Live(model);
				Ok(value)
			}
			Err(e) => {
				warn!("corpus '{}' discarded its model after a failure: {e}", self.identifier());
				Err(wrap(e))
			}
		}
	}
}

/// Normalizes a context to exactly `order` tokens.
///
/// Short inputs are left-padded with the unknown placeholder; long inputs
/// keep only their last `order` tokens.
pub fn context_window(tokens: &[Token], order: usize) -> Vec<Token> {
	let padding = order.saturating_sub(tokens.len());
	let kept = &tokens[tokens.len() - (order - padding)..];

	let mut window = Vec::with_capacity(order);
	window.resize(padding, Token::unknown());
	window.extend_from_slice(kept);
	window
}
