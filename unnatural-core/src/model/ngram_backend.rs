use std::path::PathBuf;

use log::debug;

use super::ngram_model::{NGramModel, SMOOTHING};
use super::{LanguageModel, ModelBackend, Suggestion, WindowedEntropy, lexemes};
use crate::error::ModelError;
use crate::io::{read_binary, remove_if_exists, write_binary};
use crate::token::Token;

/// Backend persisting one `NGramModel` in a postcard file.
///
/// # Behavior
/// - `open` loads the file if it exists, otherwise starts from empty statistics
/// - A session's `release` writes the statistics back to the same file
/// - `wipe` deletes the file, so the next `open` starts from scratch
#[derive(Debug, Clone)]
pub struct NGramBackend {
	order: usize,
	path: PathBuf,
	max_suggestions: usize,
	window_size: usize,
}

impl NGramBackend {
	/// Creates a backend storing its statistics at `path`.
	///
	/// # Errors
	/// Returns an error if `order < 1`.
	pub fn new<P: Into<PathBuf>>(order: usize, path: P, max_suggestions: usize, window_size: usize) -> Result<Self, ModelError> {
		if order < 1 {
			return Err(ModelError::InvalidOrder);
		}
		Ok(Self { order, path: path.into(), max_suggestions, window_size })
	}

	pub fn path(&self) -> &PathBuf {
		&self.path
	}
}

impl ModelBackend for NGramBackend {
	fn order(&self) -> usize {
		self.order
	}

	fn smoothing(&self) -> &str {
		SMOOTHING
	}

	fn open(&self) -> Result<Box<dyn LanguageModel>, ModelError> {
		let model = match read_binary::<NGramModel, _>(&self.path)? {
			Some(model) if model.order() != self.order => {
				return Err(ModelError::OrderMismatch(self.order, model.order()));
			}
			Some(model) => model,
			None => NGramModel::new(self.order)?,
		};
		debug!("opened {} ({} lexemes)", self.path.display(), model.vocabulary_size());

		Ok(Box::new(NGramSession {
			model,
			path: self.path.clone(),
			max_suggestions: self.max_suggestions,
			window_size: self.window_size,
		}))
	}

	fn supports_reset(&self) -> bool {
		true
	}

	fn wipe(&self) -> Result<(), ModelError> {
		debug!("wiping {}", self.path.display());
		Ok(remove_if_exists(&self.path)?)
	}
}

/// Live handle over an in-memory `NGramModel`.
struct NGramSession {
	model: NGramModel,
	path: PathBuf,
	max_suggestions: usize,
	window_size: usize,
}

impl LanguageModel for NGramSession {
	fn order(&self) -> usize {
		self.model.order()
	}

	fn train(&mut self, tokens: &[Token]) -> Result<usize, ModelError> {
		self.model.add_sequence(&lexemes(tokens))?;
		Ok(tokens.len())
	}

	fn predict(&mut self, context: &[Token]) -> Result<Vec<Suggestion>, ModelError> {
		if context.len() != self.model.order() {
			return Err(ModelError::ContextLength { expected: self.model.order(), got: context.len() });
		}
		Ok(self.model.predict(&lexemes(context), self.max_suggestions))
	}

	fn query(&mut self, tokens: &[Token]) -> Result<f64, ModelError> {
		self.model.cross_entropy(&lexemes(tokens))
	}

	fn windowed_query(&mut self, tokens: &[Token]) -> Result<WindowedEntropy, ModelError> {
		let windows = self.model.windowed_cross_entropy(&lexemes(tokens), self.window_size)?;
		WindowedEntropy::from_windows(windows)
	}

	fn release(self: Box<Self>) -> Result<(), ModelError> {
		debug!("committing {}", self.path.display());
		write_binary(&self.path, &self.model)
	}
}
