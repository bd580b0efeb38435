use thiserror::Error;

/// Failures reported by a tokenizer.
#[derive(Error, Debug)]
pub enum TokenizeError {
	/// The lexer hit input it has no rule for.
	#[error("unrecognized input {text:?} at line {line}, column {column}")]
	Unrecognized {
		line: usize,
		column: usize,
		text: String,
	},

	/// A dedent does not line up with any enclosing indentation level.
	#[error("inconsistent dedent at line {line}")]
	Dedent { line: usize },

	/// The pre-lexed payload could not be decoded.
	#[error("malformed token payload: {0}")]
	Payload(#[from] serde_json::Error),
}

/// Failures reported by a language model or its backend.
#[derive(Error, Debug)]
pub enum ModelError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("statistics codec error: {0}")]
	Codec(#[from] postcard::Error),

	/// The model cannot score or predict from an empty sequence.
	#[error("empty token sequence")]
	EmptyInput,

	/// The context handed to `predict` does not match the model order.
	#[error("context has {got} tokens, model order is {expected}")]
	ContextLength { expected: usize, got: usize },

	/// Statistics of two different orders cannot be merged.
	#[error("order mismatch: {0} != {1}")]
	OrderMismatch(usize, usize),

	#[error("n-gram order must be >= 1")]
	InvalidOrder,

	#[error("key mismatch")]
	KeyMismatch,
}

/// Errors surfaced by corpus and registry operations.
///
/// Every variant maps to one stable [`category`](CorpusError::category) so a
/// boundary layer can pick a response without parsing messages.
#[derive(Error, Debug)]
pub enum CorpusError {
	#[error("corpus '{0}' not found")]
	NotFound(String),

	#[error("tokenization failed: {0}")]
	Tokenization(#[from] TokenizeError),

	#[error("training failed: {0}")]
	Training(#[source] ModelError),

	#[error("prediction failed: {0}")]
	Prediction(#[source] ModelError),

	#[error("scoring failed: {0}")]
	Scoring(#[source] ModelError),

	/// The corpus variant lacks a capability (e.g. its backend cannot wipe).
	#[error("corpus '{corpus}' does not support {operation}")]
	Unsupported {
		corpus: String,
		operation: &'static str,
	},

	/// The model resource could not be acquired, committed or wiped.
	#[error("model resource unavailable: {0}")]
	Unavailable(#[source] ModelError),

	#[error("n-gram order must be >= 1")]
	InvalidOrder,
}

impl CorpusError {
	/// Returns the stable category name for this error.
	pub fn category(&self) -> &'static str {
		match self {
			CorpusError::NotFound(_) => "not_found",
			CorpusError::Tokenization(_) => "tokenization",
			CorpusError::Training(_) => "training",
			CorpusError::Prediction(_) => "prediction",
			CorpusError::Scoring(_) => "scoring",
			CorpusError::Unsupported { .. } => "unsupported",
			CorpusError::Unavailable(_) => "unavailable",
			CorpusError::InvalidOrder => "invalid_order",
		}
	}
}

/// Result type for corpus operations.
pub type CorpusResult<T> = Result<T, CorpusError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_categories_are_distinct() {
		let errors = [
			CorpusError::NotFound("x".to_owned()),
			CorpusError::Tokenization(TokenizeError::Dedent { line: 1 }),
			CorpusError::Training(ModelError::EmptyInput),
			CorpusError::Prediction(ModelError::EmptyInput),
			CorpusError::Scoring(ModelError::EmptyInput),
			CorpusError::Unsupported { corpus: "x".to_owned(), operation: "reset" },
			CorpusError::Unavailable(ModelError::EmptyInput),
			CorpusError::InvalidOrder,
		];
		let mut categories: Vec<&str> = errors.iter().map(CorpusError::category).collect();
		categories.sort();
		categories.dedup();
		assert_eq!(categories.len(), errors.len());
	}

	#[test]
	fn test_not_found_message() {
		let error = CorpusError::NotFound("cobol".to_owned());
		assert_eq!(error.to_string(), "corpus 'cobol' not found");
	}
}
