//! Per-language tokenizers.
//!
//! A tokenizer turns raw text into the fixed-arity [`Token`] records a
//! corpus feeds to its language model.

use crate::error::TokenizeError;
use crate::token::Token;

/// Pre-lexed JSON token payloads (the generic corpus).
pub mod json;

/// Python source lexer built on a `logos` DFA.
pub mod python;

pub use json::JsonTokenizer;
pub use python::PythonTokenizer;

/// Converts raw text into a materialized token sequence for one language.
///
/// Implementations are stateless: a corpus calls them without holding its
/// model lock.
pub trait Tokenizer: Send + Sync {
	/// Tokenizes `text`.
	///
	/// `mid_line` marks the input as possibly ending inside an incomplete
	/// line; it only changes how the trailing partial token is treated.
	fn tokenize(&self, text: &str, mid_line: bool) -> Result<Vec<Token>, TokenizeError>;
}
