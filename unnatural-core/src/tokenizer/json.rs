use serde::Deserialize;

use super::Tokenizer;
use crate::error::TokenizeError;
use crate::token::Token;

/// One element of a pre-lexed payload: a full record or a bare lexeme.
#[derive(Deserialize)]
#[serde(untagged)]
enum Entry {
	Record(Token),
	Lexeme(String),
}

/// Tokenizer for input that is already lexed.
///
/// The text is a JSON array whose elements are either 5-element token
/// records (`[kind, value, start, end, lexeme]`) or plain lexeme strings:
///
/// ```json
/// [["NAME", "x", [1, 0], [1, 1], "x"], "=", "1"]
/// ```
///
/// `mid_line` has no effect; the payload is taken as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTokenizer;

impl Tokenizer for JsonTokenizer {
	fn tokenize(&self, text: &str, _mid_line: bool) -> Result<Vec<Token>, TokenizeError> {
		let entries: Vec<Entry> = serde_json::from_str(text)?;
		Ok(entries
			.into_iter()
			.map(|entry| match entry {
				Entry::Record(token) => token,
				Entry::Lexeme(lexeme) => Token::from_lexeme(&lexeme),
			})
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mixed_payload() {
		let tokens = JsonTokenizer
			.tokenize(r#"[["NAME", "x", [1, 0], [1, 1], "x"], "=", "1"]"#, false)
			.unwrap();
		assert_eq!(
			tokens,
			vec![
				Token::new("NAME", "x", (1, 0), (1, 1), "x"),
				Token::from_lexeme("="),
				Token::from_lexeme("1"),
			]
		);
	}

	#[test]
	fn test_rejects_non_array() {
		assert!(matches!(JsonTokenizer.tokenize("x = 1", true), Err(TokenizeError::Payload(_))));
		assert!(JsonTokenizer.tokenize("[]", true).unwrap().is_empty());
	}
}
