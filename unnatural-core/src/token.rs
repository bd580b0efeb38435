use serde::{Deserialize, Serialize};

/// Lexeme used by the unknown-token placeholder.
pub const UNKNOWN_LEXEME: &str = "<unk>";

/// A `(line, column)` source position. Lines start at 1, columns at 0.
pub type Position = (usize, usize);

/// Wire shape of a token: a fixed 5-element array.
type TokenRecord = (Option<String>, Option<String>, Option<Position>, Option<Position>, String);

/// One lexical unit as the language model sees it.
///
/// Every token has the same arity: a classification (`kind`), the raw source
/// text (`value`), optional start/end positions, and the `lexeme` the model
/// keys its statistics on. On the wire a token is the array
/// `[kind, value, start, end, lexeme]`.
///
/// # Invariants
/// - `lexeme` is never empty for tokens produced by a tokenizer
/// - The unknown placeholder has every optional field unset
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "TokenRecord", into = "TokenRecord")]
pub struct Token {
	pub kind: Option<String>,
	pub value: Option<String>,
	pub start: Option<Position>,
	pub end: Option<Position>,
	pub lexeme: String,
}

impl Token {
	/// Creates a fully positioned token.
	pub fn new(kind: &str, value: &str, start: Position, end: Position, lexeme: &str) -> Self {
		Self {
			kind: Some(kind.to_owned()),
			value: Some(value.to_owned()),
			start: Some(start),
			end: Some(end),
			lexeme: lexeme.to_owned(),
		}
	}

	/// Creates a bare token carrying only a lexeme.
	pub fn from_lexeme(lexeme: &str) -> Self {
		Self { kind: None, value: None, start: None, end: None, lexeme: lexeme.to_owned() }
	}

	/// The unknown-token placeholder used to pad short contexts.
	pub fn unknown() -> Self {
		Self::from_lexeme(UNKNOWN_LEXEME)
	}

	pub fn is_unknown(&self) -> bool {
		self.lexeme == UNKNOWN_LEXEME
	}
}

impl From<TokenRecord> for Token {
	fn from((kind, value, start, end, lexeme): TokenRecord) -> Self {
		Self { kind, value, start, end, lexeme }
	}
}

impl From<Token> for TokenRecord {
	fn from(token: Token) -> Self {
		(token.kind, token.value, token.start, token.end, token.lexeme)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_wire_shape() {
		let json = serde_json::to_string(&Token::unknown()).unwrap();
		assert_eq!(json, r#"[null,null,null,null,"<unk>"]"#);
	}

	#[test]
	fn test_token_from_array() {
		let token: Token = serde_json::from_str(r#"["NAME","foo",[1,0],[1,3],"foo"]"#).unwrap();
		assert_eq!(token, Token::new("NAME", "foo", (1, 0), (1, 3), "foo"));
		assert!(!token.is_unknown());
	}
}
