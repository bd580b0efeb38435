//! # Python Lexer
//!
//! Compile-time DFA lexer for Python source, post-processed into the
//! token stream Python's own `tokenize` produces: logical `NEWLINE`s,
//! `INDENT`/`DEDENT` pairs and a final `ENDMARKER`. Comments, blank lines
//! and explicit line continuations produce no tokens, and newlines inside
//! brackets are ignored.

use logos::Logos;

use super::Tokenizer;
use crate::error::TokenizeError;
use crate::token::{Position, Token};

const KEYWORDS: &[&str] = &[
	"False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
	"elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
	"not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Raw lexical classes recognised by the DFA.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum PyLexeme {
	#[regex(r"[ \t\x0C]+")]
	Whitespace,

	#[regex(r"#[^\r\n]*", allow_greedy = true)]
	Comment,

	#[regex(r"\\(\r\n|\n|\r)")]
	Continuation,

	#[regex(r"\r\n|\n|\r")]
	Newline,

	#[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
	Name,

	#[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?[jJ]?")]
	#[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[jJ]?")]
	#[regex(r"0[xXoObB][0-9a-fA-F_]+")]
	Number,

	#[regex(r#"[rRbBuUfF]{0,2}"([^"\\\r\n]|\\[^\r\n]|\\\r?\n)*""#)]
	#[regex(r#"[rRbBuUfF]{0,2}'([^'\\\r\n]|\\[^\r\n]|\\\r?\n)*'"#)]
	#[regex(r#"[rRbBuUfF]{0,2}"""([^"\\]|\\[\s\S]|"{1,2}([^"\\]|\\[\s\S]))*""""#)]
	#[regex(r#"[rRbBuUfF]{0,2}'''([^'\\]|\\[\s\S]|'{1,2}([^'\\]|\\[\s\S]))*'''"#)]
	String,

	#[token("(")]
	#[token("[")]
	#[token("{")]
	Open,

	#[token(")")]
	#[token("]")]
	#[token("}")]
	Close,

	#[token("+")]
	#[token("-")]
	#[token("*")]
	#[token("**")]
	#[token("/")]
	#[token("//")]
	#[token("%")]
	#[token("@")]
	#[token("<<")]
	#[token(">>")]
	#[token("&")]
	#[token("|")]
	#[token("^")]
	#[token("~")]
	#[token(":=")]
	#[token("<")]
	#[token(">")]
	#[token("<=")]
	#[token(">=")]
	#[token("==")]
	#[token("!=")]
	#[token(",")]
	#[token(":")]
	#[token(".")]
	#[token(";")]
	#[token("=")]
	#[token("->")]
	#[token("+=")]
	#[token("-=")]
	#[token("*=")]
	#[token("/=")]
	#[token("//=")]
	#[token("%=")]
	#[token("@=")]
	#[token("&=")]
	#[token("|=")]
	#[token("^=")]
	#[token(">>=")]
	#[token("<<=")]
	#[token("**=")]
	#[token("...")]
	Operator,
}

/// Tokenizer for Python source.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonTokenizer;

impl Tokenizer for PythonTokenizer {
	fn tokenize(&self, text: &str, mid_line: bool) -> Result<Vec<Token>, TokenizeError> {
		let mut cursor = Cursor::new(text);
		let mut lexer = PyLexeme::lexer(text);

		while let Some(result) = lexer.next() {
			let span = lexer.span();
			match result {
				Err(()) => {
					let rest = &text[span.start..];
					// Only the trailing partial line may be incomplete
					if mid_line && !rest.contains(['\r', '\n']) {
						cursor.begin_line_content()?;
						cursor.push("ERRORTOKEN", span.start, text.len(), rest);
						return Ok(cursor.tokens);
					}
					let (line, column) = cursor.position(span.start);
					return Err(TokenizeError::Unrecognized { line, column, text: lexer.slice().to_owned() });
				}
				Ok(PyLexeme::String) if opens_triple_quote(lexer.slice(), lexer.remainder()) => {
					// An unclosed triple quote runs to the end of the input
					if mid_line {
						cursor.begin_line_content()?;
						cursor.push("ERRORTOKEN", span.start, text.len(), &text[span.start..]);
						return Ok(cursor.tokens);
					}
					let (line, column) = cursor.position(span.start);
					return Err(TokenizeError::Unrecognized { line, column, text: text[span.start..=span.end].to_owned() });
				}
				Ok(PyLexeme::Whitespace) => cursor.whitespace(lexer.slice()),
				Ok(PyLexeme::Comment) => (),
				Ok(PyLexeme::Continuation) => cursor.next_line(span.end),
				Ok(PyLexeme::Newline) => cursor.newline(span.start, span.end),
				Ok(kind) => {
					cursor.begin_line_content()?;
					let slice = lexer.slice();
					let class = match kind {
						PyLexeme::Name if KEYWORDS.contains(&slice) => "KEYWORD",
						PyLexeme::Name => "NAME",
						PyLexeme::Number => "NUMBER",
						PyLexeme::String => "STRING",
						PyLexeme::Open => {
							cursor.depth += 1;
							"OP"
						}
						PyLexeme::Close => {
							cursor.depth = cursor.depth.saturating_sub(1);
							"OP"
						}
						_ => "OP",
					};
					cursor.push(class, span.start, span.end, slice);
				}
			}
		}

		if !mid_line {
			cursor.finish();
		}
		Ok(cursor.tokens)
	}
}

/// Whether an empty string literal is really the start of a triple quote.
///
/// The DFA falls back to `""` (or `''`) when a triple-quoted string is never
/// closed, leaving the third quote at the front of `remainder`.
fn opens_triple_quote(slice: &str, remainder: &str) -> bool {
	let quotes = slice.trim_start_matches(['r', 'R', 'b', 'B', 'u', 'U', 'f', 'F']);
	match quotes {
		"\"\"" => remainder.starts_with('"'),
		"''" => remainder.starts_with('\''),
		_ => false,
	}
}

/// Line, indentation and bracket bookkeeping while walking the DFA output.
struct Cursor<'a> {
	text: &'a str,
	tokens: Vec<Token>,
	/// Open indentation levels; never empty, the base level is 0.
	indents: Vec<usize>,
	/// Bracket nesting; newlines and indentation are ignored while > 0.
	depth: usize,
	line: usize,
	line_start: usize,
	/// Width of the leading whitespace of the current line.
	line_indent: usize,
	/// Whether the current logical line has produced a token yet.
	line_has_content: bool,
}

impl<'a> Cursor<'a> {
	fn new(text: &'a str) -> Self {
		Self {
			text,
			tokens: Vec::new(),
			indents: vec![0],
			depth: 0,
			line: 1,
			line_start: 0,
			line_indent: 0,
			line_has_content: false,
		}
	}

	/// Position of a byte offset on the current line (or a later one, for
	/// offsets past embedded newlines).
	fn position(&self, offset: usize) -> Position {
		let before = &self.text[self.line_start..offset];
		match before.rfind('\n') {
			Some(newline) => (
				self.line + before.matches('\n').count(),
				before[newline + 1..].chars().count(),
			),
			None => (self.line, before.chars().count()),
		}
	}

	fn whitespace(&mut self, slice: &str) {
		if self.line_has_content {
			return;
		}
		self.line_indent = slice.chars().fold(0, |width, c| match c {
			'\t' => (width / 8 + 1) * 8,
			'\x0C' => 0,
			_ => width + 1,
		});
	}

	fn next_line(&mut self, line_start: usize) {
		self.line += 1;
		self.line_start = line_start;
	}

	fn newline(&mut self, start: usize, end: usize) {
		if self.depth == 0 {
			if self.line_has_content {
				self.push_marker("NEWLINE", start, end, "<NEWLINE>");
			}
			self.line_has_content = false;
			self.line_indent = 0;
		}
		self.next_line(end);
	}

	/// Emits `INDENT`/`DEDENT` for the first token of a logical line.
	fn begin_line_content(&mut self) -> Result<(), TokenizeError> {
		if self.line_has_content || self.depth > 0 {
			return Ok(());
		}
		self.line_has_content = true;

		let offset = self.line_start;
		let current = self.indents.last().copied().unwrap_or(0);
		if self.line_indent > current {
			self.indents.push(self.line_indent);
			self.push_marker("INDENT", offset, offset, "<INDENT>");
			return Ok(());
		}
		while self.line_indent < self.indents.last().copied().unwrap_or(0) {
			self.indents.pop();
			self.push_marker("DEDENT", offset, offset, "<DEDENT>");
		}
		if self.indents.last().copied().unwrap_or(0) != self.line_indent {
			return Err(TokenizeError::Dedent { line: self.line });
		}
		Ok(())
	}

	fn push(&mut self, kind: &str, start: usize, end: usize, slice: &str) {
		let from = self.position(start);
		let to = self.position(end);
		self.tokens.push(Token::new(kind, slice, from, to, slice));

		// Multi-line strings move the cursor to their last line
		if let Some(newline) = slice.rfind('\n') {
			self.line = to.0;
			self.line_start = start + newline + 1;
		}
	}

	fn push_marker(&mut self, kind: &str, start: usize, end: usize, lexeme: &str) {
		let from = self.position(start);
		let to = self.position(end);
		self.tokens.push(Token::new(kind, &self.text[start..end], from, to, lexeme));
	}

	/// Closes the final line and every open block.
	fn finish(&mut self) {
		let end = self.text.len();
		if self.line_has_content {
			self.push_marker("NEWLINE", end, end, "<NEWLINE>");
		}
		while self.indents.len() > 1 {
			self.indents.pop();
			self.push_marker("DEDENT", end, end, "<DEDENT>");
		}
		self.push_marker("ENDMARKER", end, end, "<ENDMARKER>");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(text: &str, mid_line: bool) -> Vec<String> {
		PythonTokenizer
			.tokenize(text, mid_line)
			.unwrap()
			.into_iter()
			.map(|token| token.kind.unwrap_or_default())
			.collect()
	}

	fn lexemes(text: &str) -> Vec<String> {
		PythonTokenizer
			.tokenize(text, false)
			.unwrap()
			.into_iter()
			.map(|token| token.lexeme)
			.collect()
	}

	#[test]
	fn test_simple_statement() {
		assert_eq!(kinds("x = 1\n", false), vec!["NAME", "OP", "NUMBER", "NEWLINE", "ENDMARKER"]);
		let tokens = PythonTokenizer.tokenize("x = 1\n", false).unwrap();
		assert_eq!(tokens[2], Token::new("NUMBER", "1", (1, 4), (1, 5), "1"));
	}

	#[test]
	fn test_indentation() {
		assert_eq!(
			lexemes("if x:\n    y = 2\nz\n"),
			vec![
				"if", "x", ":", "<NEWLINE>", "<INDENT>", "y", "=", "2", "<NEWLINE>", "<DEDENT>", "z", "<NEWLINE>",
				"<ENDMARKER>",
			]
		);
	}

	#[test]
	fn test_open_blocks_close_at_end() {
		assert_eq!(
			kinds("def f():\n    return 1", false),
			vec!["KEYWORD", "NAME", "OP", "OP", "OP", "NEWLINE", "INDENT", "KEYWORD", "NUMBER", "NEWLINE", "DEDENT", "ENDMARKER"]
		);
	}

	#[test]
	fn test_brackets_join_lines() {
		assert_eq!(lexemes("f(a,\n  b)\n"), vec!["f", "(", "a", ",", "b", ")", "<NEWLINE>", "<ENDMARKER>"]);
	}

	#[test]
	fn test_comments_and_blank_lines() {
		assert_eq!(lexemes("# header\n\nx  # trailing\n"), vec!["x", "<NEWLINE>", "<ENDMARKER>"]);
	}

	#[test]
	fn test_strings() {
		let tokens = PythonTokenizer.tokenize("s = '''a\nb'''\nt = rb\"x\"\n", false).unwrap();
		assert_eq!(tokens[2].kind.as_deref(), Some("STRING"));
		assert_eq!(tokens[2].end, Some((2, 4)));
		let t = tokens.iter().find(|token| token.lexeme == "t").unwrap();
		assert_eq!(t.start, Some((3, 0)));
		assert_eq!(tokens[6].lexeme, "rb\"x\"");
	}

	#[test]
	fn test_mid_line_keeps_partial_token() {
		assert_eq!(kinds("x = 1", true), vec!["NAME", "OP", "NUMBER"]);
		let tokens = PythonTokenizer.tokenize("print('hel", true).unwrap();
		assert_eq!(tokens.last().unwrap().kind.as_deref(), Some("ERRORTOKEN"));
		assert_eq!(tokens.last().unwrap().lexeme, "'hel");
	}

	#[test]
	fn test_mid_line_keeps_open_triple_quote() {
		let tokens = PythonTokenizer.tokenize("s = \"\"\"abc", true).unwrap();
		let lexemes: Vec<&str> = tokens.iter().map(|token| token.lexeme.as_str()).collect();
		assert_eq!(lexemes, vec!["s", "=", "\"\"\"abc"]);
		assert_eq!(tokens[2].kind.as_deref(), Some("ERRORTOKEN"));

		let tokens = PythonTokenizer.tokenize("def f():\n    x = r'''doc\nmore", true).unwrap();
		let last = tokens.last().unwrap();
		assert_eq!(last.lexeme, "r'''doc\nmore");
		assert_eq!(last.start, Some((2, 8)));
		assert_eq!(last.end, Some((3, 4)));
	}

	#[test]
	fn test_empty_strings_stay_strings() {
		assert_eq!(kinds("x = '' + \"\"", true), vec!["NAME", "OP", "STRING", "OP", "STRING"]);
		assert_eq!(lexemes("s = \"\"\"a\"\"\"\n")[2], "\"\"\"a\"\"\"");
	}

	#[test]
	fn test_errors() {
		assert!(matches!(
			PythonTokenizer.tokenize("print('hel", false),
			Err(TokenizeError::Unrecognized { line: 1, column: 6, .. })
		));
		assert!(matches!(
			PythonTokenizer.tokenize("if x:\n    y\n  z\n", false),
			Err(TokenizeError::Dedent { line: 3 })
		));
		assert!(matches!(
			PythonTokenizer.tokenize("x = \"\"\"doc\nmore", false),
			Err(TokenizeError::Unrecognized { line: 1, column: 4, .. })
		));
	}
}
