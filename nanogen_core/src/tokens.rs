use std::fmt::Display;
use std::ops::Range;

use crate::text::Delimiter;

/// Token kinds produced for component declaration text. Access modifiers
/// never reach this stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
	/// `using`
	Using,
	/// `namespace`
	Namespace,
	/// `class` | `struct`
	TypeKeyword,
	/// `static`, `readonly`, `partial`, ...
	Modifier,
	/// `{`
	BraceOpen,
	/// `}`
	BraceClose,
	/// `[`
	BracketOpen,
	/// `]`
	BracketClose,
	/// `(`
	ParenOpen,
	/// `)`
	ParenClose,
	/// `<`
	AngleOpen,
	/// `>`
	AngleClose,
	/// `,`
	Comma,
	/// `;`
	Semicolon,
	/// `.`
	Dot,
	/// `:`
	Colon,
	/// `=`
	Equals,
	/// `?`
	Question,
	/// `=>`
	Arrow,
	/// An identifier, e.g. `Health`
	Ident,
	/// A number, string or character literal.
	Literal,
	/// Arithmetic and logical operators.
	Operator,
	/// Anything the lexer does not recognize.
	Unknown,
}

impl Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let text = match self {
			Self::Using => "`using`",
			Self::Namespace => "`namespace`",
			Self::TypeKeyword => "type keyword",
			Self::Modifier => "modifier",
			Self::BraceOpen => "`{`",
			Self::BraceClose => "`}`",
			Self::BracketOpen => "`[`",
			Self::BracketClose => "`]`",
			Self::ParenOpen => "`(`",
			Self::ParenClose => "`)`",
			Self::AngleOpen => "`<`",
			Self::AngleClose => "`>`",
			Self::Comma => "`,`",
			Self::Semicolon => "`;`",
			Self::Dot => "`.`",
			Self::Colon => "`:`",
			Self::Equals => "`=`",
			Self::Question => "`?`",
			Self::Arrow => "`=>`",
			Self::Ident => "identifier",
			Self::Literal => "literal",
			Self::Operator => "operator",
			Self::Unknown => "unknown character",
		};

		write!(f, "{text}")
	}
}

/// A token and the byte range it covers in the declaration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub kind: TokenKind,
	pub span: Range<usize>,
}

impl Token {
	pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
		Self { kind, span }
	}

	pub fn text<'a>(&self, source: &'a str) -> &'a str {
		&source[self.span.clone()]
	}

	pub(crate) fn brace(&self) -> Delimiter {
		match self.kind {
			TokenKind::BraceOpen => Delimiter::Open,
			TokenKind::BraceClose => Delimiter::Close,
			_ => Delimiter::Other,
		}
	}

	pub(crate) fn bracket(&self) -> Delimiter {
		match self.kind {
			TokenKind::BracketOpen => Delimiter::Open,
			TokenKind::BracketClose => Delimiter::Close,
			_ => Delimiter::Other,
		}
	}

	pub(crate) fn paren(&self) -> Delimiter {
		match self.kind {
			TokenKind::ParenOpen => Delimiter::Open,
			TokenKind::ParenClose => Delimiter::Close,
			_ => Delimiter::Other,
		}
	}
}
