use logos::Logos;

use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Raw tokens produced by logos for component declaration text. Whitespace,
/// comments and preprocessor lines are skipped.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
#[logos(skip(r"#[^\n]*", allow_greedy = true))]
enum RawToken {
	#[token("public")]
	#[token("private")]
	#[token("protected")]
	#[token("internal")]
	AccessModifier,
	#[token("static")]
	#[token("readonly")]
	#[token("partial")]
	#[token("sealed")]
	#[token("abstract")]
	#[token("const")]
	#[token("volatile")]
	#[token("virtual")]
	#[token("override")]
	#[token("unsafe")]
	#[token("new")]
	Modifier,
	#[token("using")]
	Using,
	#[token("namespace")]
	Namespace,
	#[token("class")]
	#[token("struct")]
	TypeKeyword,
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[token("[")]
	BracketOpen,
	#[token("]")]
	BracketClose,
	#[token("(")]
	ParenOpen,
	#[token(")")]
	ParenClose,
	#[token("<")]
	AngleOpen,
	#[token(">")]
	AngleClose,
	#[token(",")]
	Comma,
	#[token(";")]
	Semicolon,
	#[token(".")]
	Dot,
	#[token(":")]
	Colon,
	#[token("=")]
	Equals,
	#[token("?")]
	Question,
	#[token("=>")]
	Arrow,
	#[regex(r"@?[A-Za-z_][A-Za-z0-9_]*")]
	Ident,
	#[regex(r"[0-9][0-9A-Za-z_.]*")]
	#[regex(r#""([^"\\\n]|\\.)*""#)]
	#[regex(r#"@"([^"]|"")*""#)]
	#[regex(r"'([^'\\\n]|\\.)*'")]
	Literal,
	#[regex(r"[+\-*/%&|^!~]")]
	Operator,
}

impl RawToken {
	/// Access modifiers are noise for component declarations and are dropped.
	fn kind(self) -> Option<TokenKind> {
		let kind = match self {
			Self::AccessModifier => return None,
			Self::Modifier => TokenKind::Modifier,
			Self::Using => TokenKind::Using,
			Self::Namespace => TokenKind::Namespace,
			Self::TypeKeyword => TokenKind::TypeKeyword,
			Self::BraceOpen => TokenKind::BraceOpen,
			Self::BraceClose => TokenKind::BraceClose,
			Self::BracketOpen => TokenKind::BracketOpen,
			Self::BracketClose => TokenKind::BracketClose,
			Self::ParenOpen => TokenKind::ParenOpen,
			Self::ParenClose => TokenKind::ParenClose,
			Self::AngleOpen => TokenKind::AngleOpen,
			Self::AngleClose => TokenKind::AngleClose,
			Self::Comma => TokenKind::Comma,
			Self::Semicolon => TokenKind::Semicolon,
			Self::Dot => TokenKind::Dot,
			Self::Colon => TokenKind::Colon,
			Self::Equals => TokenKind::Equals,
			Self::Question => TokenKind::Question,
			Self::Arrow => TokenKind::Arrow,
			Self::Ident => TokenKind::Ident,
			Self::Literal => TokenKind::Literal,
			Self::Operator => TokenKind::Operator,
		};

		Some(kind)
	}
}

/// Tokenize a component declaration. Characters the lexer does not recognize
/// become [`TokenKind::Unknown`] tokens so the parser can report them with a
/// line number.
pub fn tokenize(source: &str) -> Vec<Token> {
	RawToken::lexer(source)
		.spanned()
		.filter_map(|(raw, span)| {
			match raw {
				Ok(raw) => raw.kind().map(|kind| Token::new(kind, span)),
				Err(()) => Some(Token::new(TokenKind::Unknown, span)),
			}
		})
		.collect()
}
