use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::ComponentDeclaration;
use crate::FieldDeclaration;
use crate::NanogenError;
use crate::NanogenResult;
use crate::UNIQUE_ATTRIBUTE;
use crate::lexer::tokenize;
use crate::text::Delimiter;
use crate::text::line_at;
use crate::text::match_delimiter;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Parse one component declaration file.
///
/// Only the first `class` or `struct` in the file is read. Attribute lists
/// written before it decide the contexts, every `using` directive is kept
/// verbatim, and each field statement in its body becomes a
/// [`FieldDeclaration`]. Declarations without any attribute list fall back to
/// the first of `known_contexts`.
pub fn parse_declaration(
	source: &str,
	known_contexts: &[String],
	force_reactive: bool,
) -> NanogenResult<ComponentDeclaration> {
	let Some(default_context) = known_contexts.first() else {
		return Err(NanogenError::MissingContexts);
	};

	let mut reader = DeclarationReader::new(source);
	let end = reader.tokens.len();
	let Some(header) = reader.read_items(end)? else {
		return Err(NanogenError::MalformedDeclaration {
			line: 1,
			reason: "no `class` or `struct` declaration found".to_string(),
		});
	};

	let mut attributes = if reader.has_attribute_list {
		reader.attributes
	} else {
		vec![default_context.clone()]
	};

	let is_unique = attributes.iter().any(|a| a == UNIQUE_ATTRIBUTE);
	attributes.retain(|a| a != UNIQUE_ATTRIBUTE);

	let mut contexts: Vec<String> = vec![];
	for attribute in &attributes {
		if known_contexts.contains(attribute) && !contexts.contains(attribute) {
			contexts.push(attribute.clone());
		}
	}
	if contexts.is_empty() {
		contexts.push(default_context.clone());
	}

	tracing::debug!(
		name = %header.name,
		fields = header.fields.len(),
		?contexts,
		"parsed component declaration"
	);

	Ok(ComponentDeclaration {
		name: header.name,
		attributes,
		contexts,
		fields: header.fields,
		is_unique,
		force_reactive,
		usings: reader.usings.join("\n"),
		synthesized: false,
	})
}

/// The pass/fail outcome of validating one declaration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecheckRecord {
	/// Path of the declaration file.
	pub file: PathBuf,
	/// Whether the declaration parsed successfully.
	pub passed: bool,
	/// Human readable outcome.
	pub message: String,
}

/// Validate and parse one declaration file. The declaration is returned
/// alongside its record when it passed.
pub fn precheck_declaration(
	file: &Path,
	source: &str,
	known_contexts: &[String],
	force_reactive: bool,
) -> (PrecheckRecord, Option<ComponentDeclaration>) {
	let file_name = file
		.file_name()
		.map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());

	match parse_declaration(source, known_contexts, force_reactive) {
		Ok(declaration) => {
			let record = PrecheckRecord {
				file: file.to_path_buf(),
				passed: true,
				message: format!("{file_name} is valid"),
			};
			(record, Some(declaration))
		}
		Err(error) => {
			let record = PrecheckRecord {
				file: file.to_path_buf(),
				passed: false,
				message: format!("Failed! Error in file {file_name}: {error}"),
			};
			(record, None)
		}
	}
}

struct TypeHeader {
	name: String,
	fields: Vec<FieldDeclaration>,
}

/// Recursive-descent reader over the token stream of a single declaration.
struct DeclarationReader<'a> {
	source: &'a str,
	tokens: Vec<Token>,
	cursor: usize,
	/// `using` directives in source order.
	usings: Vec<&'a str>,
	/// Attribute names collected before the type keyword.
	attributes: Vec<String>,
	has_attribute_list: bool,
}

impl<'a> DeclarationReader<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			source,
			tokens: tokenize(source),
			cursor: 0,
			usings: vec![],
			attributes: vec![],
			has_attribute_list: false,
		}
	}

	fn kind_at(&self, index: usize) -> Option<TokenKind> {
		self.tokens.get(index).map(|token| token.kind)
	}

	fn peek(&self) -> Option<TokenKind> {
		self.kind_at(self.cursor)
	}

	fn text_at(&self, index: usize) -> &'a str {
		self.tokens
			.get(index)
			.map_or("", |token| token.text(self.source))
	}

	fn ident_at(&self, index: usize) -> String {
		let text = self.text_at(index);
		text.strip_prefix('@').unwrap_or(text).to_string()
	}

	fn error_at(&self, index: usize, reason: impl Into<String>) -> NanogenError {
		let offset = self
			.tokens
			.get(index)
			.map_or(self.source.len(), |token| token.span.start);

		NanogenError::MalformedDeclaration {
			line: line_at(self.source, offset),
			reason: reason.into(),
		}
	}

	/// Index of the token closing the group opened at `open`.
	fn matching(&self, open: usize, classify: fn(&Token) -> Delimiter) -> NanogenResult<usize> {
		match_delimiter(&self.tokens, open, classify).map_err(|_| {
			let opening = self.text_at(open);
			self.error_at(open, format!("no matching close for `{opening}`"))
		})
	}

	/// Read top level items until `end`, returning the first type found.
	fn read_items(&mut self, end: usize) -> NanogenResult<Option<TypeHeader>> {
		while self.cursor < end {
			match self.kind_at(self.cursor) {
				Some(TokenKind::Using) => self.read_using(end),
				Some(TokenKind::Namespace) => {
					if let Some(header) = self.read_namespace(end)? {
						return Ok(Some(header));
					}
				}
				Some(TokenKind::BracketOpen) => self.read_attribute_list()?,
				Some(TokenKind::TypeKeyword) => return self.read_type(end).map(Some),
				_ => self.cursor += 1,
			}
		}

		Ok(None)
	}

	fn read_using(&mut self, end: usize) {
		let start = self.tokens[self.cursor].span.start;
		let terminator = (self.cursor..end).find(|i| self.kind_at(*i) == Some(TokenKind::Semicolon));

		match terminator {
			Some(index) => {
				let source = self.source;
				let stop = self.tokens[index].span.end;
				self.usings.push(&source[start..stop]);
				self.cursor = index + 1;
			}
			None => self.cursor += 1,
		}
	}

	fn read_namespace(&mut self, end: usize) -> NanogenResult<Option<TypeHeader>> {
		let keyword = self.cursor;
		self.cursor += 1;

		while self.cursor < end {
			match self.kind_at(self.cursor) {
				Some(TokenKind::Semicolon) => {
					// File scoped namespace, the rest of the file is its body.
					self.cursor += 1;
					return Ok(None);
				}
				Some(TokenKind::BraceOpen) => {
					let open = self.cursor;
					let close = self.matching(open, Token::brace)?;
					self.cursor = open + 1;
					let header = self.read_items(close)?;
					self.cursor = close + 1;
					return Ok(header);
				}
				_ => self.cursor += 1,
			}
		}

		Err(self.error_at(keyword, "expected `{` after namespace name"))
	}

	fn read_attribute_list(&mut self) -> NanogenResult<()> {
		let open = self.cursor;
		let close = self.matching(open, Token::bracket)?;
		self.has_attribute_list = true;

		let mut depth = 0usize;
		let mut current: Option<String> = None;
		for index in open + 1..close {
			match self.kind_at(index) {
				Some(TokenKind::ParenOpen | TokenKind::AngleOpen) => depth += 1,
				Some(TokenKind::ParenClose | TokenKind::AngleClose) => depth = depth.saturating_sub(1),
				Some(TokenKind::Ident) if depth == 0 => current = Some(self.ident_at(index)),
				// `[assembly: Foo]` style targets.
				Some(TokenKind::Colon) if depth == 0 => current = None,
				Some(TokenKind::Comma) if depth == 0 => {
					if let Some(name) = current.take() {
						self.attributes.push(name);
					}
				}
				_ => {}
			}
		}

		if let Some(name) = current {
			self.attributes.push(name);
		}

		self.cursor = close + 1;
		Ok(())
	}

	fn read_type(&mut self, end: usize) -> NanogenResult<TypeHeader> {
		let keyword = self.cursor;
		self.cursor += 1;

		if self.peek() != Some(TokenKind::Ident) {
			let found = self.text_at(keyword);
			return Err(self.error_at(keyword, format!("expected a type name after `{found}`")));
		}

		let name = self.ident_at(self.cursor);
		self.cursor += 1;

		let open = loop {
			match self.peek() {
				Some(TokenKind::BraceOpen) if self.cursor < end => break self.cursor,
				Some(TokenKind::Semicolon) | None => {
					return Err(self.error_at(keyword, format!("expected `{{` to open the body of `{name}`")));
				}
				_ if self.cursor >= end => {
					return Err(self.error_at(keyword, format!("expected `{{` to open the body of `{name}`")));
				}
				_ => self.cursor += 1,
			}
		};

		let close = self.matching(open, Token::brace)?;
		let fields = self.read_members(open + 1, close)?;
		self.cursor = close + 1;

		Ok(TypeHeader { name, fields })
	}

	fn read_members(&mut self, start: usize, end: usize) -> NanogenResult<Vec<FieldDeclaration>> {
		let mut fields = vec![];
		self.cursor = start;

		while self.cursor < end {
			match self.kind_at(self.cursor) {
				Some(TokenKind::Semicolon | TokenKind::Modifier) => self.cursor += 1,
				Some(TokenKind::BracketOpen) => {
					self.cursor = self.matching(self.cursor, Token::bracket)? + 1;
				}
				Some(TokenKind::BraceOpen) => {
					self.cursor = self.matching(self.cursor, Token::brace)? + 1;
				}
				Some(TokenKind::TypeKeyword) => self.skip_member(end)?,
				Some(TokenKind::Ident) => self.read_member(end, &mut fields)?,
				Some(TokenKind::ParenOpen) => {
					return Err(self.error_at(self.cursor, "tuple-typed fields are not supported"));
				}
				Some(kind) => {
					return Err(self.error_at(self.cursor, format!("unexpected {kind} in component body")));
				}
				None => break,
			}
		}

		Ok(fields)
	}

	/// Read a member starting at a type. Fields are appended to `fields`;
	/// methods, properties and constructors are skipped.
	fn read_member(&mut self, end: usize, fields: &mut Vec<FieldDeclaration>) -> NanogenResult<()> {
		let field_type = self.read_type_expr()?;

		match self.peek() {
			Some(TokenKind::Ident) => {}
			// A constructor: the "type" was the member name.
			Some(TokenKind::ParenOpen) => return self.skip_member(end),
			_ => {
				return Err(self.error_at(
					self.cursor,
					format!("expected a field name after `{field_type}`"),
				));
			}
		}

		loop {
			let name = self.ident_at(self.cursor);
			self.cursor += 1;

			match self.peek() {
				Some(TokenKind::Semicolon) => {
					fields.push(FieldDeclaration::new(name, field_type.clone(), fields.len()));
					self.cursor += 1;
					return Ok(());
				}
				Some(TokenKind::Comma) => {
					fields.push(FieldDeclaration::new(name, field_type.clone(), fields.len()));
					self.cursor += 1;
				}
				Some(TokenKind::Equals) => {
					fields.push(FieldDeclaration::new(name, field_type.clone(), fields.len()));
					self.skip_initializer(end);
					match self.peek() {
						Some(TokenKind::Comma) => self.cursor += 1,
						Some(TokenKind::Semicolon) => {
							self.cursor += 1;
							return Ok(());
						}
						_ => {
							return Err(self.error_at(self.cursor, "unterminated field initializer"));
						}
					}
				}
				Some(
					TokenKind::ParenOpen | TokenKind::BraceOpen | TokenKind::Arrow | TokenKind::AngleOpen,
				) => return self.skip_member(end),
				_ => {
					return Err(self.error_at(self.cursor, format!("expected `;` after field `{name}`")));
				}
			}

			if self.peek() != Some(TokenKind::Ident) {
				return Err(self.error_at(self.cursor, "expected a field name after `,`"));
			}
		}
	}

	/// Read a type such as `System.Collections.Generic.List<int>[]` and render
	/// it canonically.
	fn read_type_expr(&mut self) -> NanogenResult<String> {
		if self.peek() != Some(TokenKind::Ident) {
			return Err(self.error_at(self.cursor, "expected a type"));
		}

		let mut rendered = self.ident_at(self.cursor);
		self.cursor += 1;

		while self.peek() == Some(TokenKind::Dot)
			&& self.kind_at(self.cursor + 1) == Some(TokenKind::Ident)
		{
			rendered.push('.');
			rendered.push_str(&self.ident_at(self.cursor + 1));
			self.cursor += 2;
		}

		if self.peek() == Some(TokenKind::AngleOpen) {
			rendered.push('<');
			self.cursor += 1;
			loop {
				rendered.push_str(&self.read_type_expr()?);
				match self.peek() {
					Some(TokenKind::Comma) => {
						rendered.push_str(", ");
						self.cursor += 1;
					}
					Some(TokenKind::AngleClose) => {
						rendered.push('>');
						self.cursor += 1;
						break;
					}
					_ => {
						return Err(self.error_at(
							self.cursor,
							format!("unterminated generic arguments in `{rendered}`"),
						));
					}
				}
			}
		}

		if self.peek() == Some(TokenKind::Question) {
			rendered.push('?');
			self.cursor += 1;
		}

		while self.peek() == Some(TokenKind::BracketOpen) {
			rendered.push('[');
			self.cursor += 1;
			while self.peek() == Some(TokenKind::Comma) {
				rendered.push(',');
				self.cursor += 1;
			}
			if self.peek() != Some(TokenKind::BracketClose) {
				return Err(self.error_at(self.cursor, format!("unterminated array type `{rendered}`")));
			}
			rendered.push(']');
			self.cursor += 1;
		}

		Ok(rendered)
	}

	/// Move the cursor to the `,` or `;` ending an initializer.
	fn skip_initializer(&mut self, end: usize) {
		let mut depth = 0usize;
		while self.cursor < end {
			match self.kind_at(self.cursor) {
				Some(
					TokenKind::ParenOpen
					| TokenKind::BraceOpen
					| TokenKind::BracketOpen
					| TokenKind::AngleOpen,
				) => depth += 1,
				Some(
					TokenKind::ParenClose
					| TokenKind::BraceClose
					| TokenKind::BracketClose
					| TokenKind::AngleClose,
				) => depth = depth.saturating_sub(1),
				Some(TokenKind::Comma | TokenKind::Semicolon) if depth == 0 => return,
				_ => {}
			}
			self.cursor += 1;
		}
	}

	/// Skip a method, property, constructor or nested type.
	fn skip_member(&mut self, end: usize) -> NanogenResult<()> {
		while self.cursor < end {
			match self.kind_at(self.cursor) {
				Some(TokenKind::ParenOpen) => {
					self.cursor = self.matching(self.cursor, Token::paren)? + 1;
				}
				Some(TokenKind::BraceOpen) => {
					self.cursor = self.matching(self.cursor, Token::brace)? + 1;
					// Auto properties may carry an initializer: `{ get; set; } = 1;`
					if self.peek() != Some(TokenKind::Equals) {
						return Ok(());
					}
				}
				Some(TokenKind::Semicolon) => {
					self.cursor += 1;
					return Ok(());
				}
				_ => self.cursor += 1,
			}
		}

		Ok(())
	}
}
