//! Small text helpers shared by the parser and the expansion engine.

use crate::NanogenError;
use crate::NanogenResult;

/// Number of spaces emitted per indentation level by [`new_line`].
pub const INDENT_WIDTH: usize = 4;

/// A line break followed by `tabs` levels of indentation.
pub fn new_line(tabs: usize) -> String {
	let mut line = String::with_capacity(1 + tabs * INDENT_WIDTH);
	line.push('\n');
	line.extend(std::iter::repeat_n(' ', tabs * INDENT_WIDTH));
	line
}

/// Uppercase the first character, leaving the rest untouched.
pub fn first_char_to_upper(value: &str) -> String {
	let mut chars = value.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Flip the case of the first letter. A leading underscore is kept and the
/// rule is applied to the remainder.
///
/// ```
/// use nanogen_core::text::variate_first_char;
///
/// assert_eq!(variate_first_char("health"), "Health");
/// assert_eq!(variate_first_char("Health"), "health");
/// assert_eq!(variate_first_char("_x"), "_X");
/// ```
pub fn variate_first_char(value: &str) -> String {
	if let Some(rest) = value.strip_prefix('_') {
		return format!("_{}", variate_first_char(rest));
	}

	let mut chars = value.chars();
	match chars.next() {
		Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Join a sequence that must not be empty. `what` names the sequence in the
/// error.
pub fn aggregate<I, S>(items: I, separator: &str, what: &str) -> NanogenResult<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut iter = items.into_iter();
	let Some(first) = iter.next() else {
		return Err(NanogenError::EmptyAggregate(what.to_string()));
	};

	let mut joined = first.as_ref().to_string();
	for item in iter {
		joined.push_str(separator);
		joined.push_str(item.as_ref());
	}

	Ok(joined)
}

/// How an item takes part in delimiter matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
	Open,
	Close,
	Other,
}

/// Find the index of the item closing the group opened at `start`.
///
/// Depth goes up on every opening item and down on every closing one; the
/// result is the index at which it first returns to zero.
pub(crate) fn match_delimiter<T>(
	items: &[T],
	start: usize,
	classify: impl Fn(&T) -> Delimiter,
) -> NanogenResult<usize> {
	match items.get(start).map(&classify) {
		Some(Delimiter::Open) => {}
		_ => return Err(NanogenError::NotAnOpeningBrace { offset: start }),
	}

	let mut depth = 0usize;
	for (index, item) in items.iter().enumerate().skip(start) {
		match classify(item) {
			Delimiter::Open => depth += 1,
			Delimiter::Close => {
				depth -= 1;
				if depth == 0 {
					return Ok(index);
				}
			}
			Delimiter::Other => {}
		}
	}

	Err(NanogenError::UnmatchedBrace { offset: start })
}

/// Byte index of the `}` matching the `{` at `index`.
///
/// ```
/// use nanogen_core::text::find_matching_brace;
///
/// assert_eq!(find_matching_brace("{a{b}c}", 0).unwrap(), 6);
/// assert!(find_matching_brace("a{b}", 0).is_err());
/// ```
pub fn find_matching_brace(text: &str, index: usize) -> NanogenResult<usize> {
	match_delimiter(text.as_bytes(), index, |byte| {
		match *byte {
			b'{' => Delimiter::Open,
			b'}' => Delimiter::Close,
			_ => Delimiter::Other,
		}
	})
}

/// One-based line number of a byte offset.
pub(crate) fn line_at(source: &str, offset: usize) -> usize {
	let end = offset.min(source.len());
	source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
