//! Extraction of tagged comments from source text.
//!
//! A comment token starts at the first `//` or comment-like `#` on a line that is
//! not inside a quoted literal or a block comment, and runs to the end of that line.
//! String and block comment state carries over line breaks. Only tokens that start
//! with one of the [`Tag::MARKERS`] prefixes are kept.

use std::path::Path;

use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::{Comment, Tag, error::ScanError};

/// Directory names never descended into during a project scan.
const IGNORED_DIRS: [&str; 2] = ["target", "node_modules"];

/// A text document together with its line index.
#[derive(Clone, Debug)]
pub struct Document {
	name: String,
	text: String,
	/// Byte offset of the first character of every line.
	line_starts: Vec<usize>,
}

impl Document {
	pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
		let text = text.into();
		let line_starts = std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1)).collect();
		Self {
			name: name.into(),
			text,
			line_starts,
		}
	}

	pub fn load(path: &Path) -> Result<Self, ScanError> {
		let bytes = std::fs::read(path).map_err(|source| ScanError::Read { path: path.to_path_buf(), source })?;
		let text = String::from_utf8(bytes).map_err(|_| ScanError::NotUtf8 { path: path.to_path_buf() })?;
		Ok(Self::new(path.display().to_string(), text))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Zero-based line containing `offset`. Offsets past the end map to the last line.
	pub fn line_number(&self, offset: usize) -> usize {
		self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1)
	}

	/// Lines of the document paired with their starting byte offsets.
	fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
		self.line_starts.iter().map(move |&start| {
			let rest = &self.text[start..];
			let line = rest.split('\n').next().unwrap_or_default();
			(start, line.strip_suffix('\r').unwrap_or(line))
		})
	}
}

/// Extract every marked comment of `doc`, in source order.
#[instrument(skip(doc), fields(document = doc.name()))]
pub fn extract_comments(doc: &Document) -> Vec<Comment> {
	let mut state = LexState::Code;
	let comments: Vec<Comment> = doc
		.lines()
		.filter_map(|(line_start, line)| {
			let column = comment_start(line, &mut state)?;
			let token = &line[column..];
			let tag = Tag::from_marker(token);
			if tag == Tag::Unknown {
				return None;
			}
			let offset = line_start + column;
			Some(Comment::new(tag, token, doc.name(), offset, doc.line_number(offset)))
		})
		.collect();

	debug!(found = comments.len(), "extracted marked comments");
	comments
}

/// Scan a single file. Errors are returned to the caller.
pub fn scan_file(path: &Path) -> Result<Vec<Comment>, ScanError> {
	Document::load(path).map(|doc| extract_comments(&doc))
}

/// Scan the single document currently being viewed. An unreadable document has no comments.
pub fn scan_open_file(path: &Path) -> Vec<Comment> {
	scan_file(path).unwrap_or_else(|e| {
		debug!(error = %e, "could not scan open document");
		Vec::new()
	})
}

/// Scan files and directory trees, best effort.
///
/// Directories are walked recursively in file-name order, skipping hidden directories
/// and build output. Files that cannot be read as UTF-8 text are skipped.
pub fn scan_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<Comment> {
	let mut comments = Vec::new();
	for root in paths {
		let walker = WalkDir::new(root.as_ref()).sort_by_file_name().into_iter().filter_entry(|e| e.depth() == 0 || !is_ignored_dir(e));
		for entry in walker {
			let entry = match entry {
				Ok(entry) => entry,
				Err(e) => {
					debug!(error = %e, "skipping unreadable path");
					continue;
				}
			};
			if !entry.file_type().is_file() {
				continue;
			}
			match scan_file(entry.path()) {
				Ok(found) => comments.extend(found),
				Err(e) => debug!(error = %e, "skipping file"),
			}
		}
	}
	debug!(total = comments.len(), "project scan finished");
	comments
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
	if !entry.file_type().is_dir() {
		return false;
	}
	let name = entry.file_name().to_string_lossy();
	name.starts_with('.') || IGNORED_DIRS.iter().any(|dir| *dir == name)
}

/// What the lexer is inside of when a line ends.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LexState {
	Code,
	/// `/* ... */`, not nested
	BlockComment,
	/// `"..."`
	Str,
	/// `r"..."`, `r#"..."#` and so on
	RawStr { hashes: usize },
}

/// Byte column where the line's comment token begins, if any.
///
/// `state` is what the previous line left open; it is updated for the next one.
/// A line that ends inside a string or block comment yields no token.
fn comment_start(line: &str, state: &mut LexState) -> Option<usize> {
	let bytes = line.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		let rest = &bytes[i..];
		match *state {
			LexState::BlockComment => {
				let end = find(rest, b"*/")?;
				i += end + 2;
				*state = LexState::Code;
				continue;
			}
			LexState::Str => {
				let end = closing_quote(rest, b'"')?;
				i += end + 1;
				*state = LexState::Code;
				continue;
			}
			LexState::RawStr { hashes } => {
				i += raw_string_end(rest, hashes)?;
				*state = LexState::Code;
				continue;
			}
			LexState::Code => {}
		}

		if let Some(hashes) = raw_string_open(bytes, i) {
			*state = LexState::RawStr { hashes };
			i += hashes + 2;
			continue;
		}
		match bytes[i] {
			b'/' if bytes.get(i + 1) == Some(&b'/') => return Some(i),
			b'/' if bytes.get(i + 1) == Some(&b'*') => {
				*state = LexState::BlockComment;
				i += 2;
				continue;
			}
			b'"' => {
				*state = LexState::Str;
				i += 1;
				continue;
			}
			// a single quote is only a char literal if it closes on the same line; otherwise a lifetime
			b'\'' => {
				if let Some(close) = closing_quote(&bytes[i + 1..], b'\'') {
					i += close + 1;
				}
			}
			b'#' if is_hash_comment(bytes, i) => return Some(i),
			_ => {}
		}
		i += 1;
	}
	None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len()).position(|w| w == needle)
}

/// Number of `#` when a raw string literal (`r"`, `r#"`, `br"`, `cr"`) opens at `i`.
fn raw_string_open(bytes: &[u8], i: usize) -> Option<usize> {
	if bytes[i] != b'r' {
		return None;
	}
	let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
	let prefix_ok = match i.checked_sub(1).map(|p| bytes[p]) {
		None => true,
		Some(b'b' | b'c') => i < 2 || !is_ident(bytes[i - 2]),
		Some(b) => !is_ident(b),
	};
	if !prefix_ok {
		return None;
	}
	let hashes = bytes[i + 1..].iter().take_while(|&&b| b == b'#').count();
	(bytes.get(i + 1 + hashes) == Some(&b'"')).then_some(hashes)
}

/// Length up to and including the `"` plus `hashes` `#` that close a raw string.
fn raw_string_end(rest: &[u8], hashes: usize) -> Option<usize> {
	rest.iter()
		.enumerate()
		.filter(|&(_, &b)| b == b'"')
		.map(|(i, _)| i + 1)
		.find(|&after| rest[after..].iter().take(hashes).filter(|&&b| b == b'#').count() == hashes)
		.map(|after| after + hashes)
}

/// Index of the unescaped `quote` in `rest`.
fn closing_quote(rest: &[u8], quote: u8) -> Option<usize> {
	let mut escaped = false;
	for (i, &b) in rest.iter().enumerate() {
		match b {
			_ if escaped => escaped = false,
			b'\\' => escaped = true,
			_ if b == quote => return Some(i),
			_ => {}
		}
	}
	None
}

/// `#` opens a comment at line start or after whitespace, but not as an attribute (`#[`, `#!`).
fn is_hash_comment(bytes: &[u8], i: usize) -> bool {
	let preceded_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
	let followed_ok = !matches!(bytes.get(i + 1), Some(b'[' | b'!' | b'{'));
	preceded_ok && followed_ok
}
