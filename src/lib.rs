use serde::Serialize;

pub mod config;
pub mod error;
pub mod github;
pub mod hierarchy;
pub mod mock_github;
pub mod reconcile;
pub mod render;
pub mod scan;

pub use config::{Settings, Token};
pub use error::{ConfigError, NetworkError, ScanError};
pub use github::{BoxedIssueTracker, Issue, IssueState, IssueTracker, RealIssueTracker, RepoSlug, create_tracker};
pub use hierarchy::{PROXIMITY_WINDOW, Strategy, build_forest, is_child_of};
pub use reconcile::{Action, Outcome, ReconcileOptions, ReconcileReport, plan, reconcile};
pub use scan::{Document, extract_comments, scan_file, scan_open_file, scan_paths};

/// Classification of a tagged comment, derived from its marker prefix.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tag {
	#[display("TODO")]
	Todo,
	#[display("FIXME")]
	Fixme,
	#[display("BUG")]
	Bug,
	#[display("UNKNOWN")]
	Unknown,
}

impl Tag {
	/// Recognised marker prefixes, in the order they are tested.
	pub const MARKERS: [(&'static str, &'static str, Tag); 3] = [("//TODO", "#TODO", Tag::Todo), ("//FIXME", "#FIXME", Tag::Fixme), ("//BUG", "#BUG", Tag::Bug)];

	/// Derive the tag from a comment token. Matching is case-sensitive; first prefix wins.
	pub fn from_marker(token: &str) -> Self {
		let trimmed = token.trim();
		Self::MARKERS
			.iter()
			.find(|(slashes, hash, _)| trimmed.starts_with(slashes) || trimmed.starts_with(hash))
			.map(|(_, _, tag)| *tag)
			.unwrap_or(Tag::Unknown)
	}

	/// Whether the token carries any recognised marker.
	pub fn is_marked(token: &str) -> bool {
		Self::from_marker(token) != Tag::Unknown
	}

	/// Only TODO and FIXME items may hold children; BUG is always a leaf.
	pub fn can_have_children(self) -> bool {
		matches!(self, Tag::Todo | Tag::Fixme)
	}
}

/// A tagged source comment and the comments nested under it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Comment {
	pub tag: Tag,
	/// Raw comment token, marker included.
	pub text: String,
	pub file_name: String,
	/// Byte offset of the token in its document.
	pub offset: usize,
	/// Zero-based line containing `offset`.
	pub line_number: usize,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<Comment>,
}

impl Comment {
	pub fn new(tag: Tag, text: impl Into<String>, file_name: impl Into<String>, offset: usize, line_number: usize) -> Self {
		Self {
			tag,
			text: text.into(),
			file_name: file_name.into(),
			offset,
			line_number,
			children: Vec::new(),
		}
	}

	pub fn is_leaf(&self) -> bool {
		self.children.is_empty()
	}

	/// This comment and all its descendants, depth first in source order.
	pub fn iter_subtree(&self) -> Box<dyn Iterator<Item = &Comment> + '_> {
		Box::new(std::iter::once(self).chain(self.children.iter().flat_map(Comment::iter_subtree)))
	}

	/// Number of comments in this subtree, self included.
	pub fn subtree_len(&self) -> usize {
		self.iter_subtree().count()
	}
}
