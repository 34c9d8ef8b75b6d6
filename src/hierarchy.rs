//! Grouping of flat comment sequences into parent/child trees.

use clap::ValueEnum;

use crate::Comment;

/// Width of the proximity window, in lines.
pub const PROXIMITY_WINDOW: usize = 10;

/// Policy used to infer nesting between comments.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Strategy {
	/// Nest under the nearest preceding TODO/FIXME less than [`PROXIMITY_WINDOW`] lines above.
	Proximity,
	/// Track a single open TODO/FIXME parent; the next TODO/FIXME nests under it and closes it.
	#[default]
	OpenParent,
}

/// `x` falls within `y`'s proximity window: `y.line < x.line < y.line + PROXIMITY_WINDOW`.
pub fn is_child_of(x: &Comment, y: &Comment) -> bool {
	y.line_number < x.line_number && x.line_number < y.line_number + PROXIMITY_WINDOW
}

/// Build the comment forest. Roots keep source order; so do the children of each node.
pub fn build_forest(comments: Vec<Comment>, strategy: Strategy) -> Vec<Comment> {
	match strategy {
		Strategy::Proximity => by_proximity(comments),
		Strategy::OpenParent => by_open_parent(comments),
	}
}

fn by_proximity(comments: Vec<Comment>) -> Vec<Comment> {
	let parents: Vec<Option<usize>> = comments
		.iter()
		.enumerate()
		.map(|(i, x)| (0..i).rev().find(|&j| can_adopt(&comments[j], x) && is_child_of(x, &comments[j])))
		.collect();

	// Parents always precede their children, so attaching back to front moves every
	// subtree into place before its own parent is moved.
	let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
	for i in (0..slots.len()).rev() {
		let Some(parent_index) = parents[i] else {
			continue;
		};
		if let Some(child) = slots[i].take()
			&& let Some(parent) = slots[parent_index].as_mut()
		{
			parent.children.insert(0, child);
		}
	}
	slots.into_iter().flatten().collect()
}

fn by_open_parent(comments: Vec<Comment>) -> Vec<Comment> {
	let mut roots: Vec<Comment> = Vec::new();
	// index into `roots`; only roots are ever opened
	let mut open: Option<usize> = None;

	for comment in comments {
		if open.is_some_and(|i| roots[i].file_name != comment.file_name) {
			open = None;
		}
		match (comment.tag.can_have_children(), open) {
			(true, None) => {
				roots.push(comment);
				open = Some(roots.len() - 1);
			}
			(true, Some(i)) => {
				roots[i].children.push(comment);
				open = None;
			}
			(false, Some(i)) => roots[i].children.push(comment),
			(false, None) => roots.push(comment),
		}
	}
	roots
}

fn can_adopt(parent: &Comment, child: &Comment) -> bool {
	parent.tag.can_have_children() && parent.file_name == child.file_name
}
