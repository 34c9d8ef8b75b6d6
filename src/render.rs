//! Text renderings of the comment forest and of reconciliation reports.

use std::fmt::Write as _;

use crate::{
	Comment,
	reconcile::{Action, Outcome, ReconcileReport},
};

/// Render the forest as an indented tree, one comment per line: `text (file:line)`.
/// Lines are 1-based, as editors show them.
pub fn render_tree(forest: &[Comment]) -> String {
	let mut out = String::new();
	for root in forest {
		write_node(&mut out, root, "", None);
	}
	out.truncate(out.trim_end().len());
	out
}

fn write_node(out: &mut String, node: &Comment, prefix: &str, is_last: Option<bool>) {
	let branch = match is_last {
		None => "",
		Some(true) => "└── ",
		Some(false) => "├── ",
	};
	let _ = writeln!(out, "{prefix}{branch}{} ({}:{})", node.text.trim_end(), node.file_name, node.line_number + 1);

	let child_prefix = match is_last {
		None => prefix.to_string(),
		Some(true) => format!("{prefix}    "),
		Some(false) => format!("{prefix}│   "),
	};
	for (i, child) in node.children.iter().enumerate() {
		write_node(out, child, &child_prefix, Some(i + 1 == node.children.len()));
	}
}

pub fn render_json(forest: &[Comment]) -> Result<String, serde_json::Error> {
	serde_json::to_string_pretty(forest)
}

/// One summary line, then one line per planned action.
pub fn render_report(report: &ReconcileReport) -> String {
	let mut out = format!(
		"created {}, updated {}, closed {}, skipped {}, failed {}",
		report.created, report.updated, report.closed, report.skipped, report.failed
	);
	for (action, outcome) in &report.outcomes {
		let action = match action {
			Action::Comment { issue_number, .. } => format!("comment on #{issue_number}"),
			Action::Create { title, .. } => format!("create {:?}", title.trim_end()),
			Action::Close { issue_number } => format!("close #{issue_number}"),
			Action::KeepUnmatched { issue_number } => format!("keep #{issue_number} open"),
		};
		let outcome = match outcome {
			Outcome::Done => "done".to_string(),
			Outcome::DryRun => "dry run".to_string(),
			Outcome::Skipped => "skipped".to_string(),
			Outcome::Failed(e) => format!("failed: {e}"),
		};
		let _ = write!(out, "\n  {action}: {outcome}");
	}
	out
}
