//! Two-pass reconciliation of comments against a snapshot of open issues.
//!
//! Pass 1 links every root comment to the first issue whose title or body contains
//! its text (case-insensitively), creating an issue when none does. Pass 2 handles
//! issues no comment matches. Planning is pure; [`reconcile`] then performs the
//! planned writes one by one, isolating failures per item.

use serde::Serialize;
use tracing::{info, warn};

use crate::{
	Comment,
	error::NetworkError,
	github::{Issue, IssueTracker, RepoSlug},
};

/// Comment posted on an issue that a source comment matches.
pub const ACK_MESSAGE: &str = "This issue is related to a TODO comment in the code.";

/// Body of an issue created for an unmatched comment.
pub fn issue_body(text: &str) -> String {
	format!("This issue corresponds to the TODO comment in the code. \n\nDetails: {text}")
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ReconcileOptions {
	/// Close open issues that no comment matches.
	pub close_unmatched: bool,
	/// Plan and report, but send nothing.
	pub dry_run: bool,
}

/// A single write planned against the tracker.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
	Comment { issue_number: u64, body: String },
	Create { title: String, body: String },
	Close { issue_number: u64 },
	/// An unmatched issue left open because closing was not enabled.
	KeepUnmatched { issue_number: u64 },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum Outcome {
	Done,
	DryRun,
	Skipped,
	Failed(String),
}

/// What a reconciliation pass did.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ReconcileReport {
	pub created: usize,
	pub updated: usize,
	pub closed: usize,
	pub skipped: usize,
	pub failed: usize,
	pub outcomes: Vec<(Action, Outcome)>,
}

impl ReconcileReport {
	fn record(&mut self, action: Action, outcome: Outcome) {
		match (&action, &outcome) {
			(_, Outcome::Failed(_)) => self.failed += 1,
			(_, Outcome::Skipped | Outcome::DryRun) => self.skipped += 1,
			(Action::Create { .. }, Outcome::Done) => self.created += 1,
			(Action::Comment { .. }, Outcome::Done) => self.updated += 1,
			(Action::Close { .. }, Outcome::Done) => self.closed += 1,
			(Action::KeepUnmatched { .. }, Outcome::Done) => self.skipped += 1,
		}
		self.outcomes.push((action, outcome));
	}

	pub fn is_success(&self) -> bool {
		self.failed == 0
	}
}

/// `issue`'s title or body contains `text`, ignoring case.
pub fn matches(issue: &Issue, text: &str) -> bool {
	let needle = text.to_lowercase();
	issue.title.to_lowercase().contains(&needle) || issue.body.to_lowercase().contains(&needle)
}

/// Plan both passes. Only root comments get an issue of their own in pass 1, but
/// pass 2 keeps every issue that any comment in the forest still matches.
pub fn plan(comments: &[Comment], issues: &[Issue], options: &ReconcileOptions) -> Vec<Action> {
	let link_or_create = comments.iter().map(|comment| match issues.iter().find(|issue| matches(issue, &comment.text)) {
		Some(issue) => Action::Comment {
			issue_number: issue.number,
			body: ACK_MESSAGE.to_string(),
		},
		None => Action::Create {
			title: comment.text.clone(),
			body: issue_body(&comment.text),
		},
	});

	let unmatched = issues.iter().filter(|issue| !comments.iter().flat_map(Comment::iter_subtree).any(|c| matches(issue, &c.text))).map(|issue| match options.close_unmatched {
		true => Action::Close { issue_number: issue.number },
		false => Action::KeepUnmatched { issue_number: issue.number },
	});

	link_or_create.chain(unmatched).collect()
}

/// Perform the planned writes sequentially, pass 1 before pass 2.
///
/// A failing write is logged and recorded; it never stops the remaining items.
pub async fn reconcile(tracker: &dyn IssueTracker, repo: &RepoSlug, comments: &[Comment], issues: &[Issue], options: &ReconcileOptions) -> ReconcileReport {
	let mut report = ReconcileReport::default();

	for action in plan(comments, issues, options) {
		let outcome = match &action {
			Action::KeepUnmatched { issue_number } => {
				info!(%repo, issue_number, "issue has no matching comment; leaving it open");
				Outcome::Skipped
			}
			_ if options.dry_run => {
				info!(%repo, ?action, "dry run");
				Outcome::DryRun
			}
			_ => match apply(tracker, repo, &action).await {
				Ok(()) => Outcome::Done,
				Err(e) => {
					warn!(%repo, ?action, error = %e, "issue tracker write failed");
					Outcome::Failed(e.to_string())
				}
			},
		};
		report.record(action, outcome);
	}

	info!(%repo, created = report.created, updated = report.updated, closed = report.closed, failed = report.failed, "reconciliation finished");
	report
}

/// Fetch the open issues, then reconcile. A failed fetch aborts the pass.
pub async fn run(tracker: &dyn IssueTracker, repo: &RepoSlug, comments: &[Comment], options: &ReconcileOptions) -> Result<ReconcileReport, NetworkError> {
	let issues = tracker.list_open_issues(repo).await?;
	Ok(reconcile(tracker, repo, comments, &issues, options).await)
}

async fn apply(tracker: &dyn IssueTracker, repo: &RepoSlug, action: &Action) -> Result<(), NetworkError> {
	match action {
		Action::Comment { issue_number, body } => {
			info!(%repo, issue_number, "linking comment to existing issue");
			tracker.comment_on_issue(repo, *issue_number, body).await
		}
		Action::Create { title, body } => {
			info!(%repo, %title, "creating issue for unmatched comment");
			tracker.create_issue(repo, title, body).await
		}
		Action::Close { issue_number } => {
			info!(%repo, issue_number, "closing issue with no matching comment");
			tracker.close_issue(repo, *issue_number).await
		}
		Action::KeepUnmatched { .. } => Ok(()),
	}
}
