//! Scan a project on disk, build the forest, and reconcile it against the in-memory tracker.

use todo_organizer::{
	Outcome, ReconcileOptions, Strategy, build_forest,
	github::{IssueState, TODO_LABEL},
	mock_github::{MockIssueTracker, MockOperation},
	reconcile::{self, ACK_MESSAGE, issue_body},
	scan_paths,
};

use crate::common::{TestContext, repo};

const MAIN_RS: &str = "\
fn main() {
	//TODO parse arguments
	//BUG crashes without a config file
	run();
}

//FIXME retry on timeout
fn run() {}
";

const TOOLS_PY: &str = "\
# plain comment
x = compute()  #TODO cache compute
";

fn project() -> TestContext {
	TestContext::new(&[("src/main.rs", MAIN_RS), ("scripts/tools.py", TOOLS_PY)])
}

#[tokio::test]
async fn test_only_roots_become_issues() {
	let ctx = project();
	let tracker = MockIssueTracker::new();
	let repo = repo();

	let forest = build_forest(scan_paths(&[ctx.root()]), Strategy::OpenParent);
	let report = reconcile::run(&tracker, &repo, &forest, &ReconcileOptions::default()).await.unwrap();

	// scripts/ sorts before src/; in main.rs the FIXME closes the open TODO
	let roots: Vec<&str> = forest.iter().map(|c| c.text.as_str()).collect();
	assert_eq!(roots, vec!["#TODO cache compute", "//TODO parse arguments"]);
	assert_eq!(forest[1].children.len(), 2);

	assert_eq!(report.created, 2);
	assert!(report.is_success());
	assert_eq!(tracker.issue_count(&repo), 2);

	let created = tracker.find_by_title(&repo, "//TODO parse arguments").unwrap();
	assert_eq!(created.body, issue_body("//TODO parse arguments"));
	assert_eq!(tracker.labels(&repo, created.number), vec![TODO_LABEL.to_string()]);
	assert!(tracker.find_by_title(&repo, "//BUG crashes without a config file").is_none());
}

#[tokio::test]
async fn test_second_pass_links_instead_of_duplicating() {
	let ctx = project();
	let tracker = MockIssueTracker::new();
	let repo = repo();
	let forest = build_forest(scan_paths(&[ctx.root()]), Strategy::Proximity);

	let first = reconcile::run(&tracker, &repo, &forest, &ReconcileOptions::default()).await.unwrap();
	let second = reconcile::run(&tracker, &repo, &forest, &ReconcileOptions::default()).await.unwrap();

	assert_eq!(first.created, forest.len());
	assert_eq!(second.created, 0);
	assert_eq!(second.updated, forest.len());
	assert_eq!(tracker.issue_count(&repo), forest.len());

	let issue = tracker.find_by_title(&repo, "//TODO parse arguments").unwrap();
	assert_eq!(tracker.comments(&repo, issue.number), vec![ACK_MESSAGE.to_string()]);
}

#[tokio::test]
async fn test_fixed_comment_closes_its_issue_when_enabled() {
	let tracker = MockIssueTracker::new();
	let repo = repo();
	tracker.add_issue(&repo, 1, "//TODO parse arguments", "");
	tracker.add_issue(&repo, 2, "//TODO drop python 2 support", "");

	let ctx = project();
	let forest = build_forest(scan_paths(&[ctx.root().join("src")]), Strategy::OpenParent);
	let options = ReconcileOptions {
		close_unmatched: true,
		..Default::default()
	};
	let report = reconcile::run(&tracker, &repo, &forest, &options).await.unwrap();

	assert_eq!((report.updated, report.created, report.closed), (1, 0, 1));
	assert_eq!(tracker.issue(&repo, 1).unwrap().state, IssueState::Open);
	assert_eq!(tracker.issue(&repo, 2).unwrap().state, IssueState::Closed);
}

#[tokio::test]
async fn test_close_failure_is_reported_not_raised() {
	let tracker = MockIssueTracker::new();
	let repo = repo();
	tracker.add_issue(&repo, 1, "stale", "");
	tracker.add_issue(&repo, 2, "also stale", "");
	tracker.fail_operation(MockOperation::CloseIssue);

	let options = ReconcileOptions {
		close_unmatched: true,
		..Default::default()
	};
	let report = reconcile::run(&tracker, &repo, &[], &options).await.unwrap();

	assert_eq!(report.failed, 2);
	assert!(report.outcomes.iter().all(|(_, o)| matches!(o, Outcome::Failed(_))));
	let closes = tracker.get_call_log().into_iter().filter(|c| c.starts_with("close_issue")).count();
	assert_eq!(closes, 2, "every close is attempted despite failures");
}
