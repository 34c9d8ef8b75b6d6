//! Mock issue tracker for testing purposes.
//!
//! Stores all data in memory and records every call, so reconciliation can be
//! exercised without hitting the real API. Individual operations can be made to
//! fail to test per-item failure isolation.

use std::{
	collections::{BTreeMap, HashMap, HashSet},
	sync::{
		Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::instrument;

use crate::{
	error::NetworkError,
	github::{Issue, IssueState, IssueTracker, RepoSlug, TODO_LABEL},
};

/// Internal representation of an issue in the mock
#[derive(Clone, Debug)]
struct MockIssueData {
	id: u64,
	number: u64,
	title: String,
	body: String,
	state: IssueState,
	labels: Vec<String>,
	comments: Vec<String>,
}

impl MockIssueData {
	fn to_issue(&self) -> Issue {
		Issue {
			id: self.id,
			number: self.number,
			title: self.title.clone(),
			body: self.body.clone(),
			state: self.state,
		}
	}
}

/// Operations of [`IssueTracker`], for failure injection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MockOperation {
	ListOpenIssues,
	CreateIssue,
	CommentOnIssue,
	CloseIssue,
}

/// Mock issue tracker that stores all state in memory.
/// Thread-safe for use in async contexts.
pub struct MockIssueTracker {
	/// Counter for generating unique issue IDs
	next_issue_id: AtomicU64,

	/// Counter for generating issue numbers of created issues
	next_issue_number: AtomicU64,

	/// All issues, keyed by repo -> issue_number -> issue
	issues: Mutex<HashMap<RepoSlug, BTreeMap<u64, MockIssueData>>>,

	/// Operations that respond with a server error
	failing: Mutex<HashSet<MockOperation>>,

	/// Call log for debugging
	call_log: Mutex<Vec<String>>,
}

impl Default for MockIssueTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl MockIssueTracker {
	pub fn new() -> Self {
		Self {
			next_issue_id: AtomicU64::new(1000),
			next_issue_number: AtomicU64::new(1),
			issues: Mutex::new(HashMap::new()),
			failing: Mutex::new(HashSet::new()),
			call_log: Mutex::new(Vec::new()),
		}
	}

	/// Add an open issue to the mock state
	pub fn add_issue(&self, repo: &RepoSlug, number: u64, title: &str, body: &str) {
		let id = self.next_issue_id.fetch_add(1, Ordering::SeqCst);
		self.next_issue_number.fetch_max(number + 1, Ordering::SeqCst);

		let issue = MockIssueData {
			id,
			number,
			title: title.to_string(),
			body: body.to_string(),
			state: IssueState::Open,
			labels: Vec::new(),
			comments: Vec::new(),
		};

		let mut issues = self.issues.lock().unwrap();
		issues.entry(repo.clone()).or_default().insert(number, issue);
	}

	/// Make every call of `operation` fail with a 500 response
	pub fn fail_operation(&self, operation: MockOperation) {
		self.failing.lock().unwrap().insert(operation);
	}

	/// Current snapshot of an issue, whatever its state
	pub fn issue(&self, repo: &RepoSlug, number: u64) -> Option<Issue> {
		self.with_issue(repo, number, |data| data.to_issue())
	}

	/// Issue with the given exact title
	pub fn find_by_title(&self, repo: &RepoSlug, title: &str) -> Option<Issue> {
		let issues = self.issues.lock().unwrap();
		issues.get(repo)?.values().find(|i| i.title == title).map(MockIssueData::to_issue)
	}

	pub fn comments(&self, repo: &RepoSlug, number: u64) -> Vec<String> {
		self.with_issue(repo, number, |data| data.comments.clone()).unwrap_or_default()
	}

	pub fn labels(&self, repo: &RepoSlug, number: u64) -> Vec<String> {
		self.with_issue(repo, number, |data| data.labels.clone()).unwrap_or_default()
	}

	/// Number of issues stored for the repo, open or closed
	pub fn issue_count(&self, repo: &RepoSlug) -> usize {
		self.issues.lock().unwrap().get(repo).map_or(0, BTreeMap::len)
	}

	/// Get the call log for debugging
	pub fn get_call_log(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	/// Clear the call log
	pub fn clear_call_log(&self) {
		self.call_log.lock().unwrap().clear();
	}

	fn log_call(&self, call: &str) {
		self.call_log.lock().unwrap().push(call.to_string());
	}

	fn with_issue<T>(&self, repo: &RepoSlug, number: u64, f: impl FnOnce(&MockIssueData) -> T) -> Option<T> {
		let issues = self.issues.lock().unwrap();
		issues.get(repo).and_then(|i| i.get(&number)).map(f)
	}

	fn check_failure(&self, operation: MockOperation, name: &'static str) -> Result<(), NetworkError> {
		if self.failing.lock().unwrap().contains(&operation) {
			return Err(NetworkError::Status {
				operation: name,
				status: StatusCode::INTERNAL_SERVER_ERROR,
				body: "mock failure".to_string(),
			});
		}
		Ok(())
	}

	fn not_found(name: &'static str, repo: &RepoSlug, issue_number: u64) -> NetworkError {
		NetworkError::Status {
			operation: name,
			status: StatusCode::NOT_FOUND,
			body: format!("issue #{issue_number} not found in {repo}"),
		}
	}
}

#[async_trait]
impl IssueTracker for MockIssueTracker {
	#[instrument(skip(self), name = "MockIssueTracker::list_open_issues")]
	async fn list_open_issues(&self, repo: &RepoSlug) -> Result<Vec<Issue>, NetworkError> {
		tracing::info!(target: "mock_github", %repo, "list_open_issues");
		self.log_call(&format!("list_open_issues({repo})"));
		self.check_failure(MockOperation::ListOpenIssues, "list open issues")?;

		let issues = self.issues.lock().unwrap();
		let open = issues
			.get(repo)
			.map(|repo_issues| repo_issues.values().filter(|i| i.state == IssueState::Open).map(MockIssueData::to_issue).collect())
			.unwrap_or_default();
		Ok(open)
	}

	#[instrument(skip(self, body), name = "MockIssueTracker::create_issue")]
	async fn create_issue(&self, repo: &RepoSlug, title: &str, body: &str) -> Result<(), NetworkError> {
		tracing::info!(target: "mock_github", %repo, title, "create_issue");
		self.log_call(&format!("create_issue({repo}, {title}, <body>)"));
		self.check_failure(MockOperation::CreateIssue, "create issue")?;

		let id = self.next_issue_id.fetch_add(1, Ordering::SeqCst);
		let number = self.next_issue_number.fetch_add(1, Ordering::SeqCst);

		let issue = MockIssueData {
			id,
			number,
			title: title.to_string(),
			body: body.to_string(),
			state: IssueState::Open,
			labels: vec![TODO_LABEL.to_string()],
			comments: Vec::new(),
		};

		let mut issues = self.issues.lock().unwrap();
		issues.entry(repo.clone()).or_default().insert(number, issue);
		Ok(())
	}

	#[instrument(skip(self, body), name = "MockIssueTracker::comment_on_issue")]
	async fn comment_on_issue(&self, repo: &RepoSlug, issue_number: u64, body: &str) -> Result<(), NetworkError> {
		tracing::info!(target: "mock_github", %repo, issue_number, "comment_on_issue");
		self.log_call(&format!("comment_on_issue({repo}, {issue_number}, <body>)"));
		self.check_failure(MockOperation::CommentOnIssue, "comment on issue")?;

		let mut issues = self.issues.lock().unwrap();
		let issue = issues
			.get_mut(repo)
			.and_then(|i| i.get_mut(&issue_number))
			.ok_or_else(|| Self::not_found("comment on issue", repo, issue_number))?;
		issue.comments.push(body.to_string());
		Ok(())
	}

	#[instrument(skip(self), name = "MockIssueTracker::close_issue")]
	async fn close_issue(&self, repo: &RepoSlug, issue_number: u64) -> Result<(), NetworkError> {
		tracing::info!(target: "mock_github", %repo, issue_number, "close_issue");
		self.log_call(&format!("close_issue({repo}, {issue_number})"));
		self.check_failure(MockOperation::CloseIssue, "close issue")?;

		let mut issues = self.issues.lock().unwrap();
		let issue = issues
			.get_mut(repo)
			.and_then(|i| i.get_mut(&issue_number))
			.ok_or_else(|| Self::not_found("close issue", repo, issue_number))?;
		issue.state = IssueState::Closed;
		Ok(())
	}
}
