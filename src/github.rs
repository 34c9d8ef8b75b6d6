use std::{
	fmt,
	str::FromStr,
	sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use regex::Regex;
use reqwest::{
	Client, RequestBuilder, Response,
	header::{ACCEPT, AUTHORIZATION},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
	config::{Settings, Token},
	error::{ConfigError, NetworkError},
};

/// Label attached to every issue created from a comment.
pub const TODO_LABEL: &str = "TODO";
/// Page size requested when listing issues.
const PER_PAGE: usize = 100;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
	#[default]
	Open,
	Closed,
}

/// Snapshot of a remote issue, fetched at the start of a reconciliation pass.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Issue {
	pub id: u64,
	/// Repository-scoped number, used to address the issue in API paths.
	pub number: u64,
	#[serde(default, deserialize_with = "null_as_empty")]
	pub title: String,
	#[serde(default, deserialize_with = "null_as_empty")]
	pub body: String,
	#[serde(default)]
	pub state: IssueState,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The issues endpoint also returns pull requests; they carry a `pull_request` key.
#[derive(Deserialize)]
struct ListedIssue {
	#[serde(flatten)]
	issue: Issue,
	#[serde(default)]
	pull_request: Option<serde_json::Value>,
}

/// `owner/repo` coordinates of a GitHub repository.
#[derive(Clone, Debug, Eq, Hash, PartialEq, derive_new::new)]
pub struct RepoSlug {
	pub owner: String,
	pub repo: String,
}

static SLUG_PART: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("static regex"));

/// Accepts `owner/repo` and the usual GitHub remote forms:
/// - https://github.com/owner/repo
/// - github.com/owner/repo
/// - git@github.com:owner/repo.git
/// - ssh://git@github.com/owner/repo.git
///
/// Trailing path segments (e.g. `/issues/12`) are ignored.
impl FromStr for RepoSlug {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		let path = ["git@github.com:", "ssh://git@github.com/", "https://github.com/", "http://github.com/", "github.com/"]
			.iter()
			.find_map(|prefix| s.strip_prefix(prefix))
			.unwrap_or(s);

		let mut parts = path.split('/');
		let (Some(owner), Some(repo)) = (parts.next(), parts.next()) else {
			return Err(ConfigError::InvalidRepo(s.to_string()));
		};
		let repo = repo.strip_suffix(".git").unwrap_or(repo);
		if !SLUG_PART.is_match(owner) || !SLUG_PART.is_match(repo) {
			return Err(ConfigError::InvalidRepo(s.to_string()));
		}
		Ok(Self::new(owner.to_string(), repo.to_string()))
	}
}

impl fmt::Display for RepoSlug {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.owner, self.repo)
	}
}

//==============================================================================
// Issue Tracker Trait
//==============================================================================

/// The issue tracker operations reconciliation needs.
/// Implemented by the real GitHub client and by an in-memory mock for tests.
#[async_trait]
pub trait IssueTracker: Send + Sync {
	/// All open issues of the repository, pull requests excluded
	async fn list_open_issues(&self, repo: &RepoSlug) -> Result<Vec<Issue>, NetworkError>;

	/// Create an issue labelled [`TODO_LABEL`]
	async fn create_issue(&self, repo: &RepoSlug, title: &str, body: &str) -> Result<(), NetworkError>;

	/// Add a comment to an issue
	async fn comment_on_issue(&self, repo: &RepoSlug, issue_number: u64, body: &str) -> Result<(), NetworkError>;

	/// Set an issue's state to closed
	async fn close_issue(&self, repo: &RepoSlug, issue_number: u64) -> Result<(), NetworkError>;
}

//==============================================================================
// Real GitHub Client Implementation
//==============================================================================

/// GitHub REST client
pub struct RealIssueTracker {
	http_client: Client,
	api_base: String,
	token: Token,
}

impl RealIssueTracker {
	/// Validates the token and API base before anything is sent.
	pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
		let token = settings.token()?;
		let api_base = settings.api_base()?;
		let http_client = Client::builder()
			.user_agent(concat!("todo-organizer/", env!("CARGO_PKG_VERSION")))
			.timeout(settings.request_timeout())
			.build()
			.map_err(ConfigError::HttpClient)?;

		Ok(Self { http_client, api_base, token })
	}

	fn auth_header(&self) -> String {
		format!("token {}", self.token.expose())
	}

	fn issues_url(&self, repo: &RepoSlug) -> String {
		format!("{}/repos/{}/{}/issues", self.api_base, urlencoding::encode(&repo.owner), urlencoding::encode(&repo.repo))
	}

	async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response, NetworkError> {
		let res = request
			.header(AUTHORIZATION, self.auth_header())
			.header(ACCEPT, "application/vnd.github+json")
			.send()
			.await
			.map_err(|source| NetworkError::Transport { operation, source })?;

		if !res.status().is_success() {
			let status = res.status();
			let body = res.text().await.unwrap_or_default();
			return Err(NetworkError::Status { operation, status, body });
		}

		Ok(res)
	}
}

#[async_trait]
impl IssueTracker for RealIssueTracker {
	async fn list_open_issues(&self, repo: &RepoSlug) -> Result<Vec<Issue>, NetworkError> {
		const OPERATION: &str = "list open issues";
		let mut issues = Vec::new();

		for page in 1.. {
			let api_url = format!("{}?state=open&per_page={PER_PAGE}&page={page}", self.issues_url(repo));
			let res = self.send(OPERATION, self.http_client.get(&api_url)).await?;
			let listed = res.json::<Vec<ListedIssue>>().await.map_err(|source| NetworkError::Decode { operation: OPERATION, source })?;

			let last_page = listed.len() < PER_PAGE;
			issues.extend(listed.into_iter().filter(|l| l.pull_request.is_none()).map(|l| l.issue));
			if last_page {
				break;
			}
		}

		tracing::debug!(%repo, count = issues.len(), "fetched open issues");
		Ok(issues)
	}

	async fn create_issue(&self, repo: &RepoSlug, title: &str, body: &str) -> Result<(), NetworkError> {
		let request = self
			.http_client
			.post(self.issues_url(repo))
			.json(&serde_json::json!({ "title": title, "body": body, "labels": [TODO_LABEL] }));
		self.send("create issue", request).await?;
		Ok(())
	}

	async fn comment_on_issue(&self, repo: &RepoSlug, issue_number: u64, body: &str) -> Result<(), NetworkError> {
		let api_url = format!("{}/{issue_number}/comments", self.issues_url(repo));
		let request = self.http_client.post(&api_url).json(&serde_json::json!({ "body": body }));
		self.send("comment on issue", request).await?;
		Ok(())
	}

	async fn close_issue(&self, repo: &RepoSlug, issue_number: u64) -> Result<(), NetworkError> {
		let api_url = format!("{}/{issue_number}", self.issues_url(repo));
		let request = self.http_client.patch(&api_url).json(&serde_json::json!({ "state": IssueState::Closed }));
		self.send("close issue", request).await?;
		Ok(())
	}
}

//==============================================================================
// Convenience type alias for boxed client
//==============================================================================

pub type BoxedIssueTracker = Arc<dyn IssueTracker>;

/// Create the GitHub client from settings.
/// Returns an error if the token is not configured.
pub fn create_tracker(settings: &Settings) -> Result<BoxedIssueTracker, ConfigError> {
	Ok(Arc::new(RealIssueTracker::new(settings)?))
}
