//! Error types for scanning, configuration and issue tracker calls.
//!
//! Uses miette diagnostic codes so the binary can render actionable help.

use std::path::PathBuf;

use miette::Diagnostic;

/// A document could not be turned into text.
///
/// Multi-file scans skip the offending file; single-document scans yield no comments.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum ScanError {
	#[error("failed to read {}", .path.display())]
	#[diagnostic(code(todo_organizer::scan::read))]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{} is not valid UTF-8", .path.display())]
	#[diagnostic(code(todo_organizer::scan::not_utf8), help("only text files are scanned for markers"))]
	NotUtf8 { path: PathBuf },
}

/// An issue tracker call failed, either in transport or with a non-success status.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum NetworkError {
	#[error("{operation}: request failed: {source}")]
	#[diagnostic(code(todo_organizer::network::transport))]
	Transport {
		operation: &'static str,
		#[source]
		source: reqwest::Error,
	},

	#[error("{operation}: tracker responded {status}: {body}")]
	#[diagnostic(code(todo_organizer::network::status))]
	Status {
		operation: &'static str,
		status: reqwest::StatusCode,
		body: String,
	},

	#[error("{operation}: could not decode response: {source}")]
	#[diagnostic(code(todo_organizer::network::decode))]
	Decode {
		operation: &'static str,
		#[source]
		source: reqwest::Error,
	},
}

impl NetworkError {
	pub fn status(&self) -> Option<reqwest::StatusCode> {
		match self {
			NetworkError::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Settings are missing or malformed. Raised before any network call is attempted.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum ConfigError {
	#[error("GitHub token is missing or empty")]
	#[diagnostic(
		code(todo_organizer::config::missing_token),
		help("set TODO_ORGANIZER_GITHUB_TOKEN or GITHUB_TOKEN, or `github_token` in config.toml")
	)]
	MissingToken,

	#[error("failed to load settings")]
	#[diagnostic(code(todo_organizer::config::load))]
	Load(#[from] config::ConfigError),

	#[error("invalid repository `{0}`")]
	#[diagnostic(code(todo_organizer::config::invalid_repo), help("expected `owner/repo` or a GitHub repository URL"))]
	InvalidRepo(String),

	#[error("no repository given")]
	#[diagnostic(code(todo_organizer::config::missing_repo), help("pass --repo owner/repo or set `repo` in config.toml"))]
	MissingRepo,

	#[error("invalid api_base `{url}`")]
	#[diagnostic(code(todo_organizer::config::invalid_api_base))]
	InvalidApiBase {
		url: String,
		#[source]
		source: url::ParseError,
	},

	#[error("failed to build HTTP client")]
	#[diagnostic(code(todo_organizer::config::http_client))]
	HttpClient(#[source] reqwest::Error),
}
