//! Shared test infrastructure for integration tests.
//!
//! Provides `TestContext`, a temporary project directory that also serves as an
//! isolated XDG config home, plus helpers to run the compiled binary against it.
//!
//! # Example
//!
//! ```ignore
//! let ctx = TestContext::new(&[("src/main.rs", "//TODO parse args\n")]);
//! let (status, stdout, stderr) = ctx.run(&["scan", "."]);
//! assert!(status.success());
//! ```

use std::{
	path::Path,
	process::{Command, ExitStatus},
};

use tempfile::TempDir;
use todo_organizer::{RepoSlug, Settings};

/// Environment variables that would leak the developer's setup into a test run.
const SCRUBBED_ENV: [&str; 6] = [
	"GITHUB_TOKEN",
	"TODO_ORGANIZER_GITHUB_TOKEN",
	"TODO_ORGANIZER_API_BASE",
	"TODO_ORGANIZER_REPO",
	"TODO_ORGANIZER_CLOSE_UNMATCHED",
	"TODO_ORGANIZER_TRACE_FILE",
];

pub struct TestContext {
	pub dir: TempDir,
	env: Vec<(String, String)>,
}

impl TestContext {
	/// Create a project directory holding `files`, given as `(relative path, contents)`.
	pub fn new(files: &[(&str, &str)]) -> Self {
		let dir = tempfile::tempdir().unwrap();
		for (rel, contents) in files {
			let path = dir.path().join(rel);
			std::fs::create_dir_all(path.parent().unwrap()).unwrap();
			std::fs::write(path, contents).unwrap();
		}
		Self { dir, env: Vec::new() }
	}

	pub fn root(&self) -> &Path {
		self.dir.path()
	}

	/// Set an environment variable for subsequent [`run`](Self::run) calls.
	pub fn with_env(mut self, key: &str, value: &str) -> Self {
		self.env.push((key.to_string(), value.to_string()));
		self
	}

	/// Run the binary inside the project directory.
	///
	/// Returns (exit_status, stdout, stderr) for easy assertions.
	pub fn run(&self, args: &[&str]) -> (ExitStatus, String, String) {
		let mut cmd = Command::new(env!("CARGO_BIN_EXE_todo-organizer"));
		cmd.args(args).current_dir(self.root()).env("XDG_CONFIG_HOME", self.root().join(".config")).env("RUST_LOG", "warn");
		for key in SCRUBBED_ENV {
			cmd.env_remove(key);
		}
		for (key, value) in &self.env {
			cmd.env(key, value);
		}
		let output = cmd.output().unwrap();
		(
			output.status,
			String::from_utf8_lossy(&output.stdout).into_owned(),
			String::from_utf8_lossy(&output.stderr).into_owned(),
		)
	}
}

pub fn repo() -> RepoSlug {
	RepoSlug::new("owner".to_string(), "repo".to_string())
}

/// Settings pointing the real client at a local mock server.
pub fn settings_for(api_base: &str) -> Settings {
	Settings {
		api_base: api_base.to_string(),
		github_token: Some("test-token".to_string()),
		..Default::default()
	}
}
