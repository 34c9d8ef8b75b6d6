use std::{fmt, path::Path, time::Duration};

use serde::Deserialize;
use smart_default::SmartDefault;
use url::Url;

use crate::error::ConfigError;

pub const APP_NAME: &str = "todo-organizer";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "TODO_ORGANIZER";

/// Layered settings: defaults, then `config.toml`, then `TODO_ORGANIZER_*` environment.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Settings {
	#[default = "https://api.github.com"]
	pub api_base: String,
	/// Never logged; see [`Token`].
	pub github_token: Option<String>,
	/// Default repository for `sync`, as `owner/repo`.
	pub repo: Option<String>,
	#[default = 30]
	pub request_timeout_secs: u64,
	/// Close open issues that no comment matches. Off unless explicitly enabled.
	pub close_unmatched: bool,
}

impl Settings {
	/// Load settings. `path` overrides the XDG config file location and must exist when given.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let mut builder = config::Config::builder();
		let file = match path {
			Some(path) => Some((path.to_path_buf(), true)),
			None => xdg::BaseDirectories::with_prefix(APP_NAME).find_config_file(CONFIG_FILE).map(|found| (found, false)),
		};
		if let Some((file, required)) = file {
			builder = builder.add_source(config::File::from(file).required(required));
		}
		builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

		let mut settings: Settings = builder.build()?.try_deserialize()?;
		if is_blank(settings.github_token.as_deref()) {
			settings.github_token = std::env::var("GITHUB_TOKEN").ok();
		}
		tracing::debug!(api_base = %settings.api_base, has_token = !is_blank(settings.github_token.as_deref()), "settings loaded");
		Ok(settings)
	}

	/// The validated credential. Fails before any request can be built.
	pub fn token(&self) -> Result<Token, ConfigError> {
		Token::new(self.github_token.as_deref().unwrap_or_default())
	}

	/// `api_base` without a trailing slash, validated as a URL.
	pub fn api_base(&self) -> Result<String, ConfigError> {
		let parsed = Url::parse(&self.api_base).map_err(|source| ConfigError::InvalidApiBase {
			url: self.api_base.clone(),
			source,
		})?;
		Ok(parsed.as_str().trim_end_matches('/').to_string())
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

fn is_blank(s: Option<&str>) -> bool {
	s.is_none_or(|s| s.trim().is_empty())
}

/// A non-empty API token. `Debug` never prints the secret.
#[derive(Clone)]
pub struct Token(String);

impl Token {
	pub fn new(raw: &str) -> Result<Self, ConfigError> {
		let raw = raw.trim();
		if raw.is_empty() {
			return Err(ConfigError::MissingToken);
		}
		Ok(Self(raw.to_string()))
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Token(<redacted>)")
	}
}
