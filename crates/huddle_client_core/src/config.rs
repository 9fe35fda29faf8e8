#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use huddle_domain::SessionId;
use huddle_util::endpoint::HttpEndpoint;
use huddle_util::env::{env_nonempty, nonempty, parse_env_bool};
use serde::Deserialize;
use tracing::{info, warn};

use crate::view::LayoutSettings;

pub const DEFAULT_SESSION_ID: &str = "demo-session";
pub const DEFAULT_ARCHIVE_USER: &str = "someone";
pub const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default config path: `~/.huddle/config.toml`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
	let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
	Ok(home.join(".huddle").join("config.toml"))
}

/// Load the session config from TOML and env overrides.
pub fn load_session_config() -> anyhow::Result<SessionConfig> {
	let path = default_config_path()?;
	load_session_config_from_path(&path)
}

/// Same as `load_session_config` but with an explicit config path.
pub fn load_session_config_from_path(path: &Path) -> anyhow::Result<SessionConfig> {
	let file_cfg = read_toml_if_exists(path)
		.with_context(|| format!("read config from {}", path.display()))?
		.unwrap_or_default();

	let mut cfg = SessionConfig::from_file(file_cfg).with_context(|| format!("invalid config in {}", path.display()))?;

	apply_env_overrides(&mut cfg);

	Ok(cfg)
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
	pub credentials: Credentials,
	pub archive: ArchiveSettings,
	pub layout: LayoutSettings,
}

/// Which session to join.
#[derive(Debug, Clone)]
pub struct Credentials {
	/// Session to join; also the archive topic.
	pub session_id: SessionId,
}

impl Default for Credentials {
	fn default() -> Self {
		Self {
			session_id: default_session_id(),
		}
	}
}

/// Replay archive settings.
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
	pub enabled: bool,
	pub url: Option<HttpEndpoint>,
	/// Value sent as the `user` field.
	pub user_label: String,
	pub timeout: Duration,
}

impl Default for ArchiveSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			url: None,
			user_label: DEFAULT_ARCHIVE_USER.to_string(),
			timeout: DEFAULT_ARCHIVE_TIMEOUT,
		}
	}
}

impl ArchiveSettings {
	/// Whether the archiver should run.
	pub fn is_active(&self) -> bool {
		self.enabled && self.url.is_some()
	}
}

fn default_session_id() -> SessionId {
	SessionId::new(DEFAULT_SESSION_ID).expect("valid default session id")
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
	#[serde(default)]
	credentials: FileCredentials,

	#[serde(default)]
	archive: FileArchiveSettings,

	#[serde(default)]
	layout: FileLayoutSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileCredentials {
	session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileArchiveSettings {
	enabled: Option<bool>,
	url: Option<String>,
	user_label: Option<String>,
	timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileLayoutSettings {
	publisher_width: Option<u32>,
	publisher_height: Option<u32>,
	subscriber_width: Option<u32>,
	subscriber_height: Option<u32>,
}

impl SessionConfig {
	fn from_file(file: FileConfig) -> anyhow::Result<Self> {
		let session_id = match file.credentials.session_id.as_deref().and_then(nonempty) {
			Some(id) => SessionId::new(id).context("credentials.session_id")?,
			None => default_session_id(),
		};

		let url = match file.archive.url.as_deref().and_then(nonempty) {
			Some(url) => Some(HttpEndpoint::parse(&url).map_err(|e| anyhow!(e)).context("archive.url")?),
			None => None,
		};

		let layout_defaults = LayoutSettings::default();

		Ok(Self {
			credentials: Credentials { session_id },
			archive: ArchiveSettings {
				enabled: file.archive.enabled.unwrap_or(true),
				url,
				user_label: file
					.archive
					.user_label
					.filter(|s| !s.trim().is_empty())
					.unwrap_or_else(|| DEFAULT_ARCHIVE_USER.to_string()),
				timeout: file
					.archive
					.timeout_ms
					.filter(|ms| *ms > 0)
					.map(Duration::from_millis)
					.unwrap_or(DEFAULT_ARCHIVE_TIMEOUT),
			},
			layout: LayoutSettings {
				publisher_width: file.layout.publisher_width.unwrap_or(layout_defaults.publisher_width),
				publisher_height: file.layout.publisher_height.unwrap_or(layout_defaults.publisher_height),
				subscriber_width: file.layout.subscriber_width.unwrap_or(layout_defaults.subscriber_width),
				subscriber_height: file.layout.subscriber_height.unwrap_or(layout_defaults.subscriber_height),
			},
		})
	}
}

fn read_toml_if_exists(path: &Path) -> anyhow::Result<Option<FileConfig>> {
	match fs::read_to_string(path) {
		Ok(s) => {
			let cfg: FileConfig = toml::from_str(&s).context("parse TOML")?;
			Ok(Some(cfg))
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(anyhow!(e).context("read config file")),
	}
}

fn apply_env_overrides(cfg: &mut SessionConfig) {
	apply_overrides(cfg, env_nonempty);
}

/// Apply `HUDDLE_*` overrides read through `lookup`, which returns trimmed,
/// non-blank values only.
pub fn apply_overrides(cfg: &mut SessionConfig, lookup: impl Fn(&str) -> Option<String>) {
	if let Some(v) = lookup("HUDDLE_SESSION_ID")
		&& let Ok(id) = SessionId::new(v)
	{
		info!(session_id = %id, "credentials: session_id overridden by env");
		cfg.credentials.session_id = id;
	}

	if let Some(v) = lookup("HUDDLE_ARCHIVE_URL") {
		match HttpEndpoint::parse(&v) {
			Ok(endpoint) => {
				info!(url = %endpoint.url(), "archive: url overridden by env");
				cfg.archive.url = Some(endpoint);
			}
			Err(e) => warn!(error = %e, "archive: ignoring invalid HUDDLE_ARCHIVE_URL"),
		}
	}

	if let Some(v) = lookup("HUDDLE_ARCHIVE_USER") {
		cfg.archive.user_label = v;
		info!("archive: user_label overridden by env");
	}

	if let Some(v) = lookup("HUDDLE_ARCHIVE_TIMEOUT_MS")
		&& let Ok(ms) = v.parse::<u64>()
		&& ms > 0
	{
		cfg.archive.timeout = Duration::from_millis(ms);
		info!(timeout_ms = ms, "archive: timeout overridden by env");
	}

	if let Some(v) = lookup("HUDDLE_ARCHIVE_ENABLED")
		&& let Some(enabled) = parse_env_bool(&v)
	{
		cfg.archive.enabled = enabled;
		info!(enabled, "archive: enabled overridden by env");
	}

	if cfg.archive.enabled && cfg.archive.url.is_none() {
		warn!("archive: no url configured; chat replay archiving is off");
	}
}
