//! Configuration file support for tally.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `TALLY_`, e.g., `TALLY_ACCESS_TOKEN`)
//! 3. Local config file (./tally.toml)
//! 4. Config file (~/.config/tally/config.toml)
//! 5. Built-in defaults
//!
//! Top-level keys apply to every platform. A platform section overrides the
//! identity and host for that platform only.
//!
//! Example config file:
//! ```toml
//! username = "octocat"
//! emails = ["octocat@github.com", "octo@example.com"]
//! from_date = "2024-01-01"
//! min_commits = 3
//! concurrency = 8
//!
//! [github]
//! token = "ghp_..."  # or use TALLY_GITHUB__TOKEN
//!
//! [gitlab]
//! host = "https://gitlab.example.com"
//! username = "octo"
//! token = "glpat-..."
//!
//! [gitea]
//! host = "https://codeberg.org"
//! requests_per_second = 2
//! ```
//!
//! List keys accept comma-separated environment values:
//! `TALLY_EMAILS=me@example.com,me@work.example`.

use std::path::PathBuf;

use config::builder::{ConfigBuilder, DefaultState};
use config::{Environment, File, FileFormat};
use directories::ProjectDirs;
use serde_json::{Map, Value, json};
use tally::rate_limits;

/// Forges the CLI can tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forge {
    #[cfg(feature = "github")]
    GitHub,
    #[cfg(feature = "gitlab")]
    GitLab,
    #[cfg(feature = "gitea")]
    Gitea,
}

/// Keys of the per-platform sections.
const PLATFORM_SECTIONS: [&str; 3] = ["github", "gitlab", "gitea"];

impl Forge {
    /// Name of the platform's config section.
    pub fn section(self) -> &'static str {
        match self {
            #[cfg(feature = "github")]
            Forge::GitHub => "github",
            #[cfg(feature = "gitlab")]
            Forge::GitLab => "gitlab",
            #[cfg(feature = "gitea")]
            Forge::Gitea => "gitea",
        }
    }

    /// Default API host.
    pub fn default_host(self) -> &'static str {
        match self {
            #[cfg(feature = "github")]
            Forge::GitHub => tally::github::GITHUB_API_HOST,
            #[cfg(feature = "gitlab")]
            Forge::GitLab => tally::gitlab::GITLAB_HOST,
            #[cfg(feature = "gitea")]
            Forge::Gitea => tally::gitea::CODEBERG_HOST,
        }
    }

    /// Request rate used when none is configured.
    pub fn default_requests_per_second(self) -> u32 {
        match self {
            #[cfg(feature = "github")]
            Forge::GitHub => rate_limits::GITHUB_DEFAULT_RPS,
            #[cfg(feature = "gitlab")]
            Forge::GitLab => rate_limits::GITLAB_DEFAULT_RPS,
            #[cfg(feature = "gitea")]
            Forge::Gitea => rate_limits::GITEA_DEFAULT_RPS,
        }
    }
}

/// Layered configuration as loaded, before resolution.
///
/// Values are kept untyped so that one mistyped key falls back to its own
/// default when the options are resolved, instead of invalidating the rest.
#[derive(Debug, Default, Clone)]
pub struct Config {
    options: Map<String, Value>,
}

/// Per-platform overrides.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// API host, e.g. a self-hosted instance.
    pub host: Option<String>,
    /// Login on this platform.
    pub username: Option<String>,
    /// Access token for this platform.
    pub token: Option<String>,
    /// Rate limit for this platform.
    pub requests_per_second: Option<u64>,
}

impl PlatformConfig {
    fn from_section(name: &str, section: Option<&Value>) -> Self {
        let Some(section) = section else {
            return Self::default();
        };
        let Some(table) = section.as_object() else {
            tracing::warn!("Ignoring [{}]: expected a table", name);
            return Self::default();
        };

        let string = |key: &str| match table.get(key) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                tracing::warn!("Ignoring {}.{}: expected a string, got {}", name, key, other);
                None
            }
        };

        let requests_per_second = match table.get("requests_per_second") {
            None => None,
            Some(value) => {
                let rate = value.as_u64();
                if rate.is_none() {
                    tracing::warn!(
                        "Ignoring {}.requests_per_second: expected a non-negative integer, got {}",
                        name,
                        value
                    );
                }
                rate
            }
        };

        Self {
            host: string("host"),
            username: string("username"),
            token: string("token"),
            requests_per_second,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/tally/config.toml)
    /// 3. Local config file (./tally.toml)
    /// 4. Environment variables with TALLY_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::<DefaultState>::default();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("tally.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./tally.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        Self::from_builder(builder.add_source(environment()))
    }

    /// Build the layered sources into options.
    ///
    /// A source that cannot be read (e.g. malformed TOML) yields the
    /// defaults with a warning.
    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Self {
        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Map<String, Value>>() {
                Ok(options) => Self { options },
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tally").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The section for one platform.
    pub fn platform(&self, forge: Forge) -> PlatformConfig {
        let name = forge.section();
        PlatformConfig::from_section(name, self.options.get(name))
    }

    /// API host for a platform, falling back to its public instance.
    pub fn host(&self, forge: Forge) -> String {
        self.platform(forge)
            .host
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| forge.default_host().to_string())
    }

    /// User options for a platform, ready for `Settings::resolve`.
    ///
    /// Top-level keys pass through as loaded; the resolver keeps the
    /// well-typed ones. Platform sections override the identity and the
    /// request rate, which otherwise falls back to the platform's default.
    pub fn user_options(&self, forge: Forge) -> Map<String, Value> {
        let mut options: Map<String, Value> = self
            .options
            .iter()
            .filter(|(key, _)| !PLATFORM_SECTIONS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let section = self.platform(forge);
        if let Some(username) = section.username {
            options.insert("username".to_string(), json!(username));
        }
        if let Some(token) = section.token {
            options.insert("access_token".to_string(), json!(token));
        }

        let rate = section
            .requests_per_second
            .or_else(|| options.get("requests_per_second").and_then(Value::as_u64))
            .unwrap_or_else(|| u64::from(forge.default_requests_per_second()));
        options.insert("requests_per_second".to_string(), json!(rate));

        options
    }
}

/// `TALLY_*` environment source.
///
/// `TALLY_MIN_COMMITS` sets `min_commits`; a double underscore reaches into
/// a platform section, as in `TALLY_GITLAB__TOKEN`.
fn environment() -> Environment {
    Environment::with_prefix("TALLY")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("emails")
        .with_list_parse_key("names")
}
