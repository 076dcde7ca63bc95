//! Configuration for repolens.
//!
//! Settings are layered: `config.toml` in the user config directory, then
//! environment variables, then CLI flags (applied by the binary).
//!
//! # Configuration File Format
//!
//! ```toml
//! [github]
//! api_base = "https://api.github.com"
//! oauth_base = "https://github.com"
//! client_id = "Iv1.0123456789abcdef"
//! redirect_uri = "http://127.0.0.1:8976/callback"
//! scope = "repo user:email"
//!
//! [analyzer]
//! model = "gemini-2.5-flash"
//! assumed_seconds_per_file = 20
//!
//! [selection]
//! extensions = [".rs", ".py"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::selection::SUPPORTED_FILE_EXTENSIONS;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_OAUTH_BASE: &str = "https://github.com";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8976/callback";
pub const DEFAULT_OAUTH_SCOPE: &str = "repo user:email";
pub const DEFAULT_ASSUMED_SECONDS_PER_FILE: u64 = 20;

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSection {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_github_oauth_base")]
    pub oauth_base: String,
    /// OAuth app client id (or `GITHUB_CLIENT_ID`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// OAuth app client secret (or `GITHUB_CLIENT_SECRET`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_oauth_scope")]
    pub scope: String,
}

fn default_github_api_base() -> String {
    DEFAULT_GITHUB_API_BASE.to_string()
}

fn default_github_oauth_base() -> String {
    DEFAULT_GITHUB_OAUTH_BASE.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_oauth_scope() -> String {
    DEFAULT_OAUTH_SCOPE.to_string()
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            oauth_base: default_github_oauth_base(),
            client_id: None,
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            scope: default_oauth_scope(),
        }
    }
}

/// `[analyzer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerSection {
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,
    /// Per-file duration assumed for the ETA before any file has completed.
    #[serde(default = "default_assumed_seconds_per_file")]
    pub assumed_seconds_per_file: u64,
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_gemini_api_base() -> String {
    DEFAULT_GEMINI_API_BASE.to_string()
}

fn default_assumed_seconds_per_file() -> u64 {
    DEFAULT_ASSUMED_SECONDS_PER_FILE
}

impl Default for AnalyzerSection {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
            assumed_seconds_per_file: default_assumed_seconds_per_file(),
        }
    }
}

/// `[selection]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSection {
    /// File extensions offered for analysis.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    SUPPORTED_FILE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

/// The complete config.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepolensToml {
    #[serde(default)]
    pub github: GitHubSection,
    #[serde(default)]
    pub analyzer: AnalyzerSection,
    #[serde(default)]
    pub selection: SelectionSection,
}

impl RepolensToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load from `path`, returning defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match reqwest::Url::parse(&self.github.redirect_uri) {
            Ok(url) => {
                let loopback = matches!(url.host_str(), Some("127.0.0.1") | Some("localhost"));
                if url.scheme() != "http" || !loopback {
                    warnings.push(format!(
                        "redirect_uri '{}' is not a loopback http URL; the login callback cannot be received locally",
                        self.github.redirect_uri
                    ));
                }
            }
            Err(e) => warnings.push(format!(
                "Invalid redirect_uri '{}': {}",
                self.github.redirect_uri, e
            )),
        }

        if self.analyzer.assumed_seconds_per_file == 0 {
            warnings.push(
                "assumed_seconds_per_file is 0; no estimate is shown until the first file completes"
                    .to_string(),
            );
        }

        for ext in &self.selection.extensions {
            if !ext.starts_with('.') {
                warnings.push(format!("Extension '{}' should start with '.'", ext));
            }
        }

        warnings
    }
}

/// Default location of config.toml.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("repolens").join("config.toml"))
}

/// Resolved runtime configuration (file + environment).
#[derive(Debug, Clone)]
pub struct Config {
    pub file: RepolensToml,
    /// Static forge token from `GITHUB_TOKEN`.
    pub github_token: Option<String>,
    /// Analyzer key from `GEMINI_API_KEY`, falling back to `API_KEY`.
    pub analyzer_key: Option<String>,
}

impl Config {
    /// Load config.toml (explicit path or the default location) and apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => RepolensToml::load(p)?,
            None => match default_config_path() {
                Some(p) => RepolensToml::load_or_default(&p)?,
                None => RepolensToml::default(),
            },
        };
        Ok(Self::from_toml_with_env(file))
    }

    /// Apply environment variable overrides to a parsed file.
    pub fn from_toml_with_env(file: RepolensToml) -> Self {
        Self::from_toml_with_lookup(file, |key| std::env::var(key).ok())
    }

    fn from_toml_with_lookup(mut file: RepolensToml, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = non_empty("GITHUB_CLIENT_ID") {
            file.github.client_id = Some(id);
        }
        if let Some(secret) = non_empty("GITHUB_CLIENT_SECRET") {
            file.github.client_secret = Some(secret);
        }
        if let Some(model) = non_empty("REPOLENS_GEMINI_MODEL") {
            file.analyzer.model = model;
        }

        Self {
            file,
            github_token: non_empty("GITHUB_TOKEN"),
            analyzer_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
        }
    }
}
