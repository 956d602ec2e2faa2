//! Configuration management for mdtree.
//!
//! Parses `mdtree.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Only declarative settings live here. Predicates, custom URI transforms,
//! dynamic link targets and custom renderers are functions and are set
//! programmatically on the renderer's options.
//!
//! ```toml
//! disallowed_elements = ["em", "strong"]
//! unwrap_disallowed = true
//! link_target = "_blank"
//! source_pos = true
//!
//! [components]
//! b = "strong"
//! ```
//!
//! ## Deprecated keys
//!
//! - `escape_html` - use `allow_dangerous_html` (inverted meaning)
//! - `[renderers]` - use `[components]`
//!
//! Deprecated keys are still honored. [`Config::deprecated_keys`] lists the
//! ones present so the caller can warn about them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdtree.toml";

/// Renderer configuration as read from `mdtree.toml`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Only these tag names are kept. Exclusive with `disallowed_elements`.
    pub allowed_elements: Option<Vec<String>>,
    /// These tag names are removed. Exclusive with `allowed_elements`.
    pub disallowed_elements: Option<Vec<String>>,
    /// Keep the children of removed elements in their place.
    pub unwrap_disallowed: bool,
    /// Sanitize link URIs. `false` disables sanitization explicitly.
    pub transform_link_uri: bool,
    /// Sanitize image URIs. `false` disables sanitization explicitly.
    pub transform_image_uri: bool,
    /// `target` attribute for links.
    pub link_target: Option<String>,
    /// Render `data-sourcepos` attributes.
    pub source_pos: bool,
    /// Pass structured source positions to custom renderers.
    pub raw_source_pos: bool,
    /// Drop raw HTML outright.
    pub skip_html: bool,
    /// Parse raw HTML with the fragment parser instead of rendering it as text.
    allow_dangerous_html: Option<bool>,
    /// Pass sibling index to custom renderers.
    pub include_element_index: bool,
    /// Wrap output in a `div` with this class.
    pub class_name: Option<String>,
    /// Tag name overrides (raw TOML values, validated after loading).
    components: BTreeMap<String, toml::Value>,

    /// Deprecated: inverse of `allow_dangerous_html`.
    escape_html: Option<bool>,
    /// Deprecated: old name of `components`.
    renderers: Option<BTreeMap<String, toml::Value>>,

    /// Validated tag name overrides (set after loading).
    #[serde(skip)]
    pub components_resolved: BTreeMap<String, String>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_elements: None,
            disallowed_elements: None,
            unwrap_disallowed: false,
            transform_link_uri: true,
            transform_image_uri: true,
            link_target: None,
            source_pos: false,
            raw_source_pos: false,
            skip_html: false,
            allow_dangerous_html: None,
            include_element_index: false,
            class_name: None,
            components: BTreeMap::new(),
            escape_html: None,
            renderers: None,
            components_resolved: BTreeMap::new(),
            config_path: None,
        }
    }
}

/// Configuration key that still works but has a replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeprecatedKey {
    EscapeHtml,
    Renderers,
}

impl DeprecatedKey {
    /// The deprecated key as written in configuration.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::EscapeHtml => "escape_html",
            Self::Renderers => "renderers",
        }
    }

    /// The key to use instead.
    #[must_use]
    pub fn replacement(self) -> &'static str {
        match self {
            Self::EscapeHtml => "allow_dangerous_html",
            Self::Renderers => "components",
        }
    }
}

impl fmt::Display for DeprecatedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "please use `{}` instead of `{}`",
            self.replacement(),
            self.key()
        )
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Component override that is not a tag name.
    #[error("Component for name `{tag}` not supported: expected a tag name")]
    InvalidComponent {
        /// Tag whose override is invalid.
        tag: String,
    },
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdtree.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the configuration is invalid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }
        match Self::discover_config() {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails or the configuration is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.resolve()?;
        config.validate()?;
        Ok(config)
    }

    /// Whether raw HTML may be handed to the fragment parser.
    ///
    /// `allow_dangerous_html` wins over the deprecated `escape_html`.
    #[must_use]
    pub fn allow_dangerous_html(&self) -> bool {
        self.allow_dangerous_html
            .or(self.escape_html.map(|escape| !escape))
            .unwrap_or(false)
    }

    /// Deprecated keys present in this configuration.
    #[must_use]
    pub fn deprecated_keys(&self) -> Vec<DeprecatedKey> {
        let mut keys = Vec::new();
        if self.escape_html.is_some() {
            keys.push(DeprecatedKey::EscapeHtml);
        }
        if self.renderers.is_some() {
            keys.push(DeprecatedKey::Renderers);
        }
        keys
    }

    /// Validate option combinations.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if both element lists are set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_elements.is_some() && self.disallowed_elements.is_some() {
            return Err(ConfigError::Validation(
                "Only one of `allowed_elements` and `disallowed_elements` should be defined"
                    .to_owned(),
            ));
        }
        if let Some(target) = &self.link_target {
            require_non_empty(target, "link_target")?;
        }
        Ok(())
    }

    /// Merge `[renderers]` into `[components]` and check every override is a tag name.
    ///
    /// Entries in `[components]` win over the deprecated `[renderers]`.
    fn resolve(&mut self) -> Result<(), ConfigError> {
        let mut resolved = BTreeMap::new();
        let legacy = self.renderers.iter().flatten();
        for (tag, value) in legacy.chain(&self.components) {
            let name = match value {
                toml::Value::String(name) if !name.trim().is_empty() => name.trim().to_owned(),
                _ => return Err(ConfigError::InvalidComponent { tag: tag.clone() }),
            };
            resolved.insert(tag.clone(), name);
        }
        self.components_resolved = resolved;
        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
