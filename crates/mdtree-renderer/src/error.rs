//! Error types for rendering.

use mdtree_config::ConfigError;

/// Misconfiguration detected before or while rendering.
///
/// Malformed but well-typed markup never produces an error; it degrades
/// instead (blank URI, dropped style declaration, omitted position).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// Both element lists were configured.
    #[error("Only one of `allowed_elements` and `disallowed_elements` should be defined")]
    ConflictingElementFilters,

    /// Component registry entry that is neither a tag name nor a renderer.
    #[error("Component for name `{tag}` not supported: expected a tag name or a renderer")]
    InvalidComponent {
        /// Tag the entry is registered for.
        tag: String,
    },

    /// Raw HTML fragment parser used without hooks.
    #[error("html parser called before use: configure it with hooks first")]
    ParserNotConfigured,

    /// Invalid configuration file.
    #[error("configuration error")]
    Config(#[from] ConfigError),
}
