//! Filter-then-compile facade.

use std::path::Path;
use std::sync::Arc;

use mdtree_config::Config;
use mdtree_hast::Node;

use crate::compiler::compile_shared;
use crate::element::Child;
use crate::error::RenderError;
use crate::filter::filter;
use crate::html::render_static_markup;
use crate::options::Options;
use crate::warnings::WarningLog;

/// Renders hypertext trees with fixed options.
///
/// Holds no per-call state and can be shared across threads. Deprecation
/// warnings go to the caller's [`WarningLog`].
#[derive(Clone, Debug, Default)]
pub struct TreeRenderer {
    options: Options,
}

impl TreeRenderer {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Renderer configured from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(Options::from_config(config))
    }

    /// Renderer configured from `mdtree.toml`: the given file, or the one
    /// discovered from the current directory, or defaults.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Config` if the file is missing or invalid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, RenderError> {
        let config = Config::load(config_path)?;
        Ok(Self::from_config(&config))
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Filter and compile `tree`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any node is processed.
    pub fn render(&self, tree: &Node, warnings: &WarningLog) -> Result<Vec<Child>, RenderError> {
        let filtered = Arc::new(filter(tree, &self.options)?);
        compile_shared(&filtered, &self.options, warnings)
    }

    /// Filter, compile and serialize `tree` to HTML.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any node is processed.
    pub fn render_to_string(&self, tree: &Node, warnings: &WarningLog) -> Result<String, RenderError> {
        Ok(render_static_markup(&self.render(tree, warnings)?))
    }
}
