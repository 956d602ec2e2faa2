//! Raw HTML fragment parser seam.
//!
//! The renderer does not parse HTML itself. When raw HTML is allowed, each
//! raw node is handed to a [`FragmentParser`] and the resulting nodes are
//! spliced into the tree and filtered like any other content.

use mdtree_hast::Node;

use crate::error::RenderError;

/// Turns raw HTML text into hypertext nodes.
pub trait FragmentParser: Send + Sync {
    /// Fail if the parser has not been configured with its hooks.
    ///
    /// Called once before rendering starts.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::ParserNotConfigured` for an unconfigured parser.
    fn ensure_configured(&self) -> Result<(), RenderError>;

    /// Parse `html` into zero or more nodes. Never fails: markup that cannot
    /// be parsed degrades to text.
    fn parse_fragment(&self, html: &str) -> Vec<Node>;
}
