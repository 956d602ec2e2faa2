//! Raw HTML fragment parser for the mdtree renderer.
//!
//! [`HtmlParser`] implements [`mdtree_renderer::FragmentParser`]. It must be
//! configured with [`ParserHooks`] before use: a validity predicate that
//! drops unwanted elements and an ordered list of
//! [`ProcessingInstruction`]s that replace matching elements.
//!
//! ```
//! use std::sync::Arc;
//!
//! use mdtree_hast::Node;
//! use mdtree_html::{HtmlParser, ParserHooks};
//! use mdtree_renderer::{Options, TreeRenderer, WarningLog};
//!
//! let parser = HtmlParser::with_hooks(ParserHooks::new(|el| el.tag_name != "script"));
//! let renderer = TreeRenderer::new(
//!     Options::new()
//!         .with_allow_dangerous_html(true)
//!         .with_html_parser(Arc::new(parser)),
//! );
//!
//! let tree = Node::root(vec![Node::raw("<b>bold</b><script>x()</script>")]);
//! let html = renderer.render_to_string(&tree, &WarningLog::new()).unwrap();
//! assert_eq!(html, "<b>bold</b>");
//! ```

mod hooks;
mod parser;

pub use hooks::{NodePredicate, ParserHooks, ProcessingInstruction};
pub use parser::HtmlParser;
