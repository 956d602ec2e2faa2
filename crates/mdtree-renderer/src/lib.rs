//! Schema-driven compiler from hypertext trees to UI element trees.
//!
//! # Architecture
//!
//! Rendering is two passes over an immutable input tree:
//! - [`filter`]: removes or unwraps elements by allow/disallow lists and an
//!   optional predicate, and resolves raw HTML nodes
//! - [`compile`]: resolves each element's renderer through the
//!   [`Components`] registry, maps properties through the schema,
//!   sanitizes URIs, injects semantic props, and assigns stable keys
//!
//! [`TreeRenderer`] runs both with fixed [`Options`]. The output is a tree of
//! [`CompiledElement`]s for a UI framework to materialize;
//! [`render_static_markup`] is a minimal HTML backend for it.
//!
//! Raw HTML parsing is delegated to a [`FragmentParser`] (see the
//! `mdtree-html` crate).
//!
//! # Example
//!
//! ```
//! use mdtree_hast::{Element, Node};
//! use mdtree_renderer::{Options, TreeRenderer, WarningLog};
//!
//! let tree = Node::root(vec![Node::from(
//!     Element::new("p").with_children(vec![
//!         Node::from(
//!             Element::new("a")
//!                 .with_property("href", "javascript:alert(1)")
//!                 .with_children(vec![Node::text("click")]),
//!         ),
//!         Node::from(Element::new("em").with_children(vec![Node::text(" me")])),
//!     ]),
//! )]);
//!
//! let renderer = TreeRenderer::new(
//!     Options::new()
//!         .with_disallowed_elements(["em"])
//!         .with_unwrap_disallowed(true),
//! );
//! let html = renderer.render_to_string(&tree, &WarningLog::new()).unwrap();
//!
//! assert_eq!(html, r#"<p><a href="">click</a> me</p>"#);
//! ```

mod compiler;
mod components;
mod element;
mod entities;
mod error;
mod filter;
mod fragment;
mod html;
mod options;
mod renderer;
pub mod sanitize;
pub mod schema;
mod style;
mod warnings;

pub use compiler::compile;
pub use components::{Component, Components, Render};
pub use element::{Child, CompiledElement, ElementType, PropValue, Props, SourceNode};
pub use entities::decode_character_references;
pub use error::RenderError;
pub use filter::filter;
pub use fragment::FragmentParser;
pub use html::{escape_html, render_static_markup};
pub use options::{AllowElement, LinkTarget, LinkTargetFn, Options};
pub use renderer::TreeRenderer;
pub use sanitize::{DEFAULT_PROTOCOLS, Protocols, UriPolicy, UriTransform, sanitize_uri};
pub use schema::map_properties;
pub use style::parse_style;
pub use warnings::WarningLog;

pub use mdtree_config::{Config, ConfigError, DeprecatedKey};
