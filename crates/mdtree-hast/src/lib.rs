//! Hypertext syntax tree for the mdtree renderer.
//!
//! The tree is produced upstream (markdown parsing and markdown-to-hypertext
//! conversion are not part of this workspace) and is treated as immutable by
//! every consumer. The renderer filters it into a new tree and compiles that
//! tree into renderable elements.
//!
//! # Example
//!
//! ```
//! use mdtree_hast::{Element, Node};
//!
//! let tree = Node::root(vec![Node::from(
//!     Element::new("h1").with_children(vec![Node::text("Title")]),
//! )]);
//!
//! assert_eq!(tree.children().len(), 1);
//! assert!(tree.children()[0].is_element("h1"));
//! ```
//!
//! With the `serde` feature the tree (de)serializes in the usual JSON shape:
//! nodes tagged by `type`, elements carrying `tagName`, `properties`,
//! `children` and an optional `position`.

mod node;
mod position;

pub use node::{
    Comment, Element, Node, Primitive, Properties, PropertyValue, Raw, Root, Text, format_number,
};
pub use position::{Point, Position};
