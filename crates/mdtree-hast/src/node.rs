//! Node types of the hypertext tree.

use std::collections::BTreeMap;
use std::fmt;

use crate::position::Position;

/// Element properties keyed by property name.
///
/// Upstream producers use camel-cased property names (`className`,
/// `dataWhatever`, `ariaDescribedBy`); raw-HTML fragments carry plain
/// attribute names (`class`, `data-whatever`). The renderer normalizes both.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A node in the hypertext tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum Node {
    Root(Root),
    Element(Element),
    Text(Text),
    Comment(Comment),
    /// Raw HTML text, kept verbatim by the upstream converter.
    Raw(Raw),
}

/// Document root.
#[derive(Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Root {
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Node>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub position: Option<Position>,
}

/// Markup element.
///
/// Cloning and dropping walk the subtree with an explicit stack, so trees of
/// any depth can be copied and freed.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Element {
    pub tag_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: Properties,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Node>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub position: Option<Position>,
}

/// Text content.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Text {
    pub value: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub position: Option<Position>,
}

/// Markup comment. Never rendered.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comment {
    pub value: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub position: Option<Position>,
}

/// Raw HTML text.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Raw {
    pub value: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub position: Option<Position>,
}

/// Value of an element property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum PropertyValue {
    Boolean(bool),
    Number(f64),
    String(String),
    /// Ordered multi-value property (`className`, `accept`, `coords`).
    List(Vec<Primitive>),
}

/// Item of a multi-value property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Primitive {
    Number(f64),
    String(String),
}

impl Node {
    #[must_use]
    pub fn root(children: Vec<Node>) -> Self {
        Self::Root(Root {
            children,
            position: None,
        })
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(Text {
            value: value.into(),
            position: None,
        })
    }

    #[must_use]
    pub fn comment(value: impl Into<String>) -> Self {
        Self::Comment(Comment {
            value: value.into(),
            position: None,
        })
    }

    #[must_use]
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(Raw {
            value: value.into(),
            position: None,
        })
    }

    /// Child nodes; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Root(root) => &root.children,
            Self::Element(element) => &element.children,
            Self::Text(_) | Self::Comment(_) | Self::Raw(_) => &[],
        }
    }

    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Whether this is an element with the given tag name.
    #[must_use]
    pub fn is_element(&self, tag_name: &str) -> bool {
        self.as_element().is_some_and(|e| e.tag_name == tag_name)
    }

    #[must_use]
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::Root(root) => root.position.as_ref(),
            Self::Element(element) => element.position.as_ref(),
            Self::Text(text) => text.position.as_ref(),
            Self::Comment(comment) => comment.position.as_ref(),
            Self::Raw(raw) => raw.position.as_ref(),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl Element {
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            properties: Properties::new(),
            children: Vec::new(),
            position: None,
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Copy of this element without its children.
    #[must_use]
    pub fn shallow_clone(&self) -> Self {
        Self {
            tag_name: self.tag_name.clone(),
            properties: self.properties.clone(),
            children: Vec::new(),
            position: self.position,
        }
    }
}

impl Clone for Root {
    fn clone(&self) -> Self {
        Self {
            children: clone_nodes(&self.children),
            position: self.position,
        }
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        drop_nodes(&mut self.children);
    }
}

impl Clone for Element {
    fn clone(&self) -> Self {
        let mut element = self.shallow_clone();
        element.children = clone_nodes(&self.children);
        element
    }
}

impl Drop for Element {
    fn drop(&mut self) {
        drop_nodes(&mut self.children);
    }
}

/// Childless copy of `node`.
fn shell(node: &Node) -> Node {
    match node {
        Node::Root(root) => Node::Root(Root {
            children: Vec::new(),
            position: root.position,
        }),
        Node::Element(element) => Node::Element(element.shallow_clone()),
        Node::Text(text) => Node::Text(text.clone()),
        Node::Comment(comment) => Node::Comment(comment.clone()),
        Node::Raw(raw) => Node::Raw(raw.clone()),
    }
}

fn children_mut(node: &mut Node) -> Option<&mut Vec<Node>> {
    match node {
        Node::Root(root) => Some(&mut root.children),
        Node::Element(element) => Some(&mut element.children),
        Node::Text(_) | Node::Comment(_) | Node::Raw(_) => None,
    }
}

/// Deep copy of `nodes`.
fn clone_nodes(nodes: &[Node]) -> Vec<Node> {
    struct Frame<'a> {
        source: &'a [Node],
        next: usize,
        out: Vec<Node>,
        /// Childless copy the output is attached to; `None` for `nodes`.
        shell: Option<Node>,
    }

    let mut stack = vec![Frame {
        source: nodes,
        next: 0,
        out: Vec::with_capacity(nodes.len()),
        shell: None,
    }];
    loop {
        let Some(frame) = stack.last_mut() else {
            return Vec::new();
        };
        let source = frame.source;
        if let Some(node) = source.get(frame.next) {
            frame.next += 1;
            let children = node.children();
            if children.is_empty() {
                frame.out.push(shell(node));
            } else {
                stack.push(Frame {
                    source: children,
                    next: 0,
                    out: Vec::with_capacity(children.len()),
                    shell: Some(shell(node)),
                });
            }
            continue;
        }

        let Some(done) = stack.pop() else {
            return Vec::new();
        };
        match (done.shell, stack.last_mut()) {
            (Some(mut node), Some(parent)) => {
                if let Some(children) = children_mut(&mut node) {
                    *children = done.out;
                }
                parent.out.push(node);
            }
            _ => return done.out,
        }
    }
}

/// Free `nodes` without recursing into their subtrees.
fn drop_nodes(nodes: &mut Vec<Node>) {
    if nodes.iter().all(|node| node.children().is_empty()) {
        return;
    }
    let mut pending = std::mem::take(nodes);
    while let Some(mut node) = pending.pop() {
        if let Some(children) = children_mut(&mut node) {
            pending.append(children);
        }
    }
}

impl PropertyValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Join list items with `separator`; scalars format as themselves.
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        match self {
            Self::List(items) => items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(separator),
            other => other.to_string(),
        }
    }
}

/// Lists format space-separated.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::List(_) => f.write_str(&self.join(" ")),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Format a number the way markup writes it: `120`, not `120.0`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<Vec<Primitive>> for PropertyValue {
    fn from(value: Vec<Primitive>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(Primitive::from).collect())
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}
