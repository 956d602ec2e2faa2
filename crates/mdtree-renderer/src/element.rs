//! Compiled UI element tree.
//!
//! This is what the compiler hands to a rendering backend: element type,
//! framework-cased props, children, and a stable key.
//!
//! Like the input tree, compiled elements are cloned and dropped with an
//! explicit stack.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mdtree_hast::{Element, Node, Position, format_number};

use crate::components::Render;

/// Props of a compiled element keyed by framework property name.
pub type Props = BTreeMap<String, PropValue>;

/// Value of a compiled prop.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Explicit absence, e.g. `checked` on a plain list item.
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Parsed inline style as ordered `(property, value)` pairs.
    Style(Vec<(String, String)>),
    /// Source span, passed to custom renderers.
    Position(Position),
    /// Source element, passed to custom renderers.
    Node(SourceNode),
}

impl PropValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Scalars format like markup attribute values; structured values have no
/// attribute form and format empty.
impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null | Self::Position(_) | Self::Node(_) => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::Style(declarations) => {
                for (i, (name, value)) in declarations.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "{name}:{value}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<bool>> for PropValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Null, Self::Bool)
    }
}

/// Handle to the source element of a compiled element.
///
/// Holds the compiled tree behind an `Arc` plus the element's child-index
/// path, so every custom renderer can get its source without a copy.
#[derive(Clone)]
pub struct SourceNode {
    tree: Arc<Node>,
    path: Arc<PathStep>,
}

impl SourceNode {
    pub(crate) fn new(tree: Arc<Node>, path: Arc<PathStep>) -> Self {
        Self { tree, path }
    }

    /// The source element.
    #[must_use]
    pub fn element(&self) -> Option<&Element> {
        let mut indexes = self.path.indexes().into_iter();
        let mut node = &*self.tree;
        if !matches!(node, Node::Root(_)) {
            // A tree that is not a root is its own single top-level node.
            indexes.next();
        }
        for index in indexes {
            node = node.children().get(index)?;
        }
        node.as_element()
    }
}

impl PartialEq for SourceNode {
    fn eq(&self, other: &Self) -> bool {
        self.element() == other.element()
    }
}

impl fmt::Debug for SourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceNode")
            .field("path", &self.path.indexes())
            .finish_non_exhaustive()
    }
}

/// Child index of a node, linked to its parent's step.
pub(crate) struct PathStep {
    parent: Option<Arc<PathStep>>,
    index: usize,
}

impl PathStep {
    pub(crate) fn new(parent: Option<&Arc<PathStep>>, index: usize) -> Arc<Self> {
        Arc::new(Self {
            parent: parent.map(Arc::clone),
            index,
        })
    }

    /// Child indexes from the top of the tree down to this step.
    fn indexes(&self) -> Vec<usize> {
        let mut indexes = vec![self.index];
        let mut step = self.parent.as_deref();
        while let Some(current) = step {
            indexes.push(current.index);
            step = current.parent.as_deref();
        }
        indexes.reverse();
        indexes
    }
}

impl Drop for PathStep {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(step) = next {
            next = match Arc::try_unwrap(step) {
                Ok(mut step) => step.parent.take(),
                Err(_) => None,
            };
        }
    }
}

/// What a compiled element renders as.
#[derive(Clone)]
pub enum ElementType {
    /// Plain tag rendered by the backend.
    Tag(String),
    /// Custom renderer registered for `name`.
    Component {
        name: String,
        renderer: Arc<dyn Render>,
    },
}

impl ElementType {
    /// Tag name, or the name the custom renderer is registered for.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Tag(tag) => tag,
            Self::Component { name, .. } => name,
        }
    }

    #[must_use]
    pub fn is_component(&self) -> bool {
        matches!(self, Self::Component { .. })
    }
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tag(a), Self::Tag(b)) => a == b,
            (
                Self::Component { name, renderer },
                Self::Component {
                    name: other_name,
                    renderer: other_renderer,
                },
            ) => name == other_name && Arc::ptr_eq(renderer, other_renderer),
            _ => false,
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            Self::Component { name, .. } => f
                .debug_struct("Component")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// Element of the output tree.
#[derive(Debug, PartialEq)]
pub struct CompiledElement {
    pub element_type: ElementType,
    pub props: Props,
    pub children: Vec<Child>,
    /// Stable identity derived from structural position.
    pub key: String,
    /// Tag of the source element. Decides which props are semantic when the
    /// element type was remapped through the component registry.
    pub source_tag: String,
}

impl CompiledElement {
    /// Element of `element_type`, with the source tag set to its name.
    #[must_use]
    pub fn new(element_type: ElementType) -> Self {
        let source_tag = element_type.name().to_owned();
        Self {
            element_type,
            props: Props::new(),
            children: Vec::new(),
            key: String::new(),
            source_tag,
        }
    }

    fn shallow_clone(&self) -> Self {
        Self {
            element_type: self.element_type.clone(),
            props: self.props.clone(),
            children: Vec::new(),
            key: self.key.clone(),
            source_tag: self.source_tag.clone(),
        }
    }

    #[must_use]
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Child>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn with_source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = tag.into();
        self
    }

    /// Tag name for plain tags, `None` for custom renderers.
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        match &self.element_type {
            ElementType::Tag(tag) => Some(tag),
            ElementType::Component { .. } => None,
        }
    }

    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&PropValue> {
        self.props.get(name)
    }
}

impl Clone for CompiledElement {
    fn clone(&self) -> Self {
        struct Frame<'a> {
            source: &'a [Child],
            next: usize,
            element: CompiledElement,
        }

        let mut stack = vec![Frame {
            source: &self.children,
            next: 0,
            element: self.shallow_clone(),
        }];
        loop {
            let Some(frame) = stack.last_mut() else {
                return self.shallow_clone();
            };
            let source = frame.source;
            if let Some(child) = source.get(frame.next) {
                frame.next += 1;
                match child {
                    Child::Text(text) => frame.element.children.push(Child::Text(text.clone())),
                    Child::Element(element) => stack.push(Frame {
                        source: &element.children,
                        next: 0,
                        element: element.shallow_clone(),
                    }),
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                return self.shallow_clone();
            };
            match stack.last_mut() {
                Some(parent) => parent.element.children.push(Child::Element(done.element)),
                None => return done.element,
            }
        }
    }
}

impl Drop for CompiledElement {
    fn drop(&mut self) {
        let nested = self
            .children
            .iter()
            .any(|child| child.as_element().is_some_and(|e| !e.children.is_empty()));
        if !nested {
            return;
        }
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            if let Child::Element(element) = &mut child {
                pending.append(&mut element.children);
            }
        }
    }
}

/// Child of a compiled element.
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Element(CompiledElement),
    Text(String),
}

impl Child {
    #[must_use]
    pub fn as_element(&self) -> Option<&CompiledElement> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(_) => None,
        }
    }
}

impl From<CompiledElement> for Child {
    fn from(element: CompiledElement) -> Self {
        Self::Element(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Render;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_sets_fields() {
        let element = CompiledElement::new(ElementType::Tag("h1".to_owned()))
            .with_prop("level", 1.0)
            .with_children(vec![Child::Text("Title".to_owned())])
            .with_key("h1-0");

        assert_eq!(element.tag_name(), Some("h1"));
        assert_eq!(element.prop("level"), Some(&PropValue::Number(1.0)));
        assert_eq!(element.children[0].as_text(), Some("Title"));
        assert_eq!(element.key, "h1-0");
    }

    #[test]
    fn test_optional_bool_maps_to_null() {
        assert_eq!(PropValue::from(None::<bool>), PropValue::Null);
        assert_eq!(PropValue::from(Some(true)), PropValue::Bool(true));
    }

    #[test]
    fn test_display_formats_attribute_values() {
        assert_eq!(PropValue::Number(120.0).to_string(), "120");
        assert_eq!(
            PropValue::Style(vec![
                ("color".to_owned(), "red".to_owned()),
                ("fontWeight".to_owned(), "bold".to_owned()),
            ])
            .to_string(),
            "color:red;fontWeight:bold"
        );
        assert_eq!(PropValue::Null.to_string(), "");
    }

    #[test]
    fn test_component_types_compare_by_renderer_identity() {
        let renderer: Arc<dyn Render> = Arc::new(|_: &Props, children: Vec<Child>| children);
        let a = ElementType::Component {
            name: "h1".to_owned(),
            renderer: Arc::clone(&renderer),
        };
        let b = ElementType::Component {
            name: "h1".to_owned(),
            renderer,
        };
        let other: Arc<dyn Render> = Arc::new(|_: &Props, children: Vec<Child>| children);
        let c = ElementType::Component {
            name: "h1".to_owned(),
            renderer: other,
        };

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, ElementType::Tag("h1".to_owned()));
        assert!(a.is_component());
        assert_eq!(a.name(), "h1");
    }

    fn tag(name: &str) -> CompiledElement {
        CompiledElement::new(ElementType::Tag(name.to_owned()))
    }

    fn nested(depth: usize) -> CompiledElement {
        let mut element = tag("b").with_children(vec![Child::Text("x".to_owned())]);
        for _ in 1..depth {
            element = tag("b").with_children(vec![Child::Element(element)]);
        }
        element
    }

    fn depth(element: &CompiledElement) -> usize {
        let mut depth = 1;
        let mut current = element;
        while let Some(child) = current.children.first().and_then(Child::as_element) {
            depth += 1;
            current = child;
        }
        depth
    }

    #[test]
    fn test_clone_keeps_children_and_source_tag() {
        let element = tag("div")
            .with_source_tag("h1")
            .with_key("h1-0")
            .with_children(vec![
                Child::Text("a".to_owned()),
                Child::Element(tag("em").with_children(vec![Child::Text("b".to_owned())])),
            ]);
        let copy = element.clone();
        assert_eq!(copy, element);
        assert_eq!(copy.source_tag, "h1");
    }

    #[test]
    fn test_deep_element_clones_and_drops() {
        let element = nested(100_000);
        let copy = element.clone();
        assert_eq!(depth(&copy), 100_000);
        drop(element);
        drop(copy);
    }

    #[test]
    fn test_source_node_follows_path() {
        let tree = Arc::new(Node::root(vec![
            Node::text("\n"),
            Node::from(Element::new("ul").with_children(vec![Node::from(Element::new("li"))])),
        ]));
        let ul = PathStep::new(None, 1);
        let li = SourceNode::new(Arc::clone(&tree), PathStep::new(Some(&ul), 0));
        assert_eq!(li.element().map(|e| e.tag_name.as_str()), Some("li"));
        assert_eq!(
            SourceNode::new(Arc::clone(&tree), ul).element().map(|e| e.tag_name.as_str()),
            Some("ul")
        );
        let text = SourceNode::new(Arc::clone(&tree), PathStep::new(None, 0));
        assert_eq!(text.element(), None);
        let missing = SourceNode::new(tree, PathStep::new(None, 5));
        assert_eq!(missing.element(), None);
    }

    #[test]
    fn test_source_node_of_element_tree() {
        let tree = Arc::new(Node::from(
            Element::new("p").with_children(vec![Node::from(Element::new("em"))]),
        ));
        let p = PathStep::new(None, 0);
        let em = PathStep::new(Some(&p), 0);
        assert_eq!(
            SourceNode::new(Arc::clone(&tree), p).element().map(|e| e.tag_name.as_str()),
            Some("p")
        );
        assert_eq!(
            SourceNode::new(tree, em).element().map(|e| e.tag_name.as_str()),
            Some("em")
        );
    }

    #[test]
    fn test_long_path_indexes_and_drop() {
        let mut step = PathStep::new(None, 0);
        for index in 1..200_000 {
            step = PathStep::new(Some(&step), index % 3);
        }
        let indexes = step.indexes();
        assert_eq!(indexes.len(), 200_000);
        assert_eq!(&indexes[..4], &[0, 1, 2, 0]);
        drop(step);
    }
}
