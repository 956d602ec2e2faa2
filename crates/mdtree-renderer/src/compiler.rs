//! Compiler from a (filtered) hypertext tree to UI elements.
//!
//! For every element: resolve the renderer through the component registry,
//! map properties through the schema, apply URI policies and the link
//! target, inject the semantic props of the element type, compile the
//! children, and assign a key derived from the element's position.
//!
//! | tag | injected props |
//! |---|---|
//! | `h1`..`h6` | `level` |
//! | `ol`, `ul` | `ordered`, `depth` (0 at the outermost list) |
//! | `li` | `ordered` (from the parent list), `checked` (bool, or null if not a task item), `index` |
//! | `code` | `inline: true` unless inside `pre` |
//! | `tr` | `isHeader` (inside `thead`) |
//! | `th`, `td` | `isHeader` (`th` only) |
//!
//! Custom renderers also get `node`, and optionally `index`/`siblingCount`
//! and `sourcePosition`.
//!
//! Keys are `{tag}-{i}` at the top level. Below it they are
//! `{parent}.{tag}-{i}`, where `parent` is a 64-bit hash of the parent key
//! in hex, so a key stays short however deep the element is.
//!
//! Comments are never compiled. Raw HTML still present at this point is
//! compiled as text.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use mdtree_hast::{Element, Node, PropertyValue};

use crate::element::{Child, CompiledElement, ElementType, PathStep, PropValue, Props, SourceNode};
use crate::error::RenderError;
use crate::options::Options;
use crate::schema::{Space, map_properties_in};
use crate::warnings::WarningLog;

/// Elements whose whitespace-only text children (any mix of spaces, tabs,
/// line breaks and form feeds) are not rendered.
const TABLE_ELEMENTS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr"];

/// Compile `tree` into UI elements.
///
/// A root compiles to the sequence of its children; any other node compiles
/// as the single top-level node. Deprecated options are reported through
/// `warnings`, once per key for the lifetime of the log.
///
/// When custom renderers are registered, the tree is copied once so their
/// `node` props can share it.
///
/// # Errors
///
/// Returns a configuration error for inconsistent options or a component
/// registry entry that is not a tag name.
pub fn compile(
    tree: &Node,
    options: &Options,
    warnings: &WarningLog,
) -> Result<Vec<Child>, RenderError> {
    let shared = options
        .components
        .has_custom()
        .then(|| Arc::new(tree.clone()));
    compile_with(tree, shared.as_ref(), options, warnings)
}

/// Compile a tree the caller already owns, without copying it.
pub(crate) fn compile_shared(
    tree: &Arc<Node>,
    options: &Options,
    warnings: &WarningLog,
) -> Result<Vec<Child>, RenderError> {
    compile_with(tree, Some(tree), options, warnings)
}

/// `shared`, when given, holds the same tree as `tree`; source handles
/// point into it.
fn compile_with(
    tree: &Node,
    shared: Option<&Arc<Node>>,
    options: &Options,
    warnings: &WarningLog,
) -> Result<Vec<Child>, RenderError> {
    options.validate()?;
    for key in &options.deprecated {
        warnings.warn_once(*key);
    }

    let top = match tree {
        Node::Root(root) => root.children.as_slice(),
        other => std::slice::from_ref(other),
    };
    let mut stack = vec![Frame::top(top)];
    loop {
        let Some(frame) = stack.last_mut() else {
            return Ok(Vec::new());
        };
        let index = frame.next;
        let children = frame.children;
        if let Some(child) = children.get(index) {
            frame.next += 1;
            match child {
                Node::Text(text) => {
                    if !frame.skips_whitespace(&text.value) {
                        frame.out.push(Child::Text(text.value.clone()));
                    }
                }
                Node::Raw(raw) => frame.out.push(Child::Text(raw.value.clone())),
                Node::Comment(_) => {}
                Node::Root(root) => {
                    let nested = frame.nested(&root.children, index, shared.is_some());
                    stack.push(nested);
                }
                Node::Element(element) => {
                    let opened = open(frame, element, index, shared, options)?;
                    stack.push(opened);
                }
            }
            continue;
        }

        let Some(done) = stack.pop() else { continue };
        let compiled = done.close();
        match stack.last_mut() {
            Some(parent) => parent.out.extend(compiled),
            None => return Ok(wrap(compiled, options)),
        }
    }
}

/// Whether `prop` on a plain `tag` is a semantic prop rather than an
/// attribute.
pub(crate) fn is_semantic_prop(tag: &str, prop: &str) -> bool {
    match prop {
        "level" => heading_level(tag).is_some(),
        "ordered" => matches!(tag, "ol" | "ul" | "li"),
        "depth" => matches!(tag, "ol" | "ul"),
        "checked" | "index" => tag == "li",
        "inline" => tag == "code",
        "isHeader" => matches!(tag, "tr" | "th" | "td"),
        "node" | "siblingCount" | "sourcePosition" => true,
        _ => false,
    }
}

/// Element (or sequence) whose children are being compiled.
struct Frame<'a> {
    /// Nearest enclosing element; `None` at the top level.
    element: Option<&'a Element>,
    children: &'a [Node],
    next: usize,
    out: Vec<Child>,
    key: String,
    space: Space,
    /// Number of enclosing lists.
    list_depth: usize,
    /// Child-index path to this frame's node; only tracked while there is
    /// a shared tree to resolve it against.
    path: Option<Arc<PathStep>>,
    /// Type and props of the element being built; `None` splices the
    /// children into the parent.
    pending: Option<(ElementType, Props)>,
}

impl<'a> Frame<'a> {
    fn top(children: &'a [Node]) -> Self {
        Self {
            element: None,
            children,
            next: 0,
            out: Vec::new(),
            key: String::new(),
            space: Space::Html,
            list_depth: 0,
            path: None,
            pending: None,
        }
    }

    /// Frame for a root nested at `index`, spliced into this one.
    fn nested(&self, children: &'a [Node], index: usize, track_path: bool) -> Self {
        Self {
            element: self.element,
            children,
            next: 0,
            out: Vec::new(),
            key: child_key(&self.key, "root", index),
            space: self.space,
            list_depth: self.list_depth,
            path: track_path.then(|| PathStep::new(self.path.as_ref(), index)),
            pending: None,
        }
    }

    fn parent_tag(&self) -> Option<&str> {
        self.element.map(|element| element.tag_name.as_str())
    }

    fn skips_whitespace(&self, text: &str) -> bool {
        self.parent_tag()
            .is_some_and(|tag| TABLE_ELEMENTS.contains(&tag))
            && text.chars().all(|c| c.is_ascii_whitespace())
    }

    fn close(self) -> Vec<Child> {
        match self.pending {
            Some((element_type, props)) => vec![Child::Element(CompiledElement {
                element_type,
                props,
                children: self.out,
                key: self.key,
                source_tag: self
                    .element
                    .map(|element| element.tag_name.clone())
                    .unwrap_or_default(),
            })],
            None => self.out,
        }
    }
}

/// Start compiling `element`, the child at `index` of `parent`.
fn open<'a>(
    parent: &Frame<'a>,
    element: &'a Element,
    index: usize,
    shared: Option<&Arc<Node>>,
    options: &Options,
) -> Result<Frame<'a>, RenderError> {
    let tag = element.tag_name.as_str();
    let element_type = options.components.resolve(tag)?;
    let space = parent.space.enter(tag);
    let mut props = map_properties_in(space, &element.properties);

    apply_link_target(&mut props, element, options);
    apply_uri_policies(&mut props, element, options);

    let siblings = parent.children;
    match tag {
        "ol" | "ul" => {
            props.insert("ordered".to_owned(), PropValue::Bool(tag == "ol"));
            props.insert("depth".to_owned(), count(parent.list_depth));
        }
        "li" => {
            props.insert(
                "ordered".to_owned(),
                PropValue::Bool(parent.parent_tag() == Some("ol")),
            );
            props.insert("checked".to_owned(), PropValue::from(task_checked(element)));
            let position = siblings[..index]
                .iter()
                .filter(|node| node.is_element("li"))
                .count();
            props.insert("index".to_owned(), count(position));
        }
        "code" if parent.parent_tag() != Some("pre") => {
            props.insert("inline".to_owned(), PropValue::Bool(true));
        }
        "tr" => {
            props.insert(
                "isHeader".to_owned(),
                PropValue::Bool(parent.parent_tag() == Some("thead")),
            );
        }
        "th" | "td" => {
            props.insert("isHeader".to_owned(), PropValue::Bool(tag == "th"));
            align_to_style(&mut props);
        }
        _ => {
            if let Some(level) = heading_level(tag) {
                props.insert("level".to_owned(), PropValue::Number(f64::from(level)));
            }
        }
    }

    if options.source_pos
        && let Some(position) = element.position
    {
        props.insert(
            "data-sourcepos".to_owned(),
            PropValue::String(position.to_string()),
        );
    }

    let path = shared.map(|_| PathStep::new(parent.path.as_ref(), index));
    if element_type.is_component() {
        if let (Some(tree), Some(path)) = (shared, &path) {
            props.insert(
                "node".to_owned(),
                PropValue::Node(SourceNode::new(Arc::clone(tree), Arc::clone(path))),
            );
        }
        if options.include_element_index {
            let element_count = |nodes: &[Node]| {
                nodes
                    .iter()
                    .filter(|node| node.as_element().is_some())
                    .count()
            };
            props
                .entry("index".to_owned())
                .or_insert_with(|| count(element_count(&siblings[..index])));
            props.insert("siblingCount".to_owned(), count(element_count(siblings)));
        }
        if options.raw_source_pos
            && let Some(position) = element.position
        {
            props.insert("sourcePosition".to_owned(), PropValue::Position(position));
        }
    }

    let list_depth = if matches!(tag, "ol" | "ul") {
        parent.list_depth + 1
    } else {
        parent.list_depth
    };

    Ok(Frame {
        element: Some(element),
        children: &element.children,
        next: 0,
        out: Vec::new(),
        key: child_key(&parent.key, tag, index),
        space,
        list_depth,
        path,
        pending: Some((element_type, props)),
    })
}

/// Set `target` on links that carry an `href`, from the original `href`.
fn apply_link_target(props: &mut Props, element: &Element, options: &Options) {
    if element.tag_name != "a" {
        return;
    }
    let Some(target) = &options.link_target else {
        return;
    };
    let Some(href) = props.get("href").map(ToString::to_string) else {
        return;
    };
    if let Some(target) = target.resolve(&href, element) {
        props.insert("target".to_owned(), PropValue::String(target));
    }
}

/// Run `href`/`xlinkHref` through the link policy and `src` through the
/// image policy.
fn apply_uri_policies(props: &mut Props, element: &Element, options: &Options) {
    for (name, policy) in [
        ("href", &options.link_uri),
        ("xlinkHref", &options.link_uri),
        ("src", &options.image_uri),
    ] {
        if let Some(PropValue::String(uri)) = props.get_mut(name) {
            *uri = policy.apply(uri, element);
        }
    }
}

/// Move a cell's `align` into `style.textAlign`.
fn align_to_style(props: &mut Props) {
    let Some(align) = props.remove("align") else {
        return;
    };
    let align = align.to_string();
    match props.get_mut("style") {
        Some(PropValue::Style(declarations)) => {
            declarations.retain(|(name, _)| name != "textAlign");
            declarations.insert(0, ("textAlign".to_owned(), align));
        }
        _ => {
            props.insert(
                "style".to_owned(),
                PropValue::Style(vec![("textAlign".to_owned(), align)]),
            );
        }
    }
}

/// Checked state of a task list item: its first `input` of type checkbox,
/// directly or inside a leading paragraph. `None` if it is not a task item.
fn task_checked(item: &Element) -> Option<bool> {
    fn checkbox(children: &[Node]) -> Option<&Element> {
        children.iter().find_map(|node| {
            node.as_element().filter(|element| {
                element.tag_name == "input"
                    && element
                        .property("type")
                        .and_then(PropertyValue::as_str)
                        .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox"))
            })
        })
    }

    let input = checkbox(&item.children).or_else(|| {
        item.children
            .iter()
            .find_map(Node::as_element)
            .filter(|first| first.tag_name == "p")
            .and_then(|paragraph| checkbox(&paragraph.children))
    })?;
    Some(match input.property("checked") {
        None | Some(PropertyValue::Boolean(false)) => false,
        Some(PropertyValue::Number(n)) => *n != 0.0,
        Some(_) => true,
    })
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', level @ b'1'..=b'6'] => Some(level - b'0'),
        _ => None,
    }
}

pub(crate) fn child_key(parent: &str, tag: &str, index: usize) -> String {
    if parent.is_empty() {
        format!("{tag}-{index}")
    } else {
        let mut hasher = DefaultHasher::new();
        parent.hash(&mut hasher);
        format!("{:016x}.{tag}-{index}", hasher.finish())
    }
}

#[allow(clippy::cast_precision_loss)]
fn count(n: usize) -> PropValue {
    PropValue::Number(n as f64)
}

/// Wrap the output in a `div` when a class name is configured.
fn wrap(children: Vec<Child>, options: &Options) -> Vec<Child> {
    match &options.class_name {
        Some(class_name) => vec![Child::Element(
            CompiledElement::new(ElementType::Tag("div".to_owned()))
                .with_prop("className", class_name.as_str())
                .with_children(children)
                .with_key("root"),
        )],
        None => children,
    }
}
