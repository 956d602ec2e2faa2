//! Static HTML markup for compiled elements.
//!
//! A minimal rendering backend: custom renderers are expanded, UI property
//! names are mapped back to attribute names, semantic props are left out,
//! and text and attribute values are escaped. Attributes whose names
//! cannot be written safely are left out, and elements with such tag names
//! render only their children. The output matches what a
//! framework's static renderer produces for the same tree (`<img .../>`,
//! `disabled=""`, `style="color:red"`).

use mdtree_hast::format_number;

use crate::compiler::is_semantic_prop;
use crate::components::is_tag_name;
use crate::element::{Child, CompiledElement, ElementType, PropValue};
use crate::schema::{Space, attribute_name};
use crate::style::css_property_name;

/// Elements without content or closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Render compiled elements to an HTML string.
///
/// # Examples
///
/// ```
/// use mdtree_hast::{Element, Node};
/// use mdtree_renderer::{Options, WarningLog, compile, render_static_markup};
///
/// let tree = Node::root(vec![Node::from(
///     Element::new("h1").with_children(vec![Node::text("Title")]),
/// )]);
/// let compiled = compile(&tree, &Options::new(), &WarningLog::new()).unwrap();
///
/// assert_eq!(render_static_markup(&compiled), "<h1>Title</h1>");
/// ```
#[must_use]
pub fn render_static_markup(children: &[Child]) -> String {
    let mut out = String::with_capacity(1024);
    let mut stack: Vec<Work<'_>> = children
        .iter()
        .rev()
        .map(|child| Work::Borrowed(child, Space::Html))
        .collect();

    while let Some(work) = stack.pop() {
        match work {
            Work::Close(tag) => {
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            Work::Borrowed(Child::Text(text), _) => out.push_str(&escape_html(text)),
            Work::Owned(Child::Text(text), _) => out.push_str(&escape_html(&text)),
            Work::Borrowed(Child::Element(element), space) => {
                if let ElementType::Component { renderer, .. } = &element.element_type {
                    let rendered = renderer.render(&element.props, element.children.clone());
                    stack.extend(rendered.into_iter().rev().map(|c| Work::Owned(c, space)));
                    continue;
                }
                let inner = space.enter(element.tag_name().unwrap_or_default());
                match open_tag(element, inner, &mut out) {
                    Opened::Void => continue,
                    Opened::Tag(close) => stack.push(Work::Close(close)),
                    Opened::Skipped => {}
                }
                stack.extend(
                    element
                        .children
                        .iter()
                        .rev()
                        .map(|child| Work::Borrowed(child, inner)),
                );
            }
            Work::Owned(Child::Element(mut element), space) => {
                if let ElementType::Component { renderer, .. } = &element.element_type {
                    let children = std::mem::take(&mut element.children);
                    let rendered = renderer.render(&element.props, children);
                    stack.extend(rendered.into_iter().rev().map(|c| Work::Owned(c, space)));
                    continue;
                }
                let inner = space.enter(element.tag_name().unwrap_or_default());
                match open_tag(&element, inner, &mut out) {
                    Opened::Void => continue,
                    Opened::Tag(close) => stack.push(Work::Close(close)),
                    Opened::Skipped => {}
                }
                stack.extend(
                    std::mem::take(&mut element.children)
                        .into_iter()
                        .rev()
                        .map(|child| Work::Owned(child, inner)),
                );
            }
        }
    }
    out
}

enum Work<'a> {
    Borrowed(&'a Child, Space),
    /// Output of a custom renderer.
    Owned(Child, Space),
    Close(String),
}

/// Result of writing an opening tag.
enum Opened {
    /// Close with this tag after the children.
    Tag(String),
    /// Void element; no children, no closing tag.
    Void,
    /// Tag name not writable; only the children are rendered.
    Skipped,
}

/// Write the opening tag of `element`.
fn open_tag(element: &CompiledElement, space: Space, out: &mut String) -> Opened {
    let tag = element.tag_name().unwrap_or_default();
    if !is_tag_name(tag) {
        tracing::trace!(tag, "Skipped element with invalid tag name");
        return Opened::Skipped;
    }
    out.push('<');
    out.push_str(tag);
    for (name, value) in &element.props {
        if is_semantic_prop(&element.source_tag, name) {
            continue;
        }
        let value = match value {
            PropValue::Null
            | PropValue::Bool(false)
            | PropValue::Position(_)
            | PropValue::Node(_) => continue,
            PropValue::Bool(true) => String::new(),
            PropValue::Number(n) => format_number(*n),
            PropValue::String(s) => s.clone(),
            PropValue::Style(declarations) => declarations
                .iter()
                .map(|(name, value)| format!("{}:{value}", css_property_name(name)))
                .collect::<Vec<_>>()
                .join(";"),
        };
        let attribute = attribute_name(space, name);
        if !is_attribute_name(&attribute) {
            tracing::trace!(%attribute, "Skipped invalid attribute name");
            continue;
        }
        out.push(' ');
        out.push_str(&attribute);
        out.push_str("=\"");
        out.push_str(&escape_html(&value));
        out.push('"');
    }

    if VOID_ELEMENTS.contains(&tag) {
        out.push_str("/>");
        Opened::Void
    } else {
        out.push('>');
        Opened::Tag(tag.to_owned())
    }
}

/// Whether `name` can be written as an attribute name as-is.
fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            !c.is_whitespace()
                && !c.is_control()
                && !matches!(c, '"' | '\'' | '<' | '>' | '/' | '=' | '&' | '`')
        })
}

/// Escape text for HTML content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(ch),
        }
    }
    result
}
