//! Lenient HTML fragment parser on top of quick-xml.
//!
//! HTML is not XML, so the reader is configured to tolerate unmatched and
//! mismatched end tags, void elements are closed as soon as they open,
//! attributes are read in HTML mode (valueless and unquoted values), and
//! bare ampersands are escaped before reading. Elements left open at the
//! end of the input are closed there. Anything quick-xml still rejects
//! degrades to one text node with the original markup.

use std::borrow::Cow;
use std::io::BufRead;

use mdtree_hast::{Element, Node, Properties, PropertyValue};
use mdtree_renderer::{FragmentParser, RenderError, decode_character_references};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::hooks::ParserHooks;

/// Elements without content or closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw HTML fragment parser.
///
/// Starts unconfigured; using it before [`configure`](Self::configure) is an
/// error, reported by the renderer before rendering starts.
#[derive(Debug, Default)]
pub struct HtmlParser {
    hooks: Option<ParserHooks>,
}

impl HtmlParser {
    /// Create an unconfigured parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser configured with `hooks`.
    #[must_use]
    pub fn with_hooks(hooks: ParserHooks) -> Self {
        Self { hooks: Some(hooks) }
    }

    /// Configure the parser, replacing any previous hooks.
    pub fn configure(&mut self, hooks: ParserHooks) {
        self.hooks = Some(hooks);
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.hooks.is_some()
    }

    /// Parse an HTML fragment into nodes.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::ParserNotConfigured` if no hooks are configured.
    pub fn parse(&self, html: &str) -> Result<Vec<Node>, RenderError> {
        let hooks = self
            .hooks
            .as_ref()
            .ok_or(RenderError::ParserNotConfigured)?;
        let escaped = escape_bare_ampersands(html);
        let mut reader = Reader::from_str(&escaped);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        match FragmentBuilder::new(hooks).build(&mut reader) {
            Ok(nodes) => Ok(nodes),
            Err(error) => {
                tracing::debug!(%error, "Raw HTML not parsed, keeping it as text");
                Ok(vec![Node::text(html)])
            }
        }
    }
}

impl FragmentParser for HtmlParser {
    fn ensure_configured(&self) -> Result<(), RenderError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(RenderError::ParserNotConfigured)
        }
    }

    fn parse_fragment(&self, html: &str) -> Vec<Node> {
        self.parse(html).unwrap_or_else(|_| vec![Node::text(html)])
    }
}

/// Builds the node list for one fragment.
struct FragmentBuilder<'h> {
    hooks: &'h ParserHooks,
    /// Elements opened and not yet closed, innermost last.
    open: Vec<Element>,
    top: Vec<Node>,
}

impl<'h> FragmentBuilder<'h> {
    fn new(hooks: &'h ParserHooks) -> Self {
        Self {
            hooks,
            open: Vec::new(),
            top: Vec::new(),
        }
    }

    fn build<R: BufRead>(mut self, reader: &mut Reader<R>) -> Result<Vec<Node>, quick_xml::Error> {
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let element = self.start_element(reader, &e);
                    if VOID_ELEMENTS.contains(&element.tag_name.as_str()) {
                        self.finish(element);
                    } else {
                        self.open.push(element);
                    }
                }
                Event::Empty(e) => {
                    let element = self.start_element(reader, &e);
                    self.finish(element);
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e)?;
                    self.append_text(&text);
                }
                Event::GeneralRef(e) => {
                    let entity = reader.decoder().decode(&e)?;
                    let text = decode_character_references(&format!("&{entity};")).into_owned();
                    self.append_text(&text);
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.append_text(&text);
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.push(Node::comment(text));
                }
                Event::End(e) => {
                    let tag = decode_name(reader, e.name().as_ref());
                    self.close(&tag);
                }
                Event::Eof => {
                    while let Some(element) = self.open.pop() {
                        self.finish(element);
                    }
                    return Ok(self.top);
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }
    }

    fn in_svg(&self) -> bool {
        self.open.iter().any(|element| element.tag_name == "svg")
    }

    fn start_element<R: BufRead>(&self, reader: &Reader<R>, e: &BytesStart) -> Element {
        let name = decode_name(reader, e.name().as_ref());
        let tag_name = if self.in_svg() {
            name
        } else {
            name.to_ascii_lowercase()
        };
        let mut element = Element::new(tag_name);
        element.properties = decode_attrs(reader, e);
        element
    }

    /// Close the innermost open element named `tag` and everything opened
    /// inside it. End tags without a matching open element are ignored.
    fn close(&mut self, tag: &str) {
        let Some(index) = self
            .open
            .iter()
            .rposition(|element| element.tag_name.eq_ignore_ascii_case(tag))
        else {
            tracing::trace!(tag, "Ignored unmatched end tag");
            return;
        };
        while self.open.len() > index {
            if let Some(element) = self.open.pop() {
                self.finish(element);
            }
        }
    }

    fn finish(&mut self, element: Element) {
        if let Some(node) = self.hooks.finish(element) {
            self.push(node);
        }
    }

    fn push(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.top.push(node),
        }
    }

    /// Append text, merging with a preceding text node.
    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.top,
        };
        if let Some(Node::Text(last)) = siblings.last_mut() {
            last.value.push_str(text);
        } else {
            siblings.push(Node::text(text));
        }
    }
}

fn decode_name<R: BufRead>(reader: &Reader<R>, name: &[u8]) -> String {
    reader
        .decoder()
        .decode(name)
        .map_or_else(|_| String::from_utf8_lossy(name).into_owned(), Cow::into_owned)
}

/// Attributes in HTML attribute form. Valueless attributes get an empty
/// value; character references in values are decoded.
fn decode_attrs<R: BufRead>(reader: &Reader<R>, e: &BytesStart) -> Properties {
    let mut properties = Properties::new();
    for attr in e.html_attributes().flatten() {
        let key = decode_name(reader, attr.key.as_ref());
        let raw = String::from_utf8_lossy(&attr.value);
        let value = decode_character_references(&raw).into_owned();
        properties.insert(key, PropertyValue::String(value));
    }
    properties
}

/// Escape `&` that does not start a character reference, so the reader
/// accepts text like `fish & chips`.
fn escape_bare_ampersands(html: &str) -> Cow<'_, str> {
    if !html.contains('&') {
        return Cow::Borrowed(html);
    }
    let mut out = String::with_capacity(html.len() + 16);
    let mut rest = html;
    while let Some(index) = rest.find('&') {
        out.push_str(&rest[..index]);
        let after = &rest[index + 1..];
        if starts_with_reference(after) {
            out.push('&');
        } else {
            out.push_str("&amp;");
        }
        rest = after;
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Whether `text` (after an `&`) is `name;`, `#digits;` or `#xhex;`.
fn starts_with_reference(text: &str) -> bool {
    let Some(end) = text.find(';') else {
        return false;
    };
    let body = &text[..end];
    if let Some(number) = body.strip_prefix('#') {
        return match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        };
    }
    let mut chars = body.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::hooks::ProcessingInstruction;
    use mdtree_hast::{Point, Position, Raw};
    use mdtree_renderer::{Options, TreeRenderer, WarningLog};
    use pretty_assertions::assert_eq;

    static_assertions::assert_impl_all!(HtmlParser: Send, Sync);

    fn parser() -> HtmlParser {
        HtmlParser::with_hooks(ParserHooks::permissive())
    }

    fn el(tag: &str, children: Vec<Node>) -> Node {
        Node::from(Element::new(tag).with_children(children))
    }

    #[test]
    fn test_unconfigured_parser_rejected() {
        let parser = HtmlParser::new();
        assert!(!parser.is_configured());
        assert!(matches!(
            parser.parse("<b>x</b>").unwrap_err(),
            RenderError::ParserNotConfigured
        ));
        assert!(parser.ensure_configured().is_err());
    }

    #[test]
    fn test_configure_later() {
        let mut parser = HtmlParser::new();
        parser.configure(ParserHooks::permissive());
        assert!(parser.ensure_configured().is_ok());
    }

    #[test]
    fn test_parse_nested_elements() {
        assert_eq!(
            parser().parse("<p><strong>Bold</strong> text</p>").unwrap(),
            vec![el(
                "p",
                vec![el("strong", vec![Node::text("Bold")]), Node::text(" text")],
            )]
        );
    }

    #[test]
    fn test_parse_attributes() {
        let nodes = parser()
            .parse(r#"<a href="/x?a=1&amp;b=2" class=link data-id='7' download>go</a>"#)
            .unwrap();
        let link = nodes[0].as_element().unwrap();
        assert_eq!(link.property("href"), Some(&PropertyValue::from("/x?a=1&b=2")));
        assert_eq!(link.property("class"), Some(&PropertyValue::from("link")));
        assert_eq!(link.property("data-id"), Some(&PropertyValue::from("7")));
        assert_eq!(link.property("download"), Some(&PropertyValue::from("")));
    }

    #[test]
    fn test_void_elements_need_no_end_tag() {
        assert_eq!(
            parser().parse("a<br>b<img src=x.png>c").unwrap(),
            vec![
                Node::text("a"),
                el("br", vec![]),
                Node::text("b"),
                Node::from(Element::new("img").with_property("src", "x.png")),
                Node::text("c"),
            ]
        );
    }

    #[test]
    fn test_unclosed_elements_closed_at_end() {
        assert_eq!(
            parser().parse("<div><span>open").unwrap(),
            vec![el("div", vec![el("span", vec![Node::text("open")])])]
        );
    }

    #[test]
    fn test_mismatched_end_tags() {
        assert_eq!(
            parser().parse("<div><em>x</div></b>y").unwrap(),
            vec![el("div", vec![el("em", vec![Node::text("x")])]), Node::text("y")]
        );
    }

    #[test]
    fn test_lone_end_tag_ignored() {
        assert_eq!(parser().parse("</details>").unwrap(), Vec::<Node>::new());
    }

    #[test]
    fn test_references_decoded() {
        assert_eq!(
            parser().parse("<p>fish &amp; chips &mdash; &#x41; & more</p>").unwrap(),
            vec![el("p", vec![Node::text("fish & chips \u{2014} A & more")])]
        );
    }

    #[test]
    fn test_comments_kept_as_comment_nodes() {
        assert_eq!(
            parser().parse("<!-- note -->x").unwrap(),
            vec![Node::comment(" note "), Node::text("x")]
        );
    }

    #[test]
    fn test_tag_names_lowercased_outside_svg() {
        let nodes = parser()
            .parse("<DIV><svg viewBox=\"0 0 1 1\"><linearGradient/></svg></DIV>")
            .unwrap();
        let div = nodes[0].as_element().unwrap();
        assert_eq!(div.tag_name, "div");
        let svg = div.children[0].as_element().unwrap();
        assert_eq!(svg.property("viewBox"), Some(&PropertyValue::from("0 0 1 1")));
        assert!(svg.children[0].is_element("linearGradient"));
    }

    #[test]
    fn test_rejected_markup_degrades_to_text() {
        let html = "<p>x<!-- unterminated";
        assert_eq!(parser().parse(html).unwrap(), vec![Node::text(html)]);
    }

    #[test]
    fn test_escape_bare_ampersands() {
        assert_eq!(escape_bare_ampersands("a & b"), "a &amp; b");
        assert_eq!(escape_bare_ampersands("&amp;&#39;&#x27;"), "&amp;&#39;&#x27;");
        assert_eq!(escape_bare_ampersands("&;&#;&x y;"), "&amp;;&amp;#;&amp;x y;");
        assert!(matches!(escape_bare_ampersands("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_validity_hook_drops_subtree() {
        let parser =
            HtmlParser::with_hooks(ParserHooks::new(|element| element.tag_name != "script"));
        assert_eq!(
            parser.parse("<script>alert(1)</script><b>ok</b>").unwrap(),
            vec![el("b", vec![Node::text("ok")])]
        );
    }

    fn code_to_kbd() -> ProcessingInstruction {
        ProcessingInstruction::new(
            |element| element.tag_name == "code",
            |mut element| {
                let children = std::mem::take(&mut element.children);
                Node::from(Element::new("kbd").with_children(children))
            },
        )
    }

    #[test]
    fn test_processing_instruction_sees_children() {
        let parser = HtmlParser::with_hooks(ParserHooks::permissive().with_instruction(code_to_kbd()));
        assert_eq!(
            parser.parse("<p><code>ctrl</code></p>").unwrap(),
            vec![el("p", vec![el("kbd", vec![Node::text("ctrl")])])]
        );
    }

    fn raw_tree(html: &str) -> Node {
        Node::root(vec![Node::from(Element::new("p").with_children(vec![
            Node::text("before "),
            Node::Raw(Raw {
                value: html.to_owned(),
                position: Some(Position::new(Point::new(1, 8), Point::new(1, 30))),
            }),
        ]))])
    }

    #[test]
    fn test_render_with_unconfigured_parser_fails() {
        let renderer = TreeRenderer::new(
            Options::new()
                .with_allow_dangerous_html(true)
                .with_html_parser(Arc::new(HtmlParser::new())),
        );
        let err = renderer
            .render(&raw_tree("<b>x</b>"), &WarningLog::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::ParserNotConfigured));
        assert!(err.to_string().contains("configure it with hooks"));
    }

    #[test]
    fn test_render_raw_html_end_to_end() {
        let parser = HtmlParser::with_hooks(ParserHooks::permissive().with_instruction(code_to_kbd()));
        let renderer = TreeRenderer::new(
            Options::new()
                .with_allow_dangerous_html(true)
                .with_html_parser(Arc::new(parser))
                .with_disallowed_elements(["i"])
                .with_unwrap_disallowed(true)
                .with_source_pos(true),
        );
        let html = renderer
            .render_to_string(
                &raw_tree(r#"<a href="javascript:alert(1)" class="x"><i>hi</i></a> <code>k</code>"#),
                &WarningLog::new(),
            )
            .unwrap();
        assert_eq!(
            html,
            r#"<p>before <a class="x" data-sourcepos="1:8-1:30" href="">hi</a> <kbd data-sourcepos="1:8-1:30">k</kbd></p>"#
        );
    }

    #[test]
    fn test_raw_html_escaped_without_dangerous_flag() {
        let renderer = TreeRenderer::new(
            Options::new().with_html_parser(Arc::new(parser())),
        );
        let html = renderer
            .render_to_string(&raw_tree("<b>x</b>"), &WarningLog::new())
            .unwrap();
        assert_eq!(html, "<p>before &lt;b&gt;x&lt;/b&gt;</p>");
    }
}
