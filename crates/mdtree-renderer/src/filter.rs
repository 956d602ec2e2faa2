//! Node filter: removes or unwraps elements before compilation.
//!
//! Elements are decided pre-order, parent before children. A removed
//! element is either dropped with its subtree or, with `unwrap_disallowed`,
//! replaced by its children, each filtered again under the same rules and
//! spliced in at the element's position. The root is never filtered.
//!
//! Raw HTML nodes are resolved here too: dropped (`skip_html`), parsed into
//! nodes that are filtered like the rest (`allow_dangerous_html` with a
//! fragment parser), or passed on to be rendered as text.
//!
//! The walk uses an explicit stack, so deep input cannot exhaust the call
//! stack. The input tree is never modified; parsed fragments are owned by
//! the filter and their children are moved rather than copied.

use std::mem;

use mdtree_hast::{Element, Node, Position, Raw, Root};

use crate::error::RenderError;
use crate::options::Options;

/// Filter `tree` into a new tree.
///
/// # Errors
///
/// Returns a configuration error if the options are inconsistent (both
/// element lists set, invalid component, unconfigured fragment parser).
pub fn filter(tree: &Node, options: &Options) -> Result<Node, RenderError> {
    options.validate()?;

    let mut stack = vec![Frame::new(Source::Borrowed(tree), Exit::Rebuild(shell(tree)))];
    loop {
        let Some(frame) = stack.last_mut() else {
            return Ok(Node::root(Vec::new()));
        };
        let index = frame.next;
        if index < frame.source.node().children().len() {
            frame.next += 1;
            match decide(&mut frame.source, index, options) {
                Step::Emit(node) => frame.out.push(node),
                Step::Skip => {}
                Step::Descend(source, exit) => stack.push(Frame::new(source, exit)),
            }
            continue;
        }

        let Some(done) = stack.pop() else { continue };
        match (done.exit, stack.last_mut()) {
            (Exit::Rebuild(node), Some(parent)) => parent.out.push(with_children(node, done.out)),
            (Exit::Rebuild(node), None) => return Ok(with_children(node, done.out)),
            (Exit::Splice, Some(parent)) => parent.out.extend(done.out),
            (Exit::Splice, None) => return Ok(Node::root(done.out)),
        }
    }
}

/// Node whose children are being filtered.
enum Source<'a> {
    Borrowed(&'a Node),
    /// Parsed raw HTML or a subtree of it. Children are moved out as they
    /// are visited, so element verdicts are taken while it is still intact.
    Owned { node: Node, verdicts: Vec<bool> },
}

impl Source<'_> {
    fn owned(node: Node, options: &Options) -> Self {
        let verdicts = node
            .children()
            .iter()
            .enumerate()
            .map(|(index, child)| {
                child
                    .as_element()
                    .is_none_or(|element| allows(element, index, &node, options))
            })
            .collect();
        Self::Owned { node, verdicts }
    }

    fn node(&self) -> &Node {
        match self {
            Self::Borrowed(node) => node,
            Self::Owned { node, .. } => node,
        }
    }
}

/// What happens to a frame's filtered children once it is done.
enum Exit {
    /// Attach them to this childless copy of the node.
    Rebuild(Node),
    /// Splice them into the parent's children.
    Splice,
}

struct Frame<'a> {
    source: Source<'a>,
    next: usize,
    out: Vec<Node>,
    exit: Exit,
}

impl<'a> Frame<'a> {
    fn new(source: Source<'a>, exit: Exit) -> Self {
        Self {
            source,
            next: 0,
            out: Vec::new(),
            exit,
        }
    }
}

enum Step<'a> {
    Emit(Node),
    Skip,
    Descend(Source<'a>, Exit),
}

/// Decide the child at `index` of `source`.
fn decide<'a>(source: &mut Source<'a>, index: usize, options: &Options) -> Step<'a> {
    match source {
        Source::Borrowed(parent) => decide_borrowed(*parent, index, options),
        Source::Owned { node, verdicts } => {
            let allowed = verdicts[index];
            decide_owned(take_child(node, index), allowed, options)
        }
    }
}

fn decide_borrowed<'a>(parent: &'a Node, index: usize, options: &Options) -> Step<'a> {
    let child = &parent.children()[index];
    match child {
        Node::Text(_) | Node::Comment(_) => Step::Emit(child.clone()),
        Node::Raw(raw) => decide_raw(raw, options),
        Node::Root(_) => Step::Descend(Source::Borrowed(child), Exit::Splice),
        Node::Element(element) => {
            let allowed = allows(element, index, parent, options);
            match element_exit(element, allowed, options) {
                Some(exit) => Step::Descend(Source::Borrowed(child), exit),
                None => Step::Skip,
            }
        }
    }
}

fn decide_owned<'a>(child: Node, allowed: bool, options: &Options) -> Step<'a> {
    match child {
        Node::Text(_) | Node::Comment(_) => Step::Emit(child),
        Node::Raw(raw) => decide_raw(&raw, options),
        Node::Root(_) => Step::Descend(Source::owned(child, options), Exit::Splice),
        Node::Element(element) => match element_exit(&element, allowed, options) {
            Some(exit) => Step::Descend(Source::owned(Node::Element(element), options), exit),
            None => Step::Skip,
        },
    }
}

/// Whether the lists and `allow_element` keep `element`, the child at
/// `index` of `parent`.
fn allows(element: &Element, index: usize, parent: &Node, options: &Options) -> bool {
    options.list_allows(&element.tag_name)
        && options
            .allow_element
            .as_ref()
            .is_none_or(|allow| allow(element, index, parent))
}

/// How a decided element leaves its frame, or `None` to drop it.
fn element_exit(element: &Element, allowed: bool, options: &Options) -> Option<Exit> {
    if allowed {
        Some(Exit::Rebuild(Node::Element(element.shallow_clone())))
    } else if options.unwrap_disallowed {
        tracing::trace!(tag = %element.tag_name, "Unwrapping disallowed element");
        Some(Exit::Splice)
    } else {
        tracing::trace!(tag = %element.tag_name, "Dropping disallowed element");
        None
    }
}

/// Move the child at `index` out of `node`, leaving an empty text node.
fn take_child(node: &mut Node, index: usize) -> Node {
    let children = match node {
        Node::Root(root) => &mut root.children,
        Node::Element(element) => &mut element.children,
        Node::Text(_) | Node::Comment(_) | Node::Raw(_) => return Node::text(""),
    };
    mem::replace(&mut children[index], Node::text(""))
}

fn decide_raw<'a>(raw: &Raw, options: &Options) -> Step<'a> {
    if options.skip_html {
        return Step::Skip;
    }
    match options.active_parser() {
        Some(parser) => {
            let mut nodes = parser.parse_fragment(&raw.value);
            if let Some(position) = raw.position {
                for node in &mut nodes {
                    inherit_position(node, position);
                }
            }
            Step::Descend(Source::owned(Node::root(nodes), options), Exit::Splice)
        }
        None => Step::Emit(Node::Raw(raw.clone())),
    }
}

/// Set `position` on `node` unless it already has one.
fn inherit_position(node: &mut Node, position: Position) {
    let slot = match node {
        Node::Root(root) => &mut root.position,
        Node::Element(element) => &mut element.position,
        Node::Text(text) => &mut text.position,
        Node::Comment(comment) => &mut comment.position,
        Node::Raw(raw) => &mut raw.position,
    };
    slot.get_or_insert(position);
}

/// Copy of `node` without children.
fn shell(node: &Node) -> Node {
    match node {
        Node::Root(root) => Node::Root(Root {
            children: Vec::new(),
            position: root.position,
        }),
        Node::Element(element) => Node::Element(element.shallow_clone()),
        leaf => leaf.clone(),
    }
}

fn with_children(mut node: Node, children: Vec<Node>) -> Node {
    match &mut node {
        Node::Root(root) => root.children = children,
        Node::Element(element) => element.children = children,
        Node::Text(_) | Node::Comment(_) | Node::Raw(_) => {}
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentParser;
    use mdtree_hast::{Element, Point};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn el(tag: &str, children: Vec<Node>) -> Node {
        Node::from(Element::new(tag).with_children(children))
    }

    fn text(value: &str) -> Node {
        Node::text(value)
    }

    /// `<p>a <em>b <strong>c</strong></em> d</p>`
    fn sample() -> Node {
        Node::root(vec![el(
            "p",
            vec![
                text("a "),
                el("em", vec![text("b "), el("strong", vec![text("c")])]),
                text(" d"),
            ],
        )])
    }

    /// Tag names in pre-order.
    fn tags(node: &Node) -> Vec<String> {
        let mut tags = Vec::new();
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            if let Some(element) = node.as_element() {
                tags.push(element.tag_name.clone());
            }
            stack.extend(node.children().iter().rev());
        }
        tags
    }

    #[test]
    fn test_no_rules_keeps_everything() {
        let tree = sample();
        assert_eq!(filter(&tree, &Options::new()).unwrap(), tree);
    }

    #[test]
    fn test_disallowed_dropped_with_subtree() {
        let options = Options::new().with_disallowed_elements(["em"]);
        let filtered = filter(&sample(), &options).unwrap();
        assert_eq!(
            filtered,
            Node::root(vec![el("p", vec![text("a "), text(" d")])])
        );
    }

    #[test]
    fn test_unwrap_splices_children_in_place() {
        let options = Options::new()
            .with_disallowed_elements(["em"])
            .with_unwrap_disallowed(true);
        let filtered = filter(&sample(), &options).unwrap();
        assert_eq!(
            filtered,
            Node::root(vec![el(
                "p",
                vec![
                    text("a "),
                    text("b "),
                    el("strong", vec![text("c")]),
                    text(" d"),
                ],
            )])
        );
    }

    #[test]
    fn test_unwrap_refilters_nested_disallowed() {
        let options = Options::new()
            .with_disallowed_elements(["em", "strong"])
            .with_unwrap_disallowed(true);
        let filtered = filter(&sample(), &options).unwrap();
        assert_eq!(
            filtered,
            Node::root(vec![el(
                "p",
                vec![text("a "), text("b "), text("c"), text(" d")],
            )])
        );
    }

    #[test]
    fn test_allowed_list_keeps_root() {
        let options = Options::new().with_allowed_elements(["p", "strong"]);
        let filtered = filter(&sample(), &options).unwrap();
        assert!(matches!(filtered, Node::Root(_)));
        assert_eq!(tags(&filtered), vec!["p"]);
    }

    #[test]
    fn test_both_lists_rejected() {
        let options = Options::new()
            .with_allowed_elements(["p"])
            .with_disallowed_elements(["em"]);
        assert!(matches!(
            filter(&sample(), &options).unwrap_err(),
            RenderError::ConflictingElementFilters
        ));
    }

    #[test]
    fn test_allow_element_receives_index_and_parent() {
        let tree = Node::root(vec![el(
            "ul",
            vec![
                text("\n"),
                el("li", vec![text("one")]),
                text("\n"),
                el("li", vec![text("two")]),
            ],
        )]);
        let options = Options::new().with_allow_element(|element, index, parent| {
            element.tag_name != "li" || (parent.is_element("ul") && index == 1)
        });
        let filtered = filter(&tree, &options).unwrap();
        assert_eq!(
            filtered,
            Node::root(vec![el(
                "ul",
                vec![text("\n"), el("li", vec![text("one")]), text("\n")],
            )])
        );
    }

    #[test]
    fn test_allow_element_combines_with_lists() {
        let options = Options::new()
            .with_disallowed_elements(["strong"])
            .with_allow_element(|element, _, _| element.tag_name != "em")
            .with_unwrap_disallowed(true);
        let filtered = filter(&sample(), &options).unwrap();
        assert_eq!(tags(&filtered), vec!["p"]);
    }

    #[test]
    fn test_allow_element_parent_is_unwrapped_element() {
        let options = Options::new()
            .with_disallowed_elements(["em"])
            .with_unwrap_disallowed(true)
            .with_allow_element(|element, _, parent| {
                element.tag_name != "strong" || !parent.is_element("em")
            });
        let filtered = filter(&sample(), &options).unwrap();
        assert_eq!(tags(&filtered), vec!["p"]);
    }

    #[test]
    fn test_comments_survive_filtering() {
        let tree = Node::root(vec![Node::comment("note"), el("p", vec![])]);
        let filtered = filter(&tree, &Options::new()).unwrap();
        assert_eq!(filtered.children()[0], Node::comment("note"));
    }

    #[test]
    fn test_input_tree_unchanged() {
        let tree = sample();
        let copy = tree.clone();
        let _ = filter(&tree, &Options::new().with_disallowed_elements(["em"])).unwrap();
        assert_eq!(tree, copy);
    }

    struct BoldParser;

    impl FragmentParser for BoldParser {
        fn ensure_configured(&self) -> Result<(), RenderError> {
            Ok(())
        }

        fn parse_fragment(&self, html: &str) -> Vec<Node> {
            vec![
                el("b", vec![text(html)]),
                el("i", vec![text("!")]),
            ]
        }
    }

    fn raw_tree() -> Node {
        let position = Position::new(Point::new(3, 1), Point::new(3, 9));
        Node::root(vec![Node::Raw(Raw {
            value: "<b>x</b>".to_owned(),
            position: Some(position),
        })])
    }

    #[test]
    fn test_raw_skipped() {
        let options = Options::new()
            .with_skip_html(true)
            .with_allow_dangerous_html(true)
            .with_html_parser(Arc::new(BoldParser));
        assert_eq!(filter(&raw_tree(), &options).unwrap(), Node::root(vec![]));
    }

    #[test]
    fn test_raw_kept_without_parser() {
        let options = Options::new().with_allow_dangerous_html(true);
        assert_eq!(filter(&raw_tree(), &options).unwrap(), raw_tree());
    }

    #[test]
    fn test_raw_parsed_and_filtered() {
        let options = Options::new()
            .with_allow_dangerous_html(true)
            .with_html_parser(Arc::new(BoldParser))
            .with_disallowed_elements(["i"]);
        let filtered = filter(&raw_tree(), &options).unwrap();

        assert_eq!(tags(&filtered), vec!["b"]);
        let bold = filtered.children()[0].as_element().unwrap();
        assert_eq!(
            bold.position,
            Some(Position::new(Point::new(3, 1), Point::new(3, 9)))
        );
        assert_eq!(bold.children, vec![text("<b>x</b>")]);
    }

    #[test]
    fn test_raw_fragment_parent_is_synthetic_root() {
        let options = Options::new()
            .with_allow_dangerous_html(true)
            .with_html_parser(Arc::new(BoldParser))
            .with_allow_element(|element, index, parent| {
                element.tag_name != "b" || (matches!(parent, Node::Root(_)) && index == 0)
            });
        let filtered = filter(&raw_tree(), &options).unwrap();
        assert_eq!(tags(&filtered), vec!["b", "i"]);
    }

    /// Parses any input into `<ul><li>a</li><li>b</li></ul>`.
    struct ListParser;

    impl FragmentParser for ListParser {
        fn ensure_configured(&self) -> Result<(), RenderError> {
            Ok(())
        }

        fn parse_fragment(&self, _html: &str) -> Vec<Node> {
            vec![el(
                "ul",
                vec![el("li", vec![text("a")]), el("li", vec![text("b")])],
            )]
        }
    }

    #[test]
    fn test_raw_fragment_siblings_visible_to_allow_element() {
        let options = Options::new()
            .with_allow_dangerous_html(true)
            .with_html_parser(Arc::new(ListParser))
            .with_allow_element(|element, _, parent| {
                element.tag_name != "li"
                    || parent
                        .children()
                        .iter()
                        .filter(|child| child.is_element("li"))
                        .count()
                        == 2
            });
        let filtered = filter(&raw_tree(), &options).unwrap();
        assert_eq!(tags(&filtered), vec!["ul", "li", "li"]);
        assert_eq!(filtered.children()[0].children()[1], el("li", vec![text("b")]));
    }

    /// Parses any input into `depth` nested `div`s.
    struct DeepParser(usize);

    impl FragmentParser for DeepParser {
        fn ensure_configured(&self) -> Result<(), RenderError> {
            Ok(())
        }

        fn parse_fragment(&self, _html: &str) -> Vec<Node> {
            let mut node = text("leaf");
            for _ in 0..self.0 {
                node = el("div", vec![node]);
            }
            vec![node]
        }
    }

    #[test]
    fn test_deep_raw_fragment_filtered() {
        let options = Options::new()
            .with_allow_dangerous_html(true)
            .with_html_parser(Arc::new(DeepParser(50_000)))
            .with_disallowed_elements(["span"]);
        let filtered = filter(&raw_tree(), &options).unwrap();
        let mut depth = 0;
        let mut current = &filtered;
        while let Some(child) = current.children().first() {
            depth += 1;
            current = child;
        }
        assert_eq!(depth, 50_001);
        assert_eq!(current, &text("leaf"));
    }
}
