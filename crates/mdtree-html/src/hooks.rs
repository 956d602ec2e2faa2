//! Parser hooks: node validity and processing instructions.

use std::fmt;
use std::sync::Arc;

use mdtree_hast::{Element, Node};

/// Predicate on a parsed element; `false` drops it with its subtree.
pub type NodePredicate = Arc<dyn Fn(&Element) -> bool + Send + Sync>;

/// Replaces matching elements once their children are parsed.
///
/// Instructions are tried in order; the first whose `should_process`
/// matches wins.
#[derive(Clone)]
pub struct ProcessingInstruction {
    should_process: NodePredicate,
    process: Arc<dyn Fn(Element) -> Node + Send + Sync>,
}

impl ProcessingInstruction {
    pub fn new<S, P>(should_process: S, process: P) -> Self
    where
        S: Fn(&Element) -> bool + Send + Sync + 'static,
        P: Fn(Element) -> Node + Send + Sync + 'static,
    {
        Self {
            should_process: Arc::new(should_process),
            process: Arc::new(process),
        }
    }

    #[must_use]
    pub fn should_process(&self, element: &Element) -> bool {
        (self.should_process)(element)
    }

    #[must_use]
    pub fn process(&self, element: Element) -> Node {
        (self.process)(element)
    }
}

impl fmt::Debug for ProcessingInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingInstruction").finish_non_exhaustive()
    }
}

/// Hooks an [`HtmlParser`](crate::HtmlParser) must be configured with.
#[derive(Clone)]
pub struct ParserHooks {
    is_valid_node: NodePredicate,
    processing_instructions: Vec<ProcessingInstruction>,
}

impl ParserHooks {
    /// Hooks keeping the elements `is_valid_node` accepts.
    pub fn new<F>(is_valid_node: F) -> Self
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
    {
        Self {
            is_valid_node: Arc::new(is_valid_node),
            processing_instructions: Vec::new(),
        }
    }

    /// Hooks accepting every element, with no processing instructions.
    #[must_use]
    pub fn permissive() -> Self {
        Self::new(|_| true)
    }

    #[must_use]
    pub fn with_instruction(mut self, instruction: ProcessingInstruction) -> Self {
        self.processing_instructions.push(instruction);
        self
    }

    /// Apply the hooks to a finished element; `None` drops it.
    pub(crate) fn finish(&self, element: Element) -> Option<Node> {
        if !(self.is_valid_node)(&element) {
            tracing::trace!(tag = %element.tag_name, "Dropped invalid html node");
            return None;
        }
        let node = match self
            .processing_instructions
            .iter()
            .find(|instruction| instruction.should_process(&element))
        {
            Some(instruction) => instruction.process(element),
            None => Node::Element(element),
        };
        Some(node)
    }
}

impl fmt::Debug for ParserHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserHooks")
            .field("processing_instructions", &self.processing_instructions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_permissive_keeps_elements() {
        let hooks = ParserHooks::permissive();
        assert_eq!(
            hooks.finish(Element::new("span")),
            Some(Node::from(Element::new("span")))
        );
    }

    #[test]
    fn test_invalid_node_dropped() {
        let hooks = ParserHooks::new(|element| element.tag_name != "script");
        assert_eq!(hooks.finish(Element::new("script")), None);
    }

    #[test]
    fn test_first_matching_instruction_wins() {
        let hooks = ParserHooks::permissive()
            .with_instruction(ProcessingInstruction::new(
                |element| element.tag_name == "code",
                |element| {
                    let mut kbd = element;
                    kbd.tag_name = "kbd".to_owned();
                    Node::Element(kbd)
                },
            ))
            .with_instruction(ProcessingInstruction::new(
                |_| true,
                |_| Node::text("replaced"),
            ));

        assert_eq!(
            hooks.finish(Element::new("code")),
            Some(Node::from(Element::new("kbd")))
        );
        assert_eq!(hooks.finish(Element::new("b")), Some(Node::text("replaced")));
    }
}
