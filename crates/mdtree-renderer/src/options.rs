//! Render options.
//!
//! Built programmatically with the `with_*` builder methods, or bridged from
//! a file configuration with [`Options::from_config`]. Function-valued
//! options (element predicate, URI transforms, dynamic link targets, custom
//! renderers, fragment parser) exist only here.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use mdtree_config::{Config, DeprecatedKey};
use mdtree_hast::{Element, Node};

use crate::components::{Component, Components};
use crate::error::RenderError;
use crate::fragment::FragmentParser;
use crate::sanitize::UriPolicy;

/// Predicate deciding whether an element is kept: `(element, index, parent)`.
pub type AllowElement = Arc<dyn Fn(&Element, usize, &Node) -> bool + Send + Sync>;

/// Dynamic link target: `(href, element)`, `None` for no `target`.
pub type LinkTargetFn = Arc<dyn Fn(&str, &Element) -> Option<String> + Send + Sync>;

/// `target` attribute for links.
#[derive(Clone)]
pub enum LinkTarget {
    Fixed(String),
    Dynamic(LinkTargetFn),
}

impl LinkTarget {
    /// Target for a link with `href`.
    #[must_use]
    pub fn resolve(&self, href: &str, element: &Element) -> Option<String> {
        match self {
            Self::Fixed(target) => Some(target.clone()),
            Self::Dynamic(target) => target(href, element),
        }
    }
}

impl fmt::Debug for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(target) => f.debug_tuple("Fixed").field(target).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Options for filtering and compiling a tree.
#[derive(Clone, Default)]
pub struct Options {
    pub(crate) allowed_elements: Option<HashSet<String>>,
    pub(crate) disallowed_elements: Option<HashSet<String>>,
    pub(crate) allow_element: Option<AllowElement>,
    pub(crate) unwrap_disallowed: bool,
    pub(crate) link_uri: UriPolicy,
    pub(crate) image_uri: UriPolicy,
    pub(crate) link_target: Option<LinkTarget>,
    pub(crate) source_pos: bool,
    pub(crate) raw_source_pos: bool,
    pub(crate) skip_html: bool,
    pub(crate) allow_dangerous_html: bool,
    pub(crate) include_element_index: bool,
    pub(crate) class_name: Option<String>,
    pub(crate) components: Components,
    pub(crate) html_parser: Option<Arc<dyn FragmentParser>>,
    pub(crate) deprecated: Vec<DeprecatedKey>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge a file configuration.
    ///
    /// `transform_*_uri = false` disables the corresponding sanitization.
    /// Deprecated keys present in `config` are warned about on render.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let disabled_or_default = |enabled: bool| {
            if enabled {
                UriPolicy::default()
            } else {
                UriPolicy::Disabled
            }
        };
        Self {
            allowed_elements: config
                .allowed_elements
                .as_ref()
                .map(|tags| tags.iter().cloned().collect()),
            disallowed_elements: config
                .disallowed_elements
                .as_ref()
                .map(|tags| tags.iter().cloned().collect()),
            unwrap_disallowed: config.unwrap_disallowed,
            link_uri: disabled_or_default(config.transform_link_uri),
            image_uri: disabled_or_default(config.transform_image_uri),
            link_target: config.link_target.clone().map(LinkTarget::Fixed),
            source_pos: config.source_pos,
            raw_source_pos: config.raw_source_pos,
            skip_html: config.skip_html,
            allow_dangerous_html: config.allow_dangerous_html(),
            include_element_index: config.include_element_index,
            class_name: config.class_name.clone(),
            components: Components::from(&config.components_resolved),
            deprecated: config.deprecated_keys(),
            ..Self::default()
        }
    }

    /// Keep only these tags.
    #[must_use]
    pub fn with_allowed_elements<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_elements = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Remove these tags.
    #[must_use]
    pub fn with_disallowed_elements<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed_elements = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Additional predicate an element must pass to be kept.
    #[must_use]
    pub fn with_allow_element<F>(mut self, allow: F) -> Self
    where
        F: Fn(&Element, usize, &Node) -> bool + Send + Sync + 'static,
    {
        self.allow_element = Some(Arc::new(allow));
        self
    }

    /// Keep the children of removed elements.
    #[must_use]
    pub fn with_unwrap_disallowed(mut self, unwrap: bool) -> Self {
        self.unwrap_disallowed = unwrap;
        self
    }

    /// Policy for `href`/`xlinkHref`.
    #[must_use]
    pub fn with_link_uri(mut self, policy: UriPolicy) -> Self {
        self.link_uri = policy;
        self
    }

    /// Policy for `src`.
    #[must_use]
    pub fn with_image_uri(mut self, policy: UriPolicy) -> Self {
        self.image_uri = policy;
        self
    }

    #[must_use]
    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = Some(LinkTarget::Fixed(target.into()));
        self
    }

    #[must_use]
    pub fn with_link_target_fn<F>(mut self, target: F) -> Self
    where
        F: Fn(&str, &Element) -> Option<String> + Send + Sync + 'static,
    {
        self.link_target = Some(LinkTarget::Dynamic(Arc::new(target)));
        self
    }

    /// Render `data-sourcepos` on plain tags.
    #[must_use]
    pub fn with_source_pos(mut self, enabled: bool) -> Self {
        self.source_pos = enabled;
        self
    }

    /// Pass `sourcePosition` to custom renderers.
    #[must_use]
    pub fn with_raw_source_pos(mut self, enabled: bool) -> Self {
        self.raw_source_pos = enabled;
        self
    }

    /// Drop raw HTML nodes.
    #[must_use]
    pub fn with_skip_html(mut self, skip: bool) -> Self {
        self.skip_html = skip;
        self
    }

    /// Parse raw HTML nodes with the fragment parser.
    #[must_use]
    pub fn with_allow_dangerous_html(mut self, allow: bool) -> Self {
        self.allow_dangerous_html = allow;
        self
    }

    /// Inverse of [`Options::with_allow_dangerous_html`].
    #[deprecated(note = "use `with_allow_dangerous_html` instead")]
    #[must_use]
    pub fn with_escape_html(mut self, escape: bool) -> Self {
        self.allow_dangerous_html = !escape;
        if !self.deprecated.contains(&DeprecatedKey::EscapeHtml) {
            self.deprecated.push(DeprecatedKey::EscapeHtml);
        }
        self
    }

    /// Pass `index`/`siblingCount` to custom renderers.
    #[must_use]
    pub fn with_include_element_index(mut self, include: bool) -> Self {
        self.include_element_index = include;
        self
    }

    /// Wrap output in a `div` with this class.
    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn with_components(mut self, components: Components) -> Self {
        self.components = components;
        self
    }

    /// Register a single component.
    #[must_use]
    pub fn with_component(mut self, tag: impl Into<String>, component: impl Into<Component>) -> Self {
        self.components.insert(tag, component);
        self
    }

    #[must_use]
    pub fn with_html_parser(mut self, parser: Arc<dyn FragmentParser>) -> Self {
        self.html_parser = Some(parser);
        self
    }

    #[must_use]
    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Check option combinations before any node is processed.
    ///
    /// # Errors
    ///
    /// - `ConflictingElementFilters` if both element lists are set
    /// - `InvalidComponent` for a registry entry that is not a tag name
    /// - `ParserNotConfigured` if raw HTML is allowed and the parser has no hooks
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.allowed_elements.is_some() && self.disallowed_elements.is_some() {
            return Err(RenderError::ConflictingElementFilters);
        }
        self.components.validate()?;
        if self.allow_dangerous_html
            && !self.skip_html
            && let Some(parser) = &self.html_parser
        {
            parser.ensure_configured()?;
        }
        Ok(())
    }

    /// Whether `tag` passes the allow/disallow lists.
    pub(crate) fn list_allows(&self, tag: &str) -> bool {
        if let Some(allowed) = &self.allowed_elements {
            allowed.contains(tag)
        } else if let Some(disallowed) = &self.disallowed_elements {
            !disallowed.contains(tag)
        } else {
            true
        }
    }

    /// Parser for raw HTML when raw HTML is parsed.
    pub(crate) fn active_parser(&self) -> Option<&dyn FragmentParser> {
        if self.allow_dangerous_html && !self.skip_html {
            self.html_parser.as_deref()
        } else {
            None
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("allowed_elements", &self.allowed_elements)
            .field("disallowed_elements", &self.disallowed_elements)
            .field("allow_element", &self.allow_element.as_ref().map(|_| ".."))
            .field("unwrap_disallowed", &self.unwrap_disallowed)
            .field("link_uri", &self.link_uri)
            .field("image_uri", &self.image_uri)
            .field("link_target", &self.link_target)
            .field("source_pos", &self.source_pos)
            .field("raw_source_pos", &self.raw_source_pos)
            .field("skip_html", &self.skip_html)
            .field("allow_dangerous_html", &self.allow_dangerous_html)
            .field("include_element_index", &self.include_element_index)
            .field("class_name", &self.class_name)
            .field("components", &self.components)
            .field("html_parser", &self.html_parser.as_ref().map(|_| ".."))
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdtree_config::Config;

    struct Unconfigured;

    impl FragmentParser for Unconfigured {
        fn ensure_configured(&self) -> Result<(), RenderError> {
            Err(RenderError::ParserNotConfigured)
        }

        fn parse_fragment(&self, html: &str) -> Vec<Node> {
            vec![Node::text(html)]
        }
    }

    #[test]
    fn test_both_lists_rejected() {
        let options = Options::new()
            .with_allowed_elements(["p"])
            .with_disallowed_elements(["a"]);
        let err = options.validate().unwrap_err();
        assert!(matches!(err, RenderError::ConflictingElementFilters));
        assert!(err.to_string().contains("Only one of"));
    }

    #[test]
    fn test_list_rules() {
        let allow = Options::new().with_allowed_elements(["p", "em"]);
        assert!(allow.list_allows("em"));
        assert!(!allow.list_allows("strong"));

        let deny = Options::new().with_disallowed_elements(["em"]);
        assert!(!deny.list_allows("em"));
        assert!(deny.list_allows("strong"));

        assert!(Options::new().list_allows("anything"));
    }

    #[test]
    fn test_unconfigured_parser_rejected_only_when_used() {
        let parser: Arc<dyn FragmentParser> = Arc::new(Unconfigured);
        let unused = Options::new().with_html_parser(Arc::clone(&parser));
        assert!(unused.validate().is_ok());

        let used = Options::new()
            .with_html_parser(Arc::clone(&parser))
            .with_allow_dangerous_html(true);
        assert!(matches!(
            used.validate().unwrap_err(),
            RenderError::ParserNotConfigured
        ));

        let skipped = used.with_skip_html(true);
        assert!(skipped.validate().is_ok());
        assert!(skipped.active_parser().is_none());
    }

    #[test]
    fn test_invalid_component_rejected() {
        let options = Options::new().with_component("h1", "not a tag");
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("Component for name `h1`"));
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_toml_str(
            r#"
disallowed_elements = ["em"]
unwrap_disallowed = true
transform_image_uri = false
link_target = "_blank"
escape_html = false

[components]
b = "strong"
"#,
        )
        .unwrap();
        let options = Options::from_config(&config);

        assert!(!options.list_allows("em"));
        assert!(options.unwrap_disallowed);
        assert!(matches!(options.link_uri, UriPolicy::Sanitize(_)));
        assert!(matches!(options.image_uri, UriPolicy::Disabled));
        assert!(matches!(options.link_target, Some(LinkTarget::Fixed(ref t)) if t == "_blank"));
        assert!(options.allow_dangerous_html);
        assert_eq!(options.deprecated, vec![DeprecatedKey::EscapeHtml]);
        assert!(matches!(options.components.get("b"), Some(Component::Tag(t)) if t == "strong"));
    }

    #[test]
    #[allow(deprecated)]
    fn test_escape_html_builder_records_deprecation() {
        let options = Options::new().with_escape_html(false).with_escape_html(false);
        assert!(options.allow_dangerous_html);
        assert_eq!(options.deprecated, vec![DeprecatedKey::EscapeHtml]);
    }

    #[test]
    fn test_dynamic_link_target() {
        let target = LinkTarget::Dynamic(Arc::new(|href: &str, _: &Element| {
            href.starts_with("http").then(|| "_blank".to_owned())
        }));
        let element = Element::new("a");
        assert_eq!(
            target.resolve("https://x", &element),
            Some("_blank".to_owned())
        );
        assert_eq!(target.resolve("/local", &element), None);
    }
}
