//! Component registry: which renderer each tag compiles to.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::element::{Child, ElementType, Props};
use crate::error::RenderError;

/// Custom renderer for an element.
///
/// Receives the compiled props (including the semantic props and, for
/// custom renderers only, `node` and optional `index`/`siblingCount`/
/// `sourcePosition`) plus the compiled children, and returns what to
/// render in the element's place.
pub trait Render: Send + Sync {
    fn render(&self, props: &Props, children: Vec<Child>) -> Vec<Child>;
}

impl<F> Render for F
where
    F: Fn(&Props, Vec<Child>) -> Vec<Child> + Send + Sync,
{
    fn render(&self, props: &Props, children: Vec<Child>) -> Vec<Child> {
        self(props, children)
    }
}

/// Registry entry.
#[derive(Clone)]
pub enum Component {
    /// Render as another plain tag.
    Tag(String),
    /// Render through a custom renderer.
    Custom(Arc<dyn Render>),
}

impl Component {
    /// Wrap a renderer as a [`Component::Custom`] entry.
    pub fn custom<R: Render + 'static>(renderer: R) -> Self {
        Self::Custom(Arc::new(renderer))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for Component {
    fn from(tag: &str) -> Self {
        Self::Tag(tag.to_owned())
    }
}

impl From<String> for Component {
    fn from(tag: String) -> Self {
        Self::Tag(tag)
    }
}

/// Mapping from source tag name to [`Component`].
///
/// Tags without an entry render as themselves.
#[derive(Clone, Debug, Default)]
pub struct Components {
    entries: HashMap<String, Component>,
}

impl Components {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component` for `tag`, replacing any previous entry.
    pub fn insert(&mut self, tag: impl Into<String>, component: impl Into<Component>) {
        self.entries.insert(tag.into(), component.into());
    }

    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, component: impl Into<Component>) -> Self {
        self.insert(tag, component);
        self
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Component> {
        self.entries.get(tag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry is a custom renderer.
    #[must_use]
    pub fn has_custom(&self) -> bool {
        self.entries
            .values()
            .any(|component| matches!(component, Component::Custom(_)))
    }

    /// Check that every plain-tag entry is a usable tag name.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidComponent` naming the first offending tag.
    pub fn validate(&self) -> Result<(), RenderError> {
        let mut tags: Vec<_> = self.entries.keys().collect();
        tags.sort();
        for tag in tags {
            if let Some(Component::Tag(name)) = self.entries.get(tag)
                && !is_tag_name(name)
            {
                return Err(RenderError::InvalidComponent { tag: tag.clone() });
            }
        }
        Ok(())
    }

    /// Element type `tag` compiles to.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidComponent` if the entry is not a tag name.
    pub fn resolve(&self, tag: &str) -> Result<ElementType, RenderError> {
        match self.entries.get(tag) {
            None => Ok(ElementType::Tag(tag.to_owned())),
            Some(Component::Tag(name)) if is_tag_name(name) => Ok(ElementType::Tag(name.clone())),
            Some(Component::Tag(_)) => Err(RenderError::InvalidComponent {
                tag: tag.to_owned(),
            }),
            Some(Component::Custom(renderer)) => Ok(ElementType::Component {
                name: tag.to_owned(),
                renderer: Arc::clone(renderer),
            }),
        }
    }
}

impl From<&BTreeMap<String, String>> for Components {
    fn from(map: &BTreeMap<String, String>) -> Self {
        let mut components = Self::new();
        for (tag, name) in map {
            components.insert(tag.clone(), name.clone());
        }
        components
    }
}

/// Whether `name` can be emitted as a tag: an ASCII letter followed by
/// letters, digits, `-` or `:`.
pub(crate) fn is_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unregistered_tag_resolves_to_itself() {
        let components = Components::new();
        assert_eq!(
            components.resolve("p").unwrap(),
            ElementType::Tag("p".to_owned())
        );
    }

    #[test]
    fn test_tag_override() {
        let components = Components::new().with("b", "strong");
        assert_eq!(
            components.resolve("b").unwrap(),
            ElementType::Tag("strong".to_owned())
        );
    }

    #[test]
    fn test_custom_renderer_keeps_registered_name() {
        let components = Components::new().with(
            "h1",
            Component::custom(|_: &Props, children: Vec<Child>| children),
        );
        let resolved = components.resolve("h1").unwrap();
        assert!(resolved.is_component());
        assert_eq!(resolved.name(), "h1");
        assert!(components.has_custom());
        assert!(!Components::new().with("b", "strong").has_custom());
    }

    #[test]
    fn test_invalid_entry_names_the_tag() {
        let components = Components::new().with("h1", "");
        let err = components.resolve("h1").unwrap_err();
        assert!(matches!(err, RenderError::InvalidComponent { ref tag } if tag == "h1"));
        assert!(err.to_string().contains("Component for name `h1`"));
    }

    #[test]
    fn test_validate_rejects_non_tag_names() {
        for bad in ["", "1h", "a b", "<b>"] {
            let components = Components::new().with("x", bad);
            assert!(components.validate().is_err(), "{bad:?} should be rejected");
        }
        assert!(
            Components::new()
                .with("x", "my-element")
                .with("y", "svg:rect")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_from_config_map() {
        let mut map = BTreeMap::new();
        map.insert("i".to_owned(), "em".to_owned());
        let components = Components::from(&map);
        assert_eq!(
            components.resolve("i").unwrap(),
            ElementType::Tag("em".to_owned())
        );
    }
}
