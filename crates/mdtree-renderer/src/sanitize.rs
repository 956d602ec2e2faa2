//! URI sanitization for `href`/`src` values.
//!
//! The default policy keeps references without a scheme (relative paths,
//! protocol-relative `//host`, `?query`, `#fragment`) and the schemes in the
//! allow-list. Any other scheme yields an empty string. Sanitization never
//! fails.
//!
//! Scheme detection sees through obfuscation: character references are
//! resolved and whitespace/control characters are removed before the scheme
//! is read, so `java&#x09;script:`, ` JAVASCRIPT:` and `javascript&colon;`
//! are all recognized.

use std::fmt;
use std::sync::Arc;

use mdtree_hast::Element;

use crate::entities::decode_character_references;

/// Schemes allowed by default.
pub const DEFAULT_PROTOCOLS: &[&str] = &["http", "https", "mailto", "tel"];

/// Caller-supplied URI transform, given the URI and the element carrying it.
pub type UriTransform = Arc<dyn Fn(&str, &Element) -> String + Send + Sync>;

/// Allow-list of URI schemes, stored lowercase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Protocols(Vec<String>);

impl Protocols {
    pub fn new<I, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            protocols
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase())
                .collect(),
        )
    }

    /// Whether `scheme` (already lowercase) is allowed.
    #[must_use]
    pub fn allows(&self, scheme: &str) -> bool {
        self.0.iter().any(|p| p == scheme)
    }
}

impl Default for Protocols {
    fn default() -> Self {
        Self::new(DEFAULT_PROTOCOLS)
    }
}

/// How URI-valued attributes are treated.
#[derive(Clone)]
pub enum UriPolicy {
    /// Keep allow-listed schemes, blank everything else.
    Sanitize(Protocols),
    /// Pass every URI through untouched. Must be chosen explicitly.
    Disabled,
    /// Replace sanitization with a caller-supplied transform.
    Custom(UriTransform),
}

impl UriPolicy {
    /// Wrap a closure as a [`UriPolicy::Custom`] policy.
    pub fn custom<F>(transform: F) -> Self
    where
        F: Fn(&str, &Element) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(transform))
    }

    /// Apply the policy to `uri` found on `element`.
    #[must_use]
    pub fn apply(&self, uri: &str, element: &Element) -> String {
        match self {
            Self::Sanitize(protocols) => sanitize_uri_with(uri, protocols),
            Self::Disabled => uri.to_owned(),
            Self::Custom(transform) => transform(uri, element),
        }
    }
}

impl Default for UriPolicy {
    fn default() -> Self {
        Self::Sanitize(Protocols::default())
    }
}

impl fmt::Debug for UriPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sanitize(protocols) => f.debug_tuple("Sanitize").field(protocols).finish(),
            Self::Disabled => f.write_str("Disabled"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Sanitize `uri` against [`DEFAULT_PROTOCOLS`].
///
/// # Examples
///
/// ```
/// use mdtree_renderer::sanitize_uri;
///
/// assert_eq!(sanitize_uri("https://example.com"), "https://example.com");
/// assert_eq!(sanitize_uri("/docs/guide"), "/docs/guide");
/// assert_eq!(sanitize_uri("JavaScript:alert(1)"), "");
/// ```
#[must_use]
pub fn sanitize_uri(uri: &str) -> String {
    sanitize_uri_with(uri, &Protocols::default())
}

/// Sanitize `uri` against a custom allow-list.
///
/// Allowed URIs are returned verbatim; blocked ones become an empty string.
#[must_use]
pub fn sanitize_uri_with(uri: &str, protocols: &Protocols) -> String {
    match scheme(uri) {
        None => uri.to_owned(),
        Some(scheme) if protocols.allows(&scheme) => uri.to_owned(),
        Some(scheme) => {
            tracing::debug!(scheme = %scheme, "Blocked URI with disallowed scheme");
            String::new()
        }
    }
}

/// Lowercase scheme of `uri`, or `None` for references without one.
///
/// A colon only starts a scheme when no `/`, `?` or `#` precedes it.
fn scheme(uri: &str) -> Option<String> {
    let decoded = decode_character_references(uri);
    let cleaned: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    let colon = cleaned.find(':')?;
    let candidate = &cleaned[..colon];
    if candidate.contains(['/', '?', '#']) {
        return None;
    }
    Some(candidate.to_ascii_lowercase())
}
