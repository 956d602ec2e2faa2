//! Inline `style` strings.
//!
//! Only declaration splitting is done here: `a: b; c: d` becomes ordered
//! `(name, value)` pairs. Values are kept as written.

/// Prefixes whose property names are kept verbatim.
const VENDOR_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-", "-khtml-"];

/// Parse an inline style into `(property, value)` pairs.
///
/// Declarations without a colon or with an empty property name are dropped
/// one at a time. Property names become camel case (`font-weight` →
/// `fontWeight`) except vendor-prefixed names and custom properties.
#[must_use]
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    for declaration in style.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        let Some((name, value)) = declaration.split_once(':') else {
            tracing::trace!(declaration, "Dropped style declaration without colon");
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            tracing::trace!(declaration, "Dropped style declaration without property");
            continue;
        }
        declarations.push((style_property_name(name), value.trim().to_owned()));
    }
    declarations
}

/// Camel-case a CSS property name, keeping vendor-prefixed and custom ones.
#[must_use]
pub fn style_property_name(name: &str) -> String {
    if name.starts_with("--") || is_vendor_prefixed(name) {
        return name.to_owned();
    }
    let mut result = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = !result.is_empty();
        } else if upper {
            result.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            result.push(c.to_ascii_lowercase());
        }
    }
    result
}

/// CSS name for a style property produced by [`style_property_name`].
#[must_use]
pub fn css_property_name(name: &str) -> String {
    if name.starts_with('-') {
        return name.to_owned();
    }
    let mut result = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            result.push('-');
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn is_vendor_prefixed(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    VENDOR_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_parse_style_declarations() {
        assert_eq!(
            parse_style("color: red; font-weight: bold"),
            pairs(&[("color", "red"), ("fontWeight", "bold")])
        );
    }

    #[test]
    fn test_parse_style_trailing_semicolon_and_spacing() {
        assert_eq!(
            parse_style("  margin-top :  1em ;; "),
            pairs(&[("marginTop", "1em")])
        );
    }

    #[test]
    fn test_malformed_declarations_dropped_individually() {
        assert_eq!(parse_style("broken"), Vec::<(String, String)>::new());
        assert_eq!(
            parse_style("color: red; broken; : blue; width: 2px"),
            pairs(&[("color", "red"), ("width", "2px")])
        );
    }

    #[test]
    fn test_value_keeps_later_colons() {
        assert_eq!(
            parse_style("background: url(http://x/y.png)"),
            pairs(&[("background", "url(http://x/y.png)")])
        );
    }

    #[test]
    fn test_vendor_prefixes_preserved() {
        assert_eq!(
            parse_style("-webkit-transition: none; -ms-flex: 1; -moz-box-sizing: border-box"),
            pairs(&[
                ("-webkit-transition", "none"),
                ("-ms-flex", "1"),
                ("-moz-box-sizing", "border-box"),
            ])
        );
    }

    #[test]
    fn test_custom_properties_preserved() {
        assert_eq!(parse_style("--main-color: #333"), pairs(&[("--main-color", "#333")]));
    }

    #[test]
    fn test_property_names_lowercased() {
        assert_eq!(style_property_name("Font-Size"), "fontSize");
        assert_eq!(style_property_name("COLOR"), "color");
    }

    #[test]
    fn test_css_property_name_round_trips_names() {
        assert_eq!(css_property_name("fontWeight"), "font-weight");
        assert_eq!(css_property_name("textAlign"), "text-align");
        assert_eq!(css_property_name("-webkit-transition"), "-webkit-transition");
        assert_eq!(css_property_name("--main-color"), "--main-color");
    }
}
