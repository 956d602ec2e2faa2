//! Property schema: markup property names to UI property names.
//!
//! Incoming properties arrive either camel-cased (`className`, `htmlFor`,
//! `strokeWidth`, `dataFooBar`) from the upstream converter or as raw HTML
//! attribute names (`class`, `for`, `stroke-width`, `data-foo-bar`) from the
//! fragment parser. Both resolve through case-insensitive tables to one
//! entry, which names the UI property and how the value is converted.
//!
//! `data-*`/`aria-*` attributes bypass the tables and come out in their
//! hyphenated attribute form. Anything else not in the tables is dropped.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use mdtree_hast::{Properties, PropertyValue};

use crate::element::{PropValue, Props};
use crate::style::parse_style;

/// Schema space an element is mapped in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Space {
    #[default]
    Html,
    Svg,
}

/// Element names that only exist in SVG.
const SVG_ELEMENTS: &[&str] = &[
    "animate",
    "animateMotion",
    "animateTransform",
    "circle",
    "clipPath",
    "defs",
    "desc",
    "ellipse",
    "feBlend",
    "feColorMatrix",
    "feComposite",
    "feGaussianBlur",
    "feOffset",
    "filter",
    "foreignObject",
    "g",
    "line",
    "linearGradient",
    "marker",
    "mask",
    "metadata",
    "path",
    "pattern",
    "polygon",
    "polyline",
    "radialGradient",
    "rect",
    "stop",
    "svg",
    "switch",
    "symbol",
    "text",
    "textPath",
    "tspan",
    "use",
    "view",
];

impl Space {
    /// Space for an element with `tag` appearing in this space.
    #[must_use]
    pub fn enter(self, tag: &str) -> Self {
        if tag == "svg" { Self::Svg } else { self }
    }

    /// Space for a standalone element: SVG for SVG-only element names,
    /// HTML otherwise.
    #[must_use]
    pub fn of(tag: &str) -> Self {
        if SVG_ELEMENTS.contains(&tag) {
            Self::Svg
        } else {
            Self::Html
        }
    }
}

/// How a property value is converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    String,
    /// Presence means `true`.
    Boolean,
    /// Boolean or string (`download`).
    OverloadedBoolean,
    Number,
    /// List joined with spaces (`className`, `rel`).
    SpaceSeparated,
    /// List joined with `", "` (`accept`, `coords`).
    CommaSeparated,
    /// Inline style string.
    Style,
}

/// Schema entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Camel-cased markup property name.
    pub property: &'static str,
    /// Attribute name when it is not the lowercased property.
    attribute: &'static str,
    /// UI property name.
    pub ui: &'static str,
    pub kind: Kind,
}

/// Entry whose attribute is the lowercased property and whose UI name is
/// the property.
const fn plain(property: &'static str, kind: Kind) -> PropertyInfo {
    PropertyInfo {
        property,
        attribute: "",
        ui: property,
        kind,
    }
}

/// Entry with an explicit attribute name.
const fn attr(property: &'static str, attribute: &'static str, kind: Kind) -> PropertyInfo {
    PropertyInfo {
        property,
        attribute,
        ui: property,
        kind,
    }
}

/// Entry with explicit attribute and UI names.
const fn full(
    property: &'static str,
    attribute: &'static str,
    ui: &'static str,
    kind: Kind,
) -> PropertyInfo {
    PropertyInfo {
        property,
        attribute,
        ui,
        kind,
    }
}

use Kind::{
    Boolean, CommaSeparated, Number, OverloadedBoolean, SpaceSeparated, String as Str, Style,
};

/// Properties valid in both spaces.
const COMMON: &[PropertyInfo] = &[
    attr("className", "class", SpaceSeparated),
    plain("id", Str),
    plain("lang", Str),
    plain("role", Str),
    plain("style", Style),
    plain("tabIndex", Number),
];

const HTML: &[PropertyInfo] = &[
    plain("abbr", Str),
    plain("accept", CommaSeparated),
    attr("acceptCharset", "accept-charset", SpaceSeparated),
    plain("accessKey", SpaceSeparated),
    plain("action", Str),
    plain("align", Str),
    plain("allow", Str),
    plain("allowFullScreen", Boolean),
    plain("alt", Str),
    plain("async", Boolean),
    plain("autoCapitalize", Str),
    plain("autoComplete", SpaceSeparated),
    plain("autoFocus", Boolean),
    plain("autoPlay", Boolean),
    plain("bgColor", Str),
    plain("border", Number),
    plain("capture", Str),
    plain("cellPadding", Str),
    plain("cellSpacing", Str),
    plain("charSet", Str),
    plain("checked", Boolean),
    plain("cite", Str),
    plain("colSpan", Number),
    plain("cols", Number),
    plain("content", Str),
    plain("contentEditable", Str),
    plain("controls", Boolean),
    plain("coords", CommaSeparated),
    plain("crossOrigin", Str),
    plain("data", Str),
    plain("dateTime", Str),
    plain("decoding", Str),
    plain("default", Boolean),
    plain("defer", Boolean),
    plain("dir", Str),
    plain("dirName", Str),
    plain("disabled", Boolean),
    plain("download", OverloadedBoolean),
    plain("draggable", Str),
    plain("encType", Str),
    plain("enterKeyHint", Str),
    plain("form", Str),
    plain("formAction", Str),
    plain("formEncType", Str),
    plain("formMethod", Str),
    plain("formNoValidate", Boolean),
    plain("formTarget", Str),
    plain("frameBorder", Str),
    plain("headers", SpaceSeparated),
    plain("height", Number),
    plain("hidden", Boolean),
    plain("high", Number),
    plain("href", Str),
    plain("hrefLang", Str),
    attr("htmlFor", "for", SpaceSeparated),
    attr("httpEquiv", "http-equiv", SpaceSeparated),
    plain("inert", Boolean),
    plain("inputMode", Str),
    plain("integrity", Str),
    plain("is", Str),
    plain("isMap", Boolean),
    full("itemId", "itemid", "itemID", Str),
    plain("itemProp", SpaceSeparated),
    plain("itemRef", SpaceSeparated),
    plain("itemScope", Boolean),
    plain("itemType", SpaceSeparated),
    plain("kind", Str),
    plain("label", Str),
    plain("list", Str),
    plain("loading", Str),
    plain("loop", Boolean),
    plain("low", Number),
    plain("max", Str),
    plain("maxLength", Number),
    plain("media", Str),
    plain("method", Str),
    plain("min", Str),
    plain("minLength", Number),
    plain("multiple", Boolean),
    plain("muted", Boolean),
    plain("name", Str),
    plain("noModule", Boolean),
    plain("noValidate", Boolean),
    plain("nonce", Str),
    plain("open", Boolean),
    plain("optimum", Number),
    plain("pattern", Str),
    plain("ping", SpaceSeparated),
    plain("placeholder", Str),
    plain("playsInline", Boolean),
    plain("poster", Str),
    plain("preload", Str),
    plain("readOnly", Boolean),
    plain("referrerPolicy", Str),
    plain("rel", SpaceSeparated),
    plain("required", Boolean),
    plain("reversed", Boolean),
    plain("rowSpan", Number),
    plain("rows", Number),
    plain("sandbox", SpaceSeparated),
    plain("scope", Str),
    plain("selected", Boolean),
    plain("shape", Str),
    plain("size", Number),
    plain("sizes", Str),
    plain("slot", Str),
    plain("span", Number),
    plain("spellCheck", Str),
    plain("src", Str),
    plain("srcDoc", Str),
    plain("srcLang", Str),
    plain("srcSet", Str),
    plain("start", Number),
    plain("step", Str),
    plain("target", Str),
    plain("title", Str),
    plain("translate", Str),
    plain("type", Str),
    plain("useMap", Str),
    plain("value", Str),
    plain("width", Number),
    plain("wrap", Str),
];

const SVG: &[PropertyInfo] = &[
    attr("accentHeight", "accent-height", Number),
    attr("alignmentBaseline", "alignment-baseline", Str),
    attr("baselineShift", "baseline-shift", Str),
    attr("clipPath", "clip-path", Str),
    attr("clipPathUnits", "clipPathUnits", Str),
    attr("clipRule", "clip-rule", Str),
    plain("color", Str),
    plain("cx", Number),
    plain("cy", Number),
    plain("d", Str),
    plain("display", Str),
    attr("dominantBaseline", "dominant-baseline", Str),
    plain("dx", Str),
    plain("dy", Str),
    plain("fill", Str),
    attr("fillOpacity", "fill-opacity", Number),
    attr("fillRule", "fill-rule", Str),
    plain("filter", Str),
    attr("floodColor", "flood-color", Str),
    attr("floodOpacity", "flood-opacity", Number),
    plain("focusable", Str),
    attr("fontFamily", "font-family", Str),
    attr("fontSize", "font-size", Str),
    attr("fontStyle", "font-style", Str),
    attr("fontWeight", "font-weight", Str),
    plain("fx", Number),
    plain("fy", Number),
    attr("gradientTransform", "gradientTransform", Str),
    attr("gradientUnits", "gradientUnits", Str),
    plain("height", Number),
    plain("href", Str),
    attr("lengthAdjust", "lengthAdjust", Str),
    attr("letterSpacing", "letter-spacing", Str),
    attr("markerEnd", "marker-end", Str),
    attr("markerHeight", "markerHeight", Str),
    attr("markerMid", "marker-mid", Str),
    attr("markerStart", "marker-start", Str),
    attr("markerUnits", "markerUnits", Str),
    attr("markerWidth", "markerWidth", Str),
    plain("mask", Str),
    plain("offset", Str),
    plain("opacity", Str),
    plain("orient", Str),
    plain("overflow", Str),
    attr("pathLength", "pathLength", Number),
    attr("patternTransform", "patternTransform", Str),
    attr("patternUnits", "patternUnits", Str),
    attr("pointerEvents", "pointer-events", Str),
    plain("points", Str),
    attr("preserveAspectRatio", "preserveAspectRatio", Str),
    plain("r", Number),
    attr("refX", "refX", Str),
    attr("refY", "refY", Str),
    plain("rx", Number),
    plain("ry", Number),
    attr("shapeRendering", "shape-rendering", Str),
    attr("spreadMethod", "spreadMethod", Str),
    attr("stopColor", "stop-color", Str),
    attr("stopOpacity", "stop-opacity", Number),
    plain("stroke", Str),
    full("strokeDashArray", "stroke-dasharray", "strokeDasharray", CommaSeparated),
    full("strokeDashOffset", "stroke-dashoffset", "strokeDashoffset", Str),
    full("strokeLineCap", "stroke-linecap", "strokeLinecap", Str),
    full("strokeLineJoin", "stroke-linejoin", "strokeLinejoin", Str),
    full("strokeMiterLimit", "stroke-miterlimit", "strokeMiterlimit", Number),
    attr("strokeOpacity", "stroke-opacity", Number),
    attr("strokeWidth", "stroke-width", Str),
    plain("target", Str),
    attr("textAnchor", "text-anchor", Str),
    attr("textDecoration", "text-decoration", Str),
    attr("textLength", "textLength", Str),
    plain("transform", Str),
    plain("type", Str),
    attr("vectorEffect", "vector-effect", Str),
    plain("version", Str),
    attr("viewBox", "viewBox", Str),
    plain("visibility", Str),
    plain("width", Number),
    plain("x", Number),
    plain("x1", Number),
    plain("x2", Number),
    full("xLinkHref", "xlink:href", "xlinkHref", Str),
    full("xLinkTitle", "xlink:title", "xlinkTitle", Str),
    attr("xmlLang", "xml:lang", Str),
    attr("xmlSpace", "xml:space", Str),
    plain("xmlns", Str),
    full("xmlnsXLink", "xmlns:xlink", "xmlnsXlink", Str),
    plain("y", Number),
    plain("y1", Number),
    plain("y2", Number),
];

/// Lookup tables of one space.
struct Index {
    /// Lowercased property, attribute and UI names.
    by_name: HashMap<String, &'static PropertyInfo>,
    /// Exact UI names.
    by_ui: HashMap<&'static str, &'static PropertyInfo>,
}

impl Index {
    fn build(tables: &[&'static [PropertyInfo]]) -> Self {
        let mut by_name = HashMap::new();
        let mut by_ui = HashMap::new();
        for info in tables.iter().copied().flatten() {
            by_name.insert(info.property.to_ascii_lowercase(), info);
            by_name.insert(info.attribute().to_ascii_lowercase(), info);
            by_ui.insert(info.ui, info);
        }
        Self { by_name, by_ui }
    }
}

static HTML_INDEX: LazyLock<Index> = LazyLock::new(|| Index::build(&[COMMON, HTML]));
static SVG_INDEX: LazyLock<Index> = LazyLock::new(|| Index::build(&[COMMON, SVG]));

fn index(space: Space) -> &'static Index {
    match space {
        Space::Html => &HTML_INDEX,
        Space::Svg => &SVG_INDEX,
    }
}

impl PropertyInfo {
    /// Markup attribute name.
    #[must_use]
    pub fn attribute(&self) -> Cow<'static, str> {
        if self.attribute.is_empty() {
            self.property.to_ascii_lowercase().into()
        } else {
            self.attribute.into()
        }
    }
}

/// Schema entry for `name` in `space`, matched case-insensitively against
/// property and attribute names.
#[must_use]
pub fn find(space: Space, name: &str) -> Option<&'static PropertyInfo> {
    index(space).by_name.get(&name.to_ascii_lowercase()).copied()
}

/// Map an element's properties with no enclosing context: in the SVG space
/// for SVG element names (`svg`, `circle`, `path`, ...), in the HTML space
/// otherwise.
#[must_use]
pub fn map_properties(tag_name: &str, properties: &Properties) -> Props {
    map_properties_in(Space::of(tag_name), properties)
}

/// Map properties in an explicit space.
///
/// Never fails: unknown properties and empty styles are dropped.
#[must_use]
pub fn map_properties_in(space: Space, properties: &Properties) -> Props {
    let mut props = Props::new();
    for (name, value) in properties {
        if let Some(info) = find(space, name) {
            if let Some(converted) = convert(info.kind, value) {
                props.insert(info.ui.to_owned(), converted);
            }
        } else if let Some(attribute) = data_or_aria_attribute(name) {
            if let Some(converted) = convert(Kind::SpaceSeparated, value) {
                props.insert(attribute, converted);
            }
        } else {
            tracing::trace!(property = %name, "Dropped unknown property");
        }
    }
    props
}

/// Markup attribute for a UI property name in `space`.
///
/// Names outside the schema (`data-*`, `aria-*`, unknown) are returned as-is.
#[must_use]
pub fn attribute_name(space: Space, ui: &str) -> Cow<'static, str> {
    match index(space).by_ui.get(ui) {
        Some(info) => info.attribute(),
        None => ui.to_owned().into(),
    }
}

/// Hyphenated `data-*`/`aria-*` attribute for `name`, or `None` if it is
/// neither.
///
/// `dataFooBar` becomes `data-foo-bar`, `ariaDescribedBy` becomes
/// `aria-describedby`; already hyphenated names are lowercased. Names that
/// would contain anything but `[a-z0-9._:-]` are rejected.
#[must_use]
pub fn data_or_aria_attribute(name: &str) -> Option<String> {
    hyphenated_data_or_aria(name).filter(|attribute| {
        attribute.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | ':' | '-')
        })
    })
}

fn hyphenated_data_or_aria(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("data-") || lower.starts_with("aria-") {
        return (lower.len() > 5).then_some(lower);
    }
    if let Some(rest) = name.strip_prefix("data")
        && let Some(first) = rest.chars().next()
        && (first.is_ascii_uppercase() || first.is_ascii_digit())
    {
        let mut attribute = String::from("data");
        if !first.is_ascii_uppercase() {
            attribute.push('-');
        }
        for c in rest.chars() {
            if c.is_ascii_uppercase() {
                attribute.push('-');
                attribute.push(c.to_ascii_lowercase());
            } else {
                attribute.push(c);
            }
        }
        return Some(attribute);
    }
    if let Some(rest) = name.strip_prefix("aria")
        && rest.starts_with(|c: char| c.is_ascii_uppercase())
    {
        return Some(format!("aria-{}", rest.to_ascii_lowercase()));
    }
    None
}

/// Convert a markup value; `None` drops the property.
fn convert(kind: Kind, value: &PropertyValue) -> Option<PropValue> {
    let converted = match (kind, value) {
        (Kind::Style, PropertyValue::String(style)) => {
            let declarations = parse_style(style);
            if declarations.is_empty() {
                return None;
            }
            PropValue::Style(declarations)
        }
        (Kind::Style, _) => return None,
        (Kind::Boolean, PropertyValue::Boolean(b)) => PropValue::Bool(*b),
        (Kind::Boolean, PropertyValue::Number(n)) => PropValue::Bool(*n != 0.0),
        (Kind::Boolean, _) => PropValue::Bool(true),
        (Kind::OverloadedBoolean, PropertyValue::String(s)) if s.is_empty() => {
            PropValue::Bool(true)
        }
        (Kind::Number, PropertyValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_or_else(|_| PropValue::String(s.clone()), PropValue::Number),
        (Kind::CommaSeparated, PropertyValue::List(_)) => PropValue::String(value.join(", ")),
        (_, PropertyValue::List(_)) => PropValue::String(value.join(" ")),
        (_, PropertyValue::Boolean(b)) => PropValue::Bool(*b),
        (_, PropertyValue::Number(n)) => PropValue::Number(*n),
        (_, PropertyValue::String(s)) => PropValue::String(s.clone()),
    };
    Some(converted)
}
