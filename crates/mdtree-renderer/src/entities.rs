//! Character reference decoding.
//!
//! Resolves numeric (`&#58;`, `&#x3A;`) and named (`&colon;`, `&nbsp;`)
//! character references. Numeric references may omit the trailing semicolon,
//! as browsers accept them in attribute values; named references must end
//! with one. Unknown named references are preserved as-is.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Regex pattern for matching character references.
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]{1,8});?|#([0-9]{1,10});?|([a-zA-Z][a-zA-Z0-9]{1,31});)")
        .expect("invalid character reference regex")
});

/// Decode character references to their Unicode characters.
///
/// Returns the input unchanged (borrowed) when it holds no references.
pub fn decode_character_references(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    REFERENCE_PATTERN.replace_all(text, |caps: &Captures| {
        if let Some(hex) = caps.get(1) {
            numeric_reference(u32::from_str_radix(hex.as_str(), 16).ok()).to_string()
        } else if let Some(decimal) = caps.get(2) {
            numeric_reference(decimal.as_str().parse().ok()).to_string()
        } else {
            named_reference(&caps[3]).map_or_else(|| caps[0].to_owned(), String::from)
        }
    })
}

/// Resolve a code point; invalid ones become U+FFFD as in HTML.
fn numeric_reference(code: Option<u32>) -> char {
    code.filter(|&c| c != 0)
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Map a named reference to its Unicode text.
fn named_reference(name: &str) -> Option<&'static str> {
    Some(match name {
        // XML
        "amp" | "AMP" => "&",
        "lt" | "LT" => "<",
        "gt" | "GT" => ">",
        "quot" | "QUOT" => "\"",
        "apos" => "'",

        // Punctuation used to obfuscate URI schemes
        "colon" => ":",
        "Tab" => "\t",
        "NewLine" => "\n",
        "sol" => "/",
        "bsol" => "\\",
        "lpar" => "(",
        "rpar" => ")",
        "period" => ".",
        "comma" => ",",
        "semi" => ";",
        "excl" => "!",
        "quest" => "?",
        "num" => "#",
        "percnt" => "%",
        "equals" => "=",
        "commat" => "@",
        "plus" => "+",
        "lowbar" => "_",
        "hyphen" | "dash" => "\u{2010}",

        // Common entities
        "nbsp" => "\u{00a0}",
        "shy" => "\u{00ad}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "zwj" => "\u{200d}",
        "zwnj" => "\u{200c}",

        // Arrows
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        "harr" => "\u{2194}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",

        // Math symbols
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "ne" => "\u{2260}",
        "plusmn" => "\u{00b1}",
        "times" => "\u{00d7}",
        "divide" => "\u{00f7}",

        // Legal symbols
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",

        // Currency
        "euro" => "\u{20ac}",
        "pound" => "\u{00a3}",
        "yen" => "\u{00a5}",
        "cent" => "\u{00a2}",

        // Misc symbols
        "deg" => "\u{00b0}",
        "para" => "\u{00b6}",
        "sect" => "\u{00a7}",
        "dagger" => "\u{2020}",
        "Dagger" => "\u{2021}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "middot" => "\u{00b7}",

        _ => return None,
    })
}
