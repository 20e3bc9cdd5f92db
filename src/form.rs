//! Form-encoded request bodies.
//!
//! The write endpoints take `application/x-www-form-urlencoded` bodies. The
//! bodies are assembled by hand because `reorder_subreddit_rules` needs a
//! parameter value where `,` stays unescaped: the comma is the list delimiter
//! between percent-encoded rule names.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except unreserved characters is escaped.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Like [`FORM`], but keeps `,` as the rule-order delimiter.
const RULE_ORDER: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b',');

pub(crate) fn component(value: &str) -> String {
    utf8_percent_encode(value, FORM).to_string()
}

/// Encodes `params` into a form body, escaping keys and values.
pub(crate) fn pairs(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", component(k), component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Joins rule names into the `new_rule_order` value.
///
/// Each name is escaped on its own; the joining commas are not.
pub(crate) fn comma_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let joined = names.into_iter().collect::<Vec<_>>().join(",");
    utf8_percent_encode(&joined, RULE_ORDER).to_string()
}
