//! Set values are persisted as their elements joined by [`SET_SEPARATOR`].
//!
//! There is no escaping, so elements must be non-empty and must not contain
//! the separator. Empty segments are dropped when decoding.

use std::borrow::Borrow;

/// Separator between encoded set elements.
pub const SET_SEPARATOR: char = ';';

/// Splits an encoded set into its elements, dropping empty segments.
pub fn decode_set(raw: &str) -> Vec<String> {
    raw.split(SET_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Joins elements into the encoded form.
pub fn encode_set<S: Borrow<str>>(elements: &[S]) -> String {
    elements.join(";")
}

/// Returns true when `value` can be stored as a set element.
pub fn is_valid_element(value: &str) -> bool {
    !value.is_empty() && !value.contains(SET_SEPARATOR)
}

/// Returns true when the encoded set contains `value`.
pub fn encoded_contains(raw: &str, value: &str) -> bool {
    raw.split(SET_SEPARATOR).any(|s| !s.is_empty() && s == value)
}

/// Appends `value` unless already present. `None` means unchanged.
pub(crate) fn add_to_encoded(raw: &str, value: &str) -> Option<String> {
    if encoded_contains(raw, value) {
        return None;
    }
    let mut set = decode_set(raw);
    set.push(value.to_owned());
    Some(encode_set(&set))
}

/// Removes every occurrence of `value`. `None` means unchanged.
pub(crate) fn remove_from_encoded(raw: &str, value: &str) -> Option<String> {
    if !encoded_contains(raw, value) {
        return None;
    }
    let set: Vec<String> = decode_set(raw).into_iter().filter(|s| s != value).collect();
    Some(encode_set(&set))
}

/// Sorts the encoded elements lexicographically (byte order).
pub fn sort_encoded(raw: &str) -> String {
    let mut set = decode_set(raw);
    set.sort();
    encode_set(&set)
}
