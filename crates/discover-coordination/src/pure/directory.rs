//! Attribute filter matching.

use discover_core::Attributes;

/// An instance matches when every filter entry is present with an equal value.
///
/// Extra attributes on the instance are ignored and an empty filter matches
/// everything. Comparison is exact and case-sensitive.
#[inline]
pub fn matches_filter(attributes: &Attributes, filter: &Attributes) -> bool {
    filter.iter().all(|(key, expected)| attributes.get(key) == Some(expected))
}
