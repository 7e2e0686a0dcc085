//! Tag metadata and the selection engine
//!
//! Tags, roles, and feature flags share one representation: a normalized
//! label attached to a suite or test. Selection expressions are parsed once
//! into [`TagExpr`] values and evaluated against a node's effective tag set.

use std::collections::BTreeSet;
use std::fmt;

/// A normalized test/suite tag.
///
/// A single leading `#` is cosmetic and stripped at construction, so `#smoke`
/// and `smoke` name the same tag. Roles and feature flags are tags by
/// convention only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(String);

impl Tag {
    /// Normalize a raw label into a tag.
    ///
    /// Returns `None` when the label is empty once the marker is stripped,
    /// so blank annotations silently drop out instead of matching everything.
    pub fn new(raw: &str) -> Option<Self> {
        let stripped = raw.strip_prefix('#').unwrap_or(raw).trim();
        if stripped.is_empty() {
            None
        } else {
            Some(Self(stripped.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of tags, ordered for deterministic iteration.
pub type TagSet = BTreeSet<Tag>;

/// Build a tag set from raw labels, dropping labels that normalize to nothing.
pub fn tag_set<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> TagSet {
    labels.into_iter().filter_map(Tag::new).collect()
}

/// One parsed selection expression: polarity plus an exact-match key.
///
/// `!` marks exclusion; a leading `#` on the remainder is cosmetic. Tokens
/// that normalize to nothing keep an empty key that matches no tag, so a
/// typo degrades to a no-op instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpr {
    key: Option<Tag>,
    exclude: bool,
}

impl TagExpr {
    /// Parse a raw expression token, resolving polarity and the cosmetic
    /// marker exactly once.
    pub fn parse(raw: &str) -> Self {
        let (exclude, rest) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        Self {
            key: Tag::new(rest),
            exclude,
        }
    }

    pub fn is_exclude(&self) -> bool {
        self.exclude
    }

    /// Whether this expression's key is exactly one of `tags`.
    ///
    /// Exact equality only: `tag` never matches a node tagged `tag1`.
    fn matches(&self, tags: &TagSet) -> bool {
        self.key.as_ref().is_some_and(|key| tags.contains(key))
    }
}

/// Decide whether a node with `tags` runs under `exprs`.
///
/// With no expressions every node runs. Include expressions OR together;
/// exclusions always apply and always win over a matching include. A list
/// with only exclusions runs everything it does not name.
pub fn select(tags: &TagSet, exprs: &[TagExpr]) -> bool {
    if exprs.is_empty() {
        return true;
    }
    if exprs.iter().filter(|e| e.is_exclude()).any(|e| e.matches(tags)) {
        return false;
    }
    let mut includes = exprs.iter().filter(|e| !e.is_exclude()).peekable();
    if includes.peek().is_none() {
        return true;
    }
    includes.any(|e| e.matches(tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn exprs(raw: &[&str]) -> Vec<TagExpr> {
        raw.iter().map(|r| TagExpr::parse(r)).collect()
    }

    #[test]
    fn tag_strips_single_hash() {
        assert_eq!(Tag::new("#smoke"), Tag::new("smoke"));
        // only the first marker is cosmetic
        assert_eq!(Tag::new("##smoke").unwrap().as_str(), "#smoke");
    }

    #[test]
    fn blank_tags_drop_out() {
        assert_eq!(Tag::new(""), None);
        assert_eq!(Tag::new("#"), None);
        assert_eq!(Tag::new("  "), None);
    }

    #[test]
    fn expr_polarity() {
        assert!(!TagExpr::parse("tag1").is_exclude());
        assert!(TagExpr::parse("!tag1").is_exclude());
        assert!(TagExpr::parse("!#tag1").is_exclude());
    }

    #[test_case(&["tag1"], &["tag1"], true; "exact include")]
    #[test_case(&["tag1"], &["#tag1"], true; "hash insensitive")]
    #[test_case(&["#tag1"], &["tag1"], true; "hash on node side")]
    #[test_case(&["tag1"], &["tag"], false; "substring does not include")]
    #[test_case(&["tag1"], &["!tag"], true; "substring does not exclude")]
    #[test_case(&["tag1"], &["!tag1"], false; "exact exclude")]
    #[test_case(&["tag1"], &[], true; "no expressions runs everything")]
    #[test_case(&[], &["tag1"], false; "untagged not included")]
    #[test_case(&[], &["!tag1"], true; "untagged survives exclusion")]
    #[test_case(&["role1", "tag2"], &["role1"], true; "multi tag include")]
    #[test_case(&["role1", "tag2"], &["!role1"], false; "multi tag exclude")]
    #[test_case(&["tag1"], &["tag1", "!tag1"], false; "exclusion wins")]
    #[test_case(&["tag2"], &["tag1", "tag2"], true; "includes or together")]
    #[test_case(&["tag3"], &["tag1", "tag2"], false; "no include matches")]
    #[test_case(&["tag1"], &["!"], true; "bare negation is a no-op")]
    #[test_case(&["tag1"], &[""], false; "blank include matches nothing")]
    fn selection(tags: &[&str], raw: &[&str], expected: bool) {
        assert_eq!(select(&tag_set(tags.iter().copied()), &exprs(raw)), expected);
    }

    #[test]
    fn include_and_exclude_partition_a_tree() {
        let nodes = [
            tag_set(["tag1"]),
            tag_set(["tag"]),
            TagSet::new(),
            tag_set(["other"]),
        ];
        for raw in ["tag1", "tag", "missing"] {
            let negated = format!("!{}", raw);
            let with = exprs(&[raw]);
            let without = exprs(&[negated.as_str()]);
            for node in &nodes {
                assert_ne!(select(node, &with), select(node, &without));
            }
        }
    }
}
