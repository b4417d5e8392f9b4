//! Defines the [`TagIndex`], which maps each tag to the articles carrying it
//! and weighs tags for the tag cloud.

use crate::slug::transliterate;
use crate::template::{self, Context, Templates};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Smallest tag-cloud weight.
pub const LOW: f64 = 1.0;

/// Largest tag-cloud weight, always given to the most popular tag.
pub const HIGH: f64 = 9.0;

/// Tag to member-article mapping. Members are article identities (source
/// paths) in registration order. Weights are computed on first use and
/// cached until the index changes or [`TagIndex::reset`] is called.
#[derive(Debug, Default)]
pub struct TagIndex {
    members: BTreeMap<String, Vec<PathBuf>>,
    weights: OnceCell<BTreeMap<String, f64>>,
}

impl TagIndex {
    pub fn new() -> TagIndex {
        TagIndex::default()
    }

    /// Registers `article` under `tag`.
    pub fn register(&mut self, tag: &str, article: &Path) {
        self.members
            .entry(tag.to_owned())
            .or_default()
            .push(article.to_owned());
        self.reset();
    }

    /// Drops the cached weights.
    pub fn reset(&mut self) {
        self.weights.take();
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates over tags in lexicographic order with their members.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.members
            .iter()
            .map(|(tag, members)| (tag.as_str(), members.as_slice()))
    }

    pub fn members(&self, tag: &str) -> &[PathBuf] {
        self.members.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, tag: &str) -> usize {
        self.members(tag).len()
    }

    /// The display weight of `tag` in `[LOW, HIGH]`, or `None` for an
    /// unknown tag.
    pub fn weight(&self, tag: &str) -> Option<f64> {
        self.weights().get(tag).copied()
    }

    /// All weights, computed once per index state.
    pub fn weights(&self) -> &BTreeMap<String, f64> {
        self.weights.get_or_init(|| {
            let max_count = self.members.values().map(Vec::len).max().unwrap_or(0);
            self.members
                .iter()
                .map(|(tag, members)| (tag.clone(), scale(members.len(), max_count)))
                .collect()
        })
    }

    /// Renders the tag cloud: one `tag` template per tag, lexicographic by
    /// tag name, joined by spaces. An empty index renders as `""`.
    pub fn cloud(&self, templates: &Templates) -> template::Result<String> {
        let mut entries = Vec::with_capacity(self.members.len());
        for (tag, members) in &self.members {
            let weight = self.weight(tag).unwrap_or(HIGH);
            let data = Context::new()
                .with("size", (weight.trunc() as u32).to_string())
                .with("tag", tag.as_str())
                .with("tag_url", transliterate(tag))
                .with("count", members.len().to_string());
            entries.push(templates.render("tag", &data)?);
        }
        Ok(entries.join(" "))
    }
}

/// `LOW + ln(count) / ln(max_count) * (HIGH - LOW)`. When `ln(max_count)`
/// is zero (every tag is used once, or there are no tags) every tag gets
/// `HIGH`.
fn scale(count: usize, max_count: usize) -> f64 {
    if max_count <= 1 {
        return HIGH;
    }
    let ratio = (count as f64).ln() / (max_count as f64).ln();
    LOW + ratio * (HIGH - LOW)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    // articles are given space-separated
    fn index(tags: &[(&str, &str)]) -> TagIndex {
        let mut index = TagIndex::new();
        for (tag, articles) in tags {
            for article in articles.split_whitespace() {
                index.register(tag, Path::new(article));
            }
        }
        index
    }

    #[test]
    fn test_single_tag_gets_high() {
        let index = index(&[("foo", "a")]);
        assert_eq!(index.weight("foo"), Some(HIGH));
        assert_eq!(index.weight("bar"), None);
    }

    #[test]
    fn test_all_singletons_get_high() {
        let index = index(&[("foo", "a"), ("bar", "b"), ("baz", "a")]);
        assert!(index.weights().values().all(|w| *w == HIGH));
    }

    #[test]
    fn test_weights_are_monotonic() {
        let index = index(&[
            ("one", "a"),
            ("two", "a b"),
            ("three", "a b c"),
            ("five", "a b c d e"),
        ]);
        assert_eq!(index.weight("one"), Some(LOW));
        assert_eq!(index.weight("five"), Some(HIGH));
        let one = index.weight("one").unwrap();
        let two = index.weight("two").unwrap();
        let three = index.weight("three").unwrap();
        assert!(one <= two && two <= three && three <= HIGH);
    }

    #[test]
    fn test_register_resets_cached_weights() {
        let mut index = index(&[("foo", "a")]);
        assert_eq!(index.weight("foo"), Some(HIGH));
        index.register("bar", Path::new("a"));
        index.register("bar", Path::new("b"));
        assert_eq!(index.weight("foo"), Some(LOW));
        assert_eq!(index.weight("bar"), Some(HIGH));
        assert_eq!(index.members("bar"), &[PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_cloud() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("tag.html"),
            "%(size)d\n%(tag)s\ntag_%(tag_url)s\n%(count)d",
        )
        .unwrap();
        let templates = Templates::new(dir.path(), Context::new());

        assert_eq!(TagIndex::new().cloud(&templates).unwrap(), "");

        let single = index(&[("foo", "a")]);
        assert_eq!(single.cloud(&templates).unwrap(), "9\nfoo\ntag_foo\n1");

        // insertion order doesn't matter, output is sorted by tag
        let index = index(&[("foo", "a b c"), ("bar baz", "a f")]);
        assert_eq!(
            index.cloud(&templates).unwrap(),
            "6\nbar baz\ntag_bar_baz\n2 9\nfoo\ntag_foo\n3"
        );
    }
}
