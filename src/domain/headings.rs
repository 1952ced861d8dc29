//! Heading anchor allocation shared by the renderer and the table of contents.
//!
//! Both consumers call [`allocate`] on the same document independently; the
//! function is pure and ordered, so they agree on every id without talking to
//! each other.

use std::collections::HashMap;

use crate::domain::{
    content::{Block, Document},
    slug::AnchorSlugger,
};

/// Block key → anchor slug, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingIdMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl HeadingIdMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    fn insert(&mut self, key: &str, slug: String) {
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push((key.to_string(), slug));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, slug)| (key.as_str(), slug.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the anchor id of every h2/h3 block that has a key and slug-able text.
///
/// Only anchored headings advance the duplicate counters, so inserting other
/// blocks between headings never changes their ids.
pub fn allocate(document: &Document) -> HeadingIdMap {
    let mut slugger = AnchorSlugger::new();
    let mut map = HeadingIdMap::default();

    for block in &document.blocks {
        let Block::Text(text) = block else {
            continue;
        };
        if !text.is_anchored_heading() {
            continue;
        }
        let Some(key) = text.key.as_deref() else {
            continue;
        };
        if map.get(key).is_some() {
            continue;
        }
        if let Some(slug) = slugger.anchor_for(&text.plain_text()) {
            map.insert(key, slug);
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::{BlockStyle, CodeBlock, Span, TextBlock};

    fn text(key: Option<&str>, style: BlockStyle, content: &str) -> Block {
        Block::Text(TextBlock {
            key: key.map(str::to_string),
            style,
            children: vec![Span::plain(content)],
            list: None,
        })
    }

    fn h2(key: &str, content: &str) -> Block {
        text(Some(key), BlockStyle::H2, content)
    }

    fn h3(key: &str, content: &str) -> Block {
        text(Some(key), BlockStyle::H3, content)
    }

    fn paragraph(key: &str, content: &str) -> Block {
        text(Some(key), BlockStyle::Normal, content)
    }

    fn collect(map: &HeadingIdMap) -> Vec<(String, String)> {
        map.iter()
            .map(|(key, slug)| (key.to_string(), slug.to_string()))
            .collect()
    }

    #[test]
    fn duplicate_headings_receive_occurrence_suffix() {
        let document = Document::new(vec![
            h2("k1", "Getting Started"),
            paragraph("k2", "..."),
            h2("k3", "Getting Started"),
            h3("k4", "FAQ"),
        ]);

        let map = allocate(&document);

        assert_eq!(
            collect(&map),
            vec![
                ("k1".to_string(), "getting-started".to_string()),
                ("k3".to_string(), "getting-started-1".to_string()),
                ("k4".to_string(), "faq".to_string()),
            ]
        );
    }

    #[test]
    fn lookups_cover_every_allocated_heading() {
        let blocks = (0..200)
            .map(|index| h2(&format!("k{index}"), "Section"))
            .collect();

        let map = allocate(&Document::new(blocks));

        assert_eq!(map.len(), 200);
        assert_eq!(map.get("k0"), Some("section"));
        assert_eq!(map.get("k199"), Some("section-199"));
        assert_eq!(map.get("missing"), None);
        assert_eq!(map.iter().nth(42), Some(("k42", "section-42")));
    }

    #[test]
    fn allocation_is_deterministic() {
        let document = Document::new(vec![
            h2("a", "Intro"),
            h3("b", "Intro"),
            h2("c", "Setup & Install"),
            h3("d", "Intro"),
        ]);

        assert_eq!(allocate(&document), allocate(&document));
    }

    #[test]
    fn non_heading_insertions_do_not_shift_slugs() {
        let before = Document::new(vec![h2("a", "Usage"), h2("b", "Usage")]);
        let after = Document::new(vec![
            h2("a", "Usage"),
            paragraph("p", "Usage"),
            text(Some("h4"), BlockStyle::H4, "Usage"),
            Block::Code(CodeBlock {
                key: Some("c".into()),
                code: "usage()".into(),
                language: None,
                filename: None,
            }),
            h2("b", "Usage"),
        ]);

        assert_eq!(collect(&allocate(&before)), collect(&allocate(&after)));
        assert_eq!(allocate(&after).get("b"), Some("usage-1"));
    }

    #[test]
    fn skips_headings_without_key_or_text() {
        let document = Document::new(vec![
            text(None, BlockStyle::H2, "Orphan"),
            h2("empty", "   "),
            h3("symbols", "***"),
            h2("ok", "Orphan"),
        ]);

        let map = allocate(&document);

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("ok"), Some("orphan"));
        assert_eq!(map.get("empty"), None);
    }

    #[test]
    fn heading_text_ignores_marks() {
        use crate::domain::content::Mark;

        let document = Document::new(vec![Block::Text(TextBlock {
            key: Some("k".into()),
            style: BlockStyle::H2,
            children: vec![
                Span {
                    text: "Fast ".into(),
                    marks: vec![Mark::Strong],
                },
                Span {
                    text: "Setup".into(),
                    marks: vec![Mark::Code],
                },
            ],
            list: None,
        })]);

        assert_eq!(allocate(&document).get("k"), Some("fast-setup"));
    }
}
