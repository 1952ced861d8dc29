use crate::application::render::types::TocEntry;
use crate::domain::{
    content::{Block, BlockStyle, Document},
    headings::HeadingIdMap,
};

/// Build a nested table of contents from the anchored headings of `document`.
///
/// Only headings present in `heading_ids` appear, so every entry links to an
/// id the renderer emitted. An h3 nests under the nearest preceding h2; an h3
/// that comes before any h2 becomes a root entry.
pub fn table_of_contents(document: &Document, heading_ids: &HeadingIdMap) -> Vec<TocEntry> {
    let mut entries: Vec<TocEntry> = Vec::new();

    for block in &document.blocks {
        let Block::Text(text) = block else {
            continue;
        };
        let level = match text.style {
            BlockStyle::H2 => 2,
            BlockStyle::H3 => 3,
            _ => continue,
        };
        let Some(id) = text.key.as_deref().and_then(|key| heading_ids.get(key)) else {
            continue;
        };

        let entry = TocEntry {
            id: id.to_string(),
            text: text.plain_text().trim().to_string(),
            level,
            children: Vec::new(),
        };

        match entries.last_mut() {
            Some(parent) if level == 3 && parent.level == 2 => parent.children.push(entry),
            _ => entries.push(entry),
        }
    }

    entries
}
