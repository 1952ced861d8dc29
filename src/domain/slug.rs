//! Deterministic, URL-safe slugs for heading anchors.
//!
//! Slugs keep ASCII letters and digits after lowercasing; every other run of
//! characters collapses to a single hyphen. Duplicate headings inside one
//! document are told apart by an occurrence suffix (`faq`, `faq-1`, `faq-2`).

use std::collections::{HashMap, HashSet};

/// Derive a base slug from heading text. Returns an empty string when nothing
/// representable remains.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Hands out unique anchor slugs for headings processed in document order.
#[derive(Debug, Default)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
    assigned: HashSet<String>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for the next heading with the given text, or `None` when the text
    /// cannot produce a slug.
    ///
    /// The first occurrence of a base slug is returned as is; later ones get
    /// `-N` where N counts the earlier occurrences. A suffixed candidate that
    /// was already handed out (say, a literal "FAQ 1" heading) bumps N again.
    pub fn anchor_for(&mut self, heading: &str) -> Option<String> {
        let base = slugify(heading);
        if base.is_empty() {
            return None;
        }

        let seen = self.occurrences.entry(base.clone()).or_insert(0);
        let mut candidate = if *seen == 0 {
            base.clone()
        } else {
            format!("{base}-{seen}")
        };
        *seen += 1;

        while self.assigned.contains(&candidate) {
            candidate = format!("{base}-{seen}");
            *seen += 1;
        }

        self.assigned.insert(candidate.clone());
        Some(candidate)
    }
}
