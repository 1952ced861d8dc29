//! Domain entities mirrored from the content store.

use time::OffsetDateTime;

use crate::domain::content::{AssetRef, Document};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub published_at: Option<OffsetDateTime>,
    pub categories: Vec<Category>,
    pub cover_image: Option<AssetRef>,
}

impl PostSummary {
    pub fn in_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|category| category.slug == slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub summary: PostSummary,
    pub body: Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub title: String,
    pub slug: String,
    pub version: Option<String>,
    pub date: Option<OffsetDateTime>,
    pub body: Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub logo: Option<AssetRef>,
}

impl Integration {
    /// Case-insensitive substring match on name and description.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_query_is_case_insensitive() {
        let integration = Integration {
            name: "Slack".into(),
            slug: "slack".into(),
            description: "Send alerts to your team channels".into(),
            category: "Messaging".into(),
            logo: None,
        };

        assert!(integration.matches_query("slack"));
        assert!(integration.matches_query("TEAM"));
        assert!(integration.matches_query("  "));
        assert!(!integration.matches_query("jira"));
    }
}
