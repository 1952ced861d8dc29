//! Blog, changelog and integration listings backed by the content store.

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::{
    application::{
        pagination::{PageRequest, Paginated},
        render::{AssetUrlBuilder, ImageOptions, RenderOutput, RenderService, render_document},
    },
    domain::{
        content::AssetRef,
        listing::{Category, ChangelogEntry, Integration, Post, PostSummary},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("content store is not configured")]
    Unavailable,
    #[error("{entity} `{slug}` not found")]
    NotFound { entity: &'static str, slug: String },
    #[error("content store request failed: {0}")]
    Transport(String),
    #[error("content store response could not be decoded: {0}")]
    Decode(String),
    #[error("content store returned an unexpected shape: {0}")]
    Schema(String),
}

/// Read-only access to the headless content store.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Published posts, newest first.
    async fn posts(&self) -> Result<Vec<PostSummary>, ContentError>;

    async fn post(&self, slug: &str) -> Result<Option<Post>, ContentError>;

    /// Changelog entries, newest first.
    async fn changelog(&self) -> Result<Vec<ChangelogEntry>, ContentError>;

    async fn integrations(&self) -> Result<Vec<Integration>, ContentError>;

    async fn categories(&self) -> Result<Vec<Category>, ContentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingLimits {
    pub posts_per_page: u32,
    pub integrations_per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListing {
    pub posts: Paginated<PostSummary>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    pub summary: PostSummary,
    pub rendered: RenderOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChangelogEntry {
    pub entry: ChangelogEntry,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationListing {
    pub integrations: Paginated<Integration>,
    pub categories: Vec<String>,
}

#[derive(Clone)]
pub struct ContentService {
    source: Arc<dyn ContentSource>,
    renderer: Arc<dyn RenderService>,
    assets: Arc<dyn AssetUrlBuilder>,
    limits: ListingLimits,
}

impl ContentService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        renderer: Arc<dyn RenderService>,
        assets: Arc<dyn AssetUrlBuilder>,
        limits: ListingLimits,
    ) -> Self {
        Self {
            source,
            renderer,
            assets,
            limits,
        }
    }

    pub async fn list_posts(
        &self,
        page: Option<u32>,
        category: Option<&str>,
    ) -> Result<PostListing, ContentError> {
        let (posts, categories) = futures::try_join!(self.source.posts(), self.source.categories())?;

        let filtered: Vec<PostSummary> = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(slug) => posts
                .into_iter()
                .filter(|post| post.in_category(slug))
                .collect(),
            None => posts,
        };

        Ok(PostListing {
            posts: Paginated::from_items(
                filtered,
                PageRequest::new(page, self.limits.posts_per_page),
            ),
            categories,
        })
    }

    pub async fn post(&self, slug: &str) -> Result<RenderedPost, ContentError> {
        let post = self
            .source
            .post(slug)
            .await?
            .ok_or_else(|| ContentError::NotFound {
                entity: "post",
                slug: slug.to_string(),
            })?;

        let rendered = render_document(self.renderer.as_ref(), &post.body, self.assets.as_ref());
        debug!(
            target = "application::content",
            slug,
            reading_time = rendered.metrics.reading_time_minutes,
            "post rendered"
        );

        Ok(RenderedPost {
            summary: post.summary,
            rendered,
        })
    }

    pub async fn changelog(&self) -> Result<Vec<RenderedChangelogEntry>, ContentError> {
        let entries = self.source.changelog().await?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let html =
                    render_document(self.renderer.as_ref(), &entry.body, self.assets.as_ref())
                        .html;
                RenderedChangelogEntry { entry, html }
            })
            .collect())
    }

    pub async fn list_integrations(
        &self,
        page: Option<u32>,
        category: Option<&str>,
        query: Option<&str>,
    ) -> Result<IntegrationListing, ContentError> {
        let integrations = self.source.integrations().await?;

        let categories: Vec<String> = integrations
            .iter()
            .map(|integration| integration.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let filtered: Vec<Integration> = integrations
            .into_iter()
            .filter(|integration| {
                category.is_none_or(|wanted| integration.category.eq_ignore_ascii_case(wanted))
            })
            .filter(|integration| query.is_none_or(|q| integration.matches_query(q)))
            .collect();

        Ok(IntegrationListing {
            integrations: Paginated::from_items(
                filtered,
                PageRequest::new(page, self.limits.integrations_per_page),
            ),
            categories,
        })
    }

    pub fn image_url(&self, asset: &AssetRef, options: &ImageOptions) -> Option<String> {
        self.assets.image_url(asset, options)
    }
}
