use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    content::{AssetRef, Document},
    headings::HeadingIdMap,
};

/// Resolves content-store image references to fetchable URLs.
pub trait AssetUrlBuilder: Send + Sync {
    /// URL for `asset`, or `None` when the reference cannot be resolved.
    fn image_url(&self, asset: &AssetRef, options: &ImageOptions) -> Option<String>;
}

/// Optional transformations requested from the asset URL builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Let the image CDN pick the best format for the client.
    pub auto_format: bool,
}

impl ImageOptions {
    pub fn auto() -> Self {
        Self {
            auto_format: true,
            ..Self::default()
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }
}

/// Collaborators borrowed for a single render.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub heading_ids: &'a HeadingIdMap,
    pub assets: &'a dyn AssetUrlBuilder,
}

impl<'a> RenderContext<'a> {
    pub fn new(heading_ids: &'a HeadingIdMap, assets: &'a dyn AssetUrlBuilder) -> Self {
        Self {
            heading_ids,
            assets,
        }
    }
}

/// A table-of-contents entry pointing at an anchored heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
    pub children: Vec<TocEntry>,
}

/// Content-level metrics surfaced alongside rendered HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ContentMetrics {
    pub word_count: u32,
    pub reading_time_minutes: u32,
    pub headings_count: u32,
    pub images_count: u32,
    pub code_blocks_count: u32,
    pub internal_links_count: u32,
    pub external_links_count: u32,
}

/// A block that was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub key: Option<String>,
    pub kind: String,
    pub reason: DegradationReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationReason {
    UnknownBlock,
    UnsupportedStyle,
    MissingAsset,
    UnresolvedAsset,
}

impl DegradationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationReason::UnknownBlock => "unknown_block",
            DegradationReason::UnsupportedStyle => "unsupported_style",
            DegradationReason::MissingAsset => "missing_asset",
            DegradationReason::UnresolvedAsset => "unresolved_asset",
        }
    }
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    /// Sanitised HTML fragment.
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub metrics: ContentMetrics,
    pub degradations: Vec<Degradation>,
}

/// Failures inside a single rendering step. These never escape a render; the
/// affected node falls back to a simpler form.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

/// Renders content-store documents to HTML. Implementations are pure: the
/// same document and context always produce the same output.
pub trait RenderService: Send + Sync {
    fn render(&self, document: &Document, context: &RenderContext<'_>) -> RenderOutput;
}
