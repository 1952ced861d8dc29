//! Rich-content rendering.
//!
//! The pipeline is pure: it accepts a content-store document plus the heading
//! ids allocated for it, and produces sanitised HTML, a table of contents and
//! content metrics. Blocks that cannot be rendered are reported as
//! degradations instead of failing the document.

mod service;
mod toc;
mod types;

pub use service::{BlockRenderService, render_service};
pub use toc::table_of_contents;
pub use types::{
    AssetUrlBuilder, ContentMetrics, Degradation, DegradationReason, ImageOptions, RenderContext,
    RenderError, RenderOutput, RenderService, TocEntry,
};

use crate::domain::{content::Document, headings::allocate};

/// Allocate heading ids for `document` and render it with `renderer`.
pub fn render_document(
    renderer: &dyn RenderService,
    document: &Document,
    assets: &dyn AssetUrlBuilder,
) -> RenderOutput {
    let heading_ids = allocate(document);
    let context = RenderContext::new(&heading_ids, assets);
    renderer.render(document, &context)
}
