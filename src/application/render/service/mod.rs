mod blocks;
mod highlight;
mod labels;
mod sanitize;

use std::sync::Arc;

use once_cell::sync::Lazy;
use syntect::{html::ClassStyle, parsing::SyntaxSet};
use tracing::debug;

use crate::application::render::{
    toc::table_of_contents,
    types::{RenderContext, RenderOutput, RenderService},
};
use crate::domain::content::Document;

use blocks::{BlockWriter, WrittenBlocks};
use sanitize::build_document_sanitizer;

/// Block renderer with Syntect highlighting and Ammonia sanitisation.
pub struct BlockRenderService {
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

impl BlockRenderService {
    /// Construct a renderer whose code blocks emit `syntax-` prefixed CSS classes.
    fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_document_sanitizer(),
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<BlockRenderService>> =
    Lazy::new(|| Arc::new(BlockRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<BlockRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for BlockRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for BlockRenderService {
    fn render(&self, document: &Document, context: &RenderContext<'_>) -> RenderOutput {
        let WrittenBlocks {
            html,
            metrics,
            degradations,
        } = write_stage(document, context, &self.syntax_set, &self.class_style);

        let html = sanitize_stage(html, &self.sanitizer);
        let toc = table_of_contents(document, context.heading_ids);

        debug!(
            target = "application::render",
            blocks = document.blocks.len(),
            words = metrics.word_count,
            degraded = degradations.len(),
            "document rendered"
        );

        RenderOutput {
            html,
            toc,
            metrics,
            degradations,
        }
    }
}

fn write_stage(
    document: &Document,
    context: &RenderContext<'_>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> WrittenBlocks {
    let mut writer = BlockWriter::new(context, syntax_set, class_style);
    for block in &document.blocks {
        writer.write_block(block);
    }
    writer.finish()
}

fn sanitize_stage(html: String, sanitizer: &ammonia::Builder<'static>) -> String {
    sanitizer.clean(&html).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::render::types::{AssetUrlBuilder, DegradationReason, ImageOptions};
    use crate::domain::{content::AssetRef, headings::allocate};

    struct StubAssets;

    impl AssetUrlBuilder for StubAssets {
        fn image_url(&self, asset: &AssetRef, _options: &ImageOptions) -> Option<String> {
            asset
                .hash
                .as_ref()
                .map(|hash| format!("https://img.test/{hash}.png"))
        }
    }

    fn render_json(blocks: serde_json::Value) -> RenderOutput {
        let document = Document::from_json(&blocks);
        let heading_ids = allocate(&document);
        let assets = StubAssets;
        let context = RenderContext::new(&heading_ids, &assets);
        BlockRenderService::default().render(&document, &context)
    }

    fn text_block(key: &str, style: &str, text: &str) -> serde_json::Value {
        json!({
            "_type": "block",
            "_key": key,
            "style": style,
            "children": [{ "_type": "span", "text": text, "marks": [] }],
            "markDefs": []
        })
    }

    fn list_block(key: &str, kind: &str, level: u8, text: &str) -> serde_json::Value {
        json!({
            "_type": "block",
            "_key": key,
            "style": "normal",
            "listItem": kind,
            "level": level,
            "children": [{ "_type": "span", "text": text, "marks": [] }],
            "markDefs": []
        })
    }

    #[test]
    fn headings_carry_allocated_ids() {
        let output = render_json(json!([
            text_block("k1", "h2", "Getting Started"),
            text_block("k2", "normal", "..."),
            text_block("k3", "h2", "Getting Started"),
            text_block("k4", "h3", "FAQ"),
            text_block("k5", "h4", "Details"),
        ]));

        assert_eq!(
            output.html,
            "<h2 id=\"getting-started\">Getting Started</h2><p>...</p>\
             <h2 id=\"getting-started-1\">Getting Started</h2>\
             <h3 id=\"faq\">FAQ</h3><h4>Details</h4>"
        );
        assert_eq!(output.metrics.headings_count, 4);
    }

    #[test]
    fn heading_without_slug_renders_without_id() {
        let output = render_json(json!([text_block("k1", "h2", "???")]));
        assert_eq!(output.html, "<h2>???</h2>");
    }

    #[test]
    fn blockquote_and_empty_paragraph() {
        let output = render_json(json!([
            text_block("q", "blockquote", "Ship it."),
            text_block("p", "normal", ""),
        ]));
        assert_eq!(output.html, "<blockquote>Ship it.</blockquote><p></p>");
    }

    #[test]
    fn consecutive_list_items_share_one_list() {
        let output = render_json(json!([
            list_block("a", "bullet", 1, "one"),
            list_block("b", "bullet", 1, "two"),
            list_block("c", "number", 1, "first"),
        ]));
        assert_eq!(
            output.html,
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol>"
        );
    }

    #[test]
    fn deeper_levels_nest_inside_previous_item() {
        let output = render_json(json!([
            list_block("a", "bullet", 1, "parent"),
            list_block("b", "number", 2, "child"),
            list_block("c", "number", 2, "sibling"),
            list_block("d", "bullet", 1, "next"),
        ]));
        assert_eq!(
            output.html,
            "<ul><li>parent<ol><li>child</li><li>sibling</li></ol></li><li>next</li></ul>"
        );
    }

    #[test]
    fn paragraph_between_items_splits_lists() {
        let output = render_json(json!([
            list_block("a", "bullet", 1, "one"),
            text_block("p", "normal", ""),
            list_block("b", "bullet", 1, "two"),
        ]));
        assert_eq!(
            output.html,
            "<ul><li>one</li></ul><p></p><ul><li>two</li></ul>"
        );
    }

    #[test]
    fn marks_wrap_in_order_with_link_outermost() {
        let output = render_json(json!([{
            "_type": "block",
            "_key": "m",
            "style": "normal",
            "markDefs": [
                { "_key": "ext", "_type": "link", "href": "https://example.com" },
                { "_key": "int", "_type": "link", "href": "/pricing" }
            ],
            "children": [
                { "_type": "span", "text": "bold", "marks": ["strong", "em"] },
                { "_type": "span", "text": " docs", "marks": ["code", "ext"] },
                { "_type": "span", "text": " plans", "marks": ["int", "underline", "strike-through"] },
                { "_type": "span", "text": " x", "marks": ["missing"] }
            ]
        }]));

        assert_eq!(
            output.html,
            "<p><strong><em>bold</em></strong>\
             <a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\" data-link-kind=\"external\"><code> docs</code></a>\
             <a href=\"/pricing\" data-link-kind=\"internal\"><u><s> plans</s></u></a> x</p>"
        );
        assert_eq!(output.metrics.external_links_count, 1);
        assert_eq!(output.metrics.internal_links_count, 1);
    }

    #[test]
    fn text_is_escaped() {
        let output = render_json(json!([text_block(
            "p",
            "normal",
            "<script>alert(1)</script> & more"
        )]));
        assert!(!output.html.contains("<script>"));
        assert!(output.html.contains("&lt;script&gt;"));
        assert!(output.html.contains("&amp; more"));
    }

    #[test]
    fn images_render_figure_and_skip_missing_assets() {
        let output = render_json(json!([
            {
                "_type": "image",
                "_key": "img1",
                "asset": { "_ref": "image-abc123-800x600-png" },
                "alt": "Dashboard",
                "caption": "The new dashboard"
            },
            { "_type": "image", "_key": "img2", "alt": "nothing here" }
        ]));

        assert!(output.html.starts_with("<figure><img "));
        assert!(output.html.contains("src=\"https://img.test/abc123.png\""));
        assert!(output.html.contains("alt=\"Dashboard\""));
        assert!(output.html.contains("loading=\"lazy\""));
        assert!(output.html.contains("width=\"800\""));
        assert!(output.html.contains("height=\"600\""));
        assert!(output.html.contains("<figcaption>The new dashboard</figcaption>"));
        assert!(!output.html.contains("nothing here"));
        assert_eq!(output.metrics.images_count, 1);
        assert_eq!(output.degradations.len(), 1);
        assert_eq!(output.degradations[0].key.as_deref(), Some("img2"));
        assert_eq!(
            output.degradations[0].reason,
            DegradationReason::MissingAsset
        );
    }

    #[test]
    fn code_blocks_are_labelled_and_highlighted() {
        let output = render_json(json!([
            { "_type": "code", "_key": "c1", "code": "fn main() {}", "language": "rs" },
            { "_type": "code", "_key": "c2", "code": "x", "filename": "notes.txt" },
            { "_type": "code", "_key": "c3", "code": "x" }
        ]));

        assert!(output.html.contains(
            "<figure data-role=\"code-block\"><figcaption>Rust</figcaption><pre class=\"syntax-highlight syntax-lang-rs\""
        ));
        assert!(output.html.contains("<figcaption>notes.txt</figcaption>"));
        assert!(output.html.contains("<figcaption>Plain Text</figcaption>"));
        assert_eq!(output.metrics.code_blocks_count, 3);
    }

    #[test]
    fn unknown_blocks_degrade_without_losing_neighbours() {
        let output = render_json(json!([
            text_block("a", "normal", "before"),
            { "_type": "callout", "_key": "x", "tone": "warning" },
            { "_type": "code", "_key": "bad", "code": 42 },
            text_block("h1", "h1", "Not in schema"),
            text_block("b", "normal", "after"),
        ]));

        assert_eq!(output.html, "<p>before</p><p>after</p>");
        let kinds: Vec<&str> = output
            .degradations
            .iter()
            .map(|degradation| degradation.kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["callout", "code", "block/h1"]);
    }

    #[test]
    fn rendering_does_not_mutate_inputs_and_is_repeatable() {
        let document = Document::from_json(&json!([
            text_block("k1", "h2", "Intro"),
            text_block("k2", "h3", "Intro"),
        ]));
        let snapshot = document.clone();
        let heading_ids = allocate(&document);
        let ids_snapshot = heading_ids.clone();
        let assets = StubAssets;
        let context = RenderContext::new(&heading_ids, &assets);
        let service = BlockRenderService::default();

        let first = service.render(&document, &context);
        let second = service.render(&document, &context);

        assert_eq!(first, second);
        assert_eq!(document, snapshot);
        assert_eq!(heading_ids, ids_snapshot);
        assert_eq!(first.toc.len(), 1);
        assert_eq!(first.toc[0].children[0].id, "intro-1");
    }

    #[test]
    fn metrics_count_words() {
        let output = render_json(json!([
            text_block("a", "normal", "one two three"),
            text_block("b", "h2", "four five"),
        ]));
        assert_eq!(output.metrics.word_count, 5);
        assert_eq!(output.metrics.reading_time_minutes, 1);
    }
}
