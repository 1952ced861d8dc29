use syntect::{html::ClassStyle, parsing::SyntaxSet};
use tracing::warn;

use crate::application::render::types::{
    ContentMetrics, Degradation, DegradationReason, ImageOptions, RenderContext,
};
use crate::domain::content::{
    Block, BlockStyle, CodeBlock, ImageBlock, Link, ListItem, ListKind, Mark, Span, TextBlock,
};

use super::{
    highlight::{highlight_code, plain_code},
    labels::code_label,
};

/// Mutable state for one pass over a document.
pub(crate) struct BlockWriter<'a> {
    context: &'a RenderContext<'a>,
    syntax_set: &'a SyntaxSet,
    class_style: &'a ClassStyle,
    html: String,
    open_lists: Vec<OpenList>,
    word_count: u32,
    metrics: ContentMetrics,
    degradations: Vec<Degradation>,
}

#[derive(Debug, Clone, Copy)]
struct OpenList {
    kind: ListKind,
    level: u8,
}

pub(crate) struct WrittenBlocks {
    pub html: String,
    pub metrics: ContentMetrics,
    pub degradations: Vec<Degradation>,
}

impl<'a> BlockWriter<'a> {
    pub(crate) fn new(
        context: &'a RenderContext<'a>,
        syntax_set: &'a SyntaxSet,
        class_style: &'a ClassStyle,
    ) -> Self {
        Self {
            context,
            syntax_set,
            class_style,
            html: String::new(),
            open_lists: Vec::new(),
            word_count: 0,
            metrics: ContentMetrics::default(),
            degradations: Vec::new(),
        }
    }

    pub(crate) fn write_block(&mut self, block: &Block) {
        match block {
            Block::Text(text) => match text.list {
                Some(item) => self.write_list_item(text, item),
                None => {
                    self.close_lists();
                    self.write_text(text);
                }
            },
            Block::Image(image) => {
                self.close_lists();
                self.write_image(image);
            }
            Block::Code(code) => {
                self.close_lists();
                self.write_code(code);
            }
            Block::Unknown { .. } => {
                self.close_lists();
                self.degrade(block.key(), block.kind(), DegradationReason::UnknownBlock);
            }
        }
    }

    pub(crate) fn finish(mut self) -> WrittenBlocks {
        self.close_lists();

        let mut metrics = self.metrics;
        metrics.word_count = self.word_count;
        metrics.reading_time_minutes = reading_time_minutes(self.word_count);

        WrittenBlocks {
            html: self.html,
            metrics,
            degradations: self.degradations,
        }
    }

    fn write_text(&mut self, block: &TextBlock) {
        let (open, close) = match &block.style {
            BlockStyle::Normal => ("<p>".to_string(), "</p>"),
            BlockStyle::Blockquote => ("<blockquote>".to_string(), "</blockquote>"),
            BlockStyle::H2 => (self.anchored_open("h2", block), "</h2>"),
            BlockStyle::H3 => (self.anchored_open("h3", block), "</h3>"),
            BlockStyle::H4 => ("<h4>".to_string(), "</h4>"),
            BlockStyle::Other(style) => {
                let kind = format!("block/{style}");
                self.degrade(
                    block.key.as_deref(),
                    &kind,
                    DegradationReason::UnsupportedStyle,
                );
                return;
            }
        };

        if block.style.heading_level().is_some() {
            self.metrics.headings_count += 1;
        }

        self.html.push_str(&open);
        self.write_spans(&block.children);
        self.html.push_str(close);
    }

    fn anchored_open(&self, tag: &str, block: &TextBlock) -> String {
        match self.heading_id(block) {
            Some(id) => format!("<{tag} id=\"{}\">", escape_attribute(id)),
            None => format!("<{tag}>"),
        }
    }

    fn heading_id(&self, block: &TextBlock) -> Option<&'a str> {
        if !block.is_anchored_heading() {
            return None;
        }
        let heading_ids = self.context.heading_ids;
        block.key.as_deref().and_then(|key| heading_ids.get(key))
    }

    fn write_list_item(&mut self, block: &TextBlock, item: ListItem) {
        while let Some(top) = self.open_lists.last().copied() {
            if top.level > item.level {
                self.close_top_list();
            } else if top.level == item.level && top.kind != item.kind {
                self.close_top_list();
                break;
            } else {
                break;
            }
        }

        match self.open_lists.last().copied() {
            Some(top) if top.level == item.level => self.html.push_str("</li>"),
            _ => {
                self.html.push_str(list_open_tag(item.kind));
                self.open_lists.push(OpenList {
                    kind: item.kind,
                    level: item.level,
                });
            }
        }

        match self.heading_id(block) {
            Some(id) => {
                self.html.push_str("<li id=\"");
                self.html.push_str(&escape_attribute(id));
                self.html.push_str("\">");
            }
            None => self.html.push_str("<li>"),
        }
        self.write_spans(&block.children);
    }

    fn close_top_list(&mut self) {
        if let Some(list) = self.open_lists.pop() {
            self.html.push_str("</li>");
            self.html.push_str(list_close_tag(list.kind));
        }
    }

    fn close_lists(&mut self) {
        while !self.open_lists.is_empty() {
            self.close_top_list();
        }
    }

    fn write_spans(&mut self, spans: &[Span]) {
        for span in spans {
            self.write_span(span);
        }
    }

    fn write_span(&mut self, span: &Span) {
        self.word_count += count_words(&span.text);

        let link = span.marks.iter().find_map(|mark| match mark {
            Mark::Link(link) => Some(link),
            _ => None,
        });
        let decorators: Vec<&'static str> = span.marks.iter().filter_map(decorator_tag).collect();

        if let Some(link) = link {
            self.open_link(link);
        }
        for tag in &decorators {
            self.html.push('<');
            self.html.push_str(tag);
            self.html.push('>');
        }
        self.html.push_str(&escape_text(&span.text));
        for tag in decorators.iter().rev() {
            self.html.push_str("</");
            self.html.push_str(tag);
            self.html.push('>');
        }
        if link.is_some() {
            self.html.push_str("</a>");
        }
    }

    fn open_link(&mut self, link: &Link) {
        let href = escape_attribute(&link.href);
        if link.external {
            self.metrics.external_links_count += 1;
            self.html.push_str(&format!(
                "<a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\" data-link-kind=\"external\">"
            ));
        } else {
            self.metrics.internal_links_count += 1;
            self.html
                .push_str(&format!("<a href=\"{href}\" data-link-kind=\"internal\">"));
        }
    }

    fn write_image(&mut self, image: &ImageBlock) {
        let Some(asset) = image.asset.as_ref() else {
            self.degrade(image.key.as_deref(), "image", DegradationReason::MissingAsset);
            return;
        };
        let Some(src) = self.context.assets.image_url(asset, &ImageOptions::auto()) else {
            self.degrade(
                image.key.as_deref(),
                "image",
                DegradationReason::UnresolvedAsset,
            );
            return;
        };

        self.metrics.images_count += 1;

        let mut tag = format!(
            "<figure><img src=\"{}\" alt=\"{}\" loading=\"lazy\" decoding=\"async\"",
            escape_attribute(&src),
            escape_attribute(image.alt.as_deref().unwrap_or_default())
        );
        if let (Some(width), Some(height)) = (asset.width, asset.height) {
            tag.push_str(&format!(" width=\"{width}\" height=\"{height}\""));
        }
        tag.push('>');
        self.html.push_str(&tag);

        if let Some(caption) = image.caption.as_deref() {
            self.word_count += count_words(caption);
            self.html.push_str("<figcaption>");
            self.html.push_str(&escape_text(caption));
            self.html.push_str("</figcaption>");
        }
        self.html.push_str("</figure>");
    }

    fn write_code(&mut self, block: &CodeBlock) {
        self.metrics.code_blocks_count += 1;

        let language = block.language.as_deref();
        let pre = highlight_code(language, &block.code, self.syntax_set, self.class_style)
            .unwrap_or_else(|err| {
                warn!(
                    target = "application::render",
                    key = block.key.as_deref().unwrap_or_default(),
                    error = %err,
                    "falling back to plain code block"
                );
                plain_code(language, &block.code)
            });

        self.html.push_str("<figure data-role=\"code-block\"><figcaption>");
        self.html.push_str(&escape_text(&code_label(block)));
        self.html.push_str("</figcaption>");
        self.html.push_str(&pre);
        self.html.push_str("</figure>");
    }

    fn degrade(&mut self, key: Option<&str>, kind: &str, reason: DegradationReason) {
        warn!(
            target = "application::render",
            key = key.unwrap_or_default(),
            kind,
            reason = reason.as_str(),
            "omitting block from rendered output"
        );
        self.degradations.push(Degradation {
            key: key.map(str::to_string),
            kind: kind.to_string(),
            reason,
        });
    }
}

fn decorator_tag(mark: &Mark) -> Option<&'static str> {
    match mark {
        Mark::Strong => Some("strong"),
        Mark::Em => Some("em"),
        Mark::Underline => Some("u"),
        Mark::StrikeThrough => Some("s"),
        Mark::Code => Some("code"),
        Mark::Link(_) | Mark::Unknown(_) => None,
    }
}

fn list_open_tag(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bullet => "<ul>",
        ListKind::Number => "<ol>",
    }
}

fn list_close_tag(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bullet => "</ul>",
        ListKind::Number => "</ol>",
    }
}

fn count_words(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

fn reading_time_minutes(word_count: u32) -> u32 {
    if word_count == 0 {
        return 0;
    }
    let minutes = (word_count as f32 / 225.0).ceil() as u32;
    minutes.max(1)
}

pub(crate) fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}
