//! Structured rich-content documents as delivered by the content store.
//!
//! The store hands out portable-text style JSON. [`Document::from_json`] is the
//! only place that shape is trusted: every entry is checked against the schema
//! below and anything that does not fit becomes [`Block::Unknown`], so one bad
//! block never poisons the rest of the document.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

/// An ordered sequence of content blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
    Code(CodeBlock),
    /// A block whose type is not part of the schema or whose fields were malformed.
    Unknown { key: Option<String>, kind: String },
}

impl Block {
    pub fn key(&self) -> Option<&str> {
        match self {
            Block::Text(block) => block.key.as_deref(),
            Block::Image(block) => block.key.as_deref(),
            Block::Code(block) => block.key.as_deref(),
            Block::Unknown { key, .. } => key.as_deref(),
        }
    }

    fn clear_key(&mut self) {
        match self {
            Block::Text(block) => block.key = None,
            Block::Image(block) => block.key = None,
            Block::Code(block) => block.key = None,
            Block::Unknown { key, .. } => *key = None,
        }
    }

    /// Schema type name, used in logs and degradation reports.
    pub fn kind(&self) -> &str {
        match self {
            Block::Text(_) => "block",
            Block::Image(_) => "image",
            Block::Code(_) => "code",
            Block::Unknown { kind, .. } => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub key: Option<String>,
    pub style: BlockStyle,
    pub children: Vec<Span>,
    pub list: Option<ListItem>,
}

impl TextBlock {
    /// Concatenated span text with marks ignored.
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }

    /// Whether this block receives an anchor id (h2/h3 only).
    pub fn is_anchored_heading(&self) -> bool {
        matches!(self.style, BlockStyle::H2 | BlockStyle::H3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockStyle {
    Normal,
    H2,
    H3,
    H4,
    Blockquote,
    /// Any style outside the schema (`h1`, `h5`, custom styles).
    Other(String),
}

impl BlockStyle {
    pub fn parse(value: &str) -> Self {
        match value {
            "normal" => BlockStyle::Normal,
            "h2" => BlockStyle::H2,
            "h3" => BlockStyle::H3,
            "h4" => BlockStyle::H4,
            "blockquote" => BlockStyle::Blockquote,
            other => BlockStyle::Other(other.to_string()),
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockStyle::H2 => Some(2),
            BlockStyle::H3 => Some(3),
            BlockStyle::H4 => Some(4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "bullet" => Some(ListKind::Bullet),
            "number" => Some(ListKind::Number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem {
    pub kind: ListKind,
    /// Nesting depth, starting at 1.
    pub level: u8,
}

/// A run of text carrying zero or more inline marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Strong,
    Em,
    Underline,
    StrikeThrough,
    Code,
    Link(Link),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    /// True when the href leaves the site and must open in a new context.
    pub external: bool,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        let href = href.into();
        let external = href.starts_with("http");
        Self { href, external }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    pub key: Option<String>,
    pub asset: Option<AssetRef>,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub key: Option<String>,
    pub code: String,
    pub language: Option<String>,
    pub filename: Option<String>,
}

/// Reference to an image asset held by the content store.
///
/// Store ids look like `image-<hash>-<width>x<height>-<ext>`; ids that do not
/// follow the pattern are kept verbatim with unknown dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub reference: String,
    pub hash: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub extension: Option<String>,
}

impl AssetRef {
    pub fn parse(reference: &str) -> Self {
        let mut asset = Self {
            reference: reference.to_string(),
            hash: None,
            width: None,
            height: None,
            extension: None,
        };

        let Some(rest) = reference.strip_prefix("image-") else {
            return asset;
        };
        let mut parts = rest.rsplitn(3, '-');
        let (Some(extension), Some(dimensions), Some(hash)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return asset;
        };
        let Some((width, height)) = dimensions.split_once('x') else {
            return asset;
        };
        let (Ok(width), Ok(height)) = (width.parse::<u32>(), height.parse::<u32>()) else {
            return asset;
        };
        if hash.is_empty() || extension.is_empty() {
            return asset;
        }

        asset.hash = Some(hash.to_string());
        asset.width = Some(width);
        asset.height = Some(height);
        asset.extension = Some(extension.to_string());
        asset
    }
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Build a document from the content store's block array.
    ///
    /// Input that is not an array yields an empty document. Block keys must be
    /// unique; a repeated `_key` is dropped from every block after the first.
    pub fn from_json(value: &Value) -> Self {
        let Some(entries) = value.as_array() else {
            return Self::default();
        };

        let mut seen = HashSet::new();
        let blocks = entries
            .iter()
            .map(|entry| {
                let mut block = parse_block(entry);
                let repeated = block.key().is_some_and(|key| !seen.insert(key.to_string()));
                if repeated {
                    block.clear_key();
                }
                block
            })
            .collect();

        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Deserialize)]
struct RawTextBlock {
    #[serde(rename = "_key")]
    key: Option<String>,
    style: Option<String>,
    #[serde(default)]
    children: Vec<Value>,
    #[serde(rename = "markDefs", default)]
    mark_defs: Vec<RawMarkDef>,
    #[serde(rename = "listItem")]
    list_item: Option<String>,
    level: Option<i64>,
}

#[derive(Deserialize)]
struct RawMarkDef {
    #[serde(rename = "_key")]
    key: String,
    #[serde(rename = "_type")]
    kind: String,
    href: Option<String>,
}

#[derive(Deserialize)]
struct RawSpan {
    #[serde(default)]
    text: String,
    #[serde(default)]
    marks: Vec<String>,
}

#[derive(Deserialize)]
struct RawImageBlock {
    #[serde(rename = "_key")]
    key: Option<String>,
    asset: Option<RawAsset>,
    alt: Option<String>,
    caption: Option<String>,
}

#[derive(Deserialize)]
struct RawAsset {
    #[serde(rename = "_ref")]
    reference: Option<String>,
}

#[derive(Deserialize)]
struct RawCodeBlock {
    #[serde(rename = "_key")]
    key: Option<String>,
    code: String,
    language: Option<String>,
    filename: Option<String>,
}

fn parse_block(value: &Value) -> Block {
    let key = value
        .get("_key")
        .and_then(Value::as_str)
        .map(str::to_string);
    let Some(kind) = value.get("_type").and_then(Value::as_str) else {
        return Block::Unknown {
            key,
            kind: "untyped".to_string(),
        };
    };

    let parsed = match kind {
        "block" => RawTextBlock::deserialize(value)
            .ok()
            .map(|raw| Block::Text(text_block(raw))),
        "image" => RawImageBlock::deserialize(value)
            .ok()
            .map(|raw| Block::Image(image_block(raw))),
        "code" => RawCodeBlock::deserialize(value)
            .ok()
            .map(|raw| Block::Code(code_block(raw))),
        _ => None,
    };

    parsed.unwrap_or_else(|| Block::Unknown {
        key,
        kind: kind.to_string(),
    })
}

fn text_block(raw: RawTextBlock) -> TextBlock {
    let links: HashMap<&str, &RawMarkDef> = raw
        .mark_defs
        .iter()
        .map(|def| (def.key.as_str(), def))
        .collect();

    let children = raw
        .children
        .iter()
        .filter(|child| child.get("_type").and_then(Value::as_str).unwrap_or("span") == "span")
        .filter_map(|child| RawSpan::deserialize(child).ok())
        .map(|span| Span {
            text: span.text,
            marks: span
                .marks
                .iter()
                .map(|mark| resolve_mark(mark, &links))
                .collect(),
        })
        .collect();

    let list = raw
        .list_item
        .as_deref()
        .and_then(ListKind::parse)
        .map(|kind| ListItem {
            kind,
            level: raw
                .level
                .map(|level| level.clamp(1, i64::from(u8::MAX)) as u8)
                .unwrap_or(1),
        });

    TextBlock {
        key: raw.key.filter(|key| !key.is_empty()),
        style: BlockStyle::parse(raw.style.as_deref().unwrap_or("normal")),
        children,
        list,
    }
}

fn resolve_mark(mark: &str, definitions: &HashMap<&str, &RawMarkDef>) -> Mark {
    match mark {
        "strong" => Mark::Strong,
        "em" => Mark::Em,
        "underline" => Mark::Underline,
        "strike-through" => Mark::StrikeThrough,
        "code" => Mark::Code,
        key => match definitions.get(key) {
            Some(def) if def.kind == "link" => match def.href.as_deref() {
                Some(href) if !href.trim().is_empty() => Mark::Link(Link::new(href.trim())),
                _ => Mark::Unknown(key.to_string()),
            },
            _ => Mark::Unknown(key.to_string()),
        },
    }
}

fn image_block(raw: RawImageBlock) -> ImageBlock {
    ImageBlock {
        key: raw.key.filter(|key| !key.is_empty()),
        asset: raw
            .asset
            .and_then(|asset| asset.reference)
            .filter(|reference| !reference.is_empty())
            .map(|reference| AssetRef::parse(&reference)),
        alt: raw.alt.filter(|alt| !alt.trim().is_empty()),
        caption: raw.caption.filter(|caption| !caption.trim().is_empty()),
    }
}

fn code_block(raw: RawCodeBlock) -> CodeBlock {
    CodeBlock {
        key: raw.key.filter(|key| !key.is_empty()),
        code: raw.code,
        language: raw.language.filter(|lang| !lang.trim().is_empty()),
        filename: raw.filename.filter(|name| !name.trim().is_empty()),
    }
}
