use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;

/// Allow-list for rendered document fragments. Everything the block renderer
/// emits passes; anything smuggled in through content (script tags, event
/// handlers, `javascript:` hrefs) is dropped.
pub(crate) fn build_document_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "code",
        "em",
        "figcaption",
        "figure",
        "h2",
        "h3",
        "h4",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "span",
        "strong",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "data-link-kind",
        "data-role",
        "data-language",
    ]);
    builder.generic_attributes(generic);

    builder.link_rel(None);
    builder.add_tag_attributes("a", &["target", "rel"]);
    builder.add_tag_attributes(
        "img",
        &["alt", "width", "height", "loading", "decoding"],
    );

    builder.url_schemes(HashSet::from(["http", "https", "mailto", "tel"]));

    builder
}
