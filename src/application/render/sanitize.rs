use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;

/// Sanitizer for rendered post bodies and extracted source fragments.
///
/// `rel` handling is disabled here; link annotation happens in the streaming
/// post-processing stage, which only touches external links. Inline `style`
/// is allowed on the highlighting tags because the syntect adapter emits
/// themed spans.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "div",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "ins",
        "kbd",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "span",
        "strong",
        "sub",
        "sup",
        "u",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
        "dl",
        "dt",
        "dd",
        "del",
        "mark",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("pre", &["style"]);
    builder.add_tag_attributes("span", &["style"]);
    builder.add_tag_attributes("a", &["href", "target", "rel"]);
    builder.add_tag_attributes("img", &["src", "alt", "width", "height", "loading"]);
    builder.link_rel(None);

    builder
}
