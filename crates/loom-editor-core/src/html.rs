//! HTML codec for documents.
//!
//! Serialization emits the editor's HTML subset. Parsing is lossy-safe: any
//! input produces a document. Tags outside the subset are transparent,
//! attributes nobody reads are ignored and malformed markup degrades to text.
//! Each such degradation is logged and collected as a [`ParseFallback`].

use std::fmt::Write as _;
use std::sync::LazyLock;

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use smol_str::SmolStr;

use crate::content::{ImageAttrs, Inline};
use crate::document::{Block, BlockAttrs, BlockKind, BlockType, Document, DocumentBuilder, TextAlign};
use crate::extensions::{ExtensionRegistry, HtmlElement, HtmlTag};
use crate::marks::{Mark, MarkSet};

static DEFAULT_REGISTRY: LazyLock<ExtensionRegistry> = LazyLock::new(ExtensionRegistry::default);

/// The built-in mark registry, shared.
pub fn default_registry() -> &'static ExtensionRegistry {
    &DEFAULT_REGISTRY
}

/// Tags that end the current block and are otherwise ignored.
const BLOCK_BOUNDARY_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header",
    "html", "main", "nav", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead",
    "tr",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "col", "embed", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Inline tags the built-in extensions understand, plus plain `<span>`.
const KNOWN_INLINE_TAGS: &[&str] = &[
    "b", "code", "del", "em", "i", "s", "span", "strike", "strong",
];

/// Elements whose content is dropped entirely.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "template", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackKind {
    /// Inline tag outside the subset; its text was kept unmarked.
    UnknownTag,
    /// Block-level tag outside the subset; treated as a block boundary.
    UnknownBlockTag,
    /// Something that looked like a tag but was not; kept as text.
    MalformedTag,
    /// End tag with no matching start tag.
    StrayEndTag,
    /// Element that cannot be represented where it appeared.
    IgnoredElement,
    /// Script or style content.
    DroppedContent,
}

/// One lossy step taken while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFallback {
    pub kind: FallbackKind,
    pub detail: String,
}

/// Serialize with the built-in registry.
pub fn to_html(doc: &Document) -> String {
    serialize(doc, default_registry())
}

pub fn serialize(doc: &Document, registry: &ExtensionRegistry) -> String {
    let mut out = String::new();
    let mut open_list: Option<BlockType> = None;

    for block in doc.blocks() {
        let list = match block.kind {
            BlockKind::BulletListItem => Some(BlockType::BulletListItem),
            BlockKind::OrderedListItem => Some(BlockType::OrderedListItem),
            _ => None,
        };
        if open_list != list {
            if let Some(previous) = open_list {
                out.push_str(list_tag(previous, true));
            }
            if let Some(next) = list {
                out.push_str(list_tag(next, false));
            }
            open_list = list;
        }

        match &block.kind {
            BlockKind::Paragraph => write_paragraph(&mut out, block, registry),
            BlockKind::BulletListItem | BlockKind::OrderedListItem => {
                out.push_str("<li>");
                write_paragraph(&mut out, block, registry);
                out.push_str("</li>");
            }
            BlockKind::CodeBlock { language } => {
                out.push_str("<pre><code");
                if let Some(language) = language {
                    let _ = write!(
                        out,
                        " class=\"language-{}\"",
                        encode_double_quoted_attribute(language)
                    );
                }
                out.push('>');
                out.push_str(&encode_text(&block.text()));
                out.push_str("</code></pre>");
            }
            BlockKind::HorizontalRule => out.push_str("<hr>"),
            BlockKind::Image(attrs) => write_image(&mut out, attrs),
        }
    }
    if let Some(previous) = open_list {
        out.push_str(list_tag(previous, true));
    }
    out
}

fn list_tag(list: BlockType, close: bool) -> &'static str {
    match (list, close) {
        (BlockType::OrderedListItem, false) => "<ol>",
        (BlockType::OrderedListItem, true) => "</ol>",
        (_, false) => "<ul>",
        (_, true) => "</ul>",
    }
}

fn write_paragraph(out: &mut String, block: &Block, registry: &ExtensionRegistry) {
    match block.attrs.text_align {
        TextAlign::Left => out.push_str("<p>"),
        align => {
            let _ = write!(out, "<p style=\"text-align: {}\">", align.as_str());
        }
    }
    write_inline(out, &block.content, registry);
    out.push_str("</p>");
}

fn write_image(out: &mut String, attrs: &ImageAttrs) {
    let _ = write!(out, "<img src=\"{}\"", encode_double_quoted_attribute(&attrs.src));
    if let Some(alt) = &attrs.alt {
        let _ = write!(out, " alt=\"{}\"", encode_double_quoted_attribute(alt));
    }
    out.push('>');
}

fn write_open_tag(out: &mut String, tag: &HtmlTag) {
    out.push('<');
    out.push_str(tag.name);
    for (name, value) in &tag.attrs {
        let _ = write!(out, " {}=\"{}\"", name, encode_double_quoted_attribute(value));
    }
    out.push('>');
}

/// Marks shared with the previous run stay open; only the differing suffix is
/// closed and reopened.
fn write_inline(out: &mut String, content: &[Inline], registry: &ExtensionRegistry) {
    let mut open: Vec<(&Mark, &'static str)> = Vec::new();

    for inline in content {
        let wanted: Vec<(&Mark, HtmlTag)> = match inline {
            Inline::Text { marks, .. } => marks
                .iter()
                .filter_map(|mark| registry.serialize_mark(mark).map(|tag| (mark, tag)))
                .collect(),
            Inline::Image(_) => Vec::new(),
        };

        let keep = open
            .iter()
            .zip(&wanted)
            .take_while(|((open_mark, _), (mark, _))| open_mark == mark)
            .count();
        while open.len() > keep {
            if let Some((_, name)) = open.pop() {
                let _ = write!(out, "</{name}>");
            }
        }
        for (mark, tag) in wanted.into_iter().skip(keep) {
            write_open_tag(out, &tag);
            open.push((mark, tag.name));
        }

        match inline {
            Inline::Text { text, .. } => out.push_str(&encode_text(text)),
            Inline::Image(attrs) => write_image(out, attrs),
        }
    }
    while let Some((_, name)) = open.pop() {
        let _ = write!(out, "</{name}>");
    }
}

/// Parse with the built-in registry.
pub fn from_html(html: &str) -> Document {
    parse(html, default_registry())
}

pub fn parse(html: &str, registry: &ExtensionRegistry) -> Document {
    parse_with_report(html, registry).0
}

/// Parse, also returning every fallback taken.
pub fn parse_with_report(html: &str, registry: &ExtensionRegistry) -> (Document, Vec<ParseFallback>) {
    let mut fallbacks = Vec::new();
    let tokens = tokenize(html, &mut fallbacks);
    let mut builder = TreeBuilder::new(registry, fallbacks);
    for token in tokens {
        match token {
            Token::Start {
                element,
                self_closing,
            } => builder.start(element, self_closing),
            Token::End(name) => builder.end(&name),
            Token::Text(text) => builder.text(&text),
        }
    }
    builder.finish()
}

fn report(fallbacks: &mut Vec<ParseFallback>, kind: FallbackKind, detail: impl Into<String>) {
    let detail = detail.into();
    tracing::debug!(?kind, %detail, "html parse fallback");
    fallbacks.push(ParseFallback { kind, detail });
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Start {
        element: HtmlElement,
        self_closing: bool,
    },
    End(SmolStr),
    Text(String),
}

fn tokenize(src: &str, fallbacks: &mut Vec<ParseFallback>) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    let flush = |text: &mut String, tokens: &mut Vec<Token>| {
        if !text.is_empty() {
            tokens.push(Token::Text(decode_html_entities(text.as_str()).into_owned()));
            text.clear();
        }
    };

    while pos < src.len() {
        let rest = &src[pos..];
        if let Some(comment) = rest.strip_prefix("<!--") {
            flush(&mut text, &mut tokens);
            pos += comment.find("-->").map(|idx| idx + 7).unwrap_or(rest.len());
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            flush(&mut text, &mut tokens);
            pos += rest.find('>').map(|idx| idx + 1).unwrap_or(rest.len());
            continue;
        }
        if rest.starts_with('<') {
            match lex_tag(rest) {
                Some((Token::Start { element, .. }, consumed))
                    if RAW_TEXT_TAGS.contains(&element.tag.as_str()) =>
                {
                    flush(&mut text, &mut tokens);
                    let body = &rest[consumed..];
                    let close = format!("</{}", element.tag);
                    let skipped = body
                        .to_ascii_lowercase()
                        .find(&close)
                        .and_then(|idx| body[idx..].find('>').map(|end| idx + end + 1))
                        .unwrap_or(body.len());
                    report(
                        fallbacks,
                        FallbackKind::DroppedContent,
                        format!("<{}> content", element.tag),
                    );
                    pos += consumed + skipped;
                }
                Some((token, consumed)) => {
                    flush(&mut text, &mut tokens);
                    tokens.push(token);
                    pos += consumed;
                }
                None => {
                    let preview: String = rest.chars().take(12).collect();
                    report(fallbacks, FallbackKind::MalformedTag, preview);
                    text.push('<');
                    pos += 1;
                }
            }
            continue;
        }
        let end = rest.find('<').unwrap_or(rest.len());
        text.push_str(&rest[..end]);
        pos += end;
    }
    flush(&mut text, &mut tokens);
    tokens
}

/// Lex one tag at the start of `src`. `None` if it is not a well-formed tag.
fn lex_tag(src: &str) -> Option<(Token, usize)> {
    let bytes = src.as_bytes();
    let closing = bytes.get(1) == Some(&b'/');
    let name_start = if closing { 2 } else { 1 };
    let mut i = name_start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let name = SmolStr::from(src[name_start..i].to_ascii_lowercase());

    if closing {
        let end = src[i..].find('>')?;
        return Some((Token::End(name), i + end + 1));
    }

    let mut element = HtmlElement::new(name);
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                i += 1;
                if bytes.get(i) == Some(&b'>') {
                    i += 1;
                    self_closing = true;
                    break;
                }
                continue;
            }
            Some(_) => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == attr_start {
            // a lone '='
            i += 1;
            continue;
        }
        let attr_name = SmolStr::from(src[attr_start..i].to_ascii_lowercase());
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = "";
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    i += 1;
                    let close = src[i..].find(quote as char)?;
                    value = &src[i..i + close];
                    i += close + 1;
                }
                _ => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = &src[value_start..i];
                }
            }
        }
        element
            .attrs
            .push((attr_name, decode_html_entities(value).into_owned()));
    }
    Some((
        Token::Start {
            element,
            self_closing,
        },
        i,
    ))
}

struct OpenBlock {
    kind: BlockKind,
    attrs: BlockAttrs,
    content: Vec<Inline>,
}

impl OpenBlock {
    fn new(kind: BlockKind, align: Option<TextAlign>) -> Self {
        Self {
            kind,
            attrs: BlockAttrs {
                text_align: align.unwrap_or_default(),
            },
            content: Vec::new(),
        }
    }
}

/// A `<li>` whose paragraph has not started yet.
struct PendingItem {
    kind: BlockType,
    align: Option<TextAlign>,
}

struct InlineFrame {
    tag: SmolStr,
    marks: Vec<Mark>,
}

struct TreeBuilder<'r> {
    registry: &'r ExtensionRegistry,
    doc: DocumentBuilder,
    current: Option<OpenBlock>,
    frames: Vec<InlineFrame>,
    lists: Vec<BlockType>,
    pending_item: Option<PendingItem>,
    pre_depth: usize,
    fallbacks: Vec<ParseFallback>,
}

impl<'r> TreeBuilder<'r> {
    fn new(registry: &'r ExtensionRegistry, fallbacks: Vec<ParseFallback>) -> Self {
        Self {
            registry,
            doc: DocumentBuilder::new(),
            current: None,
            frames: Vec::new(),
            lists: Vec::new(),
            pending_item: None,
            pre_depth: 0,
            fallbacks,
        }
    }

    fn fallback(&mut self, kind: FallbackKind, detail: impl Into<String>) {
        report(&mut self.fallbacks, kind, detail);
    }

    fn close_block(&mut self) {
        if let Some(block) = self.current.take() {
            self.doc.push(block.kind, block.attrs, block.content);
        }
    }

    fn flush_pending_item(&mut self) {
        if let Some(item) = self.pending_item.take() {
            self.doc.push(
                item.kind.kind(),
                BlockAttrs {
                    text_align: item.align.unwrap_or_default(),
                },
                Vec::new(),
            );
        }
    }

    fn open_block(&mut self, kind: BlockKind, align: Option<TextAlign>) {
        self.close_block();
        self.current = Some(OpenBlock::new(kind, align));
    }

    /// The open inline block, opening the pending list item or an implicit
    /// paragraph if needed.
    fn inline_block(&mut self) -> &mut Vec<Inline> {
        let block = match (self.current.take(), self.pending_item.take()) {
            (Some(block), pending) => {
                self.pending_item = pending;
                block
            }
            (None, Some(item)) => OpenBlock::new(item.kind.kind(), item.align),
            (None, None) => OpenBlock::new(BlockKind::Paragraph, None),
        };
        &mut self.current.insert(block).content
    }

    fn current_marks(&self) -> MarkSet {
        let mut marks = MarkSet::new();
        for frame in &self.frames {
            for mark in &frame.marks {
                marks.insert(mark.clone());
            }
        }
        marks
    }

    fn text(&mut self, text: &str) {
        if self.pre_depth > 0 {
            if !self.current.as_ref().is_some_and(|block| block.kind.is_code()) {
                self.open_block(BlockKind::CodeBlock { language: None }, None);
            }
            self.inline_block().push(Inline::plain(text));
            return;
        }

        let whitespace_only = text.chars().all(char::is_whitespace);
        if whitespace_only && (self.current.is_none() || text.contains('\n')) {
            return;
        }
        // newlines become spaces, tabs stay
        let text = text.replace(['\n', '\r'], " ");
        let marks = self.current_marks();
        let accepts_marks = self
            .current
            .as_ref()
            .is_none_or(|block| block.kind.accepts_marks());
        let marks = if accepts_marks { marks } else { MarkSet::new() };
        self.inline_block().push(Inline::text(text, marks));
    }

    fn start(&mut self, element: HtmlElement, self_closing: bool) {
        let tag = element.tag.clone();
        match tag.as_str() {
            "p" => {
                let align = element.style("text-align").and_then(TextAlign::parse);
                match self.pending_item.take() {
                    Some(item) => self.open_block(item.kind.kind(), align.or(item.align)),
                    None => self.open_block(BlockKind::Paragraph, align),
                }
            }
            "ul" | "ol" => {
                self.close_block();
                self.lists.push(if tag == "ul" {
                    BlockType::BulletListItem
                } else {
                    BlockType::OrderedListItem
                });
            }
            "li" => {
                self.close_block();
                self.flush_pending_item();
                let kind = match self.lists.last() {
                    Some(kind) => *kind,
                    None => {
                        self.fallback(FallbackKind::IgnoredElement, "<li> outside a list");
                        BlockType::BulletListItem
                    }
                };
                self.pending_item = Some(PendingItem {
                    kind,
                    align: element.style("text-align").and_then(TextAlign::parse),
                });
            }
            "pre" => {
                self.pending_item = None;
                self.pre_depth += 1;
                self.open_block(BlockKind::CodeBlock { language: None }, None);
            }
            "code" if self.pre_depth > 0 => {
                let language = element
                    .attr("class")
                    .and_then(|class| {
                        class
                            .split_whitespace()
                            .find_map(|name| name.strip_prefix("language-"))
                    })
                    .filter(|language| !language.is_empty())
                    .map(SmolStr::from);
                if let Some(OpenBlock {
                    kind: BlockKind::CodeBlock { language: slot },
                    content,
                    ..
                }) = &mut self.current
                {
                    if content.is_empty() && language.is_some() {
                        *slot = language;
                    }
                }
            }
            "hr" => {
                self.close_block();
                self.flush_pending_item();
                self.doc
                    .push(BlockKind::HorizontalRule, BlockAttrs::default(), Vec::new());
            }
            "img" => self.image(&element),
            "br" => {
                if self.pre_depth > 0 {
                    self.text("\n");
                } else if self.current.is_some() {
                    self.fallback(FallbackKind::IgnoredElement, "<br> replaced by a space");
                    let marks = self.current_marks();
                    self.inline_block().push(Inline::text(" ", marks));
                } else {
                    self.fallback(FallbackKind::IgnoredElement, "<br> between blocks");
                }
            }
            other if BLOCK_BOUNDARY_TAGS.contains(&other) => {
                self.close_block();
                if !matches!(other, "html" | "head" | "body") {
                    self.fallback(FallbackKind::UnknownBlockTag, format!("<{other}>"));
                }
            }
            other if VOID_TAGS.contains(&other) => {
                self.fallback(FallbackKind::IgnoredElement, format!("<{other}>"));
            }
            other => {
                let marks = self.registry.parse_marks(&element);
                if !KNOWN_INLINE_TAGS.contains(&other) && marks.is_empty() {
                    self.fallback(FallbackKind::UnknownTag, format!("<{other}>"));
                }
                if !self_closing {
                    self.frames.push(InlineFrame { tag, marks });
                }
            }
        }
    }

    fn image(&mut self, element: &HtmlElement) {
        let Some(src) = element.attr("src").filter(|src| !src.is_empty()) else {
            self.fallback(FallbackKind::IgnoredElement, "<img> without src");
            return;
        };
        let attrs = ImageAttrs {
            src: src.into(),
            alt: element.attr("alt").map(SmolStr::from),
        };
        if self.pre_depth > 0 {
            self.fallback(FallbackKind::IgnoredElement, "<img> inside code block");
            return;
        }
        let inline = self
            .current
            .as_ref()
            .is_some_and(|block| block.kind.accepts_marks())
            || self.pending_item.is_some();
        if inline {
            self.inline_block().push(Inline::Image(attrs));
        } else {
            self.close_block();
            self.doc
                .push(BlockKind::Image(attrs), BlockAttrs::default(), Vec::new());
        }
    }

    fn end(&mut self, name: &str) {
        match name {
            "p" if self.pre_depth == 0 => self.close_block(),
            "li" => {
                self.close_block();
                self.flush_pending_item();
            }
            "ul" | "ol" => {
                self.close_block();
                self.flush_pending_item();
                if self.lists.pop().is_none() {
                    self.fallback(FallbackKind::StrayEndTag, format!("</{name}>"));
                }
            }
            "pre" => {
                if self.pre_depth > 0 {
                    self.pre_depth -= 1;
                    self.close_block();
                } else {
                    self.fallback(FallbackKind::StrayEndTag, "</pre>");
                }
            }
            "code" if self.pre_depth > 0 => {}
            "p" | "br" | "hr" | "img" => {}
            other if BLOCK_BOUNDARY_TAGS.contains(&other) => self.close_block(),
            other if VOID_TAGS.contains(&other) => {}
            other => match self.frames.iter().rposition(|frame| frame.tag == other) {
                Some(idx) => self.frames.truncate(idx),
                None => self.fallback(FallbackKind::StrayEndTag, format!("</{other}>")),
            },
        }
    }

    fn finish(mut self) -> (Document, Vec<ParseFallback>) {
        self.close_block();
        self.flush_pending_item();
        (self.doc.build(), self.fallbacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marks::MarkKind;

    fn roundtrip(doc: &Document) -> Document {
        from_html(&to_html(doc))
    }

    #[test]
    fn test_shared_outer_marks_stay_open() {
        let bold = MarkSet::new().with(Mark::Bold);
        let doc = Document::builder()
            .paragraph(vec![
                Inline::text("a", bold.clone()),
                Inline::text("b", bold.clone().with(Mark::Italic)),
                Inline::text("c", MarkSet::new().with(Mark::Italic)),
            ])
            .build();
        insta::assert_snapshot!(to_html(&doc), @"<p><strong>a<em>b</em></strong><em>c</em></p>");
        assert!(roundtrip(&doc).content_eq(&doc));
    }

    #[test]
    fn test_blocks_serialize() {
        let mut doc = Document::builder()
            .text("intro")
            .bullet_item(vec![Inline::plain("one")])
            .bullet_item(vec![Inline::plain("two")])
            .ordered_item(vec![Inline::plain("first")])
            .rule()
            .image(ImageAttrs::new("a.png").with_alt("a & b"))
            .build();
        if let Some(block) = doc.block_mut(0) {
            block.attrs.text_align = TextAlign::Center;
        }
        insta::assert_snapshot!(to_html(&doc), @r#"<p style="text-align: center">intro</p><ul><li><p>one</p></li><li><p>two</p></li></ul><ol><li><p>first</p></li></ol><hr><img src="a.png" alt="a &amp; b">"#);
        assert!(roundtrip(&doc).content_eq(&doc));
    }

    #[test]
    fn test_code_block_keeps_newlines() {
        let doc = Document::builder()
            .code_block(Some("rust"), "fn main() {\n    1 < 2;\n}")
            .build();
        let html = to_html(&doc);
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">fn main() {\n    1 &lt; 2;\n}</code></pre>"
        );
        let parsed = from_html(&html);
        assert!(parsed.content_eq(&doc));
        assert_eq!(
            parsed.block(0).map(|b| &b.kind),
            Some(&BlockKind::CodeBlock {
                language: Some("rust".into())
            })
        );
    }

    #[test]
    fn test_styled_spans() {
        let marks = MarkSet::new()
            .with(Mark::font_size("24px"))
            .with(Mark::color("#ef4444"));
        let doc = Document::builder()
            .paragraph(vec![Inline::text("big red", marks)])
            .build();
        insta::assert_snapshot!(to_html(&doc), @r#"<p><span style="font-size: 24px"><span style="color: #ef4444">big red</span></span></p>"#);
        assert!(roundtrip(&doc).content_eq(&doc));
    }

    #[test]
    fn test_unknown_tags_are_transparent() {
        let (doc, fallbacks) = parse_with_report(
            "<p>keep <u>this</u> and <blink>that</blink></p>",
            default_registry(),
        );
        assert_eq!(doc.text(), "keep this and that");
        assert_eq!(doc.len(), 1);
        let kinds: Vec<_> = fallbacks.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FallbackKind::UnknownTag, FallbackKind::UnknownTag]);
    }

    #[test]
    fn test_block_boundaries_and_bare_text() {
        let doc = from_html("<h1>Title</h1>loose text<div><p>inner</p></div>");
        let texts: Vec<_> = doc.blocks().map(Block::text).collect();
        assert_eq!(texts, vec!["Title", "loose text", "inner"]);
        assert!(doc.blocks().all(|b| b.kind == BlockKind::Paragraph));
    }

    #[test]
    fn test_malformed_tag_degrades_to_text() {
        let (doc, fallbacks) = parse_with_report("<p>1 < 2 and <b>bold</p>", default_registry());
        assert_eq!(doc.text(), "1 < 2 and bold");
        assert_eq!(fallbacks.len(), 1);
        assert_eq!(fallbacks[0].kind, FallbackKind::MalformedTag);
        let block = doc.block(0).expect("paragraph");
        assert_eq!(
            block.content.last(),
            Some(&Inline::text("bold", MarkSet::new().with(Mark::Bold)))
        );
    }

    #[test]
    fn test_entities_decode() {
        let doc = from_html("<p>fish &amp; chips &lt;3 &quot;ok&quot;</p>");
        assert_eq!(doc.text(), "fish & chips <3 \"ok\"");
    }

    #[test]
    fn test_images_top_level_and_inline() {
        let doc = from_html(r#"<img src="a.png" alt="a"><p>see <img src="b.png"> here</p>"#);
        assert_eq!(doc.len(), 2);
        assert_eq!(
            doc.block(0).map(|b| &b.kind),
            Some(&BlockKind::Image(ImageAttrs::new("a.png").with_alt("a")))
        );
        let para = doc.block(1).expect("paragraph");
        assert_eq!(para.len(), 10);
        assert!(matches!(para.content[1], Inline::Image(_)));
    }

    #[test]
    fn test_script_content_dropped() {
        let (doc, fallbacks) =
            parse_with_report("<p>a</p><script>alert('<p>x</p>')</script><p>b</p>", default_registry());
        assert_eq!(doc.text(), "a\nb");
        assert_eq!(fallbacks[0].kind, FallbackKind::DroppedContent);
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(from_html("").content_eq(&Document::new()));
        assert!(from_html("\n  \n").content_eq(&Document::new()));
        let doc = from_html("<ul>\n  <li></li>\n</ul>");
        assert_eq!(doc.block(0).map(|b| &b.kind), Some(&BlockKind::BulletListItem));
    }

    #[test]
    fn test_tabs_in_text_survive() {
        let doc = Document::builder()
            .text("a\tb")
            .bullet_item(vec![Inline::text("\t", MarkSet::new().with(Mark::Bold))])
            .build();
        let html = to_html(&doc);
        assert_eq!(html, "<p>a\tb</p><ul><li><p><strong>\t</strong></p></li></ul>");
        assert!(from_html(&html).content_eq(&doc));

        let doc = from_html("<p>a\n\tb</p>");
        assert_eq!(doc.text(), "a \tb");
    }

    #[test]
    fn test_code_marks_exclude_others_on_parse() {
        let doc = from_html("<p><strong><code>x</code></strong></p>");
        let block = doc.block(0).expect("paragraph");
        let marks = block.content[0].marks().expect("text");
        assert_eq!(marks.kinds().collect::<Vec<_>>(), vec![MarkKind::Code]);
    }
}
