//! The block-structured document.
//!
//! A [`Document`] is an ordered list of blocks. Blocks are reference counted so
//! that cloning a document (for a transaction scratch copy or a history entry)
//! only copies the block list, and a mutation copies the one block it touches.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::content::{self, ImageAttrs, Inline};
use crate::types::{Position, Selection};

/// Per-document block sequence id. Fresh ids are handed out on parse and
/// whenever a transaction creates a block; splitting keeps the id on the
/// first half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub const ALL: [TextAlign; 4] = [
        TextAlign::Left,
        TextAlign::Center,
        TextAlign::Right,
        TextAlign::Justify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        TextAlign::ALL
            .into_iter()
            .find(|align| value.eq_ignore_ascii_case(align.as_str()))
    }
}

/// What a block is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    BulletListItem,
    OrderedListItem,
    CodeBlock { language: Option<SmolStr> },
    HorizontalRule,
    Image(ImageAttrs),
}

impl BlockKind {
    /// Whether the block owns inline content.
    pub fn is_textblock(&self) -> bool {
        !self.is_leaf()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BlockKind::HorizontalRule | BlockKind::Image(_))
    }

    /// Paragraphs and list items take inline marks and alignment. Code blocks
    /// hold plain text only.
    pub fn accepts_marks(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph | BlockKind::BulletListItem | BlockKind::OrderedListItem
        )
    }

    pub fn supports_alignment(&self) -> bool {
        self.accepts_marks()
    }

    pub fn is_code(&self) -> bool {
        matches!(self, BlockKind::CodeBlock { .. })
    }

    pub fn block_type(&self) -> Option<BlockType> {
        match self {
            BlockKind::Paragraph => Some(BlockType::Paragraph),
            BlockKind::BulletListItem => Some(BlockType::BulletListItem),
            BlockKind::OrderedListItem => Some(BlockType::OrderedListItem),
            BlockKind::CodeBlock { .. } => Some(BlockType::CodeBlock),
            BlockKind::HorizontalRule | BlockKind::Image(_) => None,
        }
    }
}

/// The text block types a block can be converted between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Paragraph,
    BulletListItem,
    OrderedListItem,
    CodeBlock,
}

impl BlockType {
    pub fn kind(self) -> BlockKind {
        match self {
            BlockType::Paragraph => BlockKind::Paragraph,
            BlockType::BulletListItem => BlockKind::BulletListItem,
            BlockType::OrderedListItem => BlockKind::OrderedListItem,
            BlockType::CodeBlock => BlockKind::CodeBlock { language: None },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockAttrs {
    pub text_align: TextAlign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub attrs: BlockAttrs,
    /// Always empty for leaves; unmarked text only for code blocks.
    pub content: Vec<Inline>,
}

impl Block {
    /// Length in position units. Leaves have length 0.
    pub fn len(&self) -> usize {
        content::content_len(&self.content)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn text(&self) -> String {
        content::plain_text(&self.content)
    }

    /// Structural equality ignoring the id.
    pub fn content_eq(&self, other: &Block) -> bool {
        self.kind == other.kind && self.attrs == other.attrs && self.content == other.content
    }

    /// Convert to another text block type in place, reshaping content and
    /// attributes to fit the target.
    pub fn convert(&mut self, kind: BlockKind) {
        if self.kind == kind {
            return;
        }
        if kind.is_code() {
            let text = content::plain_text(&self.content);
            self.content = content::normalize(vec![Inline::plain(text)]);
            self.attrs = BlockAttrs::default();
        } else if self.kind.is_code() {
            let text = content::plain_text(&self.content).replace(['\n', '\r'], " ");
            self.content = content::normalize(vec![Inline::plain(text)]);
        }
        self.kind = kind;
    }

    /// Content reshaped to be appended to a block of `kind`.
    pub fn content_for(content: Vec<Inline>, kind: &BlockKind) -> Vec<Inline> {
        if kind.is_code() {
            content::normalize(vec![Inline::plain(content::plain_text(&content))])
        } else if content.iter().any(|inline| match inline {
            Inline::Text { text, .. } => text.contains(['\n', '\r']),
            Inline::Image(_) => false,
        }) {
            let content = content
                .into_iter()
                .map(|inline| match inline {
                    Inline::Text { text, marks } => {
                        Inline::text(text.replace(['\n', '\r'], " "), marks)
                    }
                    image => image,
                })
                .collect();
            content::normalize(content)
        } else {
            content
        }
    }
}

/// The document: at least one block, always.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Arc<Block>>,
    next_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding one empty paragraph.
    pub fn new() -> Self {
        DocumentBuilder::new().build()
    }

    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true; present for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().map(|block| block.as_ref())
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index).map(|block| block.as_ref())
    }

    pub fn block_by_id(&self, id: BlockId) -> Option<(usize, &Block)> {
        self.blocks()
            .enumerate()
            .find(|(_, block)| block.id == id)
    }

    /// Mutable access; copies the block if a history entry still shares it.
    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index).map(Arc::make_mut)
    }

    pub fn fresh_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a new block with a fresh id at `index`.
    pub fn insert_block(
        &mut self,
        index: usize,
        kind: BlockKind,
        attrs: BlockAttrs,
        content: Vec<Inline>,
    ) -> BlockId {
        let id = self.fresh_id();
        let content = if kind.is_leaf() {
            Vec::new()
        } else {
            content::normalize(content)
        };
        let index = index.min(self.blocks.len());
        self.blocks.insert(
            index,
            Arc::new(Block {
                id,
                kind,
                attrs,
                content,
            }),
        );
        id
    }

    /// Remove the blocks in `range`. If that would empty the document, one
    /// empty paragraph takes their place.
    pub fn remove_blocks(&mut self, range: Range<usize>) {
        let end = range.end.min(self.blocks.len());
        let start = range.start.min(end);
        self.blocks.drain(start..end);
        if self.blocks.is_empty() {
            self.insert_block(0, BlockKind::Paragraph, BlockAttrs::default(), Vec::new());
        }
    }

    pub fn start_position(&self) -> Position {
        Position::new(0, 0)
    }

    pub fn end_position(&self) -> Position {
        let last = self.blocks.len().saturating_sub(1);
        Position::new(last, self.block(last).map(Block::len).unwrap_or(0))
    }

    pub fn is_valid(&self, pos: Position) -> bool {
        self.block(pos.block)
            .is_some_and(|block| pos.offset <= block.len())
    }

    pub fn is_valid_selection(&self, selection: &Selection) -> bool {
        self.is_valid(selection.anchor) && self.is_valid(selection.head)
    }

    /// Nearest valid position.
    pub fn clamp(&self, pos: Position) -> Position {
        if pos.block >= self.blocks.len() {
            return self.end_position();
        }
        let len = self.block(pos.block).map(Block::len).unwrap_or(0);
        Position::new(pos.block, pos.offset.min(len))
    }

    pub fn clamp_selection(&self, selection: Selection) -> Selection {
        Selection::new(self.clamp(selection.anchor), self.clamp(selection.head))
    }

    /// The offset range the selection covers in each block it touches.
    pub fn selection_ranges(&self, selection: &Selection) -> Vec<(usize, Range<usize>)> {
        let start = selection.start();
        let end = selection.end();
        selection
            .blocks()
            .filter_map(|index| {
                let len = self.block(index)?.len();
                let from = if index == start.block { start.offset } else { 0 };
                let to = if index == end.block { end.offset } else { len };
                Some((index, from.min(len)..to.min(len)))
            })
            .collect()
    }

    /// Structural equality ignoring block ids.
    pub fn content_eq(&self, other: &Document) -> bool {
        self.blocks.len() == other.blocks.len()
            && self
                .blocks()
                .zip(other.blocks())
                .all(|(a, b)| a.content_eq(b))
    }

    /// Plain text, one line per block.
    pub fn text(&self) -> String {
        self.blocks()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builds documents block by block, assigning sequence ids in order.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    blocks: Vec<Arc<Block>>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, kind: BlockKind, attrs: BlockAttrs, content: Vec<Inline>) -> Self {
        self.push(kind, attrs, content);
        self
    }

    pub fn push(&mut self, kind: BlockKind, attrs: BlockAttrs, content: Vec<Inline>) {
        let content = if kind.is_leaf() {
            Vec::new()
        } else {
            Block::content_for(content::normalize(content), &kind)
        };
        let id = BlockId(self.blocks.len() as u64);
        self.blocks.push(Arc::new(Block {
            id,
            kind,
            attrs,
            content,
        }));
    }

    pub fn paragraph(self, content: Vec<Inline>) -> Self {
        self.block(BlockKind::Paragraph, BlockAttrs::default(), content)
    }

    /// Paragraph of unmarked text.
    pub fn text(self, text: &str) -> Self {
        self.paragraph(vec![Inline::plain(text)])
    }

    pub fn bullet_item(self, content: Vec<Inline>) -> Self {
        self.block(BlockKind::BulletListItem, BlockAttrs::default(), content)
    }

    pub fn ordered_item(self, content: Vec<Inline>) -> Self {
        self.block(BlockKind::OrderedListItem, BlockAttrs::default(), content)
    }

    pub fn code_block(self, language: Option<&str>, text: &str) -> Self {
        self.block(
            BlockKind::CodeBlock {
                language: language.map(SmolStr::from),
            },
            BlockAttrs::default(),
            vec![Inline::plain(text)],
        )
    }

    pub fn rule(self) -> Self {
        self.block(BlockKind::HorizontalRule, BlockAttrs::default(), Vec::new())
    }

    pub fn image(self, attrs: ImageAttrs) -> Self {
        self.block(BlockKind::Image(attrs), BlockAttrs::default(), Vec::new())
    }

    pub fn build(mut self) -> Document {
        if self.blocks.is_empty() {
            self.push(BlockKind::Paragraph, BlockAttrs::default(), Vec::new());
        }
        let next_id = self.blocks.len() as u64;
        Document {
            blocks: self.blocks,
            next_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marks::{Mark, MarkSet};

    #[test]
    fn test_empty_document_has_one_paragraph() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.block(0).map(|b| &b.kind), Some(&BlockKind::Paragraph));
        assert_eq!(doc.end_position(), Position::new(0, 0));
    }

    #[test]
    fn test_remove_all_blocks_leaves_paragraph() {
        let mut doc = Document::builder().rule().text("x").build();
        doc.remove_blocks(0..2);
        assert_eq!(doc.len(), 1);
        assert!(doc.block(0).is_some_and(|b| b.is_empty()));
    }

    #[test]
    fn test_ids_are_unique_and_fresh() {
        let mut doc = Document::builder().text("a").text("b").build();
        let id = doc.insert_block(1, BlockKind::HorizontalRule, BlockAttrs::default(), vec![]);
        assert_eq!(id, BlockId(2));
        let ids: Vec<_> = doc.blocks().map(|b| b.id).collect();
        assert_eq!(ids, vec![BlockId(0), BlockId(2), BlockId(1)]);
    }

    #[test]
    fn test_clamp_and_validity() {
        let doc = Document::builder().text("abc").rule().build();
        assert!(doc.is_valid(Position::new(0, 3)));
        assert!(!doc.is_valid(Position::new(0, 4)));
        assert!(doc.is_valid(Position::new(1, 0)));
        assert!(!doc.is_valid(Position::new(1, 1)));
        assert_eq!(doc.clamp(Position::new(0, 9)), Position::new(0, 3));
        assert_eq!(doc.clamp(Position::new(7, 2)), Position::new(1, 0));
    }

    #[test]
    fn test_convert_to_code_flattens() {
        let mut doc = Document::builder()
            .paragraph(vec![
                Inline::text("bold", MarkSet::new().with(Mark::Bold)),
                Inline::Image(ImageAttrs::new("x.png")),
                Inline::plain(" text"),
            ])
            .build();
        let block = doc.block_mut(0).expect("block");
        block.attrs.text_align = TextAlign::Center;
        block.convert(BlockKind::CodeBlock { language: None });
        assert_eq!(block.content, vec![Inline::plain("bold text")]);
        assert_eq!(block.attrs.text_align, TextAlign::Left);

        block.content = vec![Inline::plain("a\nb")];
        block.convert(BlockKind::Paragraph);
        assert_eq!(block.content, vec![Inline::plain("a b")]);
    }

    #[test]
    fn test_content_eq_ignores_ids() {
        let a = Document::builder().text("x").text("y").build();
        let mut b = Document::builder().text("x").build();
        b.insert_block(1, BlockKind::Paragraph, BlockAttrs::default(), vec![Inline::plain("y")]);
        b.insert_block(0, BlockKind::Paragraph, BlockAttrs::default(), vec![]);
        b.remove_blocks(0..1);
        assert_ne!(a, b);
        assert!(a.content_eq(&b));
    }
}
