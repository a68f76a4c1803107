//! Inline content of text blocks and the run-level edits transactions use.
//!
//! Content is a list of [`Inline`] runs. Every function here that returns new
//! content returns it normalized: adjacent text runs with equal mark sets are
//! merged and empty text runs are dropped.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::marks::MarkSet;

/// Attributes of an image, whether a block or inline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub src: SmolStr,
    pub alt: Option<SmolStr>,
}

impl ImageAttrs {
    pub fn new(src: impl Into<SmolStr>) -> Self {
        Self {
            src: src.into(),
            alt: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<SmolStr>) -> Self {
        self.alt = Some(alt.into());
        self
    }
}

/// One inline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Inline {
    Text { text: String, marks: MarkSet },
    /// Inline image reference. Counts as one position unit.
    Image(ImageAttrs),
}

impl Inline {
    pub fn text(text: impl Into<String>, marks: MarkSet) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }

    /// Unmarked text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::text(text, MarkSet::new())
    }

    /// Length in position units.
    pub fn len(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::Image(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn marks(&self) -> Option<&MarkSet> {
        match self {
            Inline::Text { marks, .. } => Some(marks),
            Inline::Image(_) => None,
        }
    }
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

pub fn content_len(content: &[Inline]) -> usize {
    content.iter().map(Inline::len).sum()
}

/// Merge equal-mark neighbours and drop empty text runs.
pub fn normalize(content: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(content.len());
    for inline in content {
        if let Inline::Text { text, marks } = &inline {
            if text.is_empty() {
                continue;
            }
            if let Some(Inline::Text {
                text: prev_text,
                marks: prev_marks,
            }) = out.last_mut()
            {
                if prev_marks == marks {
                    prev_text.push_str(text);
                    continue;
                }
            }
        }
        out.push(inline);
    }
    out
}

/// Split content at a position offset. Offsets past the end split at the end.
pub fn split_content(content: &[Inline], offset: usize) -> (Vec<Inline>, Vec<Inline>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for inline in content {
        let len = inline.len();
        if pos + len <= offset {
            left.push(inline.clone());
        } else if pos >= offset {
            right.push(inline.clone());
        } else if let Inline::Text { text, marks } = inline {
            let at = char_to_byte(text, offset - pos);
            left.push(Inline::text(&text[..at], marks.clone()));
            right.push(Inline::text(&text[at..], marks.clone()));
        }
        pos += len;
    }
    (normalize(left), normalize(right))
}

/// The runs covering `range`.
pub fn slice_content(content: &[Inline], range: Range<usize>) -> Vec<Inline> {
    let (head, _) = split_content(content, range.end);
    let (_, middle) = split_content(&head, range.start);
    middle
}

/// Content with `range` cut out.
pub fn remove_range(content: &[Inline], range: Range<usize>) -> Vec<Inline> {
    let (mut left, _) = split_content(content, range.start);
    let (_, right) = split_content(content, range.end);
    left.extend(right);
    normalize(left)
}

/// Content with `insert` spliced in at `offset`.
pub fn insert_at(content: &[Inline], offset: usize, insert: Vec<Inline>) -> Vec<Inline> {
    let (mut left, right) = split_content(content, offset);
    left.extend(insert);
    left.extend(right);
    normalize(left)
}

/// Apply `f` to the mark set of every text run inside `range`.
pub fn map_marks(
    content: &[Inline],
    range: Range<usize>,
    mut f: impl FnMut(&mut MarkSet),
) -> Vec<Inline> {
    let (mut left, tail) = split_content(content, range.start);
    let (mut middle, right) = split_content(&tail, range.end.saturating_sub(range.start));
    for inline in &mut middle {
        if let Inline::Text { marks, .. } = inline {
            f(marks);
        }
    }
    left.extend(middle);
    left.extend(right);
    normalize(left)
}

/// Marks of the character immediately before `offset`. Empty at block start
/// and after an inline image.
pub fn marks_before(content: &[Inline], offset: usize) -> MarkSet {
    if offset == 0 {
        return MarkSet::new();
    }
    let mut pos = 0;
    for inline in content {
        let len = inline.len();
        if offset <= pos + len {
            return inline.marks().cloned().unwrap_or_default();
        }
        pos += len;
    }
    content
        .last()
        .and_then(Inline::marks)
        .cloned()
        .unwrap_or_default()
}

/// Mark sets of the text runs overlapping `range`, each with the number of
/// chars it covers there.
pub fn text_marks_in(content: &[Inline], range: Range<usize>) -> Vec<(&MarkSet, usize)> {
    let mut out = Vec::new();
    let mut pos = 0;
    for inline in content {
        let len = inline.len();
        let start = pos.max(range.start);
        let end = (pos + len).min(range.end);
        if let (Inline::Text { marks, .. }, true) = (inline, start < end) {
            out.push((marks, end - start));
        }
        pos += len;
    }
    out
}

/// Text of the content with images dropped.
pub fn plain_text(content: &[Inline]) -> String {
    content
        .iter()
        .filter_map(|inline| match inline {
            Inline::Text { text, .. } => Some(text.as_str()),
            Inline::Image(_) => None,
        })
        .collect()
}

/// Where `offset` lands once inline images are dropped from the content.
pub fn offset_without_images(content: &[Inline], offset: usize) -> usize {
    let mut pos = 0;
    let mut images = 0;
    for inline in content {
        if pos >= offset {
            break;
        }
        if let Inline::Image(_) = inline {
            images += 1;
        }
        pos += inline.len();
    }
    offset.min(content_len(content)).saturating_sub(images)
}
