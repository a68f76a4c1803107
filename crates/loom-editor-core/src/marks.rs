//! Inline formatting marks and mark sets.
//!
//! A [`Mark`] is pure data: a kind plus its attribute payload. Marks applied to
//! one inline run live in a [`MarkSet`], which holds at most one mark per
//! [`MarkKind`] and always iterates in canonical kind order. That ordering is
//! what makes mark sets comparable regardless of the order edits applied them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The kinds of inline mark the editor knows about.
///
/// Declaration order is the canonical nesting order used when serializing
/// (outermost first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkKind {
    Bold,
    Italic,
    Strike,
    Code,
    FontSize,
    TextStyle,
}

impl MarkKind {
    pub const ALL: [MarkKind; 6] = [
        MarkKind::Bold,
        MarkKind::Italic,
        MarkKind::Strike,
        MarkKind::Code,
        MarkKind::FontSize,
        MarkKind::TextStyle,
    ];

    /// Name used in the JSON tree representation.
    pub fn name(self) -> &'static str {
        match self {
            MarkKind::Bold => "bold",
            MarkKind::Italic => "italic",
            MarkKind::Strike => "strike",
            MarkKind::Code => "code",
            MarkKind::FontSize => "fontSize",
            MarkKind::TextStyle => "textStyle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MarkKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether a mark of this kind displaces (or refuses) a mark of `other`.
    ///
    /// Every kind excludes itself, and inline code excludes everything.
    pub fn excludes(self, other: MarkKind) -> bool {
        self == other || self == MarkKind::Code || other == MarkKind::Code
    }
}

/// Attributes that may live on the text-style carrier mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextStyleAttr {
    Color,
    FontFamily,
}

impl TextStyleAttr {
    pub const ALL: [TextStyleAttr; 2] = [TextStyleAttr::Color, TextStyleAttr::FontFamily];

    /// CSS property this attribute is stored under in `style="…"`.
    pub fn css_property(self) -> &'static str {
        match self {
            TextStyleAttr::Color => "color",
            TextStyleAttr::FontFamily => "font-family",
        }
    }

    /// Key used in the JSON `attrs` object.
    pub fn json_key(self) -> &'static str {
        match self {
            TextStyleAttr::Color => "color",
            TextStyleAttr::FontFamily => "fontFamily",
        }
    }

    pub fn from_json_key(key: &str) -> Option<Self> {
        TextStyleAttr::ALL.into_iter().find(|attr| attr.json_key() == key)
    }
}

/// Payload of the generic text-style carrier mark.
///
/// The carrier can hold several unrelated attributes. An empty carrier is never
/// stored on a run; callers use [`TextStyle::is_empty`] to drop it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TextStyle {
    attrs: BTreeMap<TextStyleAttr, SmolStr>,
}

impl TextStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: TextStyleAttr, value: impl Into<SmolStr>) -> Self {
        self.attrs.insert(attr, value.into());
        self
    }

    pub fn get(&self, attr: TextStyleAttr) -> Option<&SmolStr> {
        self.attrs.get(&attr)
    }

    /// Set or clear a single attribute, leaving the others untouched.
    pub fn set(&mut self, attr: TextStyleAttr, value: Option<SmolStr>) {
        match value {
            Some(value) => {
                self.attrs.insert(attr, value);
            }
            None => {
                self.attrs.remove(&attr);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextStyleAttr, &SmolStr)> {
        self.attrs.iter().map(|(attr, value)| (*attr, value))
    }
}

/// A single inline formatting mark.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    /// `size` is a CSS length such as `"16px"`.
    FontSize { size: SmolStr },
    TextStyle(TextStyle),
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Bold => MarkKind::Bold,
            Mark::Italic => MarkKind::Italic,
            Mark::Strike => MarkKind::Strike,
            Mark::Code => MarkKind::Code,
            Mark::FontSize { .. } => MarkKind::FontSize,
            Mark::TextStyle(_) => MarkKind::TextStyle,
        }
    }

    pub fn font_size(size: impl Into<SmolStr>) -> Self {
        Mark::FontSize { size: size.into() }
    }

    /// A text-style carrier holding only a color.
    pub fn color(color: impl Into<SmolStr>) -> Self {
        Mark::TextStyle(TextStyle::new().with(TextStyleAttr::Color, color))
    }

    /// This mark with its attribute values trimmed, or `None` when one of them
    /// could not be read back out of a `style` attribute.
    pub fn normalized(&self) -> Option<Mark> {
        match self {
            Mark::FontSize { size } => css_value(size).map(|size| Mark::FontSize { size }),
            Mark::TextStyle(style) => {
                let mut normalized = TextStyle::new();
                for (attr, value) in style.iter() {
                    normalized.set(attr, Some(css_value(value)?));
                }
                (!normalized.is_empty()).then_some(Mark::TextStyle(normalized))
            }
            mark => Some(mark.clone()),
        }
    }

    /// Attribute-free marks for the simple kinds. Returns `None` for kinds that
    /// need a payload.
    pub fn simple(kind: MarkKind) -> Option<Self> {
        match kind {
            MarkKind::Bold => Some(Mark::Bold),
            MarkKind::Italic => Some(Mark::Italic),
            MarkKind::Strike => Some(Mark::Strike),
            MarkKind::Code => Some(Mark::Code),
            MarkKind::FontSize | MarkKind::TextStyle => None,
        }
    }
}

/// A CSS value as stored in a mark attribute: trimmed, non-empty and free of
/// `;`.
pub fn css_value(value: &str) -> Option<SmolStr> {
    let value = value.trim();
    (!value.is_empty() && !value.contains(';')).then(|| SmolStr::from(value))
}

/// The marks applied to one run, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MarkSet {
    marks: BTreeMap<MarkKind, Mark>,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Marks in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.marks.values()
    }

    pub fn kinds(&self) -> impl Iterator<Item = MarkKind> + '_ {
        self.marks.keys().copied()
    }

    pub fn get(&self, kind: MarkKind) -> Option<&Mark> {
        self.marks.get(&kind)
    }

    pub fn has_kind(&self, kind: MarkKind) -> bool {
        self.marks.contains_key(&kind)
    }

    /// True if this exact mark (kind and attributes) is present.
    pub fn contains(&self, mark: &Mark) -> bool {
        self.marks.get(&mark.kind()) == Some(mark)
    }

    /// Add a mark, replacing any mark of the same kind.
    ///
    /// Inline code clears every other mark when added, and no other mark can be
    /// added to a set that carries code. Marks with unusable attribute values
    /// are never stored. Returns whether the set changed.
    pub fn insert(&mut self, mark: Mark) -> bool {
        let Some(mark) = mark.normalized() else {
            return false;
        };
        let kind = mark.kind();
        if self.contains(&mark) {
            return false;
        }
        if kind != MarkKind::Code && self.has_kind(MarkKind::Code) {
            return false;
        }
        if kind == MarkKind::Code {
            self.marks.clear();
        } else {
            self.marks.retain(|existing, _| !kind.excludes(*existing));
        }
        self.marks.insert(kind, mark);
        true
    }

    pub fn remove(&mut self, kind: MarkKind) -> Option<Mark> {
        self.marks.remove(&kind)
    }

    pub fn with(mut self, mark: Mark) -> Self {
        self.insert(mark);
        self
    }

    pub fn without(mut self, kind: MarkKind) -> Self {
        self.remove(kind);
        self
    }

    /// Set or clear one text-style attribute on the carrier mark.
    ///
    /// Creates the carrier when setting on a set without one, and deletes the
    /// carrier when its last attribute is cleared.
    pub fn update_text_style(&mut self, attr: TextStyleAttr, value: Option<SmolStr>) {
        let value = match value {
            Some(value) => match css_value(&value) {
                Some(value) => Some(value),
                None => return,
            },
            None => None,
        };
        let mut style = match self.marks.get(&MarkKind::TextStyle) {
            Some(Mark::TextStyle(style)) => style.clone(),
            _ if value.is_none() => return,
            _ => TextStyle::new(),
        };
        style.set(attr, value);
        if style.is_empty() {
            self.marks.remove(&MarkKind::TextStyle);
        } else {
            self.insert(Mark::TextStyle(style));
        }
    }

    /// Text-style attribute value carried by this set, if any.
    pub fn text_style(&self, attr: TextStyleAttr) -> Option<&SmolStr> {
        match self.marks.get(&MarkKind::TextStyle) {
            Some(Mark::TextStyle(style)) => style.get(attr),
            _ => None,
        }
    }

    pub fn font_size(&self) -> Option<&SmolStr> {
        match self.marks.get(&MarkKind::FontSize) {
            Some(Mark::FontSize { size }) => Some(size),
            _ => None,
        }
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        let mut set = MarkSet::new();
        for mark in iter {
            set.insert(mark);
        }
        set
    }
}
