//! A parameterized formatting toolbar.
//!
//! [`ToolbarFeatures`] picks which control groups exist. The state of every
//! control is derived from a [`ViewSnapshot`], and actions are issued as
//! command chains against the editor.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::chain::ChainBuilder;
use crate::config::{EditorConfig, PaletteColor};
use crate::document::{BlockType, TextAlign};
use crate::editor::Editor;
use crate::marks::{Mark, MarkKind};
use crate::tracker::MarkState;
use crate::view::ViewSnapshot;

/// Optional control groups. Mark toggles, horizontal rule and history
/// controls are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarFeatures {
    pub alignment: bool,
    pub color: bool,
    pub font_size: bool,
    pub code_block: bool,
    pub lists: bool,
}

impl Default for ToolbarFeatures {
    fn default() -> Self {
        Self {
            alignment: true,
            color: true,
            font_size: true,
            code_block: true,
            lists: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    /// One of the simple marks: bold, italic, strike, code.
    ToggleMark(MarkKind),
    ClearMarks,
    Paragraph,
    BulletList,
    OrderedList,
    CodeBlock,
    HorizontalRule,
    Align(TextAlign),
    FontSize(SmolStr),
    ResetFontSize,
    Color(SmolStr),
    ResetColor,
    Undo,
    Redo,
    CopyCodeBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarOutcome {
    /// The chain committed.
    Applied,
    /// The chain was rejected and nothing changed.
    Rejected,
    /// Text for the clipboard.
    Copied(String),
    /// The control is not part of this toolbar, or has nothing to act on.
    Unavailable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    pub active: bool,
}

impl ControlState {
    fn new(enabled: bool, active: bool) -> Self {
        Self { enabled, active }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSizeDisplay {
    Size(SmolStr),
    /// The selection spans several sizes.
    NoneSelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSizeControl {
    pub enabled: bool,
    pub display: FontSizeDisplay,
    pub options: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorControl {
    pub enabled: bool,
    /// `None` when the selection spans several colors.
    pub selected: Option<SmolStr>,
    pub palette: Vec<PaletteColor>,
}

/// Render state of every control. Groups disabled by [`ToolbarFeatures`]
/// are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarState {
    pub bold: ControlState,
    pub italic: ControlState,
    pub strike: ControlState,
    pub code: ControlState,
    pub clear_marks: ControlState,
    pub paragraph: ControlState,
    pub horizontal_rule: ControlState,
    pub undo: ControlState,
    pub redo: ControlState,
    pub bullet_list: Option<ControlState>,
    pub ordered_list: Option<ControlState>,
    pub code_block: Option<ControlState>,
    pub copy_code: Option<ControlState>,
    pub alignment: Option<Vec<(TextAlign, ControlState)>>,
    pub font_size: Option<FontSizeControl>,
    pub color: Option<ColorControl>,
}

impl ToolbarState {
    pub fn from_snapshot(snapshot: &ViewSnapshot, toolbar: &Toolbar) -> Self {
        let features = toolbar.features;
        let textblock = snapshot.block_type.is_some();
        let markable = textblock && !snapshot.in_code_block;
        let mark = |kind| ControlState::new(markable, snapshot.is_active(kind));
        let block = |ty| ControlState::new(textblock, snapshot.block_type == Some(ty));

        let font_size = features.font_size.then(|| FontSizeControl {
            enabled: markable,
            display: match &snapshot.font_size {
                MarkState::Uniform(size) => FontSizeDisplay::Size(size.clone()),
                MarkState::Absent => FontSizeDisplay::Size(toolbar.default_font_size.clone()),
                MarkState::Mixed => FontSizeDisplay::NoneSelected,
            },
            options: toolbar.font_sizes.clone(),
        });
        let color = features.color.then(|| ColorControl {
            enabled: markable,
            selected: match &snapshot.color {
                MarkState::Uniform(color) => Some(color.clone()),
                MarkState::Absent => Some(toolbar.default_color.clone()),
                MarkState::Mixed => None,
            },
            palette: toolbar.palette.clone(),
        });

        Self {
            bold: mark(MarkKind::Bold),
            italic: mark(MarkKind::Italic),
            strike: mark(MarkKind::Strike),
            code: mark(MarkKind::Code),
            clear_marks: ControlState::new(markable, false),
            paragraph: block(BlockType::Paragraph),
            horizontal_rule: ControlState::new(true, false),
            undo: ControlState::new(snapshot.can_undo, false),
            redo: ControlState::new(snapshot.can_redo, false),
            bullet_list: features.lists.then(|| block(BlockType::BulletListItem)),
            ordered_list: features.lists.then(|| block(BlockType::OrderedListItem)),
            code_block: features.code_block.then(|| block(BlockType::CodeBlock)),
            copy_code: features
                .code_block
                .then(|| ControlState::new(snapshot.in_code_block, false)),
            alignment: features.alignment.then(|| {
                TextAlign::ALL
                    .into_iter()
                    .map(|align| {
                        (
                            align,
                            ControlState::new(
                                snapshot.text_align.is_some(),
                                snapshot.text_align == Some(align),
                            ),
                        )
                    })
                    .collect()
            }),
            font_size,
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toolbar {
    features: ToolbarFeatures,
    font_sizes: Vec<SmolStr>,
    default_font_size: SmolStr,
    palette: Vec<PaletteColor>,
    default_color: SmolStr,
}

impl Toolbar {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            features: config.toolbar,
            font_sizes: config.font_sizes.clone(),
            default_font_size: config.default_font_size.clone(),
            palette: config.palette.clone(),
            default_color: config.default_color.clone(),
        }
    }

    pub fn features(&self) -> ToolbarFeatures {
        self.features
    }

    pub fn state(&self, snapshot: &ViewSnapshot) -> ToolbarState {
        ToolbarState::from_snapshot(snapshot, self)
    }

    fn allows(&self, action: &ToolbarAction) -> bool {
        let f = self.features;
        match action {
            ToolbarAction::BulletList | ToolbarAction::OrderedList => f.lists,
            ToolbarAction::CodeBlock | ToolbarAction::CopyCodeBlock => f.code_block,
            ToolbarAction::Align(_) => f.alignment,
            ToolbarAction::FontSize(_) | ToolbarAction::ResetFontSize => f.font_size,
            ToolbarAction::Color(_) | ToolbarAction::ResetColor => f.color,
            ToolbarAction::ToggleMark(kind) => Mark::simple(*kind).is_some(),
            _ => true,
        }
    }

    pub fn apply(&self, editor: &mut Editor, action: ToolbarAction) -> ToolbarOutcome {
        if !self.allows(&action) {
            return ToolbarOutcome::Unavailable;
        }
        if action == ToolbarAction::CopyCodeBlock {
            return match editor.code_block_text() {
                Some(text) => ToolbarOutcome::Copied(text),
                None => ToolbarOutcome::Unavailable,
            };
        }
        let chain = editor.chain();
        let chain = match action {
            ToolbarAction::ToggleMark(kind) => match Mark::simple(kind) {
                Some(mark) => chain.toggle_mark(mark),
                None => return ToolbarOutcome::Unavailable,
            },
            ToolbarAction::ClearMarks => chain.unset_all_marks(),
            ToolbarAction::Paragraph => chain.set_paragraph(),
            ToolbarAction::BulletList => chain.toggle_bullet_list(),
            ToolbarAction::OrderedList => chain.toggle_ordered_list(),
            ToolbarAction::CodeBlock => chain.toggle_code_block(),
            ToolbarAction::HorizontalRule => chain.set_horizontal_rule(),
            ToolbarAction::Align(align) => chain.set_text_align(align),
            ToolbarAction::FontSize(size) => chain.set_font_size(size),
            ToolbarAction::ResetFontSize => chain.unset_font_size(),
            ToolbarAction::Color(color) if color == self.default_color => chain.unset_color(),
            ToolbarAction::Color(color) => chain.set_color(color),
            ToolbarAction::ResetColor => chain.unset_color(),
            ToolbarAction::Undo => chain.undo(),
            ToolbarAction::Redo => chain.redo(),
            ToolbarAction::CopyCodeBlock => return ToolbarOutcome::Unavailable,
        };
        if chain.run() {
            ToolbarOutcome::Applied
        } else {
            ToolbarOutcome::Rejected
        }
    }
}
