//! Mark extensions: parse and serialize rules for inline marks.
//!
//! Each mark kind is described by a [`MarkExtension`] that knows how to
//! recognize the mark on an HTML element and how to render it back. The
//! [`ExtensionRegistry`] holds one extension per kind and is what the HTML codec
//! consults; replacing an extension changes how that kind is read and written.

use std::fmt;

use smol_str::SmolStr;

use crate::marks::{Mark, MarkKind, TextStyle, TextStyleAttr};

/// A parsed HTML start tag, as seen by parse rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    /// Lowercased tag name.
    pub tag: SmolStr,
    /// Attributes in document order, names lowercased, values entity-decoded.
    pub attrs: Vec<(SmolStr, String)>,
}

impl HtmlElement {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of one inline `style` property, trimmed. Empty values count as absent.
    pub fn style(&self, property: &str) -> Option<&str> {
        let style = self.attr("style")?;
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .last()
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }
}

/// An HTML tag produced by a serialize rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    pub name: &'static str,
    pub attrs: Vec<(&'static str, String)>,
}

impl HtmlTag {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }
}

/// Build an inline `style` value from property/value pairs.
pub fn style_attr<'a>(decls: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    decls
        .into_iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Schema entry for one mark attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub default: Option<&'static str>,
}

/// Parse/serialize rules for one kind of mark.
pub trait MarkExtension: Send + Sync {
    /// The mark kind this extension handles.
    fn kind(&self) -> MarkKind;

    /// Recognize the mark on an element. `None` means the rule does not match;
    /// a rule never produces an attribute-less version of a mark that needs
    /// attributes.
    fn parse(&self, element: &HtmlElement) -> Option<Mark>;

    /// Render the mark as a wrapping tag. `None` if the mark is not this
    /// extension's kind.
    fn serialize(&self, mark: &Mark) -> Option<HtmlTag>;

    /// Attribute schema of the mark.
    fn attributes(&self) -> &'static [AttributeSpec] {
        &[]
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BoldExtension;

impl MarkExtension for BoldExtension {
    fn kind(&self) -> MarkKind {
        MarkKind::Bold
    }

    fn parse(&self, element: &HtmlElement) -> Option<Mark> {
        let weight = element.style("font-weight");
        if element.is("strong") {
            return Some(Mark::Bold);
        }
        if element.is("b") {
            // `<b style="font-weight: normal">` is what some clipboards emit for plain text.
            return match weight {
                Some("normal") => None,
                _ => Some(Mark::Bold),
            };
        }
        match weight {
            Some("bold") | Some("bolder") => Some(Mark::Bold),
            Some(value) => value
                .parse::<u16>()
                .ok()
                .filter(|weight| *weight >= 500)
                .map(|_| Mark::Bold),
            None => None,
        }
    }

    fn serialize(&self, mark: &Mark) -> Option<HtmlTag> {
        matches!(mark, Mark::Bold).then(|| HtmlTag::new("strong"))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ItalicExtension;

impl MarkExtension for ItalicExtension {
    fn kind(&self) -> MarkKind {
        MarkKind::Italic
    }

    fn parse(&self, element: &HtmlElement) -> Option<Mark> {
        if element.is("em") || element.is("i") {
            return Some(Mark::Italic);
        }
        (element.style("font-style") == Some("italic")).then_some(Mark::Italic)
    }

    fn serialize(&self, mark: &Mark) -> Option<HtmlTag> {
        matches!(mark, Mark::Italic).then(|| HtmlTag::new("em"))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StrikeExtension;

impl MarkExtension for StrikeExtension {
    fn kind(&self) -> MarkKind {
        MarkKind::Strike
    }

    fn parse(&self, element: &HtmlElement) -> Option<Mark> {
        if element.is("s") || element.is("del") || element.is("strike") {
            return Some(Mark::Strike);
        }
        element
            .style("text-decoration")
            .filter(|value| value.contains("line-through"))
            .map(|_| Mark::Strike)
    }

    fn serialize(&self, mark: &Mark) -> Option<HtmlTag> {
        matches!(mark, Mark::Strike).then(|| HtmlTag::new("s"))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CodeExtension;

impl MarkExtension for CodeExtension {
    fn kind(&self) -> MarkKind {
        MarkKind::Code
    }

    fn parse(&self, element: &HtmlElement) -> Option<Mark> {
        element.is("code").then_some(Mark::Code)
    }

    fn serialize(&self, mark: &Mark) -> Option<HtmlTag> {
        matches!(mark, Mark::Code).then(|| HtmlTag::new("code"))
    }
}

/// Font size as a CSS length on a `<span style="font-size: …">`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FontSizeExtension;

const FONT_SIZE_ATTRS: &[AttributeSpec] = &[AttributeSpec {
    name: "size",
    default: None,
}];

impl MarkExtension for FontSizeExtension {
    fn kind(&self) -> MarkKind {
        MarkKind::FontSize
    }

    fn parse(&self, element: &HtmlElement) -> Option<Mark> {
        if !element.is("span") {
            return None;
        }
        element.style("font-size").map(Mark::font_size)
    }

    fn serialize(&self, mark: &Mark) -> Option<HtmlTag> {
        match mark {
            Mark::FontSize { size } => Some(
                HtmlTag::new("span").with_attr("style", style_attr([("font-size", size.as_str())])),
            ),
            _ => None,
        }
    }

    fn attributes(&self) -> &'static [AttributeSpec] {
        FONT_SIZE_ATTRS
    }
}

/// The generic text-style carrier (`<span style="color: …; font-family: …">`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TextStyleExtension;

const TEXT_STYLE_ATTRS: &[AttributeSpec] = &[
    AttributeSpec {
        name: "color",
        default: None,
    },
    AttributeSpec {
        name: "fontFamily",
        default: None,
    },
];

impl MarkExtension for TextStyleExtension {
    fn kind(&self) -> MarkKind {
        MarkKind::TextStyle
    }

    fn parse(&self, element: &HtmlElement) -> Option<Mark> {
        if !element.is("span") {
            return None;
        }
        let mut style = TextStyle::new();
        for attr in TextStyleAttr::ALL {
            if let Some(value) = element.style(attr.css_property()) {
                style.set(attr, Some(value.into()));
            }
        }
        (!style.is_empty()).then_some(Mark::TextStyle(style))
    }

    fn serialize(&self, mark: &Mark) -> Option<HtmlTag> {
        match mark {
            Mark::TextStyle(style) if !style.is_empty() => {
                let decls = style
                    .iter()
                    .map(|(attr, value)| (attr.css_property(), value.as_str()));
                Some(HtmlTag::new("span").with_attr("style", style_attr(decls)))
            }
            _ => None,
        }
    }

    fn attributes(&self) -> &'static [AttributeSpec] {
        TEXT_STYLE_ATTRS
    }
}

/// One extension per mark kind.
pub struct ExtensionRegistry {
    marks: Vec<Box<dyn MarkExtension>>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field(
                "marks",
                &self.marks.iter().map(|ext| ext.kind()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(BoldExtension);
        registry.register(ItalicExtension);
        registry.register(StrikeExtension);
        registry.register(CodeExtension);
        registry.register(FontSizeExtension);
        registry.register(TextStyleExtension);
        registry
    }
}

impl ExtensionRegistry {
    /// A registry with no marks; every inline element parses as plain text.
    pub fn empty() -> Self {
        Self { marks: Vec::new() }
    }

    /// Register an extension, replacing any existing one for the same kind.
    pub fn register(&mut self, extension: impl MarkExtension + 'static) {
        let kind = extension.kind();
        self.marks.retain(|ext| ext.kind() != kind);
        self.marks.push(Box::new(extension));
        self.marks.sort_by_key(|ext| ext.kind());
    }

    pub fn extension(&self, kind: MarkKind) -> Option<&dyn MarkExtension> {
        self.marks
            .iter()
            .find(|ext| ext.kind() == kind)
            .map(|ext| ext.as_ref())
    }

    pub fn kinds(&self) -> impl Iterator<Item = MarkKind> + '_ {
        self.marks.iter().map(|ext| ext.kind())
    }

    /// Every mark any registered rule recognizes on the element.
    pub fn parse_marks(&self, element: &HtmlElement) -> Vec<Mark> {
        self.marks
            .iter()
            .filter_map(|ext| ext.parse(element))
            .collect()
    }

    pub fn serialize_mark(&self, mark: &Mark) -> Option<HtmlTag> {
        self.extension(mark.kind())?.serialize(mark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(style: &str) -> HtmlElement {
        HtmlElement::new("span").with_attr("style", style)
    }

    #[test]
    fn test_font_size_requires_size() {
        let ext = FontSizeExtension;
        assert_eq!(
            ext.parse(&span("font-size: 24px")),
            Some(Mark::font_size("24px"))
        );
        assert_eq!(ext.parse(&span("font-size: ")), None);
        assert_eq!(ext.parse(&span("color: red")), None);
        assert_eq!(ext.parse(&HtmlElement::new("span")), None);
    }

    #[test]
    fn test_text_style_collects_carrier_attrs() {
        let ext = TextStyleExtension;
        let mark = ext
            .parse(&span("color: #3b82f6; font-family: serif; font-size: 12px"))
            .expect("carrier should match");
        let Mark::TextStyle(style) = &mark else {
            panic!("expected text style, got {mark:?}");
        };
        assert_eq!(style.get(TextStyleAttr::Color).map(|s| s.as_str()), Some("#3b82f6"));
        assert_eq!(
            style.get(TextStyleAttr::FontFamily).map(|s| s.as_str()),
            Some("serif")
        );

        let tag = ext.serialize(&mark).expect("serializes");
        assert_eq!(tag.name, "span");
        assert_eq!(
            tag.attrs,
            vec![("style", "color: #3b82f6; font-family: serif".to_string())]
        );
    }

    #[test]
    fn test_one_span_yields_both_size_and_color() {
        let registry = ExtensionRegistry::default();
        let marks = registry.parse_marks(&span("font-size: 20px; color: red"));
        assert_eq!(marks, vec![Mark::font_size("20px"), Mark::color("red")]);
    }

    #[test]
    fn test_bold_rules() {
        let ext = BoldExtension;
        assert_eq!(ext.parse(&HtmlElement::new("strong")), Some(Mark::Bold));
        assert_eq!(ext.parse(&HtmlElement::new("b")), Some(Mark::Bold));
        assert_eq!(
            ext.parse(&HtmlElement::new("b").with_attr("style", "font-weight: normal")),
            None
        );
        assert_eq!(ext.parse(&span("font-weight: 700")), Some(Mark::Bold));
        assert_eq!(ext.parse(&span("font-weight: 400")), None);
    }

    #[test]
    fn test_register_replaces_kind() {
        struct UnderlinedCode;
        impl MarkExtension for UnderlinedCode {
            fn kind(&self) -> MarkKind {
                MarkKind::Code
            }
            fn parse(&self, element: &HtmlElement) -> Option<Mark> {
                element.is("kbd").then_some(Mark::Code)
            }
            fn serialize(&self, mark: &Mark) -> Option<HtmlTag> {
                matches!(mark, Mark::Code).then(|| HtmlTag::new("kbd"))
            }
        }

        let mut registry = ExtensionRegistry::default();
        registry.register(UnderlinedCode);
        assert_eq!(registry.kinds().count(), 6);
        assert_eq!(registry.parse_marks(&HtmlElement::new("code")), vec![]);
        assert_eq!(
            registry.serialize_mark(&Mark::Code).map(|tag| tag.name),
            Some("kbd")
        );
    }
}
