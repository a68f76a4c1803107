//! JSON tree representation.
//!
//! The tree follows the node and mark names the browser editor uses (`doc`,
//! `paragraph`, `bulletList` > `listItem` > `paragraph`, `codeBlock`, `text`
//! with `marks`, ...), so saved documents can be loaded on either side.
//! Block sequence ids are not part of the tree; they are reassigned on load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use smol_str::SmolStr;

use crate::content::{ImageAttrs, Inline};
use crate::document::{Block, BlockAttrs, BlockKind, BlockType, Document, DocumentBuilder, TextAlign};
use crate::error::JsonError;
use crate::marks::{Mark, MarkKind, MarkSet, TextStyle, TextStyleAttr, css_value};

/// A node as it appears in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonNode {
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<JsonNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<JsonMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMark {
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
}

impl JsonNode {
    fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name)?.as_str()
    }
}

pub fn to_json(doc: &Document) -> Value {
    let mut content = Vec::new();
    let mut list: Option<(BlockType, Vec<Value>)> = None;

    for block in doc.blocks() {
        let item_type = block.kind.block_type().filter(|ty| {
            matches!(ty, BlockType::BulletListItem | BlockType::OrderedListItem)
        });
        let open_type = list.as_ref().map(|(ty, _)| *ty);
        if open_type.is_some() && open_type != item_type {
            if let Some((ty, items)) = list.take() {
                content.push(list_node(ty, items));
            }
        }
        if let Some(ty) = item_type {
            let item = json!({ "type": "listItem", "content": [paragraph_node(block)] });
            list.get_or_insert_with(|| (ty, Vec::new())).1.push(item);
            continue;
        }
        content.push(block_node(block));
    }
    if let Some((ty, items)) = list.take() {
        content.push(list_node(ty, items));
    }
    json!({ "type": "doc", "content": content })
}

fn list_node(ty: BlockType, items: Vec<Value>) -> Value {
    match ty {
        BlockType::OrderedListItem => {
            json!({ "type": "orderedList", "attrs": { "start": 1 }, "content": items })
        }
        _ => json!({ "type": "bulletList", "content": items }),
    }
}

fn paragraph_node(block: &Block) -> Value {
    let mut node = json!({
        "type": "paragraph",
        "attrs": { "textAlign": block.attrs.text_align.as_str() },
    });
    let inline = inline_nodes(&block.content);
    if !inline.is_empty() {
        node["content"] = Value::Array(inline);
    }
    node
}

fn block_node(block: &Block) -> Value {
    match &block.kind {
        BlockKind::CodeBlock { language } => {
            let mut node = json!({ "type": "codeBlock", "attrs": { "language": language } });
            let text = block.text();
            if !text.is_empty() {
                node["content"] = json!([{ "type": "text", "text": text }]);
            }
            node
        }
        BlockKind::HorizontalRule => json!({ "type": "horizontalRule" }),
        BlockKind::Image(attrs) => image_node(attrs),
        _ => paragraph_node(block),
    }
}

fn image_node(attrs: &ImageAttrs) -> Value {
    json!({
        "type": "image",
        "attrs": { "src": attrs.src, "alt": attrs.alt, "title": null },
    })
}

fn inline_nodes(content: &[Inline]) -> Vec<Value> {
    content
        .iter()
        .map(|inline| match inline {
            Inline::Text { text, marks } => {
                let mut node = json!({ "type": "text", "text": text });
                if !marks.is_empty() {
                    node["marks"] = Value::Array(marks.iter().map(mark_node).collect());
                }
                node
            }
            Inline::Image(attrs) => image_node(attrs),
        })
        .collect()
}

fn mark_node(mark: &Mark) -> Value {
    let name = mark.kind().name();
    match mark {
        Mark::FontSize { size } => json!({ "type": name, "attrs": { "size": size } }),
        Mark::TextStyle(style) => {
            let attrs: Map<String, Value> = TextStyleAttr::ALL
                .into_iter()
                .map(|attr| {
                    let value = style
                        .get(attr)
                        .map(|value| Value::String(value.to_string()))
                        .unwrap_or(Value::Null);
                    (attr.json_key().to_string(), value)
                })
                .collect();
            json!({ "type": name, "attrs": attrs })
        }
        _ => json!({ "type": name }),
    }
}

pub fn from_json(value: Value) -> Result<Document, JsonError> {
    let root: JsonNode = serde_json::from_value(value)?;
    if root.kind != "doc" {
        return Err(JsonError::UnexpectedRoot { found: root.kind });
    }
    let mut builder = DocumentBuilder::new();
    for node in &root.content {
        read_block(&mut builder, node, "doc")?;
    }
    Ok(builder.build())
}

fn read_block(builder: &mut DocumentBuilder, node: &JsonNode, parent: &str) -> Result<(), JsonError> {
    match node.kind.as_str() {
        "paragraph" => {
            let kind = match parent {
                "bulletList" => BlockKind::BulletListItem,
                "orderedList" => BlockKind::OrderedListItem,
                _ => BlockKind::Paragraph,
            };
            let attrs = BlockAttrs {
                text_align: node
                    .attr_str("textAlign")
                    .and_then(TextAlign::parse)
                    .unwrap_or_default(),
            };
            let content = read_inline(node, false)?;
            builder.push(kind, attrs, content);
        }
        "bulletList" | "orderedList" => {
            for item in &node.content {
                if item.kind != "listItem" {
                    return Err(JsonError::Misplaced {
                        node: item.kind.clone(),
                        parent: node.kind.clone(),
                    });
                }
                if item.content.is_empty() {
                    let kind = if node.kind == "bulletList" {
                        BlockKind::BulletListItem
                    } else {
                        BlockKind::OrderedListItem
                    };
                    builder.push(kind, BlockAttrs::default(), Vec::new());
                }
                for child in &item.content {
                    read_block(builder, child, &node.kind)?;
                }
            }
        }
        "codeBlock" => {
            let language = node.attr_str("language").map(SmolStr::from);
            let content = read_inline(node, true)?;
            builder.push(BlockKind::CodeBlock { language }, BlockAttrs::default(), content);
        }
        "horizontalRule" => builder.push(BlockKind::HorizontalRule, BlockAttrs::default(), Vec::new()),
        "image" => {
            let attrs = read_image(node)?;
            builder.push(BlockKind::Image(attrs), BlockAttrs::default(), Vec::new());
        }
        "text" | "hardBreak" | "listItem" => {
            return Err(JsonError::Misplaced {
                node: node.kind.clone(),
                parent: parent.into(),
            });
        }
        _ => {
            return Err(JsonError::UnknownNode {
                kind: node.kind.clone(),
            });
        }
    }
    Ok(())
}

fn read_image(node: &JsonNode) -> Result<ImageAttrs, JsonError> {
    let src = node.attr_str("src").ok_or_else(|| JsonError::MissingAttribute {
        node: node.kind.clone(),
        attr: "src",
    })?;
    Ok(ImageAttrs {
        src: src.into(),
        alt: node.attr_str("alt").map(SmolStr::from),
    })
}

fn read_inline(parent: &JsonNode, code: bool) -> Result<Vec<Inline>, JsonError> {
    let mut content = Vec::new();
    for node in &parent.content {
        match node.kind.as_str() {
            "text" => {
                let text = node.text.clone().unwrap_or_default();
                let marks = if code { MarkSet::new() } else { read_marks(&node.marks) };
                content.push(Inline::text(text, marks));
            }
            "hardBreak" => content.push(Inline::plain(if code { "\n" } else { " " })),
            "image" if !code => content.push(Inline::Image(read_image(node)?)),
            "image" => {
                return Err(JsonError::Misplaced {
                    node: node.kind.clone(),
                    parent: parent.kind.clone(),
                });
            }
            _ => {
                return Err(JsonError::UnknownNode {
                    kind: node.kind.clone(),
                });
            }
        }
    }
    Ok(content)
}

fn read_marks(marks: &[JsonMark]) -> MarkSet {
    let mut set = MarkSet::new();
    for mark in marks {
        let attr = |name: &str| {
            mark.attrs
                .as_ref()
                .and_then(|attrs| attrs.get(name))
                .and_then(Value::as_str)
                .and_then(css_value)
        };
        let parsed = match MarkKind::from_name(&mark.kind) {
            Some(MarkKind::FontSize) => attr("size").map(|size| Mark::FontSize { size }),
            Some(MarkKind::TextStyle) => {
                let mut style = TextStyle::new();
                for key in TextStyleAttr::ALL {
                    style.set(key, attr(key.json_key()));
                }
                (!style.is_empty()).then_some(Mark::TextStyle(style))
            }
            Some(kind) => Mark::simple(kind),
            None => {
                tracing::debug!(mark = %mark.kind, "ignoring unknown mark");
                None
            }
        };
        if let Some(parsed) = parsed {
            set.insert(parsed);
        }
    }
    set
}
