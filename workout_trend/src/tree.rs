//! XML text to a generic nested key/value tree.
//!
//! Element names become object keys, repeated siblings collapse into arrays
//! and attributes are kept under `@name`. Leaf text stays a string exactly as
//! written (surrounding whitespace trimmed); numbers are read by the
//! consumer. Namespace prefixes are dropped.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

pub const ATTRIBUTE_PREFIX: &str = "@";
pub const TEXT_KEY: &str = "#text";

/// Parse `text` into a tree rooted at the document element.
///
/// Returns `None` when the text is not well-formed XML.
pub fn parse_tree(text: &str) -> Option<Value> {
    let doc = Document::parse(text).ok()?;
    let root = doc.root_element();
    let mut tree = Map::new();
    tree.insert(root.tag_name().name().to_string(), element_value(root));
    Some(Value::Object(tree))
}

fn element_value(node: Node) -> Value {
    let mut map = Map::new();

    for attr in node.attributes() {
        map.insert(
            format!("{}{}", ATTRIBUTE_PREFIX, attr.name()),
            Value::String(attr.value().to_string()),
        );
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let key = child.tag_name().name().to_string();
            let value = element_value(child);
            match map.get_mut(&key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key, value);
                }
            }
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }

    let text = text.trim();
    if map.is_empty() {
        return Value::String(text.to_string());
    }
    if !text.is_empty() {
        map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
    }
    Value::Object(map)
}
