//! Schema inference from annotated example payloads.
//!
//! Example payloads are not authoritative: nothing is marked required, and
//! the observed leaf value is kept in `description` so the emitter can show
//! it as documentation.

use serde_json::Value;

use super::node::{SchemaNode, TypeTag};
use super::normalize::TypeMapping;

/// Derive a canonical schema from an example payload.
///
/// Arrays take the shape of their first element; an empty array yields an
/// untyped item.
pub fn infer_schema(example: &Value, mapping: &TypeMapping) -> SchemaNode {
    match example {
        Value::Null => SchemaNode::with_type(TypeTag::Null),
        Value::Bool(b) => leaf(TypeTag::Boolean, b.to_string()),
        Value::Number(n) => {
            let tag = if n.is_i64() || n.is_u64() {
                TypeTag::Integer
            } else {
                TypeTag::Number
            };
            leaf(tag, n.to_string())
        }
        Value::String(s) => leaf(TypeTag::String, s.clone()),
        Value::Array(items) => {
            let mut node = SchemaNode::with_type(TypeTag::Array);
            node.items = Some(Box::new(
                items
                    .first()
                    .map(|first| infer_schema(first, mapping))
                    .unwrap_or_default(),
            ));
            node
        }
        Value::Object(map) => {
            let mut node = SchemaNode::empty_object();
            for (name, value) in map {
                // Annotated keys carry a mock generation rule after a pipe
                // ("total|1-100"); only the part before it names the property.
                let name = name.split('|').next().unwrap_or(name).trim();
                node.properties
                    .insert(name.to_string(), infer_schema(value, mapping));
            }
            node
        }
    }
}

fn leaf(tag: TypeTag, example: String) -> SchemaNode {
    let mut node = SchemaNode::with_type(tag);
    if !example.is_empty() {
        node.description = Some(example);
    }
    node
}
