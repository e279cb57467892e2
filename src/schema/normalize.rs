//! Canonicalization of vendor schema documents.
//!
//! Input is arbitrary JSON in the general shape of a structural schema;
//! output is a [`SchemaNode`] in the closed vocabulary. Bookkeeping fields
//! (`title`, `$id`, `$ref`, `minItems`, `maxItems`, `default`) are dropped
//! by construction since only semantic keys are read.

use std::collections::HashMap;

use serde_json::Value;

use super::node::{SchemaNode, TypeTag};

/// Two-level primitive type name table: caller-supplied custom entries
/// (case-insensitive) override the built-in alias table.
#[derive(Debug, Clone, Default)]
pub struct TypeMapping {
    custom: HashMap<String, String>,
}

impl TypeMapping {
    /// Build a mapping from custom `vendor name -> canonical name` entries.
    /// Keys are matched case-insensitively.
    pub fn new(custom: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            custom: custom
                .into_iter()
                .map(|(from, to)| (from.trim().to_lowercase(), to))
                .collect(),
        }
    }

    /// Map a raw type name to a canonical tag. Unknown names map to `None`
    /// and the node stays untyped.
    pub fn map(&self, raw: &str) -> Option<TypeTag> {
        let lower = raw.trim().to_lowercase();
        if let Some(target) = self.custom.get(&lower) {
            return builtin_alias(&target.trim().to_lowercase());
        }
        builtin_alias(&lower)
    }
}

fn builtin_alias(lower: &str) -> Option<TypeTag> {
    if let Some(tag) = TypeTag::from_canonical(lower) {
        return Some(tag);
    }
    match lower {
        "byte" | "short" | "int" | "long" => Some(TypeTag::Integer),
        "float" | "double" | "decimal" | "bigdecimal" => Some(TypeTag::Number),
        "char" => Some(TypeTag::String),
        "void" => Some(TypeTag::Null),
        _ => None,
    }
}

/// Canonicalize one schema fragment. Pure and recursive, no I/O.
///
/// Idempotent: feeding the serialized form of the result back in yields an
/// equal node.
pub fn normalize(value: &Value, mapping: &TypeMapping) -> SchemaNode {
    let Value::Object(map) = value else {
        // JSON Schema allows a bare `true` meaning "anything".
        if matches!(value, Value::Bool(true)) {
            return SchemaNode::any_marker();
        }
        return SchemaNode::default();
    };

    let mut node = SchemaNode::default();

    match map.get("type") {
        Some(Value::String(name)) => {
            if let Some(tag) = mapping.map(name) {
                node.types.push(tag);
            }
        }
        Some(Value::Array(names)) => {
            for name in names {
                if let Some(tag) = name.as_str().and_then(|n| mapping.map(n)) {
                    node.types.push(tag);
                }
            }
            node.types.sort();
            node.types.dedup();
        }
        _ => {}
    }

    match map.get("properties") {
        Some(Value::Object(props)) => {
            for (name, prop) in props {
                node.properties
                    .insert(name.trim().to_string(), normalize(prop, mapping));
            }
        }
        // Some sources encode the property map as a list of schemas each
        // carrying its own `name` field.
        Some(Value::Array(props)) => {
            for prop in props {
                if let Some(name) = prop.get("name").and_then(Value::as_str) {
                    node.properties
                        .insert(name.trim().to_string(), normalize(prop, mapping));
                }
            }
        }
        _ => {}
    }

    if let Some(Value::Array(required)) = map.get("required") {
        for name in required {
            if let Some(name) = name.as_str() {
                let trimmed = name.trim();
                // Required names are only meaningful for declared properties.
                if node.properties.contains_key(trimmed) {
                    node.required.insert(trimmed.to_string());
                }
            }
        }
    }

    match map.get("items") {
        Some(Value::Array(items)) => {
            // Several item schemas collapse to the first.
            if let Some(first) = items.first() {
                node.items = Some(Box::new(normalize(first, mapping)));
            }
        }
        Some(item @ Value::Object(_)) => {
            node.items = Some(Box::new(normalize(item, mapping)));
        }
        _ => {}
    }

    for (key, target) in [
        ("oneOf", &mut node.one_of),
        ("anyOf", &mut node.any_of),
        ("allOf", &mut node.all_of),
    ] {
        if let Some(Value::Array(branches)) = map.get(key) {
            *target = branches.iter().map(|b| normalize(b, mapping)).collect();
        }
    }

    if let Some(Value::String(description)) = map.get("description") {
        node.description = Some(description.clone());
    }
    if let Some(Value::String(type_name)) = map.get("typeName") {
        node.type_name = Some(type_name.clone());
    }
    if let Some(Value::Bool(true)) = map.get("any") {
        node.any = true;
    }

    node
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builtin_aliases() {
        let mapping = TypeMapping::default();
        assert_eq!(mapping.map("int"), Some(TypeTag::Integer));
        assert_eq!(mapping.map("Long"), Some(TypeTag::Integer));
        assert_eq!(mapping.map("double"), Some(TypeTag::Number));
        assert_eq!(mapping.map("BigDecimal"), Some(TypeTag::Number));
        assert_eq!(mapping.map("char"), Some(TypeTag::String));
        assert_eq!(mapping.map("void"), Some(TypeTag::Null));
        assert_eq!(mapping.map("string"), Some(TypeTag::String));
        assert_eq!(mapping.map("File"), None);
    }

    #[test]
    fn test_custom_mapping_overrides_builtin() {
        let mapping = TypeMapping::new([
            ("Text".to_string(), "string".to_string()),
            ("int".to_string(), "string".to_string()),
        ]);
        assert_eq!(mapping.map("text"), Some(TypeTag::String));
        assert_eq!(mapping.map("INT"), Some(TypeTag::String));
        // Built-ins still apply where no custom entry matches.
        assert_eq!(mapping.map("long"), Some(TypeTag::Integer));
    }

    #[test]
    fn test_strips_bookkeeping_and_remaps_types() {
        let raw = json!({
            "type": "int",
            "title": "SomeVendorName",
            "$id": "#/definitions/x",
            "minItems": 1,
            "maxItems": 3,
            "default": 7,
            "description": "a count"
        });
        let node = normalize(&raw, &TypeMapping::default());
        assert_eq!(node.types, vec![TypeTag::Integer]);
        assert_eq!(node.description.as_deref(), Some("a count"));
        let back = serde_json::to_value(&node).unwrap();
        assert!(back.get("title").is_none());
        assert!(back.get("default").is_none());
    }

    #[test]
    fn test_array_encoded_properties_coerced_to_map() {
        let raw = json!({
            "type": "object",
            "properties": [
                {"name": " a ", "type": "string"},
                {"name": "b", "type": "long"}
            ],
            "required": ["a "]
        });
        let node = normalize(&raw, &TypeMapping::default());
        assert_eq!(node.properties["a"].types, vec![TypeTag::String]);
        assert_eq!(node.properties["b"].types, vec![TypeTag::Integer]);
        assert!(node.required.contains("a"), "required names are trimmed too");
    }

    #[test]
    fn test_items_list_collapses_to_first() {
        let raw = json!({
            "type": "array",
            "items": [{"type": "string"}, {"type": "integer"}]
        });
        let node = normalize(&raw, &TypeMapping::default());
        assert_eq!(node.items.unwrap().types, vec![TypeTag::String]);
    }

    #[test]
    fn test_recurses_into_composition_branches() {
        let raw = json!({
            "oneOf": [{"type": "int"}, {"type": "char"}],
            "allOf": [{"type": "object", "properties": {"x": {"type": "double"}}}]
        });
        let node = normalize(&raw, &TypeMapping::default());
        assert_eq!(node.one_of[0].types, vec![TypeTag::Integer]);
        assert_eq!(node.one_of[1].types, vec![TypeTag::String]);
        assert_eq!(node.all_of[0].properties["x"].types, vec![TypeTag::Number]);
    }

    #[test]
    fn test_idempotence() {
        let mapping = TypeMapping::default();
        let raw = json!({
            "type": "object",
            "properties": [
                {"name": "count", "type": "long", "default": 0},
                {"name": "tags", "type": "array", "items": [{"type": "char"}]},
                {"name": "nested", "type": "object", "properties": {
                    " inner ": {"type": "double"}
                }}
            ],
            "required": ["count", "missing"],
            "title": "Vendor"
        });
        let once = normalize(&raw, &mapping);
        let twice = normalize(&serde_json::to_value(&once).unwrap(), &mapping);
        assert_eq!(once, twice);
        assert!(!once.required.contains("missing"));
    }

    #[test]
    fn test_bare_true_is_any() {
        let node = normalize(&json!(true), &TypeMapping::default());
        assert!(node.any);
    }
}
