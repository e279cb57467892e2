//! The canonical schema tree.
//!
//! Every schema-ish input (vendor schema document, field list, annotated
//! example payload) is reduced to this closed vocabulary before any further
//! processing. No vendor type name survives normalization, and bookkeeping
//! fields such as `title`, `$id`, item-count bounds and `default` are never
//! represented here.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Closed vocabulary of structural type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl TypeTag {
    /// Parse a canonical tag name. Vendor aliases are handled by the
    /// normalizer's type mapping, not here.
    pub fn from_canonical(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// The canonical lowercase name of this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// One node of the canonical schema tree.
///
/// `types` holds zero or more tags (empty means untyped; more than one is a
/// type set), sorted and deduplicated. `required` is always a subset of the
/// property names. An array node holds exactly one item schema; sources that
/// encoded several item schemas are collapsed to the first. `type_name`
/// carries an emitter-facing type expression that overrides the structural
/// shape (the file marker and resolved reference expressions use it), and
/// `any` marks an explicitly unconstrained schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(
        rename = "type",
        with = "type_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub types: Vec<TypeTag>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub required: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub any: bool,
}

impl SchemaNode {
    /// An empty object node with no properties.
    pub fn empty_object() -> Self {
        Self {
            types: vec![TypeTag::Object],
            ..Self::default()
        }
    }

    /// A node tagged with a single type.
    pub fn with_type(tag: TypeTag) -> Self {
        Self {
            types: vec![tag],
            ..Self::default()
        }
    }

    /// The explicit "anything goes" marker.
    pub fn any_marker() -> Self {
        Self {
            any: true,
            ..Self::default()
        }
    }

    /// Whether this node is an object with at least one property.
    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    /// Union another object schema into this one: property schemas merge
    /// with last-wins precedence, required sets union. A name required on
    /// either side stays required.
    pub fn merge_object(&mut self, other: SchemaNode) {
        if !self.types.contains(&TypeTag::Object) {
            self.types.push(TypeTag::Object);
            self.types.sort();
            self.types.dedup();
        }
        for (name, prop) in other.properties {
            self.properties.insert(name, prop);
        }
        self.required.extend(other.required);
    }
}

/// Serialize the tag list the way schema documents spell it: a bare string
/// for one tag, an array for a set.
mod type_list {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::TypeTag;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(TypeTag),
        Many(Vec<TypeTag>),
    }

    pub fn serialize<S: Serializer>(tags: &[TypeTag], ser: S) -> Result<S::Ok, S::Error> {
        match tags {
            [single] => OneOrMany::One(*single).serialize(ser),
            many => OneOrMany::Many(many.to_vec()).serialize(ser),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<TypeTag>, D::Error> {
        let value = Option::<OneOrMany>::deserialize(de)?;
        match value {
            None => Ok(Vec::new()),
            Some(OneOrMany::One(tag)) => Ok(vec![tag]),
            Some(OneOrMany::Many(tags)) => {
                let mut tags = tags;
                tags.sort();
                tags.dedup();
                if tags.is_empty() {
                    return Err(D::Error::custom("empty type list"));
                }
                Ok(tags)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_round_trip() {
        for tag in [
            TypeTag::Object,
            TypeTag::Array,
            TypeTag::String,
            TypeTag::Number,
            TypeTag::Integer,
            TypeTag::Boolean,
            TypeTag::Null,
        ] {
            assert_eq!(TypeTag::from_canonical(tag.as_str()), Some(tag));
        }
        assert_eq!(TypeTag::from_canonical("File"), None);
    }

    #[test]
    fn test_single_type_serializes_as_string() {
        let node = SchemaNode::with_type(TypeTag::String);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, serde_json::json!({"type": "string"}));
    }

    #[test]
    fn test_type_set_serializes_as_array() {
        let node = SchemaNode {
            types: vec![TypeTag::String, TypeTag::Null],
            ..SchemaNode::default()
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, serde_json::json!({"type": ["string", "null"]}));
        let back: SchemaNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_merge_object_property_last_wins_required_union() {
        let mut base = SchemaNode::empty_object();
        base.properties
            .insert("a".to_string(), SchemaNode::with_type(TypeTag::String));
        base.required.insert("a".to_string());

        let mut incoming = SchemaNode::empty_object();
        incoming
            .properties
            .insert("a".to_string(), SchemaNode::with_type(TypeTag::Integer));
        incoming
            .properties
            .insert("b".to_string(), SchemaNode::with_type(TypeTag::Boolean));
        incoming.required.insert("b".to_string());

        base.merge_object(incoming);
        assert_eq!(base.properties["a"].types, vec![TypeTag::Integer]);
        assert!(
            base.required.contains("a"),
            "a stays required despite the optional incoming side"
        );
        assert!(base.required.contains("b"));
    }
}
