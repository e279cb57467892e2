//! Request/response schema derivation for one interface descriptor.
//!
//! Derivation is lossy on purpose: an unparsable body source degrades to
//! the "any" marker instead of failing the run, and result-key extraction
//! is best-effort because example payloads are not authoritative.

use serde_json::Value;
use tracing::warn;

use crate::collection::{BodyKind, FormField, FormFieldKind, InterfaceDescriptor, NamedParam};
use crate::runtime::FILE_MARKER_TYPE;

use super::infer::infer_schema;
use super::node::{SchemaNode, TypeTag};
use super::normalize::{TypeMapping, normalize};

/// Build the canonical request schema for one interface.
///
/// Query-like verbs (GET/HEAD/OPTIONS) take the query-parameter list as the
/// primary source; other verbs select by body kind. Declared query
/// parameters and then path parameters are merged on top: property schemas
/// with last-wins precedence (a path parameter beats a query parameter of
/// the same name), required sets by union.
pub fn derive_request_schema(
    descriptor: &InterfaceDescriptor,
    mapping: &TypeMapping,
) -> SchemaNode {
    let mut schema = if descriptor.is_query_method() {
        params_to_schema(&descriptor.req_query, mapping, false)
    } else {
        match descriptor.req_body_type {
            Some(BodyKind::Form) => form_fields_to_schema(&descriptor.req_body_form),
            Some(BodyKind::Json) => body_source_to_schema(
                descriptor.req_body_other.as_deref(),
                descriptor.req_body_is_json_schema,
                mapping,
                descriptor.id,
            ),
            _ => SchemaNode::default(),
        }
    };

    if !descriptor.is_query_method() && !descriptor.req_query.is_empty() {
        schema.merge_object(params_to_schema(&descriptor.req_query, mapping, false));
    }
    if !descriptor.req_params.is_empty() {
        schema.merge_object(params_to_schema(&descriptor.req_params, mapping, true));
    }

    if !schema.has_properties() && !schema.any && schema.items.is_none() {
        let raw_like = matches!(
            descriptor.req_body_type,
            Some(BodyKind::Raw) | Some(BodyKind::Text)
        ) && !descriptor.is_query_method();
        if raw_like {
            return SchemaNode::any_marker();
        }
        if schema.types.is_empty() {
            return SchemaNode::empty_object();
        }
    }
    schema
}

/// Build the canonical response schema, descending into the configured
/// result-extraction key path when every segment is present.
pub fn derive_response_schema(
    descriptor: &InterfaceDescriptor,
    mapping: &TypeMapping,
    data_key: &[String],
) -> SchemaNode {
    let schema = match descriptor.res_body_type {
        Some(BodyKind::Json) => body_source_to_schema(
            descriptor.res_body.as_deref(),
            descriptor.res_body_is_json_schema,
            mapping,
            descriptor.id,
        ),
        _ => SchemaNode::any_marker(),
    };
    extract_data_key(schema, data_key)
}

fn extract_data_key(schema: SchemaNode, data_key: &[String]) -> SchemaNode {
    if data_key.is_empty() {
        return schema;
    }
    let mut cursor = &schema;
    for segment in data_key {
        match cursor.properties.get(segment) {
            Some(next) => cursor = next,
            // A missing segment leaves the schema untouched.
            None => return schema,
        }
    }
    cursor.clone()
}

fn params_to_schema(params: &[NamedParam], mapping: &TypeMapping, force_required: bool) -> SchemaNode {
    let mut schema = SchemaNode::empty_object();
    for param in params {
        let name = param.name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        let tag = param
            .kind
            .as_deref()
            .and_then(|k| mapping.map(k))
            .unwrap_or(TypeTag::String);
        let mut prop = SchemaNode::with_type(tag);
        prop.description = param.desc.clone().filter(|d| !d.is_empty());
        if force_required || param.is_required() {
            schema.required.insert(name.clone());
        }
        schema.properties.insert(name, prop);
    }
    schema
}

fn form_fields_to_schema(fields: &[FormField]) -> SchemaNode {
    let mut schema = SchemaNode::empty_object();
    for field in fields {
        let name = field.name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        let mut prop = match field.kind {
            FormFieldKind::Text => SchemaNode::with_type(TypeTag::String),
            FormFieldKind::File => SchemaNode {
                type_name: Some(FILE_MARKER_TYPE.to_string()),
                ..SchemaNode::default()
            },
        };
        prop.description = field.desc.clone().filter(|d| !d.is_empty());
        if field.is_required() {
            schema.required.insert(name.clone());
        }
        schema.properties.insert(name, prop);
    }
    schema
}

fn body_source_to_schema(
    source: Option<&str>,
    is_literal_schema: bool,
    mapping: &TypeMapping,
    interface_id: i64,
) -> SchemaNode {
    let Some(source) = source.filter(|s| !s.trim().is_empty()) else {
        return SchemaNode::default();
    };
    match serde_json::from_str::<Value>(source) {
        Ok(value) if is_literal_schema => normalize(&value, mapping),
        Ok(value) => infer_schema(&value, mapping),
        Err(err) => {
            warn!(interface_id, error = %err, "unparsable body source, degrading to any");
            SchemaNode::any_marker()
        }
    }
}
