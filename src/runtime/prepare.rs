//! Transport payload preparation.
//!
//! [`prepare`] is single-pass and synchronous: split file fields out of the
//! call data, substitute path parameters, encode query parameters, and hand
//! back everything the request executor needs. Only the lazily built
//! multipart form can fail, and only when file parts exist without a keyed
//! ordinary payload to name them by.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::collection::BodyKind;
use crate::error::RequestPreparationError;
use crate::schema::SchemaNode;

use super::file_data::FileData;

/// How array-valued query parameters are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryArrayFormat {
    /// `list[]=1&list[]=2`
    #[default]
    Brackets,
    /// `list[0]=1&list[1]=2`
    Indices,
    /// `list=1&list=2`
    Repeat,
    /// `list=1,2`
    Comma,
    /// `list=%5B1%2C2%5D` (the JSON text, url-encoded)
    Json,
}

/// The frozen, serializable contract handed to the runtime executor.
/// Generated artifacts embed one of these per interface as literal data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestConfig {
    pub mock_url: String,
    pub dev_url: String,
    pub prod_url: String,
    pub path: String,
    pub method: String,
    pub request_body_type: Option<BodyKind>,
    pub response_body_type: Option<BodyKind>,
    /// Result-extraction key path, outermost segment first.
    pub data_key: Vec<String>,
    pub param_names: Vec<String>,
    pub query_names: Vec<String>,
    pub query_array_format: QueryArrayFormat,
    pub request_data_optional: bool,
    pub request_schema: Option<SchemaNode>,
    pub response_schema: Option<SchemaNode>,
    /// Free-form metadata passed through to the executor.
    pub extra: Map<String, Value>,
}

/// One field value of the call data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Plain(Value),
    File(FileData),
    FileList(Vec<FileData>),
}

/// Caller-supplied call data: either a keyed map (the common case) or an
/// arbitrary value passed through unsplit.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestData {
    Map(BTreeMap<String, DataValue>),
    Value(Value),
}

impl RequestData {
    /// An empty keyed map.
    pub fn empty() -> Self {
        Self::Map(BTreeMap::new())
    }
}

impl From<Value> for RequestData {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, DataValue::Plain(v)))
                    .collect(),
            ),
            other => Self::Value(other),
        }
    }
}

/// Everything the executor needs to perform one call.
#[derive(Debug, Clone)]
pub struct TransportPayload {
    /// Path template after parameter substitution and query appending.
    pub path: String,
    /// The caller's data, untouched.
    pub raw_data: RequestData,
    /// Ordinary payload after path/query keys were consumed.
    pub data: Value,
    pub has_file_data: bool,
    /// File fields, one or more parts per name.
    pub file_data: BTreeMap<String, Vec<FileData>>,
    /// Ordinary and file fields combined, before any key was consumed.
    pub all_data: BTreeMap<String, DataValue>,
}

impl TransportPayload {
    /// Build the multipart form: ordinary fields first, then file fields,
    /// one part per item of a list-valued file field.
    ///
    /// Fails when file parts exist but the ordinary payload is not a keyed
    /// map, because part names cannot be derived.
    pub fn multipart_form(&self) -> Result<reqwest::multipart::Form, RequestPreparationError> {
        let Value::Object(ordinary) = &self.data else {
            if self.has_file_data {
                return Err(RequestPreparationError::MultipartUnsupported);
            }
            return Ok(reqwest::multipart::Form::new());
        };
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in ordinary {
            form = form.text(name.clone(), plain_string(value));
        }
        for (name, files) in &self.file_data {
            for file in files {
                let mut part = reqwest::multipart::Part::bytes(file.content().to_vec())
                    .file_name(file.file_name().to_string());
                if let Some(mime) = file.mime_type() {
                    part = part
                        .mime_str(mime)
                        .map_err(|_| RequestPreparationError::MultipartUnsupported)?;
                }
                form = form.part(name.clone(), part);
            }
        }
        Ok(form)
    }
}

/// Shape caller data into a transport payload per the request configuration.
pub fn prepare(config: &RequestConfig, raw_data: RequestData) -> TransportPayload {
    let (mut ordinary, file_data, all_data) = match &raw_data {
        RequestData::Map(map) => split_fields(map),
        RequestData::Value(value) => (value.clone(), BTreeMap::new(), BTreeMap::new()),
    };

    let mut path = config.path.clone();

    if let Value::Object(fields) = &mut ordinary {
        for name in &config.param_names {
            if let Some(value) = fields.get(name) {
                let rendered = plain_string(value);
                path = substitute_path_param(&path, name, &rendered);
                fields.remove(name);
            }
        }

        let mut query_parts = Vec::new();
        for name in &config.query_names {
            let Some(value) = fields.get(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            encode_query_param(&mut query_parts, name, value, config.query_array_format);
            fields.remove(name);
        }
        if !query_parts.is_empty() {
            let joiner = if path.contains('?') { '&' } else { '?' };
            path.push(joiner);
            path.push_str(&query_parts.join("&"));
        }
    }

    TransportPayload {
        path,
        has_file_data: !file_data.is_empty(),
        raw_data,
        data: ordinary,
        file_data,
        all_data,
    }
}

type SplitFields = (
    Value,
    BTreeMap<String, Vec<FileData>>,
    BTreeMap<String, DataValue>,
);

fn split_fields(map: &BTreeMap<String, DataValue>) -> SplitFields {
    let mut ordinary = Map::new();
    let mut files = BTreeMap::new();
    for (name, value) in map {
        match value {
            DataValue::Plain(v) => {
                ordinary.insert(name.clone(), v.clone());
            }
            DataValue::File(f) => {
                files.insert(name.clone(), vec![f.clone()]);
            }
            DataValue::FileList(fs) => {
                files.insert(name.clone(), fs.clone());
            }
        }
    }
    (Value::Object(ordinary), files, map.clone())
}

/// Substitute one path parameter at both `{name}` and `/:name` (the latter
/// anchored to a following `/` or end-of-string).
fn substitute_path_param(path: &str, name: &str, value: &str) -> String {
    let path = path.replace(&format!("{{{name}}}"), value);

    let needle = format!("/:{name}");
    let mut result = String::new();
    let mut rest = path.as_str();
    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];
        if after.is_empty() || after.starts_with('/') {
            result.push_str(&rest[..pos]);
            result.push('/');
            result.push_str(value);
        } else {
            result.push_str(&rest[..pos + needle.len()]);
        }
        rest = after;
    }
    result.push_str(rest);
    result
}

fn encode_query_param(parts: &mut Vec<String>, name: &str, value: &Value, format: QueryArrayFormat) {
    let Value::Array(items) = value else {
        parts.push(format!("{name}={}", encode_component(&plain_string(value))));
        return;
    };
    match format {
        QueryArrayFormat::Brackets => {
            for item in items {
                parts.push(format!("{name}[]={}", encode_component(&plain_string(item))));
            }
        }
        QueryArrayFormat::Indices => {
            for (i, item) in items.iter().enumerate() {
                parts.push(format!(
                    "{name}[{i}]={}",
                    encode_component(&plain_string(item))
                ));
            }
        }
        QueryArrayFormat::Repeat => {
            for item in items {
                parts.push(format!("{name}={}", encode_component(&plain_string(item))));
            }
        }
        QueryArrayFormat::Comma => {
            let joined = items
                .iter()
                .map(|item| encode_component(&plain_string(item)))
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("{name}={joined}"));
        }
        QueryArrayFormat::Json => {
            let json = Value::Array(items.clone()).to_string();
            parts.push(format!("{name}={}", encode_component(&json)));
        }
    }
}

fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Render a JSON value the way it appears in a path segment or query value.
fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
