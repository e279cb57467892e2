//! Wire data model for the collection source protocol.
//!
//! The three read operations (project info, category menu, full export)
//! all speak this shape. Field names follow the wire protocol; unknown
//! fields are captured in `extra` so descriptors survive a round trip
//! through the bridge untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The application-level response envelope. A non-zero `errcode` marks a
/// failed call regardless of HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub errcode: i64,
    pub errmsg: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Wrap a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            errcode: 0,
            errmsg: "success".to_string(),
            data: Some(data),
        }
    }
}

/// One environment entry of a project: a human name mapped to a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEnv {
    pub name: String,
    pub domain: String,
}

/// Project metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub basepath: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub env: Vec<ProjectEnv>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    /// Look up the domain configured for an environment name.
    pub fn env_domain(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.domain.as_str())
    }
}

/// One entry of the category menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMenuItem {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub project_id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One exported category with its interface list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportCategory {
    #[serde(rename = "_id", default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub list: Vec<InterfaceDescriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body and response payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Form,
    Json,
    Text,
    File,
    Raw,
}

/// A declared path or query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedParam {
    pub name: String,
    #[serde(default)]
    pub required: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl NamedParam {
    /// The wire encodes requiredness as the string `"1"`.
    pub fn is_required(&self) -> bool {
        matches!(self.required.as_deref(), Some("1"))
    }
}

/// Form body field kinds: ordinary text or an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldKind {
    Text,
    File,
}

/// One declared form body field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(default = "FormField::default_kind", rename = "type")]
    pub kind: FormFieldKind,
    #[serde(default)]
    pub required: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl FormField {
    fn default_kind() -> FormFieldKind {
        FormFieldKind::Text
    }

    pub fn is_required(&self) -> bool {
        matches!(self.required.as_deref(), Some("1"))
    }
}

/// One remote operation: routing info plus request/response shape sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    #[serde(rename = "_id", default)]
    pub id: i64,
    pub title: String,
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub catid: i64,
    #[serde(default)]
    pub req_params: Vec<NamedParam>,
    #[serde(default)]
    pub req_query: Vec<NamedParam>,
    #[serde(default)]
    pub req_headers: Vec<NamedParam>,
    #[serde(default)]
    pub req_body_type: Option<BodyKind>,
    #[serde(default)]
    pub req_body_form: Vec<FormField>,
    #[serde(default)]
    pub req_body_other: Option<String>,
    #[serde(default)]
    pub req_body_is_json_schema: bool,
    #[serde(default)]
    pub res_body_type: Option<BodyKind>,
    #[serde(default)]
    pub res_body: Option<String>,
    #[serde(default)]
    pub res_body_is_json_schema: bool,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InterfaceDescriptor {
    /// Verbs whose primary request payload is the query string.
    pub fn is_query_method(&self) -> bool {
        matches!(
            self.method.to_uppercase().as_str(),
            "GET" | "HEAD" | "OPTIONS"
        )
    }
}
