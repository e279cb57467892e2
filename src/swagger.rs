//! Swagger 2.0 / OpenAPI 3 translation into the collection protocol shape.
//!
//! The compatibility bridge serves the result of [`translate`] through the
//! same 3 routes a native collection source exposes, so the rest of the
//! pipeline never knows the data started as a Swagger document.

use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::collection::{
    CategoryMenuItem, ExportCategory, InterfaceDescriptor, Project, ProjectEnv,
};
use crate::error::BridgeError;

const VERBS: [&str; 7] = ["get", "post", "put", "delete", "patch", "head", "options"];

/// A translated document, ready to serve.
#[derive(Debug, Clone)]
pub struct SwaggerTranslation {
    pub project: Project,
    pub categories: Vec<CategoryMenuItem>,
    pub export: Vec<ExportCategory>,
}

/// Translate a Swagger 2.0 or OpenAPI 3 document.
pub fn translate(document: &Value) -> Result<SwaggerTranslation, BridgeError> {
    let is_v2 = document
        .get("swagger")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with('2'));
    let is_v3 = document
        .get("openapi")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with('3'));
    if !is_v2 && !is_v3 {
        return Err(BridgeError::UnsupportedDialect(
            document
                .get("swagger")
                .or_else(|| document.get("openapi"))
                .map_or_else(|| "unknown".to_string(), Value::to_string),
        ));
    }

    let definitions = if is_v2 {
        document.get("definitions")
    } else {
        document.get("components").and_then(|c| c.get("schemas"))
    }
    .and_then(Value::as_object)
    .cloned()
    .unwrap_or_default();

    let info = document.get("info");
    let name = info
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("swagger")
        .to_string();
    let basepath = if is_v2 {
        document
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    } else {
        String::new()
    };

    let now = Utc::now().timestamp();
    let mut translator = Translator {
        definitions,
        categories: Vec::new(),
        export: Vec::new(),
        next_interface_id: 1,
        now,
    };

    if let Some(tags) = document.get("tags").and_then(Value::as_array) {
        for tag in tags {
            if let Some(tag_name) = tag.get("name").and_then(Value::as_str) {
                translator.category_id(tag_name);
            }
        }
    }

    if let Some(paths) = document.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            let shared_params = item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for verb in VERBS {
                if let Some(operation) = item.get(verb) {
                    translator.translate_operation(path, verb, operation, &shared_params, is_v2);
                }
            }
        }
    }

    let project = Project {
        id: 1,
        name,
        basepath,
        desc: info
            .and_then(|i| i.get("description"))
            .and_then(Value::as_str)
            .map(ToString::to_string),
        env: vec![ProjectEnv {
            name: "swagger".to_string(),
            domain: server_domain(document, is_v2),
        }],
        extra: Map::new(),
    };

    Ok(SwaggerTranslation {
        project,
        categories: translator.categories,
        export: translator.export,
    })
}

fn server_domain(document: &Value, is_v2: bool) -> String {
    if is_v2 {
        let host = document.get("host").and_then(Value::as_str).unwrap_or("");
        let scheme = document
            .get("schemes")
            .and_then(Value::as_array)
            .and_then(|s| s.first())
            .and_then(Value::as_str)
            .unwrap_or("http");
        if host.is_empty() {
            String::new()
        } else {
            format!("{scheme}://{host}")
        }
    } else {
        document
            .get("servers")
            .and_then(Value::as_array)
            .and_then(|s| s.first())
            .and_then(|s| s.get("url"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    }
}

struct Translator {
    definitions: Map<String, Value>,
    categories: Vec<CategoryMenuItem>,
    export: Vec<ExportCategory>,
    next_interface_id: i64,
    now: i64,
}

impl Translator {
    /// Find or create the category for a tag name.
    fn category_id(&mut self, tag_name: &str) -> i64 {
        if let Some(existing) = self.categories.iter().find(|c| c.name == tag_name) {
            return existing.id;
        }
        let id = self.categories.len() as i64 + 1;
        self.categories.push(CategoryMenuItem {
            id,
            name: tag_name.to_string(),
            desc: None,
            project_id: 1,
            extra: Map::from_iter([
                ("add_time".to_string(), json!(self.now)),
                ("up_time".to_string(), json!(self.now)),
            ]),
        });
        self.export.push(ExportCategory {
            id,
            name: tag_name.to_string(),
            desc: None,
            list: Vec::new(),
            extra: Map::new(),
        });
        id
    }

    fn translate_operation(
        &mut self,
        path: &str,
        verb: &str,
        operation: &Value,
        shared_params: &[Value],
        is_v2: bool,
    ) {
        let tag = operation
            .get("tags")
            .and_then(Value::as_array)
            .and_then(|t| t.first())
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();
        let catid = self.category_id(&tag);

        let title = operation
            .get("summary")
            .or_else(|| operation.get("operationId"))
            .and_then(Value::as_str)
            .unwrap_or(path)
            .to_string();

        let mut req_params = Vec::new();
        let mut req_query = Vec::new();
        let mut req_headers = Vec::new();
        let mut req_body_form = Vec::new();
        let mut req_body_type = None;
        let mut req_body_other = None;

        let own_params = operation
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for param in shared_params.iter().chain(own_params.iter()) {
            let param = self.dereference(param.clone());
            let Some(name) = param.get("name").and_then(Value::as_str) else {
                continue;
            };
            let required = if param.get("required").and_then(Value::as_bool) == Some(true) {
                "1"
            } else {
                "0"
            };
            let entry = json!({
                "name": name,
                "required": required,
                "type": param.get("type").and_then(Value::as_str),
                "desc": param.get("description").and_then(Value::as_str),
            });
            match param.get("in").and_then(Value::as_str) {
                Some("path") => req_params.push(entry),
                Some("query") => req_query.push(entry),
                Some("header") => req_headers.push(entry),
                Some("formData") => {
                    req_body_type = Some("form");
                    let kind = if param.get("type").and_then(Value::as_str) == Some("file") {
                        "file"
                    } else {
                        "text"
                    };
                    req_body_form.push(json!({
                        "name": name,
                        "type": kind,
                        "required": required,
                        "desc": param.get("description").and_then(Value::as_str),
                    }));
                }
                Some("body") => {
                    if let Some(schema) = param.get("schema") {
                        req_body_type = Some("json");
                        req_body_other = Some(self.dereference(schema.clone()).to_string());
                    }
                }
                _ => {}
            }
        }

        // OpenAPI 3 moves the body under requestBody.content.
        if !is_v2 {
            if let Some(content) = operation
                .get("requestBody")
                .and_then(|b| b.get("content"))
                .and_then(Value::as_object)
            {
                if let Some((media_type, media)) = content
                    .get_key_value("application/json")
                    .or_else(|| content.iter().next())
                {
                    let schema = media
                        .get("schema")
                        .map(|s| self.dereference(s.clone()))
                        .unwrap_or(Value::Null);
                    if media_type.contains("form") {
                        req_body_type = Some("form");
                        req_body_form = form_fields_from_schema(&schema);
                    } else if !schema.is_null() {
                        req_body_type = Some("json");
                        req_body_other = Some(schema.to_string());
                    }
                }
            }
        }

        let res_body = self.response_schema(operation, is_v2);

        let id = self.next_interface_id;
        self.next_interface_id += 1;

        let interface = json!({
            "_id": id,
            "title": title,
            "path": path,
            "method": verb.to_uppercase(),
            "project_id": 1,
            "catid": catid,
            "req_params": req_params,
            "req_query": req_query,
            "req_headers": req_headers,
            "req_body_type": req_body_type,
            "req_body_form": req_body_form,
            "req_body_other": req_body_other,
            "req_body_is_json_schema": true,
            "res_body_type": if res_body.is_some() { "json" } else { "raw" },
            "res_body": res_body,
            "res_body_is_json_schema": true,
            "desc": operation.get("description").and_then(Value::as_str),
            "add_time": self.now,
            "up_time": self.now,
        });
        // The literal above always matches the descriptor shape.
        if let Ok(descriptor) = serde_json::from_value::<InterfaceDescriptor>(interface) {
            if let Some(category) = self.export.iter_mut().find(|c| c.id == catid) {
                category.list.push(descriptor);
            }
        }
    }

    fn response_schema(&mut self, operation: &Value, is_v2: bool) -> Option<String> {
        let responses = operation.get("responses").and_then(Value::as_object)?;
        let response = responses
            .get("200")
            .or_else(|| responses.values().next())?;
        let schema = if is_v2 {
            response.get("schema")?
        } else {
            let content = response.get("content").and_then(Value::as_object)?;
            content
                .get("application/json")
                .or_else(|| content.values().next())?
                .get("schema")?
        };
        Some(self.dereference(schema.clone()).to_string())
    }

    /// Inline `$ref` pointers. A reference cycle bottoms out as an empty
    /// schema instead of recursing forever.
    fn dereference(&self, value: Value) -> Value {
        let mut visited = Vec::new();
        self.dereference_inner(value, &mut visited)
    }

    fn dereference_inner(&self, value: Value, visited: &mut Vec<String>) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    let name = reference
                        .rsplit('/')
                        .next()
                        .unwrap_or(reference)
                        .to_string();
                    if visited.contains(&name) {
                        return json!({});
                    }
                    let Some(target) = self.definitions.get(&name).cloned() else {
                        return json!({});
                    };
                    visited.push(name);
                    let resolved = self.dereference_inner(target, visited);
                    visited.pop();
                    return resolved;
                }
                Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, self.dereference_inner(v, visited)))
                        .collect(),
                )
            }
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|v| self.dereference_inner(v, visited))
                    .collect(),
            ),
            other => other,
        }
    }
}

fn form_fields_from_schema(schema: &Value) -> Vec<Value> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    properties
        .iter()
        .map(|(name, prop)| {
            let is_file = prop.get("format").and_then(Value::as_str) == Some("binary");
            json!({
                "name": name,
                "type": if is_file { "file" } else { "text" },
                "required": if required.contains(&name.as_str()) { "1" } else { "0" },
                "desc": prop.get("description").and_then(Value::as_str),
            })
        })
        .collect()
}
