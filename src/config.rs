//! Generation run configuration.
//!
//! One run takes a list of server configs; each server owns projects, each
//! project owns category selections. Naming and preprocessing behavior is
//! supplied through the [`GenerationHooks`] strategy rather than optional
//! callbacks, so defaults are explicit and documented.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collection::InterfaceDescriptor;
use crate::runtime::QueryArrayFormat;
use crate::util::{sanitize_identifier, to_camel_case};

/// Kind of collection source behind `server_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// A native collection source speaking the 3-route protocol.
    #[default]
    Native,
    /// A Swagger/OpenAPI document re-exposed through the compatibility
    /// bridge for the duration of the run.
    Swagger,
}

/// Selection of category ids within one project.
///
/// `0` selects every category; a negative id excludes by absolute value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryConfig {
    #[serde(with = "one_or_many")]
    pub id: Vec<i64>,
    /// Overrides the server-level destination for this category.
    pub output_file_path: Option<String>,
}

/// One project (credential) on a server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    pub token: String,
    pub categories: Vec<CategoryConfig>,
}

/// One collection source and everything generated from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub server_url: String,
    pub server_type: ServerType,
    /// Environment name whose domain becomes the production base URL.
    pub prod_env_name: Option<String>,
    /// Environment name whose domain becomes the development base URL.
    pub dev_env_name: Option<String>,
    /// Default destination for generated output.
    pub output_file_path: String,
    /// Result-extraction key path applied to response schemas.
    pub data_key: Vec<String>,
    pub query_array_format: QueryArrayFormat,
    /// Custom vendor type name mapping, case-insensitive.
    pub custom_type_mapping: HashMap<String, String>,
    pub projects: Vec<ProjectConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            server_type: ServerType::default(),
            prod_env_name: None,
            dev_env_name: None,
            output_file_path: "src/api/index.ts".to_string(),
            data_key: Vec::new(),
            query_array_format: QueryArrayFormat::default(),
            custom_type_mapping: HashMap::new(),
            projects: Vec::new(),
        }
    }
}

/// Naming and preprocessing strategy applied per interface.
///
/// Every method has a sensible default; implement only what differs.
pub trait GenerationHooks {
    /// Return `true` to drop an interface before derivation. Dropping here
    /// is the only way a malformed interface avoids failing the run.
    fn exclude_interface(&self, _interface: &InterfaceDescriptor) -> bool {
        false
    }

    /// Adjust an interface before derivation (fix paths, rewrite titles).
    fn preprocess_interface(&self, interface: InterfaceDescriptor) -> InterfaceDescriptor {
        interface
    }

    /// Name of the generated request payload declaration.
    fn request_data_type_name(&self, interface: &InterfaceDescriptor) -> String {
        format!("{}Request", sanitize_identifier(&interface.path))
    }

    /// Name of the generated response payload declaration.
    fn response_data_type_name(&self, interface: &InterfaceDescriptor) -> String {
        format!("{}Response", sanitize_identifier(&interface.path))
    }

    /// Name of the generated callable binding.
    fn request_function_name(&self, interface: &InterfaceDescriptor) -> String {
        to_camel_case(&interface.path)
    }
}

/// The documented default strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl GenerationHooks for DefaultHooks {}

/// Accept a single id or a list of ids for category selection.
mod one_or_many {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(i64),
        Many(Vec<i64>),
    }

    pub fn serialize<S: Serializer>(ids: &[i64], ser: S) -> Result<S::Ok, S::Error> {
        match ids {
            [single] => OneOrMany::One(*single).serialize(ser),
            many => OneOrMany::Many(many.to_vec()).serialize(ser),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<i64>, D::Error> {
        Ok(match OneOrMany::deserialize(de)? {
            OneOrMany::One(id) => vec![id],
            OneOrMany::Many(ids) => ids,
        })
    }
}
