//! Run orchestration.
//!
//! One run fans out over server config x project x category x expanded
//! category id, derives every interface, and folds the results into
//! deterministic output groups. The only serialization point is the
//! memoized collection fetch; everything else is immutable input merged at
//! the fan-in below.

use std::collections::BTreeSet;

use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, info};

use crate::bridge::CompatibilityBridge;
use crate::collection::{ExportCategory, InterfaceDescriptor};
use crate::config::{GenerationHooks, ProjectConfig, ServerConfig, ServerType};
use crate::error::GenerateError;
use crate::fetch::{CollectionBundle, CollectionCache, CollectionSource};
use crate::merge::{Fragment, WeightVector, group_by_destination, prologue_uids, resolve_selection};
use crate::runtime::RequestConfig;
use crate::schema::{
    SchemaNode, TypeMapping, derive_request_schema, derive_response_schema, resolve_references,
};
use crate::util::normalize_basepath;

/// Everything generated for one interface.
#[derive(Debug, Clone)]
pub struct GeneratedInterface {
    pub interface_id: i64,
    pub title: String,
    pub request_type_name: String,
    pub response_type_name: String,
    pub function_name: String,
    pub request_schema: SchemaNode,
    pub response_schema: SchemaNode,
    pub request_config: RequestConfig,
}

/// The shared prologue data for one sub-category.
#[derive(Debug, Clone)]
pub struct SyntheticalConfig {
    pub mock_url: String,
    pub dev_url: String,
    pub prod_url: String,
    pub data_key: Vec<String>,
}

/// All interfaces generated for one expanded category.
#[derive(Debug, Clone)]
pub struct GeneratedCategory {
    /// Run-unique id of this category instance, built from the
    /// (server, project, category, expansion) position. Two servers
    /// contributing the same upstream category stay distinct.
    pub uid: String,
    pub category_id: i64,
    pub category_name: String,
    pub synthetical: SyntheticalConfig,
    pub interfaces: Vec<GeneratedInterface>,
}

/// Fragments sharing one destination, in final emission order.
#[derive(Debug, Clone)]
pub struct OutputGroup {
    pub destination: String,
    pub fragments: Vec<GeneratedCategory>,
    /// Uids of category instances whose prologue is emitted, in
    /// first-occurrence order over the sorted fragments.
    pub prologue_uids: Vec<String>,
}

/// The generation run driver.
#[derive(Debug)]
pub struct Generator<S, H> {
    configs: Vec<ServerConfig>,
    cache: CollectionCache<S>,
    hooks: H,
}

impl<S: CollectionSource, H: GenerationHooks> Generator<S, H> {
    /// A generator owns its cache for the duration of one run; nothing is
    /// shared across runs.
    pub fn new(configs: Vec<ServerConfig>, source: S, hooks: H) -> Self {
        Self {
            configs,
            cache: CollectionCache::new(source),
            hooks,
        }
    }

    /// Run the full fan-out and return the ordered output groups.
    pub async fn generate(&self) -> Result<Vec<OutputGroup>, GenerateError> {
        info!(servers = self.configs.len(), "starting generation run");
        let servers = join_all(
            self.configs
                .iter()
                .enumerate()
                .map(|(index, server)| self.generate_server(index, server)),
        )
        .await;

        let mut fragments = Vec::new();
        for server in servers {
            fragments.extend(server?);
        }

        let groups = group_by_destination(fragments);
        let output = groups
            .into_iter()
            .map(|(destination, sorted)| {
                let prologue_uids = prologue_uids(&sorted);
                OutputGroup {
                    destination,
                    fragments: sorted.into_iter().map(|f| f.payload).collect(),
                    prologue_uids,
                }
            })
            .collect();
        Ok(output)
    }

    async fn generate_server(
        &self,
        server_index: usize,
        server: &ServerConfig,
    ) -> Result<Vec<(String, Fragment<GeneratedCategory>)>, GenerateError> {
        // A Swagger-backed server is re-exposed through the bridge for the
        // duration of this server's generation.
        let bridge = match server.server_type {
            ServerType::Native => None,
            ServerType::Swagger => {
                let document = fetch_document(&server.server_url).await?;
                Some(CompatibilityBridge::start(&document).await?)
            }
        };
        let effective_url = bridge
            .as_ref()
            .map_or_else(|| server.server_url.clone(), CompatibilityBridge::url);

        let result = self
            .generate_server_inner(server_index, server, &effective_url)
            .await;

        // Stop on completion or failure, so the socket never leaks.
        if let Some(bridge) = bridge {
            bridge.stop().await;
        }
        result
    }

    async fn generate_server_inner(
        &self,
        server_index: usize,
        server: &ServerConfig,
        effective_url: &str,
    ) -> Result<Vec<(String, Fragment<GeneratedCategory>)>, GenerateError> {
        let mapping = TypeMapping::new(
            server
                .custom_type_mapping
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let projects = join_all(server.projects.iter().enumerate().map(
            |(project_index, project)| {
                self.generate_project(
                    server_index,
                    project_index,
                    server,
                    project,
                    effective_url,
                    &mapping,
                )
            },
        ))
        .await;

        let mut fragments = Vec::new();
        for project in projects {
            fragments.extend(project?);
        }
        Ok(fragments)
    }

    async fn generate_project(
        &self,
        server_index: usize,
        project_index: usize,
        server: &ServerConfig,
        project: &ProjectConfig,
        effective_url: &str,
        mapping: &TypeMapping,
    ) -> Result<Vec<(String, Fragment<GeneratedCategory>)>, GenerateError> {
        let bundle = self
            .cache
            .bundle(effective_url, &project.token)
            .await
            .map_err(|source| GenerateError::Fetch {
                server_url: effective_url.to_string(),
                token: project.token.clone(),
                source,
            })?;

        let known: BTreeSet<i64> = bundle.export.iter().map(|c| c.id).collect();

        let mut fragments = Vec::new();
        for (category_index, category_config) in project.categories.iter().enumerate() {
            let expanded = resolve_selection(&category_config.id, &known);
            debug!(
                token = %project.token,
                selection = ?category_config.id,
                ?expanded,
                "resolved category selection"
            );
            for (expansion_index, category_id) in expanded.iter().enumerate() {
                let Some(category) = bundle.export.iter().find(|c| c.id == *category_id) else {
                    continue;
                };
                let uid = format!(
                    "{server_index}_{project_index}_{category_index}_{expansion_index}"
                );
                let generated =
                    self.generate_category(server, &bundle, category, mapping, effective_url, uid);
                let destination = category_config
                    .output_file_path
                    .clone()
                    .unwrap_or_else(|| server.output_file_path.clone());
                fragments.push((
                    destination,
                    Fragment {
                        weight: WeightVector::new(vec![
                            server_index as u32,
                            project_index as u32,
                            category_index as u32,
                            expansion_index as u32,
                        ]),
                        sub_category_uid: generated.uid.clone(),
                        payload: generated,
                    },
                ));
            }
        }
        Ok(fragments)
    }

    fn generate_category(
        &self,
        server: &ServerConfig,
        bundle: &CollectionBundle,
        category: &ExportCategory,
        mapping: &TypeMapping,
        effective_url: &str,
        uid: String,
    ) -> GeneratedCategory {
        // For a Swagger-backed server the effective URL is the local
        // bridge, not the document URL, so the mock root stays fetchable.
        let synthetical = SyntheticalConfig {
            mock_url: format!(
                "{}/mock/{}",
                effective_url.trim_end_matches('/'),
                bundle.project.id
            ),
            dev_url: base_url_for_env(effective_url, server.dev_env_name.as_deref(), bundle),
            prod_url: base_url_for_env(effective_url, server.prod_env_name.as_deref(), bundle),
            data_key: server.data_key.clone(),
        };

        let basepath = normalize_basepath(&bundle.project.basepath);

        let mut interfaces: Vec<&InterfaceDescriptor> = category.list.iter().collect();
        interfaces.sort_by_key(|i| i.id);

        let generated = interfaces
            .into_iter()
            .filter(|interface| !self.hooks.exclude_interface(interface))
            .map(|interface| {
                let mut interface = self.hooks.preprocess_interface(interface.clone());
                interface.path = format!("{basepath}{}", interface.path);
                self.generate_interface(server, &synthetical, interface, mapping)
            })
            .collect();

        GeneratedCategory {
            uid,
            category_id: category.id,
            category_name: category.name.clone(),
            synthetical,
            interfaces: generated,
        }
    }

    fn generate_interface(
        &self,
        server: &ServerConfig,
        synthetical: &SyntheticalConfig,
        interface: InterfaceDescriptor,
        mapping: &TypeMapping,
    ) -> GeneratedInterface {
        let request_type_name = self.hooks.request_data_type_name(&interface);
        let response_type_name = self.hooks.response_data_type_name(&interface);
        let function_name = self.hooks.request_function_name(&interface);

        let mut request_schema = derive_request_schema(&interface, mapping);
        resolve_references(&mut request_schema, &request_type_name);
        let mut response_schema = derive_response_schema(&interface, mapping, &server.data_key);
        resolve_references(&mut response_schema, &response_type_name);

        let request_config = RequestConfig {
            mock_url: synthetical.mock_url.clone(),
            dev_url: synthetical.dev_url.clone(),
            prod_url: synthetical.prod_url.clone(),
            path: interface.path.clone(),
            method: interface.method.to_uppercase(),
            request_body_type: interface.req_body_type,
            response_body_type: interface.res_body_type,
            data_key: server.data_key.clone(),
            param_names: interface.req_params.iter().map(|p| p.name.clone()).collect(),
            query_names: interface.req_query.iter().map(|p| p.name.clone()).collect(),
            query_array_format: server.query_array_format,
            request_data_optional: request_schema.required.is_empty() && !request_schema.any,
            request_schema: Some(request_schema.clone()),
            response_schema: Some(response_schema.clone()),
            extra: serde_json::Map::new(),
        };

        GeneratedInterface {
            interface_id: interface.id,
            title: interface.title,
            request_type_name,
            response_type_name,
            function_name,
            request_schema,
            response_schema,
            request_config,
        }
    }
}

fn base_url_for_env(
    effective_url: &str,
    env_name: Option<&str>,
    bundle: &CollectionBundle,
) -> String {
    env_name
        .and_then(|name| bundle.project.env_domain(name))
        .map_or_else(|| effective_url.to_string(), ToString::to_string)
}

async fn fetch_document(url: &str) -> Result<Value, GenerateError> {
    reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(|source| GenerateError::DocumentFetch {
            url: url.to_string(),
            source,
        })?
        .json()
        .await
        .map_err(|source| GenerateError::DocumentFetch {
            url: url.to_string(),
            source,
        })
}
