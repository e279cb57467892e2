//! Collection source client and per-(source, credential) cache.
//!
//! The cache is an explicit object owned by one run, never process-global,
//! and guarantees at most one in-flight fetch per (server URL, token) pair;
//! concurrent requesters await the same initialization.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::collection::{CategoryMenuItem, Envelope, ExportCategory, Project};
use crate::error::SourceFetchError;

/// The three read operations of the collection source protocol.
pub trait CollectionSource {
    fn project_info(
        &self,
        server_url: &str,
        token: &str,
    ) -> impl Future<Output = Result<Project, SourceFetchError>>;

    fn category_menu(
        &self,
        server_url: &str,
        token: &str,
        project_id: i64,
    ) -> impl Future<Output = Result<Vec<CategoryMenuItem>, SourceFetchError>>;

    fn export(
        &self,
        server_url: &str,
        token: &str,
    ) -> impl Future<Output = Result<Vec<ExportCategory>, SourceFetchError>>;
}

/// Everything one (source, token) pair contributes to a run.
#[derive(Debug, Clone)]
pub struct CollectionBundle {
    pub project: Project,
    pub categories: Vec<CategoryMenuItem>,
    pub export: Vec<ExportCategory>,
}

/// Memoizing wrapper around a [`CollectionSource`].
#[derive(Debug)]
pub struct CollectionCache<S> {
    source: S,
    entries: Mutex<HashMap<(String, String), Arc<OnceCell<Arc<CollectionBundle>>>>>,
}

impl<S: CollectionSource> CollectionCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch (or await the in-flight fetch of) the bundle for one
    /// (server URL, token) pair.
    pub async fn bundle(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<Arc<CollectionBundle>, SourceFetchError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry((server_url.to_string(), token.to_string()))
                .or_default()
                .clone()
        };
        cell.get_or_try_init(|| async {
            debug!(server_url, "fetching collection bundle");
            let project = self.source.project_info(server_url, token).await?;
            let categories = self
                .source
                .category_menu(server_url, token, project.id)
                .await?;
            let export = self.source.export(server_url, token).await?;
            Ok(Arc::new(CollectionBundle {
                project,
                categories,
                export,
            }))
        })
        .await
        .map(Arc::clone)
    }
}

/// HTTP implementation of the collection source protocol.
#[derive(Debug, Clone, Default)]
pub struct HttpCollectionSource {
    client: reqwest::Client,
}

impl HttpCollectionSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get_json(
        &self,
        server_url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, SourceFetchError> {
        let url = format!("{}{path}", server_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| SourceFetchError::Transport {
                server_url: server_url.to_string(),
                source,
            })?;
        response
            .json()
            .await
            .map_err(|source| SourceFetchError::Transport {
                server_url: server_url.to_string(),
                source,
            })
    }
}

fn unwrap_envelope<T: DeserializeOwned>(
    value: Value,
    server_url: &str,
) -> Result<T, SourceFetchError> {
    let envelope: Envelope<T> =
        serde_json::from_value(value).map_err(|err| SourceFetchError::Malformed {
            server_url: server_url.to_string(),
            detail: err.to_string(),
        })?;
    if envelope.errcode != 0 {
        return Err(SourceFetchError::Application {
            server_url: server_url.to_string(),
            code: envelope.errcode,
            message: envelope.errmsg,
        });
    }
    envelope.data.ok_or_else(|| SourceFetchError::Malformed {
        server_url: server_url.to_string(),
        detail: "missing data field in success envelope".to_string(),
    })
}

impl CollectionSource for HttpCollectionSource {
    async fn project_info(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<Project, SourceFetchError> {
        let value = self
            .get_json(server_url, "/api/project/get", &[("token", token.to_string())])
            .await?;
        unwrap_envelope(value, server_url)
    }

    async fn category_menu(
        &self,
        server_url: &str,
        token: &str,
        project_id: i64,
    ) -> Result<Vec<CategoryMenuItem>, SourceFetchError> {
        let value = self
            .get_json(
                server_url,
                "/api/interface/getCatMenu",
                &[
                    ("token", token.to_string()),
                    ("project_id", project_id.to_string()),
                ],
            )
            .await?;
        unwrap_envelope(value, server_url)
    }

    async fn export(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<Vec<ExportCategory>, SourceFetchError> {
        let value = self
            .get_json(
                server_url,
                "/api/plugin/export",
                &[
                    ("type", "json".to_string()),
                    ("status", "all".to_string()),
                    ("isWiki", "false".to_string()),
                    ("token", token.to_string()),
                ],
            )
            .await?;
        // This route answers with a bare array; some deployments wrap it in
        // the envelope anyway.
        if value.is_array() {
            serde_json::from_value(value).map_err(|err| SourceFetchError::Malformed {
                server_url: server_url.to_string(),
                detail: err.to_string(),
            })
        } else {
            unwrap_envelope(value, server_url)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CollectionSource for CountingSource {
        async fn project_info(
            &self,
            _server_url: &str,
            _token: &str,
        ) -> Result<Project, SourceFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Give concurrent requesters a chance to pile up.
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            Ok(serde_json::from_value(json!({"_id": 1, "name": "p", "basepath": ""})).unwrap())
        }

        async fn category_menu(
            &self,
            _server_url: &str,
            _token: &str,
            _project_id: i64,
        ) -> Result<Vec<CategoryMenuItem>, SourceFetchError> {
            Ok(Vec::new())
        }

        async fn export(
            &self,
            _server_url: &str,
            _token: &str,
        ) -> Result<Vec<ExportCategory>, SourceFetchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_cache_single_flight() {
        let cache = CollectionCache::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let (a, b) = tokio::join!(
            cache.bundle("http://s", "tok"),
            cache.bundle("http://s", "tok")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 1);

        // A different token is a different cache key.
        cache.bundle("http://s", "other").await.unwrap();
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_http_source_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/project/get"))
            .and(query_param("token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errcode": 0, "errmsg": "success",
                "data": {"_id": 11, "name": "demo", "basepath": "/api",
                         "env": [{"name": "dev", "domain": "http://dev"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/interface/getCatMenu"))
            .and(query_param("project_id", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errcode": 0, "errmsg": "success",
                "data": [{"_id": 3, "name": "cat", "project_id": 11}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/plugin/export"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"_id": 3, "name": "cat", "list": [
                    {"_id": 9, "title": "t", "path": "/x", "method": "GET", "catid": 3}
                ]}
            ])))
            .mount(&server)
            .await;

        let cache = CollectionCache::new(HttpCollectionSource::default());
        let bundle = cache.bundle(&server.uri(), "tok").await.unwrap();
        assert_eq!(bundle.project.id, 11);
        assert_eq!(bundle.categories.len(), 1);
        assert_eq!(bundle.export[0].list[0].id, 9);
    }

    #[tokio::test]
    async fn test_nonzero_errcode_is_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/project/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errcode": 40011, "errmsg": "token expired", "data": null
            })))
            .mount(&server)
            .await;

        let source = HttpCollectionSource::default();
        let err = source.project_info(&server.uri(), "bad").await.unwrap_err();
        assert!(matches!(
            err,
            SourceFetchError::Application { code: 40011, .. }
        ));
    }
}
