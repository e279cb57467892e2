//! The compatibility bridge.
//!
//! An ephemeral local HTTP service that re-exposes a translated Swagger
//! document through the same 3 routes a native collection source serves,
//! so the fetch layer needs no second code path. One instance per run;
//! the listening socket is released by [`CompatibilityBridge::stop`] and
//! by a ctrl-c watcher on abnormal exit.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::collection::{CategoryMenuItem, Envelope, ExportCategory, Project};
use crate::error::BridgeError;
use crate::swagger::{SwaggerTranslation, translate};

struct BridgeState {
    translation: SwaggerTranslation,
}

/// A running bridge instance.
#[derive(Debug)]
pub struct CompatibilityBridge {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    server: JoinHandle<()>,
    ctrl_c_watcher: JoinHandle<()>,
}

impl CompatibilityBridge {
    /// Translate `document` and serve it on an ephemeral local port.
    pub async fn start(document: &Value) -> Result<Self, BridgeError> {
        let translation = translate(document)?;
        Self::serve(translation).await
    }

    /// Serve an already translated collection.
    pub async fn serve(translation: SwaggerTranslation) -> Result<Self, BridgeError> {
        let bind_addr = "127.0.0.1:0";
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| BridgeError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?;

        let state = Arc::new(BridgeState { translation });
        let app = Router::new()
            .route("/api/plugin/export", get(export_collection))
            .route("/api/interface/getCatMenu", get(category_menu))
            .route("/api/project/get", get(project_info))
            .with_state(state);

        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let mut shutdown_rx = shutdown_tx.subscribe();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    debug!("bridge shutdown signal received");
                })
                .await;
            if let Err(err) = result {
                warn!(error = %err, "bridge server error");
            }
        });

        // Tear the socket down even on abnormal process exit. The watcher
        // is kept so a normal stop can abort it instead of leaving it
        // parked on the signal for the rest of the process.
        let ctrl_c_tx = shutdown_tx.clone();
        let ctrl_c_watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = ctrl_c_tx.send(());
            }
        });

        info!(%addr, "compatibility bridge listening");
        Ok(Self {
            addr,
            shutdown_tx,
            server,
            ctrl_c_watcher,
        })
    }

    /// Base URL the fetch layer should target.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the bridge and wait for the listener to close.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.server.await;
        self.ctrl_c_watcher.abort();
        let _ = self.ctrl_c_watcher.await;
        debug!("compatibility bridge stopped");
    }
}

async fn export_collection(State(state): State<Arc<BridgeState>>) -> Json<Vec<ExportCategory>> {
    // This route answers with the bare array, no envelope.
    Json(state.translation.export.clone())
}

async fn category_menu(
    State(state): State<Arc<BridgeState>>,
) -> Json<Envelope<Vec<CategoryMenuItem>>> {
    Json(Envelope::ok(state.translation.categories.clone()))
}

async fn project_info(State(state): State<Arc<BridgeState>>) -> Json<Envelope<Project>> {
    Json(Envelope::ok(state.translation.project.clone()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn minimal_document() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": "bridge test"},
            "basePath": "/v1",
            "paths": {
                "/ping": {"get": {
                    "tags": ["health"],
                    "summary": "ping",
                    "responses": {"200": {"schema": {"type": "object", "properties": {
                        "pong": {"type": "boolean"}
                    }}}}
                }}
            }
        })
    }

    #[tokio::test]
    async fn test_bridge_serves_three_routes() {
        let bridge = CompatibilityBridge::start(&minimal_document()).await.unwrap();
        let base = bridge.url();
        let client = reqwest::Client::new();

        let project: Value = client
            .get(format!("{base}/api/project/get"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(project["errcode"], 0);
        assert_eq!(project["data"]["name"], "bridge test");

        let menu: Value = client
            .get(format!("{base}/api/interface/getCatMenu"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(menu["data"][0]["name"], "health");

        let export: Value = client
            .get(format!("{base}/api/plugin/export"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(export.is_array(), "export route returns the bare array");
        assert_eq!(export[0]["list"][0]["path"], "/ping");

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_stop_releases_the_socket() {
        let bridge = CompatibilityBridge::start(&minimal_document()).await.unwrap();
        let base = bridge.url();
        bridge.stop().await;

        let client = reqwest::Client::new();
        let result = client.get(format!("{base}/api/project/get")).send().await;
        assert!(result.is_err(), "connection refused after stop");
    }

    #[tokio::test]
    async fn test_stop_tears_down_the_signal_watcher() {
        let bridge = CompatibilityBridge::start(&minimal_document()).await.unwrap();
        let watcher = bridge.ctrl_c_watcher.abort_handle();
        assert!(!watcher.is_finished(), "watcher runs while the bridge is up");
        bridge.stop().await;
        assert!(watcher.is_finished(), "stop does not leave the watcher parked");
    }
}
