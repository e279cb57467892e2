//! End-to-end integration test: a Swagger document is served over HTTP,
//! re-exposed through the compatibility bridge, fetched through the real
//! HTTP collection source, and fed through a full generation run.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use apiforge::config::{CategoryConfig, ProjectConfig, ServerType};
use apiforge::generator::Generator;
use apiforge::schema::TypeTag;
use apiforge::{DefaultHooks, HttpCollectionSource, ServerConfig};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Install a subscriber so bridge and fetch logs show up under
/// `RUST_LOG=debug`. Only the first test to call this wins; the rest get
/// an `Err` from `try_init` and keep going.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn petstore_document() -> serde_json::Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "petstore"},
        "host": "petstore.example.com",
        "schemes": ["https"],
        "basePath": "/v2",
        "tags": [{"name": "pet"}],
        "definitions": {
            "Pet": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"}
                }
            }
        },
        "paths": {
            "/pet/{petId}": {
                "get": {
                    "tags": ["pet"],
                    "summary": "find pet by id",
                    "parameters": [
                        {"name": "petId", "in": "path", "required": true, "type": "integer"}
                    ],
                    "responses": {
                        "200": {"schema": {"$ref": "#/definitions/Pet"}}
                    }
                }
            },
            "/pet": {
                "post": {
                    "tags": ["pet"],
                    "summary": "add pet",
                    "parameters": [
                        {"name": "body", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}
                    ],
                    "responses": {
                        "200": {"schema": {"type": "object", "properties": {"ok": {"type": "boolean"}}}}
                    }
                }
            }
        }
    })
}

async fn serve_document(document: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/swagger.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_swagger_source_generates_through_bridge() {
    init_tracing();
    let doc_server = serve_document(petstore_document()).await;

    let config = ServerConfig {
        server_url: format!("{}/swagger.json", doc_server.uri()),
        server_type: ServerType::Swagger,
        projects: vec![ProjectConfig {
            token: "unused".to_string(),
            categories: vec![CategoryConfig {
                id: vec![0],
                output_file_path: None,
            }],
        }],
        ..ServerConfig::default()
    };

    let generator = Generator::new(vec![config], HttpCollectionSource::default(), DefaultHooks);
    let groups = generator.generate().await.unwrap();

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.fragments.len(), 1, "one category: pet");
    let pet = &group.fragments[0];
    assert_eq!(pet.category_name, "pet");
    assert_eq!(pet.interfaces.len(), 2);

    // The mock root points at the bridge that served the collection, not
    // at the Swagger document URL.
    assert!(
        pet.synthetical.mock_url.starts_with("http://127.0.0.1:"),
        "mock url {} is not bridge-rooted",
        pet.synthetical.mock_url
    );
    assert!(pet.synthetical.mock_url.ends_with("/mock/1"));
    assert!(!pet.synthetical.mock_url.contains("swagger.json"));

    // Interfaces come out sorted by interface id; the translator assigns
    // ids in path order, so "/pet" precedes "/pet/{petId}".
    let find = &pet.interfaces[1];
    assert_eq!(find.request_config.method, "GET");
    assert_eq!(find.request_config.path, "/v2/pet/{petId}");
    assert_eq!(find.request_config.param_names, vec!["petId"]);
    // Path parameters are forced required with string type.
    assert!(find.request_schema.required.contains("petId"));
    assert_eq!(
        find.response_schema.properties["name"].types,
        vec![TypeTag::String]
    );

    let add = &pet.interfaces[0];
    assert_eq!(add.request_config.method, "POST");
    assert!(add.request_schema.required.contains("name"));
    assert_eq!(
        add.request_schema.properties["id"].types,
        vec![TypeTag::Integer]
    );
}

#[tokio::test]
async fn test_unreadable_document_fails_the_run() {
    init_tracing();
    let server = MockServer::start().await;
    // No /swagger.json mock mounted: the document fetch gets a 404 body
    // that is not JSON.
    let config = ServerConfig {
        server_url: format!("{}/swagger.json", server.uri()),
        server_type: ServerType::Swagger,
        projects: vec![ProjectConfig {
            token: "unused".to_string(),
            categories: vec![CategoryConfig {
                id: vec![0],
                output_file_path: None,
            }],
        }],
        ..ServerConfig::default()
    };

    let generator = Generator::new(vec![config], HttpCollectionSource::default(), DefaultHooks);
    let result = generator.generate().await;
    assert!(result.is_err());
}
