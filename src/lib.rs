//! Schema-driven client-code synthesis engine.
//!
//! Given a collection of remote API interface descriptors, this crate
//! derives canonical request/response schema trees, resolves
//! cross-declaration references, produces runtime request configurations,
//! and orders everything deterministically into output groups. At call
//! time, [`runtime::prepare`] turns caller data into a transport payload.
//!
//! The file writer, the text emitter for the target type system, and the
//! CLI shell are external collaborators; this crate produces the
//! structured model they consume.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro)]

pub mod bridge;
pub mod collection;
pub mod config;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod merge;
pub mod runtime;
pub mod schema;
pub mod swagger;
mod util;

pub use bridge::CompatibilityBridge;
pub use config::{DefaultHooks, GenerationHooks, ServerConfig};
pub use error::GenerateError;
pub use fetch::{CollectionCache, CollectionSource, HttpCollectionSource};
pub use generator::{Generator, OutputGroup};
pub use runtime::{FileData, RequestConfig, RequestData, TransportPayload, prepare};
pub use schema::{SchemaNode, TypeMapping, TypeTag};
