//! Canonical schema model and the pipeline that produces it.
//!
//! `node` defines the closed-vocabulary schema tree, `normalize` turns
//! vendor schema documents into that tree, `infer` derives a tree from an
//! annotated example payload, `derive` assembles per-interface request and
//! response trees, and `resolve` rewrites cross-declaration reference
//! markers into indexed-access type expressions.

pub mod derive;
pub mod infer;
pub mod node;
pub mod normalize;
pub mod resolve;

pub use derive::{derive_request_schema, derive_response_schema};
pub use infer::infer_schema;
pub use node::{SchemaNode, TypeTag};
pub use normalize::{TypeMapping, normalize};
pub use resolve::resolve_references;
