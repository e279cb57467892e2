//! Error taxonomy for the synthesis engine.
//!
//! Fetch and bridge failures abort the run; schema-level problems recover
//! locally (an unparsable body degrades to the "any" marker, an unresolvable
//! reference passes through untouched) and never surface here.

use thiserror::Error;

/// Errors raised while talking to a collection source.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    /// The source answered with a non-zero application error code.
    #[error("source {server_url} returned error code {code}: {message}")]
    Application {
        /// Base URL of the collection source.
        server_url: String,
        /// Non-zero application error code from the response envelope.
        code: i64,
        /// Error message from the response envelope.
        message: String,
    },
    /// Transport-level failure (connect, TLS, timeout).
    #[error("request to {server_url} failed: {source}")]
    Transport {
        /// Base URL of the collection source.
        server_url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The response body was not the expected JSON shape.
    #[error("malformed response from {server_url}: {detail}")]
    Malformed {
        /// Base URL of the collection source.
        server_url: String,
        /// What was wrong with the payload.
        detail: String,
    },
}

/// Errors raised while preparing a transport payload at call time.
#[derive(Debug, Error)]
pub enum RequestPreparationError {
    /// File parts exist but the ordinary payload is not a keyed map, so
    /// multipart part names cannot be derived.
    #[error("cannot build multipart form: ordinary payload is not a keyed map")]
    MultipartUnsupported,
}

/// Errors raised while starting or running the compatibility bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The ephemeral listener could not be bound.
    #[error("failed to bind bridge listener on {addr}: {source}")]
    Bind {
        /// Address the bridge attempted to bind.
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// The source document is not a dialect the bridge can translate.
    #[error("unsupported schema dialect: {0}")]
    UnsupportedDialect(String),
}

/// Terminal error for a generation run.
///
/// Carries enough context (source URL, token, interface id) to act on, per
/// the fan-in contract: one interface's failure fails the whole run unless
/// an exclusion hook dropped the interface before derivation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// A collection fetch failed for one (source, token) pair.
    #[error("fetching collection from {server_url} (token {token}) failed: {source}")]
    Fetch {
        /// Base URL of the collection source.
        server_url: String,
        /// Project credential the fetch was keyed by.
        token: String,
        #[source]
        source: SourceFetchError,
    },
    /// The Swagger document behind a bridge-backed server could not be read.
    #[error("fetching schema document from {url} failed: {source}")]
    DocumentFetch {
        /// URL of the schema document.
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The compatibility bridge could not be started.
    #[error("compatibility bridge failed: {0}")]
    Bridge(#[from] BridgeError),
}
