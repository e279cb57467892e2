//! Call-time request shaping.
//!
//! Generated bindings hand a [`RequestConfig`] plus caller data to
//! [`prepare`], which produces the [`TransportPayload`] consumed by an
//! externally supplied request executor.

pub mod file_data;
pub mod prepare;

pub use file_data::{FILE_MARKER_TYPE, FileData};
pub use prepare::{
    DataValue, QueryArrayFormat, RequestConfig, RequestData, TransportPayload, prepare,
};
