//! Object storage implementations.
//!
//! - `gcs`: Google Cloud Storage via the JSON upload API

pub mod gcs;
