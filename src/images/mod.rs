//! Image ingestion module
//!
//! This module handles:
//! - Decoding user-selected photos (any format the `image` crate knows)
//! - Downscaling to a bounded resolution
//! - Re-encoding as JPEG and embedding as a `data:` URI

pub mod ingest;

pub use ingest::{ingest_batch, load_files, IngestOutcome, IngestSettings};
