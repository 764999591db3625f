//! Migration orchestration for docmigrate.
//!
//! This crate ties together source discovery, the anchor index, the external
//! converter, page rendering, and manifest generation into the end-to-end
//! [`migrate`](pipeline::migrate) run.

pub mod anchors;
pub mod converter;
pub mod discovery;
pub mod manifest;
pub mod pipeline;
pub mod routes;

pub use anchors::{AnchorIndex, DocumentLinks};
pub use converter::{MarkupConverter, PandocConverter};
pub use manifest::{ManifestReport, write_manifests};
pub use pipeline::{MigrateReport, ProgressReporter, SilentProgress, migrate};
pub use routes::RouteMap;
