//! End-to-end `run` pipeline: discover → load → index anchors → convert → manifests.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use docmigrate_markdown::{NavLink, RenderOptions, extract_diagrams, render_page, toctree_entries};
use docmigrate_shared::{
    ConversionFailure, ConversionResult, DocMigrateError, MigrateConfig, Result, SourceDocument,
};

use crate::anchors::{AnchorIndex, DocumentLinks};
use crate::converter::MarkupConverter;
use crate::discovery;
use crate::manifest;
use crate::routes::RouteMap;

/// Result of a migration run.
#[derive(Debug)]
pub struct MigrateReport {
    /// Pages written, in source order.
    pub generated: Vec<PathBuf>,
    /// Manifests written.
    pub manifests: Vec<PathBuf>,
    /// Documents (or manifest directories) that failed.
    pub failures: Vec<ConversionFailure>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl MigrateReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document, whether it converted or failed.
    fn page_converted(&self, path: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &MigrateReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_converted(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &MigrateReport) {}
}

/// Run the full migration.
///
/// 1. Discover `.rst` sources (sorted)
/// 2. Load every document
/// 3. Build the anchor index over all of them
/// 4. Convert each document; failures are recorded and the batch continues
/// 5. Write navigation manifests
///
/// Only a missing source root aborts the run.
#[instrument(skip_all, fields(source = %config.source_root.display(), dest = %config.dest_root.display()))]
pub fn migrate(
    config: &MigrateConfig,
    converter: &dyn MarkupConverter,
    progress: &dyn ProgressReporter,
) -> Result<MigrateReport> {
    let start = Instant::now();

    // --- Phase 1: Discovery ---
    progress.phase("Discovering sources");
    let rel_paths = discovery::discover_sources(&config.source_root)?;
    info!(count = rel_paths.len(), "sources discovered");

    let (documents, mut failures) = discovery::load_documents(&config.source_root, &rel_paths);

    // --- Phase 2: Anchor index ---
    progress.phase("Indexing cross-references");
    let routes = RouteMap::new(config);
    let index = AnchorIndex::build(&documents, &routes);
    info!(labels = index.len(), "anchor index ready");

    // --- Phase 3: Convert ---
    progress.phase("Converting documents");
    let mut generated = Vec::with_capacity(documents.len());
    let total = documents.len();

    for (i, doc) in documents.iter().enumerate() {
        match convert_document(doc, config, &routes, &index, converter) {
            ConversionResult::Written(path) => generated.push(path),
            ConversionResult::Failed(failure) => failures.push(failure),
        }
        progress.page_converted(&doc.rel_path.to_string_lossy(), i + 1, total);
    }

    // --- Phase 4: Manifests ---
    progress.phase("Writing navigation manifests");
    let manifest_report = manifest::write_manifests(config);
    failures.extend(manifest_report.failures);

    let report = MigrateReport {
        generated,
        manifests: manifest_report.written,
        failures,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        pages = report.generated.len(),
        manifests = report.manifests.len(),
        failures = report.failures.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "migration complete"
    );

    Ok(report)
}

/// Convert one document and write its page.
///
/// Never fails the batch: errors come back as [`ConversionResult::Failed`].
pub fn convert_document(
    doc: &SourceDocument,
    config: &MigrateConfig,
    routes: &RouteMap,
    index: &AnchorIndex,
    converter: &dyn MarkupConverter,
) -> ConversionResult {
    match try_convert_document(doc, config, routes, index, converter) {
        Ok(path) => ConversionResult::Written(path),
        Err(e) => {
            warn!(source = %doc.rel_path.display(), error = %e, "conversion failed");
            ConversionResult::Failed(ConversionFailure {
                source: doc.rel_path.clone(),
                message: e.to_string(),
            })
        }
    }
}

#[instrument(skip_all, fields(source = %doc.rel_path.display()))]
fn try_convert_document(
    doc: &SourceDocument,
    config: &MigrateConfig,
    routes: &RouteMap,
    index: &AnchorIndex,
    converter: &dyn MarkupConverter,
) -> Result<PathBuf> {
    let (prepared, diagrams) = extract_diagrams(&doc.text);

    let source_dir = config
        .source_root
        .join(doc.rel_path.parent().unwrap_or_else(|| Path::new("")));
    let working_dir =
        std::fs::canonicalize(&source_dir).map_err(|e| DocMigrateError::io(&source_dir, e))?;

    let converted = converter.convert(&prepared, &working_dir)?;
    let restored = diagrams.restore(&converted);

    let links = DocumentLinks::new(index, routes, &doc.rel_path);
    let nav: Vec<NavLink> = toctree_entries(&doc.text)
        .into_iter()
        .map(|entry| NavLink {
            href: links.normalize_link(&entry.target),
            label: entry.label,
        })
        .collect();

    let opts = RenderOptions {
        image_prefix: config.image_prefix.clone(),
        default_title: config.default_page_title.clone(),
    };
    let page = render_page(&restored, &opts, &links, &nav);

    let dest = routes.destination_for(&doc.rel_path);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DocMigrateError::io(parent, e))?;
    }
    std::fs::write(&dest, &page.content).map_err(|e| DocMigrateError::io(&dest, e))?;

    debug!(
        dest = %dest.display(),
        title = %page.title,
        diagrams = diagrams.len(),
        nav = nav.len(),
        "page written"
    );
    Ok(dest)
}
