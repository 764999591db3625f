//! Finding and loading the reStructuredText sources.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use docmigrate_shared::{
    ConversionFailure, DocMigrateError, Result, SOURCE_EXTENSION, SourceDocument,
};

/// Relative paths of every `.rst` file under `root`, sorted.
///
/// A missing root is the only error; unreadable entries are skipped.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn discover_sources(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(DocMigrateError::validation(format!(
            "source root {} is not a directory",
            root.display()
        )));
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION)
        {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            sources.push(rel.to_path_buf());
        }
    }

    sources.sort();
    debug!(count = sources.len(), "sources discovered");
    Ok(sources)
}

/// Read every source once. Files that cannot be read become failures.
pub fn load_documents(
    root: &Path,
    rel_paths: &[PathBuf],
) -> (Vec<SourceDocument>, Vec<ConversionFailure>) {
    let mut documents = Vec::with_capacity(rel_paths.len());
    let mut failures = Vec::new();

    for rel in rel_paths {
        let path = root.join(rel);
        match std::fs::read_to_string(&path) {
            Ok(text) => documents.push(SourceDocument {
                rel_path: rel.clone(),
                text,
            }),
            Err(e) => {
                let err = DocMigrateError::io(&path, e);
                warn!(source = %rel.display(), error = %err, "failed to read source");
                failures.push(ConversionFailure {
                    source: rel.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    (documents, failures)
}
