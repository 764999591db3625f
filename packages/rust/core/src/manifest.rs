//! Per-directory `meta.json` navigation manifests.
//!
//! For each destination directory holding pages:
//! 1. Collect the immediate children (page stems, page-bearing subdirectories)
//! 2. Derive the preferred order (`index`, then the source `index.rst` toctree)
//! 3. Merge with the order in any existing manifest
//! 4. Fill a missing title and write the manifest back, unknown fields intact

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use docmigrate_markdown::{read_frontmatter_title, toctree_entries};
use docmigrate_shared::{
    ConversionFailure, DirectoryManifest, DocMigrateError, MANIFEST_FILE_NAME, MigrateConfig,
    PAGE_EXTENSION, Result,
};

/// Outcome of the manifest phase.
#[derive(Debug, Default)]
pub struct ManifestReport {
    /// Manifests written, in directory order.
    pub written: Vec<PathBuf>,
    /// Directories whose manifest could not be produced.
    pub failures: Vec<ConversionFailure>,
}

/// Write `meta.json` for the destination root and every subdirectory with pages.
#[instrument(skip_all, fields(dest = %config.dest_root.display()))]
pub fn write_manifests(config: &MigrateConfig) -> ManifestReport {
    let mut report = ManifestReport::default();
    if !config.dest_root.is_dir() {
        debug!("destination root missing, no manifests to write");
        return report;
    }

    let mut dirs: Vec<PathBuf> = WalkDir::new(&config.dest_root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();
    dirs.sort();
    dirs.insert(0, config.dest_root.clone());

    for dir in dirs {
        match write_directory_manifest(config, &dir) {
            Ok(Some(path)) => report.written.push(path),
            Ok(None) => {}
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to write manifest");
                report.failures.push(ConversionFailure {
                    source: dir,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(written = report.written.len(), failed = report.failures.len(), "manifests updated");
    report
}

fn write_directory_manifest(config: &MigrateConfig, dir: &Path) -> Result<Option<PathBuf>> {
    let children = immediate_doc_children(dir)?;
    if children.is_empty() {
        return Ok(None);
    }

    let mut preferred = Vec::new();
    if children.iter().any(|name| name == "index") {
        preferred.push("index".to_string());
    }
    let rel_dir = dir.strip_prefix(&config.dest_root).unwrap_or(Path::new(""));
    let source_index = config.source_root.join(rel_dir).join("index.rst");
    preferred.extend(toctree_immediate_order(&source_index, &children));

    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    let mut manifest = read_existing_manifest(&manifest_path).unwrap_or_default();
    manifest.pages = merge_page_order(&manifest.pages, &preferred, &children);

    if manifest.title.is_none() {
        manifest.title = Some(if dir == config.dest_root {
            config.root_title.clone()
        } else {
            directory_title(dir)
        });
    }

    let mut json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| DocMigrateError::Manifest(format!("{}: {e}", manifest_path.display())))?;
    json.push('\n');
    std::fs::write(&manifest_path, json).map_err(|e| DocMigrateError::io(&manifest_path, e))?;

    debug!(path = %manifest_path.display(), pages = manifest.pages.len(), "manifest written");
    Ok(Some(manifest_path))
}

// ---------------------------------------------------------------------------
// Children and ordering
// ---------------------------------------------------------------------------

/// Page stems and page-bearing subdirectory names directly under `dir`,
/// sorted by entry name.
pub fn immediate_doc_children(dir: &Path) -> Result<Vec<String>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| DocMigrateError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut names = Vec::new();
    for entry in entries {
        let path = entry.path();
        if entry.file_name() == MANIFEST_FILE_NAME {
            continue;
        }
        let name = if path.is_file() && is_page(&path) {
            path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
        } else if path.is_dir() && contains_pages(&path) {
            Some(entry.file_name().to_string_lossy().into_owned())
        } else {
            None
        };
        if let Some(name) = name {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Immediate child names in the order the source `index.rst` toctree lists them.
///
/// Only the first segment of each target counts, so `sub/index` orders `sub`.
pub fn toctree_immediate_order(source_index: &Path, children: &[String]) -> Vec<String> {
    let Ok(text) = std::fs::read_to_string(source_index) else {
        return Vec::new();
    };

    let valid: HashSet<&str> = children.iter().map(String::as_str).collect();
    let mut order: Vec<String> = Vec::new();
    for entry in toctree_entries(&text) {
        let Some(first) = entry
            .target
            .split('/')
            .find(|part| !part.is_empty() && *part != ".")
        else {
            continue;
        };
        let name = Path::new(first)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        if valid.contains(name.as_str()) && !order.contains(&name) {
            order.push(name);
        }
    }
    order
}

/// Existing order first, then preferred, then the rest alphabetically.
///
/// Only names in `available` survive, each once.
pub fn merge_page_order(existing: &[String], preferred: &[String], available: &[String]) -> Vec<String> {
    let available_set: HashSet<&str> = available.iter().map(String::as_str).collect();
    let mut out: Vec<String> = Vec::with_capacity(available.len());

    for name in existing.iter().chain(preferred) {
        if available_set.contains(name.as_str()) && !out.contains(name) {
            out.push(name.clone());
        }
    }

    let mut rest: Vec<&String> = available.iter().filter(|name| !out.contains(*name)).collect();
    rest.sort();
    rest.dedup();
    out.extend(rest.into_iter().cloned());
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_existing_manifest(path: &Path) -> Option<DirectoryManifest> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring unreadable manifest");
            None
        }
    }
}

fn directory_title(dir: &Path) -> String {
    let from_index = std::fs::read_to_string(dir.join(format!("index.{PAGE_EXTENSION}")))
        .ok()
        .and_then(|page| read_frontmatter_title(&page));
    from_index.unwrap_or_else(|| {
        let slug = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        titleize_slug(&slug)
    })
}

/// `getting_started` → `Getting Started`; all-caps words such as `SDK` stay.
pub fn titleize_slug(slug: &str) -> String {
    slug.replace('_', "-")
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let all_caps = word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase);
            if all_caps {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    format!("{upper}{}", chars.as_str().to_lowercase())
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_page(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(PAGE_EXTENSION)
}

fn contains_pages(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_type().is_file() && is_page(entry.path()))
}
