//! Destination paths and public routes for source documents.
//!
//! Both are pure functions of the relative source path, so every run over the
//! same tree produces the same layout.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use docmigrate_shared::{MigrateConfig, PAGE_EXTENSION, SOURCE_EXTENSION};

/// Maps relative source paths to destination files and routes.
#[derive(Debug, Clone)]
pub struct RouteMap {
    dest_root: PathBuf,
    route_prefix: String,
    special: BTreeMap<PathBuf, String>,
}

impl RouteMap {
    pub fn new(config: &MigrateConfig) -> Self {
        Self {
            dest_root: config.dest_root.clone(),
            route_prefix: config.route_prefix.clone(),
            special: config.special_destinations.clone(),
        }
    }

    /// Destination relative to the destination root.
    ///
    /// Special names land in the source file's own directory; `index.rst`
    /// becomes that directory's `index.mdx`.
    pub fn relative_destination(&self, rel: &Path) -> PathBuf {
        let parent = rel.parent().unwrap_or_else(|| Path::new(""));
        if let Some(name) = self.special.get(rel) {
            return parent.join(name);
        }
        if rel.file_name().is_some_and(|name| name == "index.rst") {
            return parent.join(format!("index.{PAGE_EXTENSION}"));
        }
        rel.with_extension(PAGE_EXTENSION)
    }

    /// Absolute destination file for a source document.
    pub fn destination_for(&self, rel: &Path) -> PathBuf {
        self.dest_root.join(self.relative_destination(rel))
    }

    /// Public route of a source document (`index` pages take the directory route).
    pub fn route_for(&self, rel: &Path) -> String {
        let dest = self.relative_destination(rel).with_extension("");
        let mut parts = path_segments(&dest);
        if parts.last().is_some_and(|last| last == "index") {
            parts.pop();
        }

        if parts.is_empty() {
            self.route_prefix.clone()
        } else {
            format!("{}/{}", self.route_prefix, parts.join("/"))
        }
    }

    /// Route of an extension-less document reference made from `doc_dir`.
    ///
    /// `.` and `..` segments are normalized; `None` when the reference climbs
    /// out of the source root or names nothing.
    pub fn route_for_reference(&self, doc_dir: &Path, reference: &str) -> Option<String> {
        let mut parts = path_segments(doc_dir);
        for segment in reference.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop()?;
                }
                name => parts.push(name.to_string()),
            }
        }

        let last = parts.pop()?;
        let mut rel: PathBuf = parts.iter().collect();
        rel.push(format!("{last}.{SOURCE_EXTENSION}"));
        Some(self.route_for(&rel))
    }
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmigrate_shared::AppConfig;
    use pretty_assertions::assert_eq;

    fn routes() -> RouteMap {
        let mut app = AppConfig::default();
        app.paths.dest_root = "out/kubos".into();
        app.special_destinations
            .insert("index.rst".into(), "legacy-sphinx-home.mdx".into());
        RouteMap::new(&MigrateConfig::from(&app))
    }

    #[test]
    fn destinations_follow_source_layout() {
        let routes = routes();
        assert_eq!(
            routes.destination_for(Path::new("guide/install.rst")),
            PathBuf::from("out/kubos/guide/install.mdx")
        );
        assert_eq!(
            routes.destination_for(Path::new("guide/index.rst")),
            PathBuf::from("out/kubos/guide/index.mdx")
        );
        assert_eq!(
            routes.destination_for(Path::new("index.rst")),
            PathBuf::from("out/kubos/legacy-sphinx-home.mdx")
        );
    }

    #[test]
    fn routes_drop_index_and_extension() {
        let routes = routes();
        assert_eq!(routes.route_for(Path::new("guide/install.rst")), "/docs/kubos/guide/install");
        assert_eq!(routes.route_for(Path::new("guide/index.rst")), "/docs/kubos/guide");
        assert_eq!(routes.route_for(Path::new("index.rst")), "/docs/kubos/legacy-sphinx-home");
        assert_eq!(routes.route_for(Path::new("a/b/c.rst")), routes.route_for(Path::new("a/b/c.rst")));
    }

    #[test]
    fn references_resolve_against_document_directory() {
        let routes = routes();
        assert_eq!(
            routes.route_for_reference(Path::new("foo"), "bar"),
            Some("/docs/kubos/foo/bar".to_string())
        );
        assert_eq!(
            routes.route_for_reference(Path::new("foo/deep"), "../sibling/./page"),
            Some("/docs/kubos/foo/sibling/page".to_string())
        );
        assert_eq!(
            routes.route_for_reference(Path::new(""), "other_doc"),
            Some("/docs/kubos/other_doc".to_string())
        );
        assert_eq!(
            routes.route_for_reference(Path::new("foo"), "sub/index"),
            Some("/docs/kubos/foo/sub".to_string())
        );
    }

    #[test]
    fn references_escaping_the_root_are_rejected() {
        let routes = routes();
        assert_eq!(routes.route_for_reference(Path::new(""), "../outside"), None);
        assert_eq!(routes.route_for_reference(Path::new("foo"), "."), None);
    }
}
