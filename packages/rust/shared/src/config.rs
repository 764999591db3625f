//! Application configuration for docmigrate.
//!
//! A project config lives at `./docmigrate.toml`, with a user-level fallback at
//! `~/.docmigrate/docmigrate.toml`. CLI flags override config file values,
//! which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocMigrateError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "docmigrate.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docmigrate";

// ---------------------------------------------------------------------------
// Config structs (matching docmigrate.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source and destination roots.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Destination site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// External converter invocation.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Source files (relative to the source root) written to a fixed destination file name.
    #[serde(default)]
    pub special_destinations: BTreeMap<String, String>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the reStructuredText source tree.
    #[serde(default = "default_source_root")]
    pub source_root: String,

    /// Root the MDX pages and manifests are written under.
    #[serde(default = "default_dest_root")]
    pub dest_root: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            dest_root: default_dest_root(),
        }
    }
}

fn default_source_root() -> String {
    "docs/source".into()
}
fn default_dest_root() -> String {
    "content/docs/legacy".into()
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Route every page is published under (defaults to `/docs/<dest dir name>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,

    /// Public prefix for rewritten image paths (defaults to `/<dest dir name>/images/`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prefix: Option<String>,

    /// Manifest title for the destination root.
    #[serde(default = "default_root_title")]
    pub root_title: String,

    /// Page title used when a converted page has no leading heading.
    #[serde(default = "default_page_title")]
    pub default_page_title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            route_prefix: None,
            image_prefix: None,
            root_title: default_root_title(),
            default_page_title: default_page_title(),
        }
    }
}

fn default_root_title() -> String {
    "Legacy Docs".into()
}
fn default_page_title() -> String {
    "Untitled".into()
}

/// `[converter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Executable to run.
    #[serde(default = "default_converter_command")]
    pub command: String,

    /// Arguments: no wrapping, rst in, gfm out, stdin to stdout.
    #[serde(default = "default_converter_args")]
    pub args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            command: default_converter_command(),
            args: default_converter_args(),
        }
    }
}

fn default_converter_command() -> String {
    "pandoc".into()
}
fn default_converter_args() -> Vec<String> {
    ["--wrap=none", "-f", "rst", "-t", "gfm", "-"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Migrate config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime migration configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Root of the reStructuredText sources.
    pub source_root: PathBuf,
    /// Root of the generated MDX tree.
    pub dest_root: PathBuf,
    /// Route prefix, without a trailing slash (e.g. `/docs/legacy`).
    pub route_prefix: String,
    /// Image prefix, with a trailing slash (e.g. `/legacy/images/`).
    pub image_prefix: String,
    /// Title for the root manifest.
    pub root_title: String,
    /// Fallback page title.
    pub default_page_title: String,
    /// Converter executable.
    pub converter_command: String,
    /// Converter arguments.
    pub converter_args: Vec<String>,
    /// Relative source path → destination file name.
    pub special_destinations: BTreeMap<PathBuf, String>,
}

impl From<&AppConfig> for MigrateConfig {
    fn from(config: &AppConfig) -> Self {
        let source_root = PathBuf::from(&config.paths.source_root);
        let dest_root = PathBuf::from(&config.paths.dest_root);
        let section = dest_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "docs".into());

        let route_prefix = config
            .site
            .route_prefix
            .clone()
            .unwrap_or_else(|| format!("/docs/{section}"));
        let image_prefix = config
            .site
            .image_prefix
            .clone()
            .unwrap_or_else(|| format!("/{section}/images/"));

        Self {
            source_root,
            dest_root,
            route_prefix: normalize_route_prefix(&route_prefix),
            image_prefix: normalize_image_prefix(&image_prefix),
            root_title: config.site.root_title.clone(),
            default_page_title: config.site.default_page_title.clone(),
            converter_command: config.converter.command.clone(),
            converter_args: config.converter.args.clone(),
            special_destinations: config
                .special_destinations
                .iter()
                .map(|(src, dst)| (PathBuf::from(src), dst.clone()))
                .collect(),
        }
    }
}

impl MigrateConfig {
    /// Override the route prefix (e.g. from a CLI flag).
    pub fn with_route_prefix(mut self, prefix: &str) -> Self {
        self.route_prefix = normalize_route_prefix(prefix);
        self
    }
}

fn normalize_route_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn normalize_image_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.docmigrate/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocMigrateError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.docmigrate/docmigrate.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config.
///
/// Looks for `./docmigrate.toml` first, then the user config file.
/// Returns defaults if neither exists.
pub fn load_config() -> Result<AppConfig> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return load_config_from(&local);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocMigrateError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocMigrateError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file at `path`, refusing to overwrite an existing one.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(DocMigrateError::config(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DocMigrateError::io(parent, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocMigrateError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| DocMigrateError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}
