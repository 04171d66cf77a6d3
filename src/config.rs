//! Centralized configuration and builder for QcStore.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - StoreConfig::from_env() reads QCSTORE_* variables, the builder overrides them.
//! - The config is owned by a Session and passed by reference; there is no global state.
//!
//! Env:
//! - QCSTORE_ROOT             : store root (default ./qcstore_data)
//! - QCSTORE_TEMPLATE_DIR     : directory with report template files (optional)
//! - QCSTORE_TEMPLATE_FILE    : base template file name (default base.html)
//! - QCSTORE_HEATMAP_FAMILIES : comma separated plot-id markers that get row-aware
//!   heatmap merging (default "fastqc")

use std::fmt;
use std::path::PathBuf;

use crate::consts::{DEFAULT_HEATMAP_FAMILY, DEFAULT_ROOT, DEFAULT_TEMPLATE_FILE};

/// Top-level configuration for a QcStore session.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Store root: <root>/<module_lower>/..., <root>/data_sources/...
    /// Env: QCSTORE_ROOT (default ./qcstore_data)
    pub root: PathBuf,

    /// Directory holding the report template (TemplateRenderer).
    /// Env: QCSTORE_TEMPLATE_DIR (default None)
    pub template_dir: Option<PathBuf>,

    /// Base template file name inside template_dir.
    /// Env: QCSTORE_TEMPLATE_FILE (default base.html)
    pub template_file: String,

    /// Plot-id markers of heatmaps that are merged row by row.
    /// Остальные heatmap'ы берутся из первого снапшота как есть.
    /// Env: QCSTORE_HEATMAP_FAMILIES (default "fastqc")
    pub heatmap_families: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            template_dir: None,
            template_file: DEFAULT_TEMPLATE_FILE.to_string(),
            heatmap_families: vec![DEFAULT_HEATMAP_FAMILY.to_string()],
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("QCSTORE_ROOT") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.root = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("QCSTORE_TEMPLATE_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.template_dir = Some(PathBuf::from(s));
            }
        }

        if let Ok(v) = std::env::var("QCSTORE_TEMPLATE_FILE") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.template_file = s.to_string();
            }
        }

        if let Ok(v) = std::env::var("QCSTORE_HEATMAP_FAMILIES") {
            let fams = parse_families(&v);
            if !fams.is_empty() {
                cfg.heatmap_families = fams;
            }
        }

        cfg
    }

    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_template_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.template_dir = dir.map(Into::into);
        self
    }

    pub fn with_template_file<S: Into<String>>(mut self, file: S) -> Self {
        self.template_file = file.into();
        self
    }

    pub fn with_heatmap_families<I, S>(mut self, fams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.heatmap_families = fams.into_iter().map(Into::into).collect();
        self
    }

    /// Does this heatmap plot id get row-aware merging?
    pub fn is_row_merged_heatmap(&self, plot_id: &str) -> bool {
        self.heatmap_families
            .iter()
            .any(|fam| !fam.is_empty() && plot_id.contains(fam.as_str()))
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }
}

fn parse_families(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreConfig {{ \
             root: {}, \
             template_dir: {}, \
             template_file: {}, \
             heatmap_families: [{}] \
             }}",
            self.root.display(),
            self.template_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.template_file,
            self.heatmap_families.join(","),
        )
    }
}

/// Lightweight builder that produces a StoreConfig.
#[derive(Clone, Debug)]
pub struct StoreBuilder {
    cfg: StoreConfig,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: StoreConfig::from_env(),
        }
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: StoreConfig::default(),
        }
    }

    pub fn root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.cfg.root = root.into();
        self
    }

    pub fn template_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.cfg.template_dir = dir.map(Into::into);
        self
    }

    pub fn template_file<S: Into<String>>(mut self, file: S) -> Self {
        self.cfg.template_file = file.into();
        self
    }

    pub fn heatmap_families<I, S>(mut self, fams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.heatmap_families = fams.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> StoreConfig {
        self.cfg
    }
}
