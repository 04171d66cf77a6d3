//! store: on-disk snapshot store.
//!
//! Раскладка:
//!   <root>/<module_lower>/module_output.json      : конкатенация JSON-объектов через ",\n"
//!   <root>/<module_lower>/plot_data/data.json     : первый снапшот
//!   <root>/<module_lower>/plot_data/data_1.json   : второй и т.д.
//!   <root>/data_sources/data_source.json          : первый снапшот data sources
//!   <root>/data_sources/data_source_1.json        : ...
//!
//! Правила:
//! - Снапшоты write-once: каждая запись получает новый номер через next_snapshot_path()
//!   и открывается с create_new, существующий файл никогда не перезаписывается.
//! - Слияние снапшотов: только при чтении (Combiner), никогда при записи.
//! - Удаление: только явный reset (overwrite-режим), рекурсивно.

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::consts::{
    DATA_SOURCES_DIR, DATA_SOURCE_BASE, MODULE_OUTPUT_FILE, MODULE_OUTPUT_SEPARATOR,
    PLOT_DATA_BASE, PLOT_DATA_DIR, SNAPSHOT_EXT,
};
use crate::metrics::{record_module_output_written, record_reset, record_snapshot_read, record_snapshot_written};
use crate::plot::PlotData;

pub mod module_output;

pub use module_output::{encode_concat, parse_concat, AssetMap, ModuleOutput};

// ---------------------- SnapshotStore ----------------------

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `root`, creating the root directory if absent.
    pub fn open_or_create(root: &Path) -> Result<Self> {
        if !root.exists() {
            fs::create_dir_all(root).with_context(|| format!("create {}", root.display()))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Open for reading only; the root may not exist yet (empty store).
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ----------------- paths -----------------

    /// <root>/<module_lower>
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.root.join(module_key(module))
    }

    pub fn plot_data_dir(&self, module: &str) -> PathBuf {
        self.module_dir(module).join(PLOT_DATA_DIR)
    }

    pub fn module_output_path(&self, module: &str) -> PathBuf {
        self.module_dir(module).join(MODULE_OUTPUT_FILE)
    }

    pub fn data_sources_dir(&self) -> PathBuf {
        self.root.join(DATA_SOURCES_DIR)
    }

    // ----------------- layout -----------------

    /// Create <root>/<module_lower> if absent.
    pub fn ensure_module_dir(&self, module: &str) -> Result<PathBuf> {
        let dir = self.module_dir(module);
        if !dir.exists() {
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(dir)
    }

    /// Overwrite reset: recursively remove the module's plot_data directory.
    /// Returns true if something was removed.
    pub fn reset_module(&self, module: &str) -> Result<bool> {
        let dir = self.plot_data_dir(module);
        remove_tree(&dir)
    }

    /// Overwrite reset for <root>/data_sources.
    pub fn reset_data_sources(&self) -> Result<bool> {
        remove_tree(&self.data_sources_dir())
    }

    // ----------------- writes -----------------

    /// Write a new plot-data snapshot for `module` (data.json, data_1.json, ...).
    pub fn write_plot_data(&self, module: &str, plot_data: &PlotData) -> Result<PathBuf> {
        self.ensure_module_dir(module)?;
        let dir = self.plot_data_dir(module);
        let bytes = serde_json::to_vec(plot_data).context("serialize plot data")?;
        write_snapshot(&dir, PLOT_DATA_BASE, &bytes)
    }

    /// Write a new data-source snapshot (data_source.json, data_source_1.json, ...).
    pub fn write_data_sources(&self, data_sources: &Value) -> Result<PathBuf> {
        let dir = self.data_sources_dir();
        let bytes = serde_json::to_vec(data_sources).context("serialize data sources")?;
        write_snapshot(&dir, DATA_SOURCE_BASE, &bytes)
    }

    /// Write module outputs into module_output.json.
    ///
    /// truncate=true rewrites the file from scratch; otherwise the objects are appended,
    /// with a separator in front if the file already holds objects.
    pub fn write_module_outputs(
        &self,
        module: &str,
        outputs: &[ModuleOutput],
        truncate: bool,
    ) -> Result<PathBuf> {
        self.ensure_module_dir(module)?;
        let path = self.module_output_path(module);
        let body = encode_concat(outputs)?;

        let non_empty = !truncate
            && fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!truncate)
            .truncate(truncate)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        if non_empty && !body.is_empty() {
            f.write_all(MODULE_OUTPUT_SEPARATOR.as_bytes())?;
        }
        f.write_all(body.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        f.flush()?;

        for _ in outputs {
            record_module_output_written();
        }
        debug!(
            "module output: {} object(s) -> {}",
            outputs.len(),
            path.display()
        );
        Ok(path)
    }

    // ----------------- reads -----------------

    pub fn has_module_output(&self, module: &str) -> bool {
        self.module_output_path(module).exists()
    }

    /// Read stored module outputs; an absent file reads as no outputs.
    pub fn read_module_outputs(&self, module: &str) -> Result<Vec<ModuleOutput>> {
        let path = self.module_output_path(module);
        if !path.exists() {
            debug!("no module output at {}", path.display());
            return Ok(Vec::new());
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        parse_concat(&text).with_context(|| format!("parse {}", path.display()))
    }

    /// Plot-data snapshots of `module` in write order.
    pub fn list_plot_data(&self, module: &str) -> Result<Vec<PathBuf>> {
        list_snapshots(&self.plot_data_dir(module), PLOT_DATA_BASE)
    }

    /// Data-source snapshots in write order.
    pub fn list_data_sources(&self) -> Result<Vec<PathBuf>> {
        list_snapshots(&self.data_sources_dir(), DATA_SOURCE_BASE)
    }

    /// Module directories present under the root (lowercased names).
    pub fn list_module_dirs(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for e in fs::read_dir(&self.root).with_context(|| format!("read_dir {}", self.root.display()))? {
            let e = e?;
            if !e.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = e.file_name().to_str() {
                if name != DATA_SOURCES_DIR {
                    out.push(name.to_string());
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Case-insensitive module key (directory name).
pub fn module_key(module: &str) -> String {
    module.trim().to_lowercase()
}

/// Read and parse a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse snapshot {}", path.display()))?;
    record_snapshot_read();
    Ok(v)
}

// ----------------- snapshot naming -----------------

/// First free path of the form `base.json`, `base_1.json`, `base_2.json`, ... in `dir`.
pub fn next_snapshot_path(dir: &Path, base: &str) -> PathBuf {
    let first = dir.join(format!("{base}.{SNAPSHOT_EXT}"));
    if !first.exists() {
        return first;
    }
    let mut n: u64 = 1;
    loop {
        let p = dir.join(format!("{base}_{n}.{SNAPSHOT_EXT}"));
        if !p.exists() {
            return p;
        }
        n += 1;
    }
}

/// Sequence number of a snapshot file name: `base.json` -> 0, `base_N.json` -> N.
pub fn snapshot_seq(file_name: &str, base: &str) -> Option<u64> {
    let stem = file_name.strip_suffix(&format!(".{SNAPSHOT_EXT}"))?;
    if stem == base {
        return Some(0);
    }
    let n = stem.strip_prefix(base)?.strip_prefix('_')?;
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    n.parse::<u64>().ok()
}

fn list_snapshots(dir: &Path, base: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out: Vec<(u64, PathBuf)> = Vec::new();
    for e in fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
        let p = e?.path();
        let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        match snapshot_seq(name, base) {
            Some(seq) => out.push((seq, p.clone())),
            None => debug!("skip non-snapshot file {}", p.display()),
        }
    }
    out.sort_by_key(|(seq, _)| *seq);
    Ok(out.into_iter().map(|(_, p)| p).collect())
}

fn write_snapshot(dir: &Path, base: &str, bytes: &[u8]) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let path = next_snapshot_path(dir, base);
    // create_new: снапшот не перезаписывается никогда
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("create snapshot {}", path.display()))?;
    f.write_all(bytes)
        .with_context(|| format!("write snapshot {}", path.display()))?;
    f.sync_all()
        .with_context(|| format!("sync snapshot {}", path.display()))?;

    record_snapshot_written(bytes.len());
    debug!("snapshot: {} B -> {}", bytes.len(), path.display());
    Ok(path)
}

fn remove_tree(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    if !dir.is_dir() {
        return Err(anyhow!("{} is not a directory", dir.display()));
    }
    fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
    record_reset();
    debug!("reset: removed {}", dir.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_parsing() {
        assert_eq!(snapshot_seq("data.json", "data"), Some(0));
        assert_eq!(snapshot_seq("data_1.json", "data"), Some(1));
        assert_eq!(snapshot_seq("data_12.json", "data"), Some(12));
        assert_eq!(snapshot_seq("data_.json", "data"), None);
        assert_eq!(snapshot_seq("data_x.json", "data"), None);
        assert_eq!(snapshot_seq("data.json.tmp", "data"), None);
        assert_eq!(snapshot_seq("data_source.json", "data"), None);
        assert_eq!(snapshot_seq("data_source_3.json", "data_source"), Some(3));
    }

    #[test]
    fn module_key_is_lowercase() {
        assert_eq!(module_key("FastQC"), "fastqc");
        assert_eq!(module_key(" Fastq_Screen "), "fastq_screen");
    }
}
