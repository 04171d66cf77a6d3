//! loader: two ingestion paths into the snapshot store.
//!
//! 1) Raw ingestion (`load`): найти файлы во входных путях, прогнать модули реестра,
//!    для каждого модуля с хотя бы одной output-записью:
//!      - module_output.json (только если файла ещё нет или overwrite),
//!      - новый plot_data снапшот;
//!    затем один data_source снапшот на всю сессию.
//! 2) Pre-built ingestion (`add`): `<dir>/multiqc_data.json` с плоской картой
//!    `report_plot_data` (plot id -> payload) и `report_data_sources`; карта plot'ов
//!    делится по модулям по имени plot id, на каждый модуль: новый снапшот.
//!
//! Overwrite-режим: перед первой записью сессии plot_data модуля и data_sources
//! удаляются рекурсивно; последующие записи той же сессии: обычный append.
//! Рабочий каталог сессии: tempfile::TempDir, удаляется на любом выходе.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::consts::{
    PREBUILT_DATA_FILE, PREBUILT_DATA_SOURCES_KEY, PREBUILT_PLOT_DATA_KEY,
    TWO_TOKEN_MODULE_PREFIX,
};
use crate::modules::{ModuleRegistry, RunContext};
use crate::outcome::{Outcome, UserInputError};
use crate::plot::PlotData;
use crate::store::{module_key, SnapshotStore};

/// What one ingestion wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    /// Modules that received a plot-data snapshot (store keys, in write order).
    pub modules: Vec<String>,
    pub plot_snapshots: Vec<PathBuf>,
    pub data_source_snapshot: Option<PathBuf>,
}

/// Tracks which overwrite resets already happened in this session.
#[derive(Debug, Default)]
struct ResetTracker {
    enabled: bool,
    modules: HashSet<String>,
    data_sources: bool,
}

impl ResetTracker {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    fn before_module_write(&mut self, store: &SnapshotStore, module: &str) -> Result<()> {
        if self.enabled && self.modules.insert(module_key(module)) {
            if store.reset_module(module)? {
                info!("overwrite: cleared plot data of '{}'", module);
            }
        }
        Ok(())
    }

    fn before_data_source_write(&mut self, store: &SnapshotStore) -> Result<()> {
        if self.enabled && !self.data_sources {
            self.data_sources = true;
            if store.reset_data_sources()? {
                info!("overwrite: cleared data sources");
            }
        }
        Ok(())
    }
}

// ---------------------- raw ingestion ----------------------

/// Run the registry's modules over `inputs` and persist their results.
///
/// `file_list=true`: `inputs` must be exactly one text file listing one path per line.
pub fn load(
    store: &SnapshotStore,
    registry: &ModuleRegistry,
    inputs: &[PathBuf],
    file_list: bool,
    overwrite: bool,
) -> Result<Outcome<IngestSummary>> {
    let inputs = if file_list {
        if inputs.len() != 1 {
            return Ok(UserInputError::FileListWithManyInputs.into());
        }
        let listed = read_file_list(&inputs[0])?;
        if listed.is_empty() {
            return Ok(UserInputError::EmptyFileList {
                list: inputs[0].clone(),
            }
            .into());
        }
        listed
    } else {
        inputs.to_vec()
    };

    let work = tempfile::Builder::new()
        .prefix("qcstore-load-")
        .tempdir()
        .context("create working directory")?;

    for d in &inputs {
        info!("Search path: {}", d.display());
    }
    let files = discover_files(&inputs)?;
    debug!("load: {} file(s) discovered", files.len());

    let mut resets = ResetTracker::new(overwrite);
    let mut summary = IngestSummary::default();
    let mut data_sources = Map::new();

    for module in registry.instantiate() {
        let name = module.name().to_string();
        let matched: Vec<PathBuf> = files.iter().filter(|p| module.matches(p)).cloned().collect();
        if matched.is_empty() {
            debug!("load: module '{}' matched no files", name);
            continue;
        }

        let ctx = RunContext {
            files: &matched,
            work_dir: work.path(),
        };
        let run = module
            .run(&ctx)
            .with_context(|| format!("run module '{}'", name))?;
        if run.is_empty() {
            info!("load: module '{}' produced no output", name);
            continue;
        }

        store.ensure_module_dir(&name)?;
        resets.before_module_write(store, &name)?;

        if overwrite || !store.has_module_output(&name) {
            store.write_module_outputs(&name, &run.outputs, overwrite)?;
        } else {
            debug!("load: keep existing module output of '{}'", name);
        }

        let path = store.write_plot_data(&name, &run.plot_data)?;
        info!(
            "load: module '{}': {} plot(s) -> {}",
            name,
            run.plot_data.len(),
            path.display()
        );
        summary.modules.push(module_key(&name));
        summary.plot_snapshots.push(path);
        data_sources.insert(name, Value::Object(run.data_sources));
    }

    if summary.modules.is_empty() {
        warn!("load: no module produced output for the given inputs");
    } else {
        resets.before_data_source_write(store)?;
        let path = store.write_data_sources(&Value::Object(data_sources))?;
        summary.data_source_snapshot = Some(path);
    }

    // work (TempDir) удаляется здесь и на любом раннем выходе выше
    Ok(Outcome::Done(summary))
}

/// Existing paths listed in `list` (one per line), absolutised.
fn read_file_list(list: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(list).with_context(|| format!("read {}", list.display()))?;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let p = Path::new(line);
        if !p.exists() {
            debug!("file list: skip missing {}", line);
            continue;
        }
        let abs = fs::canonicalize(p).with_context(|| format!("canonicalize {}", line))?;
        out.push(abs);
    }
    Ok(out)
}

/// All regular files under the inputs (recursively), sorted and deduplicated.
///
/// Unreadable entries and missing inputs are skipped with a warning.
pub fn discover_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        for entry in WalkDir::new(input).follow_links(true) {
            match entry {
                Ok(e) if e.file_type().is_file() => out.push(e.into_path()),
                Ok(_) => {}
                Err(e) => warn!("skip {}: {}", input.display(), e),
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

// ---------------------- pre-built ingestion ----------------------

/// Ingest `<dir>/multiqc_data.json`.
pub fn add(store: &SnapshotStore, dir: &Path) -> Result<Outcome<IngestSummary>> {
    let path = dir.join(PREBUILT_DATA_FILE);
    if !path.exists() {
        return Ok(UserInputError::NoData {
            dir: dir.to_path_buf(),
        }
        .into());
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let mut doc: Map<String, Value> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse {}", path.display()))?;

    let plot_data = match doc.remove(PREBUILT_PLOT_DATA_KEY) {
        Some(Value::Object(m)) => m,
        Some(_) => anyhow::bail!("{}: '{}' is not an object", path.display(), PREBUILT_PLOT_DATA_KEY),
        None => {
            warn!("add: {} has no '{}'", path.display(), PREBUILT_PLOT_DATA_KEY);
            Map::new()
        }
    };

    let mut summary = IngestSummary::default();
    for (module, group) in partition_by_module(plot_data) {
        let snap = store.write_plot_data(&module, &group)?;
        info!(
            "add: module '{}': {} plot(s) -> {}",
            module,
            group.len(),
            snap.display()
        );
        summary.modules.push(module_key(&module));
        summary.plot_snapshots.push(snap);
    }

    match doc.remove(PREBUILT_DATA_SOURCES_KEY) {
        Some(ds) => {
            summary.data_source_snapshot = Some(store.write_data_sources(&ds)?);
        }
        None => warn!("add: {} has no '{}'", path.display(), PREBUILT_DATA_SOURCES_KEY),
    }

    Ok(Outcome::Done(summary))
}

/// Module name encoded in a plot id: first `-`/`_` token, `fastq_<x>` for the two-token family.
pub fn module_name_for_plot(plot_id: &str) -> Option<String> {
    let normalized = plot_id.replace('-', "_");
    let mut tokens = normalized.split('_');
    let first = tokens.next().filter(|t| !t.is_empty())?;
    if first == TWO_TOKEN_MODULE_PREFIX {
        if let Some(second) = tokens.next().filter(|t| !t.is_empty()) {
            return Some(format!("{first}_{second}"));
        }
    }
    Some(first.to_string())
}

/// Split a flat plot map into per-module groups (first-appearance order of modules).
pub fn partition_by_module(plot_data: PlotData) -> Vec<(String, PlotData)> {
    let mut groups: Vec<(String, PlotData)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (plot_id, payload) in plot_data {
        let Some(module) = module_name_for_plot(&plot_id) else {
            warn!("add: cannot derive module from plot id '{}', skipped", plot_id);
            continue;
        };
        let key = module_key(&module);
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                groups.push((module, PlotData::new()));
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].1.insert(plot_id, payload);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn module_names_from_plot_ids() {
        assert_eq!(module_name_for_plot("fastqc_sequence_counts_plot").as_deref(), Some("fastqc"));
        assert_eq!(module_name_for_plot("fastqc-status-check-heatmap").as_deref(), Some("fastqc"));
        assert_eq!(module_name_for_plot("fastq_screen_plot").as_deref(), Some("fastq_screen"));
        assert_eq!(module_name_for_plot("fastq-screen-plot").as_deref(), Some("fastq_screen"));
        assert_eq!(module_name_for_plot("fastq").as_deref(), Some("fastq"));
        assert_eq!(module_name_for_plot("qualimap").as_deref(), Some("qualimap"));
        assert_eq!(module_name_for_plot("_x"), None);
        assert_eq!(module_name_for_plot(""), None);
    }

    #[test]
    fn partition_groups_non_adjacent_ids() {
        let m = match json!({
            "fastqc_a": {"plot_type": "other"},
            "picard_b": {"plot_type": "other"},
            "fastqc_c": {"plot_type": "other"},
            "FastQC_d": {"plot_type": "other"}
        }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let groups = partition_by_module(m);
        let names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["fastqc", "picard"]);
        let ids: Vec<&String> = groups[0].1.keys().collect();
        assert_eq!(ids, vec!["fastqc_a", "fastqc_c", "FastQC_d"]);
    }

    #[test]
    fn discovery_is_recursive_sorted_and_deduplicated() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("run1").join("lane2");
        fs::create_dir_all(&nested)?;
        fs::write(nested.join("b_mqc.json"), "{}")?;
        fs::write(dir.path().join("a_mqc.json"), "{}")?;
        let single = dir.path().join("a_mqc.json");

        let found = discover_files(&[
            dir.path().to_path_buf(),
            single.clone(),
            dir.path().join("missing"),
        ])?;
        assert_eq!(found, vec![single, nested.join("b_mqc.json")]);
        Ok(())
    }
}
