//! Discovery over data-source snapshots.
//!
//! Формат снапшота: module -> section -> sample -> source path(s).
//! Пустой результат: `None` ("not found"): "модуль не встречался" и "модуль без
//! сэмплов" намеренно не различаются.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use log::debug;
use serde_json::Value;

use crate::store::{read_snapshot, SnapshotStore};

/// Every top-level module key across all data-source snapshots (deduplicated, sorted).
pub fn list_modules(store: &SnapshotStore) -> Result<Option<Vec<String>>> {
    let mut modules = BTreeSet::new();
    for path in store.list_data_sources()? {
        let snap = read_snapshot(&path)?;
        let Value::Object(map) = snap else {
            bail!("data source snapshot {} is not a JSON object", path.display());
        };
        modules.extend(map.into_iter().map(|(k, _)| k));
    }
    Ok(non_empty(modules))
}

/// Every sample recorded for `module` (case-insensitive), deduplicated and sorted.
pub fn list_samples(store: &SnapshotStore, module: &str) -> Result<Option<Vec<String>>> {
    let wanted = module.trim().to_lowercase();
    let mut samples = BTreeSet::new();
    for path in store.list_data_sources()? {
        let snap = read_snapshot(&path)?;
        let Value::Object(map) = snap else {
            bail!("data source snapshot {} is not a JSON object", path.display());
        };
        // модуль встречается в файле не более одного раза: первое совпадение и выход
        let Some((_, sections)) = map.iter().find(|(k, _)| k.to_lowercase() == wanted) else {
            continue;
        };
        let Some(sections) = sections.as_object() else {
            debug!("{}: module '{}' is not an object", path.display(), module);
            continue;
        };
        for by_sample in sections.values() {
            if let Some(by_sample) = by_sample.as_object() {
                samples.extend(by_sample.keys().cloned());
            }
        }
    }
    Ok(non_empty(samples))
}

fn non_empty(set: BTreeSet<String>) -> Option<Vec<String>> {
    if set.is_empty() {
        None
    } else {
        Some(set.into_iter().collect())
    }
}
