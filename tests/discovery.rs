use anyhow::Result;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use QcStore::registry::{list_modules, list_samples};
use QcStore::SnapshotStore;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("qcstore-disc-{prefix}-{pid}-{t}-{id}"))
}

#[test]
fn empty_store_reports_not_found() -> Result<()> {
    let root = unique_root("empty");
    let store = SnapshotStore::open(&root);
    assert_eq!(list_modules(&store)?, None);
    assert_eq!(list_samples(&store, "fastqc")?, None);
    Ok(())
}

#[test]
fn modules_and_samples_across_snapshots() -> Result<()> {
    let root = unique_root("many");
    let store = SnapshotStore::open_or_create(&root)?;
    store.write_data_sources(&json!({
        "FastQC": {"all_sections": {"s1": "/r1/s1.zip", "s2": "/r1/s2.zip"}},
        "picard": {"dups": {"s1": "/r1/s1.dups"}}
    }))?;
    store.write_data_sources(&json!({
        "fastqc": {"all_sections": {"s2": "/r2/s2.zip", "s3": "/r2/s3.zip"}, "other": {"s4": ["/a", "/b"]}}
    }))?;

    assert_eq!(
        list_modules(&store)?,
        Some(vec!["FastQC".to_string(), "fastqc".to_string(), "picard".to_string()]),
        "module keys are deduplicated verbatim"
    );
    assert_eq!(
        list_samples(&store, "FASTQC")?,
        Some(vec!["s1".into(), "s2".into(), "s3".into(), "s4".into()]),
        "lookup is case-insensitive, samples are deduplicated"
    );
    assert_eq!(list_samples(&store, "picard")?, Some(vec!["s1".to_string()]));
    assert_eq!(list_samples(&store, "qualimap")?, None, "unknown module");
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn module_without_samples_is_not_found() -> Result<()> {
    let root = unique_root("nosamples");
    let store = SnapshotStore::open_or_create(&root)?;
    store.write_data_sources(&json!({"custom_content": {}}))?;
    assert_eq!(list_modules(&store)?, Some(vec!["custom_content".to_string()]));
    assert_eq!(list_samples(&store, "custom_content")?, None);
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn corrupt_data_source_is_an_error() -> Result<()> {
    let root = unique_root("corrupt");
    let store = SnapshotStore::open_or_create(&root)?;
    store.write_data_sources(&json!({"fastqc": {}}))?;
    fs::write(store.data_sources_dir().join("data_source_1.json"), b"{ truncated")?;
    assert!(list_modules(&store).is_err());
    let _ = fs::remove_dir_all(&root);
    Ok(())
}
