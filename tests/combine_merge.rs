use anyhow::Result;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use QcStore::{combine, PlotData, PlotMerger, SampleFilter, SnapshotStore, StoreBuilder, StoreConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("qcstore-combine-{prefix}-{pid}-{t}-{id}"))
}

fn obj(v: Value) -> PlotData {
    match v {
        Value::Object(m) => m,
        other => panic!("object expected, got {other}"),
    }
}

fn counts(samples: &[&str], values: &[i64]) -> PlotData {
    obj(json!({
        "fastqc_sequence_counts_plot": {
            "plot_type": "bar_graph",
            "samples": [samples],
            "datasets": [[{"name": "Unique Reads", "data": values}]],
            "config": {"id": "fastqc_sequence_counts_plot"}
        }
    }))
}

/// Три снапшота bar_graph, запрошены s1..s3: сэмплы и значения выровнены, конфиг из первого.
#[test]
fn categorical_snapshots_concatenate_aligned() -> Result<()> {
    let root = unique_root("cat");
    let store = SnapshotStore::open_or_create(&root)?;
    store.write_plot_data("fastqc", &counts(&["s1"], &[10]))?;
    store.write_plot_data("fastqc", &counts(&["s2"], &[20]))?;
    store.write_plot_data("fastqc", &counts(&["s3"], &[30]))?;

    let cfg = StoreBuilder::from_default().root(&root).build();
    let filter = SampleFilter::from_csv("s1,s2,s3");
    let merged = combine(&store, &cfg, "FastQC", &filter)?;

    let p = &merged["fastqc_sequence_counts_plot"];
    assert_eq!(p["samples"], json!([["s1", "s2", "s3"]]));
    assert_eq!(p["datasets"][0][0]["data"], json!([10, 20, 30]));
    assert_eq!(p["datasets"][0][0]["name"], json!("Unique Reads"), "series metadata kept");
    assert_eq!(p["config"]["id"], json!("fastqc_sequence_counts_plot"));
    assert_eq!(p["plot_type"], json!("bar_graph"));
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn categorical_filter_and_leading_token() -> Result<()> {
    let cfg = StoreConfig::default();
    let filter = SampleFilter::from_csv("s1,s3");
    let mut m = PlotMerger::new(&cfg, &filter);
    m.absorb(counts(&["s1 (R1)", "s2", "s3"], &[1, 2, 3]))?;
    // s1 повторно под другой декорацией: уже есть, пропуск
    m.absorb(counts(&["s1 (R2)", "s4"], &[9, 4]))?;
    let out = m.finish()?;
    let p = &out["fastqc_sequence_counts_plot"];
    assert_eq!(p["samples"], json!([["s1 (R1)", "s3"]]), "stored labels keep decoration");
    assert_eq!(p["datasets"][0][0]["data"], json!([1, 3]));
    Ok(())
}

/// ycats s1, s2 из двух снапшотов с тремя колонками: строки переписаны на курсор.
#[test]
fn heatmap_rows_remapped_onto_cursor() -> Result<()> {
    let cfg = StoreConfig::default();
    let filter = SampleFilter::from_csv("s1,s2");
    let mut m = PlotMerger::new(&cfg, &filter);

    let hm = |sample: &str, vals: [i64; 3]| {
        obj(json!({
            "fastqc-status-check-heatmap": {
                "plot_type": "heatmap",
                "xcats": ["a", "b", "c"],
                "ycats": [sample],
                "data": [[0, 0, vals[0]], [1, 0, vals[1]], [2, 0, vals[2]]]
            }
        }))
    };
    m.absorb(hm("s1", [5, 6, 7]))?;
    assert_eq!(m.heatmap_cursor("fastqc-status-check-heatmap"), Some(1));
    m.absorb(hm("s2", [8, 9, 10]))?;
    assert_eq!(m.heatmap_cursor("fastqc-status-check-heatmap"), Some(2));

    let out = m.finish()?;
    let p = &out["fastqc-status-check-heatmap"];
    assert_eq!(p["ycats"], json!(["s1", "s2"]));
    assert_eq!(
        p["data"],
        json!([[0, 0, 5], [1, 0, 6], [2, 0, 7], [0, 1, 8], [1, 1, 9], [2, 1, 10]])
    );
    assert_eq!(p["xcats"], json!(["a", "b", "c"]));
    Ok(())
}

#[test]
fn heatmap_family_comes_from_config() -> Result<()> {
    let cfg = StoreBuilder::from_default().heatmap_families(["picard"]).build();
    let filter = SampleFilter::from_csv("s1,s2");
    let mut m = PlotMerger::new(&cfg, &filter);
    let hm = |sample: &str| {
        obj(json!({"picard_hm": {"plot_type": "heatmap", "xcats": ["x"], "ycats": [sample], "data": [[0, 0, 1]]}}))
    };
    m.absorb(hm("s1"))?;
    m.absorb(hm("s2"))?;
    assert_eq!(m.heatmap_cursor("picard_hm"), Some(2));
    assert_eq!(m.finish()?["picard_hm"]["ycats"], json!(["s1", "s2"]));
    Ok(())
}

/// Повторное появление той же точки не дублирует её.
#[test]
fn scatter_entries_are_idempotent() -> Result<()> {
    let cfg = StoreConfig::default();
    let filter = SampleFilter::from_csv("s1,s2");
    let mut m = PlotMerger::new(&cfg, &filter);
    let scatter = |entries: Value| obj(json!({"sc": {"plot_type": "scatter", "datasets": [entries]}}));

    m.absorb(scatter(json!([{"name": "s1", "x": 1, "y": 2}, {"name": "s9", "x": 0, "y": 0}])))?;
    m.absorb(scatter(json!([{"name": "s1", "x": 1, "y": 2}, {"name": "s2", "x": 3, "y": 4}])))?;
    m.absorb(scatter(json!([{"name": "s1", "x": 1, "y": 2}])))?;

    let out = m.finish()?;
    assert_eq!(
        out["sc"]["datasets"],
        json!([[{"name": "s1", "x": 1, "y": 2}, {"name": "s2", "x": 3, "y": 4}]])
    );
    Ok(())
}

#[test]
fn xy_line_groups_are_independent() -> Result<()> {
    let cfg = StoreConfig::default();
    let filter = SampleFilter::from_csv("s1");
    let mut m = PlotMerger::new(&cfg, &filter);
    m.absorb(obj(json!({"line": {
        "plot_type": "xy_line",
        "datasets": [[{"name": "s1", "data": [[1, 2]]}], [{"name": "s1", "data": [[1, 5]]}]]
    }})))?;
    let out = m.finish()?;
    assert_eq!(out["line"]["datasets"][0], json!([{"name": "s1", "data": [[1, 2]]}]));
    assert_eq!(out["line"]["datasets"][1], json!([{"name": "s1", "data": [[1, 5]]}]));
    Ok(())
}

#[test]
fn opaque_plots_first_snapshot_wins() -> Result<()> {
    let root = unique_root("opaque");
    let store = SnapshotStore::open_or_create(&root)?;
    store.write_plot_data("qualimap", &obj(json!({"qualimap_table": {"plot_type": "table", "v": 1}})))?;
    store.write_plot_data("qualimap", &obj(json!({"qualimap_table": {"plot_type": "table", "v": 2}})))?;

    let cfg = StoreConfig::default();
    let merged = combine(&store, &cfg, "qualimap", &SampleFilter::from_csv("s1"))?;
    assert_eq!(merged["qualimap_table"], json!({"plot_type": "table", "v": 1}));
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn combine_without_snapshots_is_empty() -> Result<()> {
    let root = unique_root("empty");
    let store = SnapshotStore::open_or_create(&root)?;
    let merged = combine(&store, &StoreConfig::default(), "nothing", &SampleFilter::from_csv("s1"))?;
    assert!(merged.is_empty());
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn plot_order_follows_first_appearance() -> Result<()> {
    let cfg = StoreConfig::default();
    let filter = SampleFilter::from_csv("s1");
    let mut m = PlotMerger::new(&cfg, &filter);
    m.absorb(obj(json!({"b": {"plot_type": "table"}, "a": {"plot_type": "table"}})))?;
    m.absorb(obj(json!({"c": {"plot_type": "table"}, "a": {"plot_type": "table"}})))?;
    let out = m.finish()?;
    let ids: Vec<&str> = out.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
    Ok(())
}

#[test]
fn malformed_snapshot_is_an_error() -> Result<()> {
    let root = unique_root("bad");
    let store = SnapshotStore::open_or_create(&root)?;
    store.write_plot_data("fastqc", &counts(&["s1"], &[1]))?;
    fs::write(store.plot_data_dir("fastqc").join("data_1.json"), b"[1, 2]")?;
    let res = combine(&store, &StoreConfig::default(), "fastqc", &SampleFilter::from_csv("s1"));
    assert!(res.is_err(), "non-object snapshot must fail the combine");
    let _ = fs::remove_dir_all(&root);
    Ok(())
}
