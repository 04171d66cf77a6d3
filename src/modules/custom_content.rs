//! custom_content: built-in module for `*_mqc.json` files.
//!
//! Формат файла (custom content):
//! {
//!   "id": "my_counts",
//!   "section_name": "My counts",
//!   "description": "...",
//!   "plot_type": "bar_graph" | "heatmap" | "scatter" | "xy_line" | <other>,
//!   "pconfig": {...},
//!   "data": ...
//! }
//!
//! data по типам:
//! - bar_graph: {sample: {category: value}}
//! - scatter:   {sample: {"x":..,"y":..}} или {sample: [{"x":..,"y":..}, ...]}
//! - xy_line:   {sample: {x: y}}
//! - heatmap:   [[row values]] + верхнеуровневые "xcats" / "ycats" (ycats = сэмплы)
//! - прочее:    кладётся как есть под plot_type файла (для Combiner это opaque).

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde_json::{json, Map, Value};

use super::{AnalysisModule, ModuleRun, RunContext};
use crate::plot::{PlotType, Shape};
use crate::store::ModuleOutput;

pub const MODULE_NAME: &str = "custom_content";
pub const FILE_SUFFIX: &str = "_mqc.json";

pub struct CustomContent;

/// Registry constructor.
pub fn create() -> Box<dyn AnalysisModule> {
    Box::new(CustomContent)
}

impl AnalysisModule for CustomContent {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(FILE_SUFFIX))
            .unwrap_or(false)
    }

    fn run(&self, ctx: &RunContext<'_>) -> Result<ModuleRun> {
        let mut run = ModuleRun::default();
        for path in ctx.files {
            let text =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            let doc: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warn!("custom_content: skip {}: {}", path.display(), e);
                    continue;
                }
            };
            add_file(&mut run, path, &doc)
                .with_context(|| format!("custom content {}", path.display()))?;
        }
        debug!(
            "custom_content: {} section(s), {} plot(s)",
            run.outputs.len(),
            run.plot_data.len()
        );
        Ok(run)
    }
}

fn add_file(run: &mut ModuleRun, path: &Path, doc: &Value) -> Result<()> {
    let id = match doc.get("id").and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => file_id(path),
    };
    let section_name = doc
        .get("section_name")
        .and_then(Value::as_str)
        .unwrap_or(&id)
        .to_string();
    let description = doc
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let tag = doc
        .get("plot_type")
        .and_then(Value::as_str)
        .unwrap_or("other");
    let pconfig = doc.get("pconfig").cloned().unwrap_or_else(|| json!({}));
    let data = doc.get("data").cloned().unwrap_or(Value::Null);

    let plot_id = format!("{}-{}", MODULE_NAME, id);
    let (payload, samples) = match PlotType::from_tag(tag).shape() {
        Shape::Categorical => bar_payload(tag, &data, &pconfig)?,
        Shape::Coordinate if tag == "scatter" => scatter_payload(&data, &pconfig)?,
        Shape::Coordinate => line_payload(&data, &pconfig)?,
        Shape::Heatmap => heatmap_payload(doc, &data, &pconfig)?,
        Shape::Opaque => (
            json!({"plot_type": tag, "data": data, "config": pconfig}),
            Vec::new(),
        ),
    };
    run.plot_data.insert(plot_id.clone(), payload);

    let source = Value::String(path.display().to_string());
    let section: Map<String, Value> = samples
        .into_iter()
        .map(|s| (s, source.clone()))
        .collect();
    run.data_sources.insert(id.clone(), Value::Object(section));

    let output = ModuleOutput::new(section_name.as_str(), id.as_str(), description.as_str())
        .with_section(json!({
            "name": section_name,
            "anchor": id,
            "description": description,
            "plot": plot_id,
        }));
    run.outputs.push(output);
    Ok(())
}

/// `dir/my_stats_mqc.json` -> `my_stats`
fn file_id(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(FILE_SUFFIX).to_string())
        .unwrap_or_else(|| "custom".to_string())
}

fn as_object<'a>(data: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    data.as_object()
        .ok_or_else(|| anyhow!("{}: data must be an object keyed by sample", what))
}

/// {sample: {category: value}} -> samples [[..]] + one series per category.
fn bar_payload(tag: &str, data: &Value, pconfig: &Value) -> Result<(Value, Vec<String>)> {
    let by_sample = as_object(data, tag)?;
    let samples: Vec<String> = by_sample.keys().cloned().collect();

    let categories = bar_categories(by_sample, pconfig);

    let series: Vec<Value> = categories
        .iter()
        .map(|cat| {
            let vals: Vec<Value> = by_sample
                .values()
                .map(|row| row.get(cat).cloned().unwrap_or(Value::Null))
                .collect();
            json!({"name": cat, "data": vals})
        })
        .collect();

    let payload = json!({
        "plot_type": tag,
        "samples": [samples.clone()],
        "datasets": [series],
        "config": pconfig,
    });
    Ok((payload, samples))
}

/// Category order: `pconfig.cats` first (as listed), then the remaining keys sorted.
/// Order does not depend on the key order of one file.
fn bar_categories(by_sample: &Map<String, Value>, pconfig: &Value) -> Vec<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for row in by_sample.values() {
        if let Some(row) = row.as_object() {
            seen.extend(row.keys().cloned());
        }
    }
    let mut out = Vec::with_capacity(seen.len());
    if let Some(cats) = pconfig.get("cats").and_then(Value::as_array) {
        for c in cats.iter().filter_map(Value::as_str) {
            if seen.remove(c) {
                out.push(c.to_string());
            }
        }
    }
    out.extend(seen);
    out
}

fn scatter_payload(data: &Value, pconfig: &Value) -> Result<(Value, Vec<String>)> {
    let by_sample = as_object(data, "scatter")?;
    let mut entries = Vec::new();
    for (sample, points) in by_sample {
        let points: Vec<&Value> = match points {
            Value::Array(a) => a.iter().collect(),
            other => vec![other],
        };
        for p in points {
            let mut e = p.as_object().cloned().unwrap_or_default();
            e.insert("name".to_string(), Value::String(sample.clone()));
            entries.push(Value::Object(e));
        }
    }
    let samples = by_sample.keys().cloned().collect();
    Ok((
        json!({"plot_type": "scatter", "datasets": [entries], "config": pconfig}),
        samples,
    ))
}

fn line_payload(data: &Value, pconfig: &Value) -> Result<(Value, Vec<String>)> {
    let by_sample = as_object(data, "xy_line")?;
    let mut entries = Vec::new();
    for (sample, xy) in by_sample {
        let pairs: Vec<Value> = match xy.as_object() {
            Some(m) => m
                .iter()
                .map(|(x, y)| {
                    let x = x
                        .parse::<f64>()
                        .map(Value::from)
                        .unwrap_or_else(|_| Value::String(x.clone()));
                    json!([x, y])
                })
                .collect(),
            None => Vec::new(),
        };
        entries.push(json!({"name": sample, "data": pairs}));
    }
    let samples = by_sample.keys().cloned().collect();
    Ok((
        json!({"plot_type": "xy_line", "datasets": [entries], "config": pconfig}),
        samples,
    ))
}

/// Row-major matrix + xcats/ycats -> flat `[col, row, value]` cells.
fn heatmap_payload(doc: &Value, data: &Value, pconfig: &Value) -> Result<(Value, Vec<String>)> {
    let rows = data
        .as_array()
        .ok_or_else(|| anyhow!("heatmap: data must be a list of rows"))?;
    let xcats = doc.get("xcats").cloned().unwrap_or_else(|| json!([]));
    let ycats: Vec<String> = doc
        .get("ycats")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let num_cols = xcats.as_array().map(|a| a.len()).unwrap_or(0);
    if ycats.len() != rows.len() {
        return Err(anyhow!(
            "heatmap: {} row(s) but {} ycats",
            rows.len(),
            ycats.len()
        ));
    }

    let mut cells = Vec::with_capacity(rows.len() * num_cols);
    for (y, row) in rows.iter().enumerate() {
        let row = row
            .as_array()
            .ok_or_else(|| anyhow!("heatmap: row {} is not a list", y))?;
        if row.len() != num_cols {
            return Err(anyhow!(
                "heatmap: row {} has {} value(s), xcats has {}",
                y,
                row.len(),
                num_cols
            ));
        }
        for (x, v) in row.iter().enumerate() {
            cells.push(json!([x, y, v]));
        }
    }
    Ok((
        json!({
            "plot_type": "heatmap",
            "xcats": xcats,
            "ycats": ycats.clone(),
            "data": cells,
            "config": pconfig,
        }),
        ycats,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn matches_suffix_only() {
        let m = CustomContent;
        assert!(m.matches(Path::new("/x/counts_mqc.json")));
        assert!(!m.matches(Path::new("/x/counts.json")));
        assert!(!m.matches(Path::new("/x/mqc.json")));
    }

    #[test]
    fn bar_graph_is_index_aligned() -> Result<()> {
        let mut run = ModuleRun::default();
        let doc = json!({
            "id": "reads",
            "plot_type": "bar_graph",
            "data": {"s1": {"ok": 1, "bad": 2}, "s2": {"ok": 3}}
        });
        add_file(&mut run, &PathBuf::from("/d/reads_mqc.json"), &doc)?;
        let p = &run.plot_data["custom_content-reads"];
        assert_eq!(p["samples"], json!([["s1", "s2"]]));
        assert_eq!(p["datasets"][0][0], json!({"name": "bad", "data": [2, null]}));
        assert_eq!(p["datasets"][0][1], json!({"name": "ok", "data": [1, 3]}));
        assert_eq!(
            run.data_sources["reads"],
            json!({"s1": "/d/reads_mqc.json", "s2": "/d/reads_mqc.json"})
        );
        assert_eq!(run.outputs[0].anchor, "reads");
        Ok(())
    }

    #[test]
    fn heatmap_rows_become_cells() -> Result<()> {
        let mut run = ModuleRun::default();
        let doc = json!({
            "plot_type": "heatmap",
            "xcats": ["a", "b"],
            "ycats": ["s1", "s2"],
            "data": [[1, 2], [3, 4]]
        });
        add_file(&mut run, &PathBuf::from("/d/hm_mqc.json"), &doc)?;
        let p = &run.plot_data["custom_content-hm"];
        assert_eq!(p["data"], json!([[0, 0, 1], [1, 0, 2], [0, 1, 3], [1, 1, 4]]));
        Ok(())
    }

    #[test]
    fn heatmap_row_width_checked() {
        let mut run = ModuleRun::default();
        let doc = json!({"plot_type": "heatmap", "xcats": ["a"], "ycats": ["s1"], "data": [[1, 2]]});
        assert!(add_file(&mut run, &PathBuf::from("/d/x_mqc.json"), &doc).is_err());
    }

    #[test]
    fn bar_categories_ignore_file_key_order() -> Result<()> {
        let mut a = ModuleRun::default();
        let mut b = ModuleRun::default();
        let first = json!({"id": "r", "plot_type": "bar_graph", "data": {"s1": {"ok": 1, "bad": 100}}});
        let second = json!({"id": "r", "plot_type": "bar_graph", "data": {"s2": {"bad": 200, "ok": 2}}});
        add_file(&mut a, &PathBuf::from("/d/r_mqc.json"), &first)?;
        add_file(&mut b, &PathBuf::from("/d/r_mqc.json"), &second)?;
        let names = |run: &ModuleRun| -> Vec<Value> {
            run.plot_data["custom_content-r"]["datasets"][0]
                .as_array()
                .map(|g| g.iter().map(|s| s["name"].clone()).collect())
                .unwrap_or_default()
        };
        assert_eq!(names(&a), vec![json!("bad"), json!("ok")]);
        assert_eq!(names(&a), names(&b));

        let mut c = ModuleRun::default();
        let listed = json!({
            "id": "r", "plot_type": "bar_graph",
            "pconfig": {"cats": ["ok", "missing"]},
            "data": {"s1": {"bad": 1, "ok": 2, "alt": 3}}
        });
        add_file(&mut c, &PathBuf::from("/d/r_mqc.json"), &listed)?;
        assert_eq!(names(&c), vec![json!("ok"), json!("alt"), json!("bad")]);
        Ok(())
    }
}
