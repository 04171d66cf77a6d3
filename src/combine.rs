//! combine: сборка одного отчёта модуля из всех его plot_data снапшотов.
//!
//! Снапшоты читаются в порядке записи и сворачиваются в одну карту `plot id -> payload`.
//! Первый снапшот, в котором появился plot id, определяет правило слияния для этого id:
//!
//! - Categorical (bar_graph, beeswarm): новые метки добавляются в samples[i], а значения на
//!   тех же позициях: в data каждой серии datasets[i]; samples[i] и data всегда одной длины.
//! - Coordinate (scatter, xy_line): в datasets[i] добавляются записи с запрошенным `name`,
//!   которых там ещё нет (сравнение по значению).
//! - Heatmap из семейств конфигурации: новые строки ycats + перенос ячеек через
//!   heatmap::remap с курсором строк на каждый plot id.
//! - Всё остальное (включая прочие heatmap'ы): первый снапшот как есть, дальше игнор.
//!
//! Сэмплы сравниваются по leading token; метки хранятся как есть.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use serde_json::Value;

use crate::config::StoreConfig;
use crate::heatmap;
use crate::metrics::{record_heatmap_rows, record_plot_merged, record_samples};
use crate::plot::{
    entry_name, CategoricalPlot, CoordinatePlot, HeatmapPlot, PlotData, PlotRecord, PlotType,
    Series, Shape,
};
use crate::sample::{admitted_positions, SampleFilter};
use crate::store::{read_snapshot, ModuleOutput, SnapshotStore};

/// Consolidated report of one module: stored metadata plus merged plot data.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedReport {
    pub module: String,
    pub outputs: Vec<ModuleOutput>,
    pub plot_data: PlotData,
}

/// Merge every plot-data snapshot of `module`, keeping only samples admitted by `filter`.
pub fn combine(
    store: &SnapshotStore,
    cfg: &StoreConfig,
    module: &str,
    filter: &SampleFilter,
) -> Result<PlotData> {
    let files = store.list_plot_data(module)?;
    if files.is_empty() {
        warn!("combine: no plot data snapshots for module '{}'", module);
    }
    let mut merger = PlotMerger::new(cfg, filter);
    for path in &files {
        let snap = match read_snapshot(path)? {
            Value::Object(m) => m,
            _ => bail!("snapshot {} is not a JSON object", path.display()),
        };
        merger
            .absorb(snap)
            .with_context(|| format!("merge {}", path.display()))?;
    }
    debug!(
        "combine: module '{}' -> {} plot(s) from {} snapshot(s)",
        module,
        merger.len(),
        files.len()
    );
    merger.finish()
}

/// Accumulated state of one plot id.
#[derive(Debug)]
enum Slot {
    Categorical(CategoricalPlot),
    Coordinate(CoordinatePlot),
    Heatmap {
        plot: HeatmapPlot,
        last_row_index: usize,
    },
    /// First payload wins verbatim.
    Fixed(Value),
}

/// Incremental merge of plot-data snapshots.
pub struct PlotMerger<'a> {
    cfg: &'a StoreConfig,
    filter: &'a SampleFilter,
    order: Vec<String>,
    slots: HashMap<String, Slot>,
}

impl<'a> PlotMerger<'a> {
    pub fn new(cfg: &'a StoreConfig, filter: &'a SampleFilter) -> Self {
        Self {
            cfg,
            filter,
            order: Vec::new(),
            slots: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Row cursor of a row-merged heatmap (None for other plots).
    pub fn heatmap_cursor(&self, plot_id: &str) -> Option<usize> {
        match self.slots.get(plot_id) {
            Some(Slot::Heatmap { last_row_index, .. }) => Some(*last_row_index),
            _ => None,
        }
    }

    /// Fold one snapshot into the result.
    pub fn absorb(&mut self, snapshot: PlotData) -> Result<()> {
        for (plot_id, payload) in snapshot {
            if !self.slots.contains_key(&plot_id) {
                let slot = self.open_slot(&plot_id, &payload)?;
                self.slots.insert(plot_id.clone(), slot);
                self.order.push(plot_id.clone());
            }
            let filter = self.filter;
            let slot = self
                .slots
                .get_mut(&plot_id)
                .ok_or_else(|| anyhow!("slot for '{}' vanished", plot_id))?;
            merge_into(slot, payload, filter).with_context(|| format!("plot '{}'", plot_id))?;
        }
        Ok(())
    }

    /// Consume the merger into the merged plot-data map (first-seen order).
    pub fn finish(mut self) -> Result<PlotData> {
        let mut out = PlotData::new();
        for plot_id in self.order {
            let Some(slot) = self.slots.remove(&plot_id) else {
                continue;
            };
            let value = match slot {
                Slot::Categorical(p) => PlotRecord::Categorical(p).into_value()?,
                Slot::Coordinate(p) => PlotRecord::Coordinate(p).into_value()?,
                Slot::Heatmap { plot, .. } => PlotRecord::Heatmap(plot).into_value()?,
                Slot::Fixed(v) => v,
            };
            record_plot_merged();
            out.insert(plot_id, value);
        }
        Ok(out)
    }

    /// Empty accumulator for a newly seen plot id; its shape fixes the merge rule.
    fn open_slot(&self, plot_id: &str, payload: &Value) -> Result<Slot> {
        let ptype = PlotType::of(payload);
        let shape = ptype.shape();
        let passthrough = match shape {
            Shape::Opaque => true,
            Shape::Heatmap => !self.cfg.is_row_merged_heatmap(plot_id),
            Shape::Categorical | Shape::Coordinate => false,
        };
        if passthrough {
            debug!("plot '{}' ({}) passed through", plot_id, ptype.as_str());
            return Ok(Slot::Fixed(payload.clone()));
        }
        let rec = PlotRecord::decode_as(shape, payload.clone())
            .with_context(|| format!("plot '{}'", plot_id))?;
        let slot = match rec {
            PlotRecord::Categorical(p) => Slot::Categorical(p.cleared()),
            PlotRecord::Coordinate(p) => Slot::Coordinate(p.cleared()),
            PlotRecord::Heatmap(p) => Slot::Heatmap {
                plot: p.cleared(),
                last_row_index: 0,
            },
            PlotRecord::Opaque(v) => Slot::Fixed(v),
        };
        Ok(slot)
    }
}

impl Slot {
    /// Shape later payloads are decoded as (None: ignored).
    fn shape(&self) -> Option<Shape> {
        match self {
            Slot::Categorical(_) => Some(Shape::Categorical),
            Slot::Coordinate(_) => Some(Shape::Coordinate),
            Slot::Heatmap { .. } => Some(Shape::Heatmap),
            Slot::Fixed(_) => None,
        }
    }
}

fn merge_into(slot: &mut Slot, payload: Value, filter: &SampleFilter) -> Result<()> {
    let Some(shape) = slot.shape() else {
        return Ok(());
    };
    match (slot, PlotRecord::decode_as(shape, payload)?) {
        (Slot::Categorical(acc), PlotRecord::Categorical(inc)) => {
            merge_categorical(acc, &inc, filter)
        }
        (Slot::Coordinate(acc), PlotRecord::Coordinate(inc)) => merge_coordinate(acc, inc, filter),
        (
            Slot::Heatmap {
                plot,
                last_row_index,
            },
            PlotRecord::Heatmap(inc),
        ) => merge_heatmap(plot, last_row_index, &inc, filter),
        _ => Ok(()),
    }
}

fn merge_categorical(
    acc: &mut CategoricalPlot,
    inc: &CategoricalPlot,
    filter: &SampleFilter,
) -> Result<()> {
    for (i, labels) in inc.samples.iter().enumerate() {
        let Some(acc_labels) = acc.samples.get(i) else {
            bail!(
                "sample-group {} not present in the first snapshot ({} group(s))",
                i,
                acc.samples.len()
            );
        };
        let positions = admitted_positions(labels, acc_labels, filter);
        record_samples(positions.len(), labels.len() - positions.len());
        if positions.is_empty() {
            continue;
        }

        let inc_series: &[Series] = inc.datasets.get(i).map(|g| g.as_slice()).unwrap_or(&[]);
        let acc_group: &[Series] = acc.datasets.get(i).map(|g| g.as_slice()).unwrap_or(&[]);
        let plan = pair_series(acc_group, inc_series)
            .with_context(|| format!("dataset-group {}", i))?;

        // сначала собрать всё, потом мутировать: samples и data не разъедутся при ошибке
        let pick = |k: usize| -> Result<Vec<Value>> {
            let series = &inc_series[k];
            positions
                .iter()
                .map(|&p| {
                    series.data.get(p).cloned().ok_or_else(|| {
                        anyhow!(
                            "dataset-group {} series {}: data has {} value(s), sample position {}",
                            i,
                            k,
                            series.data.len(),
                            p
                        )
                    })
                })
                .collect()
        };
        let mut additions: Vec<Vec<Value>> = Vec::with_capacity(plan.matched.len());
        for src in &plan.matched {
            additions.push(match src {
                Some(k) => pick(*k)?,
                None => vec![Value::Null; positions.len()],
            });
        }
        let mut fresh: Vec<Series> = Vec::with_capacity(plan.added.len());
        for &k in &plan.added {
            // новая серия: прошлые сэмплы группы получают null
            let mut data = vec![Value::Null; acc_labels.len()];
            data.extend(pick(k)?);
            fresh.push(Series {
                data,
                rest: inc_series[k].rest.clone(),
            });
        }

        acc.samples[i].extend(positions.iter().map(|&p| labels[p].clone()));
        while acc.datasets.len() <= i {
            acc.datasets.push(Vec::new());
        }
        let group = &mut acc.datasets[i];
        for (series, vals) in group.iter_mut().zip(additions) {
            series.data.extend(vals);
        }
        group.extend(fresh);
    }
    Ok(())
}

/// How incoming series feed the accumulated ones of one dataset-group.
#[derive(Debug, PartialEq)]
struct SeriesPlan {
    /// Per accumulated series: index of its incoming series (None: no values, pad with null).
    matched: Vec<Option<usize>>,
    /// Incoming series unknown to the accumulator, appended as new series.
    added: Vec<usize>,
}

/// Pair series by `name` when every series has a distinct one; otherwise by position.
///
/// Positional pairing needs at least as many incoming series as accumulated ones;
/// extra incoming series are ignored.
fn pair_series(acc: &[Series], inc: &[Series]) -> Result<SeriesPlan> {
    if let (Some(acc_names), Some(inc_names)) = (distinct_names(acc), distinct_names(inc)) {
        let matched = acc_names
            .iter()
            .map(|n| inc_names.iter().position(|m| m == n))
            .collect();
        let mut added = Vec::new();
        for (k, n) in inc_names.iter().enumerate() {
            if !acc_names.contains(n) {
                added.push(k);
            }
        }
        return Ok(SeriesPlan { matched, added });
    }

    if inc.len() < acc.len() {
        bail!(
            "{} unnamed series, expected at least {}",
            inc.len(),
            acc.len()
        );
    }
    if inc.len() > acc.len() {
        debug!("{} extra unnamed series ignored", inc.len() - acc.len());
    }
    Ok(SeriesPlan {
        matched: (0..acc.len()).map(Some).collect(),
        added: Vec::new(),
    })
}

fn distinct_names(series: &[Series]) -> Option<Vec<&str>> {
    let mut names: Vec<&str> = Vec::with_capacity(series.len());
    for s in series {
        let n = s.name()?;
        if names.contains(&n) {
            return None;
        }
        names.push(n);
    }
    Some(names)
}

fn merge_coordinate(
    acc: &mut CoordinatePlot,
    inc: CoordinatePlot,
    filter: &SampleFilter,
) -> Result<()> {
    let groups = acc.datasets.len();
    for (i, entries) in inc.datasets.into_iter().enumerate() {
        let Some(acc_group) = acc.datasets.get_mut(i) else {
            bail!(
                "dataset-group {} not present in the first snapshot ({} group(s))",
                i,
                groups
            );
        };
        let (mut admitted, mut rejected) = (0usize, 0usize);
        for entry in entries {
            let wanted = entry_name(&entry).map(|n| filter.admits(n)).unwrap_or(false);
            if !wanted {
                rejected += 1;
                continue;
            }
            if !acc_group.contains(&entry) {
                acc_group.push(entry);
                admitted += 1;
            }
        }
        record_samples(admitted, rejected);
    }
    Ok(())
}

fn merge_heatmap(
    acc: &mut HeatmapPlot,
    last_row_index: &mut usize,
    inc: &HeatmapPlot,
    filter: &SampleFilter,
) -> Result<()> {
    let positions = admitted_positions(&inc.ycats, &acc.ycats, filter);
    record_samples(positions.len(), inc.ycats.len() - positions.len());
    if positions.is_empty() {
        return Ok(());
    }
    let (cells, cursor) = heatmap::remap(&positions, &inc.data, *last_row_index, inc.num_cols())?;
    acc.ycats
        .extend(positions.iter().map(|&p| inc.ycats[p].clone()));
    acc.data.extend(cells);
    record_heatmap_rows(positions.len());
    *last_row_index = cursor;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(v: Value) -> PlotData {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn first_sight_branch_sticks() -> Result<()> {
        let cfg = StoreConfig::default();
        let filter = SampleFilter::new(["s1", "s2"]);
        let mut m = PlotMerger::new(&cfg, &filter);
        m.absorb(snap(json!({"t": {"plot_type": "table", "rows": [1]}})))?;
        // другой тип у того же id: игнор, первый выигрывает
        m.absorb(snap(json!({"t": {"plot_type": "bar_graph", "samples": [["s1"]], "datasets": [[{"data": [1]}]]}})))?;
        let out = m.finish()?;
        assert_eq!(out["t"], json!({"plot_type": "table", "rows": [1]}));
        Ok(())
    }

    #[test]
    fn misaligned_data_is_error() {
        let cfg = StoreConfig::default();
        let filter = SampleFilter::new(["s1", "s2"]);
        let mut m = PlotMerger::new(&cfg, &filter);
        let bad = json!({"p": {"plot_type": "bar_graph", "samples": [["s1", "s2"]], "datasets": [[{"data": [1]}]]}});
        assert!(m.absorb(snap(bad)).is_err());
    }

    #[test]
    fn non_family_heatmap_first_wins() -> Result<()> {
        let cfg = StoreConfig::default();
        let filter = SampleFilter::new(["s1"]);
        let mut m = PlotMerger::new(&cfg, &filter);
        let a = json!({"plot_type": "heatmap", "xcats": ["a"], "ycats": ["s9"], "data": [[0, 0, 1]]});
        m.absorb(snap(json!({"picard_hm": a.clone()})))?;
        m.absorb(snap(json!({"picard_hm": {"plot_type": "heatmap", "xcats": ["a"], "ycats": ["s1"], "data": [[0, 0, 2]]}})))?;
        assert_eq!(m.heatmap_cursor("picard_hm"), None);
        assert_eq!(m.finish()?["picard_hm"], a);
        Ok(())
    }

    #[test]
    fn heatmap_cursor_is_per_plot() -> Result<()> {
        let cfg = StoreConfig::default();
        let filter = SampleFilter::new(["s1", "s2"]);
        let mut m = PlotMerger::new(&cfg, &filter);
        m.absorb(snap(json!({
            "fastqc_a": {"plot_type": "heatmap", "xcats": ["x"], "ycats": ["s1", "s2"], "data": [[0, 0, 1], [0, 1, 2]]},
            "fastqc_b": {"plot_type": "heatmap", "xcats": ["x"], "ycats": ["s2"], "data": [[0, 0, 3]]}
        })))?;
        assert_eq!(m.heatmap_cursor("fastqc_a"), Some(2));
        assert_eq!(m.heatmap_cursor("fastqc_b"), Some(1));
        let out = m.finish()?;
        assert_eq!(out["fastqc_b"]["data"], json!([[0, 0, 3]]));
        Ok(())
    }

    fn bar(samples: Value, series: Value) -> PlotData {
        snap(json!({"p": {"plot_type": "bar_graph", "samples": [samples], "datasets": [series]}}))
    }

    #[test]
    fn named_series_follow_their_name() -> Result<()> {
        let cfg = StoreConfig::default();
        let filter = SampleFilter::new(["s1", "s2"]);
        let mut m = PlotMerger::new(&cfg, &filter);
        m.absorb(bar(json!(["s1"]), json!([{"name": "ok", "data": [1]}, {"name": "bad", "data": [100]}])))?;
        m.absorb(bar(json!(["s2"]), json!([{"name": "bad", "data": [200]}, {"name": "ok", "data": [2]}])))?;
        let out = m.finish()?;
        assert_eq!(
            out["p"]["datasets"][0],
            json!([{"name": "ok", "data": [1, 2]}, {"name": "bad", "data": [100, 200]}])
        );
        Ok(())
    }

    #[test]
    fn new_named_series_padded_with_null() -> Result<()> {
        let cfg = StoreConfig::default();
        let filter = SampleFilter::new(["s1", "s2", "s3"]);
        let mut m = PlotMerger::new(&cfg, &filter);
        m.absorb(bar(json!(["s1"]), json!([{"name": "ok", "data": [1]}])))?;
        m.absorb(bar(json!(["s2"]), json!([{"name": "ok", "data": [3]}, {"name": "bad", "data": [1]}])))?;
        m.absorb(bar(json!(["s3"]), json!([{"name": "bad", "data": [7]}])))?;
        let out = m.finish()?;
        assert_eq!(out["p"]["samples"], json!([["s1", "s2", "s3"]]));
        assert_eq!(
            out["p"]["datasets"][0],
            json!([{"name": "ok", "data": [1, 3, null]}, {"name": "bad", "data": [null, 1, 7]}])
        );
        Ok(())
    }

    #[test]
    fn unnamed_series_pair_by_position() -> Result<()> {
        let cfg = StoreConfig::default();
        let filter = SampleFilter::new(["s1", "s2", "s3"]);
        let mut m = PlotMerger::new(&cfg, &filter);
        m.absorb(bar(json!(["s1"]), json!([{"data": [1]}])))?;
        // лишняя серия игнорируется
        m.absorb(bar(json!(["s2"]), json!([{"data": [2]}, {"data": [9]}])))?;
        // меньше серий, чем накоплено: выравнивание не сохранить
        assert!(m.absorb(bar(json!(["s3"]), json!([]))).is_err());
        let out = m.finish()?;
        assert_eq!(out["p"]["samples"], json!([["s1", "s2"]]));
        assert_eq!(out["p"]["datasets"][0], json!([{"data": [1, 2]}]));
        Ok(())
    }
}
