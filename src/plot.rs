//! plot: typed views over plot-data payloads.
//!
//! Снапшот plot_data: это JSON-объект `plot id -> payload`, у payload есть как минимум
//! `plot_type`. Для типов, которые умеет сливать Combiner, здесь есть типизированные
//! структуры; все прочие поля сохраняются через `#[serde(flatten)] rest` и уходят в
//! рендерер без изменений (включая сам `plot_type`).
//!
//! | plot_type            | shape        |
//! |----------------------|--------------|
//! | bar_graph, beeswarm  | Categorical  |
//! | scatter, xy_line     | Coordinate   |
//! | heatmap              | Heatmap      |
//! | anything else        | Opaque       |

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plot-data snapshot / merged report payload: plot id -> payload.
pub type PlotData = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotType {
    BarGraph,
    Beeswarm,
    Scatter,
    XyLine,
    Heatmap,
    Other,
}

/// Which merge rule a plot type selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Categorical,
    Coordinate,
    Heatmap,
    Opaque,
}

impl PlotType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "bar_graph" => PlotType::BarGraph,
            "beeswarm" => PlotType::Beeswarm,
            "scatter" => PlotType::Scatter,
            "xy_line" => PlotType::XyLine,
            "heatmap" => PlotType::Heatmap,
            _ => PlotType::Other,
        }
    }

    /// plot_type of a raw payload; missing or non-string tag is `Other`.
    pub fn of(payload: &Value) -> Self {
        payload
            .get("plot_type")
            .and_then(Value::as_str)
            .map(PlotType::from_tag)
            .unwrap_or(PlotType::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlotType::BarGraph => "bar_graph",
            PlotType::Beeswarm => "beeswarm",
            PlotType::Scatter => "scatter",
            PlotType::XyLine => "xy_line",
            PlotType::Heatmap => "heatmap",
            PlotType::Other => "other",
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            PlotType::BarGraph | PlotType::Beeswarm => Shape::Categorical,
            PlotType::Scatter | PlotType::XyLine => Shape::Coordinate,
            PlotType::Heatmap => Shape::Heatmap,
            PlotType::Other => Shape::Opaque,
        }
    }
}

/// One series of a categorical plot; `data` is index-aligned with its sample-group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Series {
    /// Series label (`name`), if present and a string.
    pub fn name(&self) -> Option<&str> {
        self.rest.get("name").and_then(Value::as_str)
    }
}

/// bar_graph / beeswarm: `samples[i]` and every `datasets[i][k].data` are parallel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalPlot {
    #[serde(default)]
    pub samples: Vec<Vec<String>>,
    #[serde(default)]
    pub datasets: Vec<Vec<Series>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl CategoricalPlot {
    /// Same shape, no samples: every group empty, every series' data empty.
    pub fn cleared(&self) -> Self {
        let mut out = self.clone();
        for group in out.samples.iter_mut() {
            group.clear();
        }
        for group in out.datasets.iter_mut() {
            for series in group.iter_mut() {
                series.data.clear();
            }
        }
        out
    }
}

/// scatter / xy_line: groups of entries, each entry carries a sample-derived `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePlot {
    #[serde(default)]
    pub datasets: Vec<Vec<Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl CoordinatePlot {
    /// Same shape with every dataset-group reset to its own empty list.
    pub fn cleared(&self) -> Self {
        Self {
            datasets: (0..self.datasets.len()).map(|_| Vec::new()).collect(),
            rest: self.rest.clone(),
        }
    }
}

/// Name of a coordinate entry (None if absent or not a string).
pub fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

/// heatmap: `ycats` one per sample row, `data` flat `[col, row, value]` cells,
/// organized in per-row blocks of `xcats.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPlot {
    #[serde(default)]
    pub xcats: Vec<Value>,
    #[serde(default)]
    pub ycats: Vec<String>,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl HeatmapPlot {
    pub fn num_cols(&self) -> usize {
        self.xcats.len()
    }

    pub fn cleared(&self) -> Self {
        Self {
            xcats: self.xcats.clone(),
            ycats: Vec::new(),
            data: Vec::new(),
            rest: self.rest.clone(),
        }
    }
}

/// Typed payload, selected by `plot_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotRecord {
    Categorical(CategoricalPlot),
    Coordinate(CoordinatePlot),
    Heatmap(HeatmapPlot),
    Opaque(Value),
}

impl PlotRecord {
    /// Decode a payload into an explicit shape (used when a later snapshot must follow
    /// the shape chosen by the first one).
    pub fn decode_as(shape: Shape, payload: Value) -> Result<Self> {
        let rec = match shape {
            Shape::Categorical => PlotRecord::Categorical(
                serde_json::from_value(payload).context("decode categorical plot")?,
            ),
            Shape::Coordinate => PlotRecord::Coordinate(
                serde_json::from_value(payload).context("decode coordinate plot")?,
            ),
            Shape::Heatmap => PlotRecord::Heatmap(
                serde_json::from_value(payload).context("decode heatmap plot")?,
            ),
            Shape::Opaque => PlotRecord::Opaque(payload),
        };
        Ok(rec)
    }

    pub fn into_value(self) -> Result<Value> {
        let v = match self {
            PlotRecord::Categorical(p) => serde_json::to_value(p),
            PlotRecord::Coordinate(p) => serde_json::to_value(p),
            PlotRecord::Heatmap(p) => serde_json::to_value(p),
            PlotRecord::Opaque(v) => return Ok(v),
        };
        v.map_err(|e| anyhow!("encode plot: {e}"))
    }
}
