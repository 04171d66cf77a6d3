#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod config;
pub mod metrics;
pub mod outcome;

// Данные: сэмплы и типизированные plot payload'ы
pub mod sample;
pub mod plot;

// Хранилище снапшотов (plot_data, data_sources, module_output)
pub mod store;

// Слияние: heatmap mapper + combiner
pub mod heatmap;
pub mod combine;

// Ingestion и discovery
pub mod modules;
pub mod loader;
pub mod registry;

// Рендер и сессия
pub mod render;
pub mod session;

// Удобные реэкспорты
pub use combine::{combine, MergedReport, PlotMerger};
pub use config::{StoreBuilder, StoreConfig};
pub use loader::IngestSummary;
pub use modules::{AnalysisModule, ModuleRegistry, ModuleRun, RunContext};
pub use outcome::{Outcome, UserInputError};
pub use plot::{PlotData, PlotRecord, PlotType};
pub use render::{JsonRenderer, ReportRenderer, TemplateRenderer};
pub use sample::{leading_token, SampleFilter};
pub use session::Session;
pub use store::{next_snapshot_path, ModuleOutput, SnapshotStore};
