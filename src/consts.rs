//! Общие константы раскладки хранилища (module dirs, plot_data, data_sources).

// -------- Module directory --------
pub const MODULE_OUTPUT_FILE: &str = "module_output.json";
// Разделитель между сериализованными объектами в module_output.json
// (файл: конкатенация JSON-объектов, не массив).
pub const MODULE_OUTPUT_SEPARATOR: &str = ",\n";

// -------- Plot-data snapshots --------
pub const PLOT_DATA_DIR: &str = "plot_data";
pub const PLOT_DATA_BASE: &str = "data";

// -------- Data-source snapshots --------
pub const DATA_SOURCES_DIR: &str = "data_sources";
pub const DATA_SOURCE_BASE: &str = "data_source";

pub const SNAPSHOT_EXT: &str = "json";

// -------- Pre-built (aggregated) input --------
pub const PREBUILT_DATA_FILE: &str = "multiqc_data.json";
pub const PREBUILT_PLOT_DATA_KEY: &str = "report_plot_data";
pub const PREBUILT_DATA_SOURCES_KEY: &str = "report_data_sources";
// Семейство модулей с двухтокенным префиксом id (fastq_screen, ...).
pub const TWO_TOKEN_MODULE_PREFIX: &str = "fastq";

// -------- Config defaults --------
pub const DEFAULT_ROOT: &str = "qcstore_data";
pub const DEFAULT_TEMPLATE_FILE: &str = "base.html";
pub const DEFAULT_HEATMAP_FAMILY: &str = "fastqc";
