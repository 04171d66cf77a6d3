//! modules: pluggable analysis modules used by raw ingestion.
//!
//! Модуль получает список найденных файлов (уже отфильтрованных его matches()),
//! временный рабочий каталог и возвращает ModuleRun: описательные output-записи,
//! plot data одного прогона и data sources (section -> sample -> path).
//!
//! Реестр: явная карта `имя -> конструктор` в порядке запуска; атрибуты модулей
//! не угадываются, опциональные поля output-записи явные (см. ModuleOutput).

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{Map, Value};

use crate::plot::PlotData;
use crate::store::ModuleOutput;

pub mod custom_content;

pub use custom_content::CustomContent;

/// Inputs of one module run.
pub struct RunContext<'a> {
    /// Files discovered under the input locations that this module matched.
    pub files: &'a [PathBuf],
    /// Scoped working directory, removed when the load finishes.
    pub work_dir: &'a Path,
}

/// Everything one module produced in one run.
#[derive(Debug, Clone, Default)]
pub struct ModuleRun {
    pub outputs: Vec<ModuleOutput>,
    pub plot_data: PlotData,
    /// section -> sample -> source path(s)
    pub data_sources: Map<String, Value>,
}

impl ModuleRun {
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

pub trait AnalysisModule {
    /// Registry key, also the store directory name (lowercased).
    fn name(&self) -> &str;

    /// Does this module consume `path`?
    fn matches(&self, path: &Path) -> bool;

    fn run(&self, ctx: &RunContext<'_>) -> Result<ModuleRun>;
}

pub type ModuleCtor = fn() -> Box<dyn AnalysisModule>;

/// Ordered registry of module constructors.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    entries: Vec<(String, ModuleCtor)>,
}

impl ModuleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the modules shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut r = Self::new();
        r.register(custom_content::MODULE_NAME, custom_content::create);
        r
    }

    /// Register (or replace, keeping its position) a module constructor.
    pub fn register(&mut self, name: &str, ctor: ModuleCtor) {
        let key = name.to_lowercase();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == key) {
            slot.1 = ctor;
        } else {
            self.entries.push((key, ctor));
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct every registered module in run order.
    pub fn instantiate(&self) -> Vec<Box<dyn AnalysisModule>> {
        self.entries.iter().map(|(_, ctor)| ctor()).collect()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
