//! Session: explicit context for load / add / show / discovery.
//!
//! Держит конфиг, хранилище и реестр модулей; передаётся по ссылке, глобального
//! состояния нет. Объединённый отчёт строится заново на каждый show/combine и
//! отдаётся вызывающему.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::combine::{combine, MergedReport};
use crate::config::StoreConfig;
use crate::loader::{self, IngestSummary};
use crate::modules::ModuleRegistry;
use crate::outcome::{Outcome, UserInputError};
use crate::registry;
use crate::render::{stage_assets, JsonRenderer, ReportRenderer, TemplateRenderer};
use crate::sample::SampleFilter;
use crate::store::{module_key, SnapshotStore};

pub struct Session {
    cfg: StoreConfig,
    store: SnapshotStore,
    modules: ModuleRegistry,
}

impl Session {
    /// Open (creating the store root if needed) with the built-in module registry.
    pub fn open(cfg: StoreConfig) -> Result<Self> {
        let store = SnapshotStore::open_or_create(&cfg.root)?;
        debug!("session: {}", cfg);
        Ok(Self {
            cfg,
            store,
            modules: ModuleRegistry::with_builtin(),
        })
    }

    /// Replace the module registry used by raw ingestion.
    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = modules;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Raw ingestion (see loader::load).
    pub fn load(
        &self,
        inputs: &[PathBuf],
        file_list: bool,
        overwrite: bool,
    ) -> Result<Outcome<IngestSummary>> {
        loader::load(&self.store, &self.modules, inputs, file_list, overwrite)
    }

    /// Pre-built ingestion of `<dir>/multiqc_data.json`.
    pub fn add(&self, dir: &Path) -> Result<Outcome<IngestSummary>> {
        loader::add(&self.store, dir)
    }

    /// Stored module outputs plus merged plot data for `module`.
    pub fn combine(&self, module: &str, samples: &SampleFilter) -> Result<MergedReport> {
        let outputs = self.store.read_module_outputs(module)?;
        let plot_data = combine(&self.store, &self.cfg, module, samples)?;
        Ok(MergedReport {
            module: module_key(module),
            outputs,
            plot_data,
        })
    }

    /// Render the report of exactly one module, filtered to `samples`.
    pub fn show<S: AsRef<str>>(
        &self,
        modules: &[S],
        samples: &SampleFilter,
        renderer: &dyn ReportRenderer,
    ) -> Result<Outcome<String>> {
        if modules.len() != 1 {
            return Ok(UserInputError::TooManyModules {
                count: modules.len(),
            }
            .into());
        }
        let module = modules[0].as_ref();
        let report = self.combine(module, samples)?;

        let work = tempfile::Builder::new()
            .prefix("qcstore-show-")
            .tempdir()
            .context("create working directory")?;
        let staged = stage_assets(&report.outputs, work.path());
        debug!("show: {} asset(s) staged", staged);

        let out = renderer.render(&report, work.path())?;
        info!(
            "show: module '{}': {} plot(s) for {} sample(s)",
            report.module,
            report.plot_data.len(),
            samples.len()
        );
        Ok(Outcome::Done(out))
    }

    /// Renderer from configuration: template if template_dir is set, JSON otherwise.
    pub fn default_renderer(&self) -> Box<dyn ReportRenderer> {
        match &self.cfg.template_dir {
            Some(dir) => Box::new(TemplateRenderer::new(dir.clone(), self.cfg.template_file.clone())),
            None => Box::new(JsonRenderer),
        }
    }

    pub fn list_modules(&self) -> Result<Option<Vec<String>>> {
        registry::list_modules(&self.store)
    }

    pub fn list_samples(&self, module: &str) -> Result<Option<Vec<String>>> {
        registry::list_samples(&self.store, module)
    }
}
