//! render: hand a merged report to a renderer.
//!
//! Рендер выполняется в рабочем каталоге сессии (TempDir): туда best-effort копируются
//! css/js ассеты output-записей и файлы шаблона; шаблоны и include_file читаются оттуда же.
//!
//! TemplateRenderer: minijinja, autoescape выключен. Контекст шаблона:
//!   {{ module_name }}               : ключ модуля
//!   {{ modules_output }}            : JSON-массив output-записей (строка)
//!   {{ plot_data }}                 : JSON объединённых plot data (строка)
//!   {{ outputs }}                   : output-записи как значения (для циклов)
//!   {{ include_file("rel/path") }}  : содержимое файла из рабочего каталога
//! `{% include %}` / `{% extends %}` резолвятся относительно рабочего каталога.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, warn};
use minijinja::{context, path_loader, AutoEscape, Environment};
use serde_json::{json, Value};
use walkdir::WalkDir;

use crate::combine::MergedReport;
use crate::store::ModuleOutput;

pub trait ReportRenderer {
    fn render(&self, report: &MergedReport, work_dir: &Path) -> Result<String>;
}

/// JSON document of a merged report: module, modules_output, plot_data.
pub fn report_json(report: &MergedReport) -> Result<Value> {
    Ok(json!({
        "module": report.module,
        "modules_output": serde_json::to_value(&report.outputs).context("encode module outputs")?,
        "plot_data": Value::Object(report.plot_data.clone()),
    }))
}

/// Pretty JSON of the merged report.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn render(&self, report: &MergedReport, _work_dir: &Path) -> Result<String> {
        let v = report_json(report)?;
        serde_json::to_string_pretty(&v).context("serialize report")
    }
}

/// Jinja template rendered from a staged copy of `template_dir`.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template_dir: PathBuf,
    base_file: String,
}

impl TemplateRenderer {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(template_dir: P, base_file: S) -> Self {
        Self {
            template_dir: template_dir.into(),
            base_file: base_file.into(),
        }
    }

    fn environment(work_dir: &Path) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_loader(path_loader(work_dir));
        env.set_auto_escape_callback(|_| AutoEscape::None);
        let root = work_dir.to_path_buf();
        env.add_function("include_file", move |rel: String| -> String {
            include_file(&root, &rel)
        });
        env
    }
}

impl ReportRenderer for TemplateRenderer {
    fn render(&self, report: &MergedReport, work_dir: &Path) -> Result<String> {
        if !self.template_dir.is_dir() {
            return Err(anyhow!(
                "could not load template: directory {} not found",
                self.template_dir.display()
            ));
        }
        copy_tree(&self.template_dir, work_dir)?;

        let env = Self::environment(work_dir);
        let template = env.get_template(&self.base_file).map_err(|e| {
            anyhow!(
                "could not load template file \"{}\" from {}: {}",
                self.base_file,
                self.template_dir.display(),
                e
            )
        })?;

        let modules_output =
            serde_json::to_string(&report.outputs).context("encode module outputs")?;
        let plot_data = serde_json::to_string(&report.plot_data).context("encode plot data")?;

        template
            .render(context! {
                module_name => report.module,
                modules_output => modules_output,
                plot_data => plot_data,
                outputs => report.outputs,
            })
            .map_err(|e| anyhow!("render template \"{}\": {}", self.base_file, e))
    }
}

fn include_file(dir: &Path, rel: &str) -> String {
    let p = dir.join(rel.trim());
    match fs::read_to_string(&p) {
        Ok(s) => s,
        Err(e) => {
            error!("Could not include file \"{}\": {}", rel, e);
            String::new()
        }
    }
}

/// Copy css/js assets of the outputs into `work_dir` (best-effort). Returns copied count.
pub fn stage_assets(outputs: &[ModuleOutput], work_dir: &Path) -> usize {
    let mut copied = 0;
    for o in outputs {
        for assets in [&o.css, &o.js].into_iter().flatten() {
            for (to, from) in assets {
                let dest = work_dir.join(to);
                let res = dest
                    .parent()
                    .map(fs::create_dir_all)
                    .unwrap_or(Ok(()))
                    .and_then(|_| fs::copy(from, &dest));
                match res {
                    Ok(_) => copied += 1,
                    Err(e) => debug!("asset {} -> {} skipped: {}", from, to, e),
                }
            }
        }
    }
    copied
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("create {}", dst.display()))?;
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("template walk {}: {}", src.display(), e);
                continue;
            }
        };
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("strip prefix {}", src.display()))?;
        let to = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to).with_context(|| format!("create {}", to.display()))?;
        } else {
            fs::copy(entry.path(), &to).with_context(|| {
                format!("copy {} -> {}", entry.path().display(), to.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_file_reads_relative_and_swallows_missing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("parts"))?;
        fs::write(dir.path().join("parts/a.txt"), "A")?;

        let env = TemplateRenderer::environment(dir.path());
        let out = env
            .render_str(
                r#"{{ include_file("parts/a.txt") }}|{{ include_file("nope.txt") }}|<{{ x }}>"#,
                context! { x => "<b>" },
            )
            .map_err(|e| anyhow!("{}", e))?;
        assert_eq!(out, "A||<<b>>");
        Ok(())
    }
}
