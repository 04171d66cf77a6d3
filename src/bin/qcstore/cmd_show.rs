use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use QcStore::outcome::Outcome;
use QcStore::sample::SampleFilter;
use QcStore::session::Session;

pub fn exec(session: &Session, module: String, samples: String, out: Option<PathBuf>) -> Result<()> {
    let modules: Vec<&str> = module
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .collect();
    let filter = SampleFilter::from_csv(&samples);
    let renderer = session.default_renderer();

    let outcome = session.show(modules.as_slice(), &filter, renderer.as_ref())?;
    if crate::report_rejected(&outcome) {
        return Ok(());
    }
    if let Outcome::Done(text) = outcome {
        match out {
            Some(path) => {
                fs::write(&path, text.as_bytes())
                    .with_context(|| format!("write {}", path.display()))?;
                println!("Report written to {} ({} B)", path.display(), text.len());
            }
            None => println!("{}", text),
        }
    }
    Ok(())
}
