use anyhow::Result;
use std::path::PathBuf;

use QcStore::outcome::Outcome;
use QcStore::session::Session;

pub fn exec(session: &Session, input: Vec<PathBuf>, file_list: bool, overwrite: bool) -> Result<()> {
    let outcome = session.load(&input, file_list, overwrite)?;
    if crate::report_rejected(&outcome) {
        return Ok(());
    }
    if let Outcome::Done(summary) = outcome {
        if summary.modules.is_empty() {
            println!("No module produced data for the given input.");
            return Ok(());
        }
        println!(
            "Data loaded and saved in {} (modules: {})",
            session.store().root().display(),
            summary.modules.join(", ")
        );
        for p in &summary.plot_snapshots {
            println!("  plot data   -> {}", p.display());
        }
        if let Some(p) = &summary.data_source_snapshot {
            println!("  data source -> {}", p.display());
        }
    }
    Ok(())
}
