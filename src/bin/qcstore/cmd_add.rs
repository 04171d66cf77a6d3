use anyhow::Result;
use std::path::PathBuf;

use QcStore::outcome::Outcome;
use QcStore::session::Session;

pub fn exec(session: &Session, dir: PathBuf) -> Result<()> {
    let outcome = session.add(&dir)?;
    if crate::report_rejected(&outcome) {
        return Ok(());
    }
    if let Outcome::Done(summary) = outcome {
        println!(
            "Data from {} loaded and saved in {} ({} module(s))",
            dir.display(),
            session.store().root().display(),
            summary.modules.len()
        );
        for (m, p) in summary.modules.iter().zip(&summary.plot_snapshots) {
            println!("  {:<16} -> {}", m, p.display());
        }
    }
    Ok(())
}
