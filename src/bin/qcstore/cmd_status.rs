use anyhow::Result;
use serde_json::json;

use QcStore::metrics;
use QcStore::session::Session;

pub fn exec(session: &Session, json: bool) -> Result<()> {
    let store = session.store();
    let mut modules = Vec::new();
    for m in store.list_module_dirs()? {
        let snaps = store.list_plot_data(&m)?.len();
        let outputs = store.read_module_outputs(&m)?.len();
        modules.push((m, snaps, outputs));
    }
    let data_sources = store.list_data_sources()?.len();
    let ms = metrics::snapshot();

    if json {
        let v = json!({
            "root": store.root().display().to_string(),
            "config": session.config().to_string(),
            "registered_modules": session.modules().names(),
            "modules": modules
                .iter()
                .map(|(m, s, o)| json!({"module": m, "plot_snapshots": s, "module_outputs": o}))
                .collect::<Vec<_>>(),
            "data_source_snapshots": data_sources,
            "metrics": {
                "snapshots_written": ms.snapshots_written,
                "snapshot_bytes_written": ms.snapshot_bytes_written,
                "snapshots_read": ms.snapshots_read,
                "module_outputs_written": ms.module_outputs_written,
                "resets": ms.resets,
                "plots_merged": ms.plots_merged,
                "samples_admitted": ms.samples_admitted,
                "samples_rejected": ms.samples_rejected,
                "heatmap_rows_remapped": ms.heatmap_rows_remapped,
            }
        });
        println!("{}", serde_json::to_string(&v)?);
        return Ok(());
    }

    println!("Store {}", store.root().display());
    println!("  {}", session.config());
    println!("  registered modules = {}", session.modules().names().join(", "));
    println!("  data_sources       = {} snapshot(s)", data_sources);
    for (m, snaps, outputs) in &modules {
        println!("  {:<20} plot_data={} module_output={}", m, snaps, outputs);
    }

    println!("Metrics snapshot:");
    println!("  snapshots_written      = {}", ms.snapshots_written);
    println!("  snapshot_bytes_written = {}", ms.snapshot_bytes_written);
    println!("  snapshots_read         = {}", ms.snapshots_read);
    println!("  module_outputs_written = {}", ms.module_outputs_written);
    println!("  resets                 = {}", ms.resets);
    println!("  plots_merged           = {}", ms.plots_merged);
    println!(
        "  samples admitted/rej   = {}/{} (ratio {:.2})",
        ms.samples_admitted,
        ms.samples_rejected,
        ms.admit_ratio()
    );
    println!("  heatmap_rows_remapped  = {}", ms.heatmap_rows_remapped);
    Ok(())
}
