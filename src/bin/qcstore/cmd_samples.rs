use anyhow::Result;

use QcStore::session::Session;

pub fn exec(session: &Session, module: String, json: bool) -> Result<()> {
    match session.list_samples(&module)? {
        Some(samples) if json => println!("{}", serde_json::to_string(&samples)?),
        Some(samples) => {
            for s in samples {
                println!("{}", s);
            }
        }
        None => println!("No samples for a given module found or wrong module specified."),
    }
    Ok(())
}
