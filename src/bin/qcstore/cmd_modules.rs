use anyhow::Result;

use QcStore::session::Session;

pub fn exec(session: &Session, json: bool) -> Result<()> {
    match session.list_modules()? {
        Some(modules) if json => println!("{}", serde_json::to_string(&modules)?),
        Some(modules) => {
            for m in modules {
                println!("{}", m);
            }
        }
        None => println!("No modules found."),
    }
    Ok(())
}
