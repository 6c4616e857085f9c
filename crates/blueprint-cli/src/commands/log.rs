use super::{colorize_revision, json_pretty, EXIT_SUCCESS};
use blueprint_core::Engine;
use serde::Serialize;

#[derive(Serialize)]
struct Entry<'a> {
    revision: &'a str,
    parent: Option<&'a str>,
    message: &'a str,
    created_at: &'a str,
    files: Vec<&'a str>,
}

pub fn run(engine: &Engine, name: &str, json: bool) -> Result<u8, String> {
    let history = engine.log(name).map_err(|e| e.to_string())?;
    if json {
        let entries: Vec<Entry<'_>> = history
            .iter()
            .map(|(id, revision)| Entry {
                revision: id.as_str(),
                parent: revision.parent.as_deref(),
                message: &revision.message,
                created_at: &revision.created_at,
                files: revision.tree.keys().map(String::as_str).collect(),
            })
            .collect();
        println!("{}", json_pretty(&entries)?);
    } else {
        for (id, revision) in &history {
            println!(
                "{} {} {}",
                colorize_revision(id.short()),
                revision.created_at,
                revision.message
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
