use super::{json_pretty, lock_store, EXIT_SUCCESS};
use blueprint_core::Engine;

pub fn run(engine: &Engine, name: &str, json: bool) -> Result<u8, String> {
    let _lock = lock_store(engine)?;
    engine.destroy(name).map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&serde_json::json!({ "destroyed": name }))?);
    } else {
        println!("destroyed {name}");
    }
    Ok(EXIT_SUCCESS)
}
