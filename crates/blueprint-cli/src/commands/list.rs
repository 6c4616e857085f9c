use super::{colorize_name, json_pretty, EXIT_SUCCESS};
use blueprint_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let names = engine.list().map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&names)?);
    } else {
        for name in &names {
            println!("{}", colorize_name(name));
        }
    }
    Ok(EXIT_SUCCESS)
}
