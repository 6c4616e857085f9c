use super::{colorize_revision, json_pretty, lock_store, EXIT_SUCCESS};
use blueprint_core::Engine;
use blueprint_schema::RevisionId;

pub fn run(
    engine: &Engine,
    minuend: &str,
    subtrahend: &str,
    target: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let Some(target) = target else {
        let mut difference = engine
            .subtract(minuend, subtrahend)
            .map_err(|e| e.to_string())?;
        println!("{}", difference.dumps().map_err(|e| e.to_string())?);
        return Ok(EXIT_SUCCESS);
    };

    let _lock = lock_store(engine)?;
    let result = engine
        .diff(minuend, subtrahend, target)
        .map_err(|e| e.to_string())?;
    let revision = result.revision().map_or("", RevisionId::as_str);

    if json {
        let payload = serde_json::json!({
            "name": target,
            "revision": revision,
            "empty": result.is_empty(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let short = result.revision().map_or("", RevisionId::short);
        println!(
            "committed {target} = {minuend} - {subtrahend} {}",
            colorize_revision(short)
        );
    }
    Ok(EXIT_SUCCESS)
}
