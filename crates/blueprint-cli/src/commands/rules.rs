use super::{json_pretty, EXIT_SUCCESS};
use blueprint_core::{default_ignore_paths, load_rules, Engine};

pub fn run(
    engine: &Engine,
    name: Option<&str>,
    revision: Option<&str>,
    check: &[String],
    json: bool,
) -> Result<u8, String> {
    let rules = match name {
        Some(name) => engine.blueprintignore(name, revision),
        None => load_rules(&default_ignore_paths()),
    }
    .map_err(|e| e.to_string())?;

    if check.is_empty() {
        if json {
            let lines: Vec<String> = rules.iter().map(ToString::to_string).collect();
            println!("{}", json_pretty(&lines)?);
        } else {
            print!("{rules}");
        }
        return Ok(EXIT_SUCCESS);
    }

    let verdicts: Vec<(&str, bool)> = check
        .iter()
        .map(|path| (path.as_str(), rules.ignore_file(path)))
        .collect();
    if json {
        let payload: serde_json::Map<String, serde_json::Value> = verdicts
            .iter()
            .map(|(path, ignored)| ((*path).to_owned(), serde_json::Value::Bool(*ignored)))
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else {
        for (path, ignored) in verdicts {
            println!("{} {path}", if ignored { "ignored" } else { "kept   " });
        }
    }
    Ok(EXIT_SUCCESS)
}
