use super::{json_pretty, EXIT_STORE_ERROR, EXIT_SUCCESS};
use blueprint_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = engine.verify_store().map_err(|e| e.to_string())?;

    if json {
        let failures: Vec<_> = report
            .failed
            .iter()
            .map(|f| serde_json::json!({ "hash": f.hash, "reason": f.reason }))
            .collect();
        let payload = serde_json::json!({
            "checked": report.checked,
            "passed": report.passed,
            "heads_checked": report.heads_checked,
            "heads_passed": report.heads_passed,
            "failed": failures,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "store integrity: {}/{} objects passed, {}/{} blueprints passed",
            report.passed, report.checked, report.heads_passed, report.heads_checked
        );
        for f in &report.failed {
            println!("  FAIL {}: {}", f.hash, f.reason);
        }
    }

    if report.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_STORE_ERROR)
    }
}
