use super::{json_pretty, lock_store, EXIT_SUCCESS};
use blueprint_core::Engine;

pub fn run(engine: &Engine, dry_run: bool, json: bool) -> Result<u8, String> {
    let lock = lock_store(engine)?;
    let report = engine.gc(&lock, dry_run).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "dry_run": dry_run,
            "live_revisions": report.live_revisions,
            "orphaned_objects": report.orphaned_objects,
            "removed_objects": report.removed_objects,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let (prefix, count) = if dry_run {
            ("would remove", report.orphaned_objects.len())
        } else {
            ("removed", report.removed_objects)
        };
        println!(
            "gc: {prefix} {count} objects ({} live revisions)",
            report.live_revisions
        );
    }
    Ok(EXIT_SUCCESS)
}
