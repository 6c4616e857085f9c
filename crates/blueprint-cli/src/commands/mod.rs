pub mod commit;
pub mod completions;
pub mod destroy;
pub mod diff;
pub mod gc;
pub mod list;
pub mod log;
pub mod rules;
pub mod show;
pub mod verify_store;

use blueprint_core::{Engine, StoreLock};
use console::Style;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_BLUEPRINT_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn lock_store(engine: &Engine) -> Result<StoreLock, String> {
    StoreLock::acquire(&engine.store_layout().lock_file()).map_err(|e| format!("store lock: {e}"))
}

pub fn colorize_revision(short: &str) -> String {
    Style::new().yellow().apply_to(short).to_string()
}

pub fn colorize_name(name: &str) -> String {
    Style::new().bold().apply_to(name).to_string()
}
