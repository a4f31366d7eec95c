//! Kinds command

use anyhow::Result;
use passive_core::standard_event_kinds;

pub fn run() -> Result<()> {
    for (kind, transformer) in standard_event_kinds() {
        let marker = if transformer.is_noop() {
            "-".to_string()
        } else {
            format!("enriched ({})", transformer.name())
        };
        println!("  {:<18} {}", kind, marker);
    }
    Ok(())
}
