use super::{json_pretty, Context, Failure, EXIT_SUCCESS};
use chrono::Utc;
use featlock_core::needs_regeneration;
use featlock_schema::LockArtifact;
use tracing::warn;

pub fn run(ctx: &Context) -> Result<u8, Failure> {
    let declared = ctx.load_declared()?;
    let fresh = LockArtifact::new(ctx.snapshot(&declared)?, Utc::now());

    let existing = if ctx.lock.exists() {
        match LockArtifact::read_from_file(&ctx.lock) {
            Ok(lock) => Some(lock),
            Err(e) => {
                warn!("replacing unreadable lock {}: {e}", ctx.lock.display());
                None
            }
        }
    } else {
        None
    };

    let status = if needs_regeneration(existing.as_ref(), &fresh) {
        fresh
            .write_to_file(&ctx.lock)
            .map_err(|e| format!("failed to write {}: {e}", ctx.lock.display()))?;
        "written"
    } else {
        "up-to-date"
    };

    if ctx.json {
        let payload = serde_json::json!({
            "status": status,
            "path": ctx.lock.display().to_string(),
        });
        println!("{}", json_pretty(&payload)?);
    } else if status == "written" {
        println!("Wrote {}", ctx.lock.display());
    } else {
        println!("features.lock is up-to-date at {}", ctx.lock.display());
    }
    Ok(EXIT_SUCCESS)
}
