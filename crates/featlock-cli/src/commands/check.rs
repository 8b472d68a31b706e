use super::{colorize_drift, json_pretty, Context, Failure, EXIT_DRIFT, EXIT_MISSING_LOCK, EXIT_SUCCESS};
use chrono::Utc;
use featlock_core::diff_locks;
use featlock_schema::LockArtifact;

pub fn run(ctx: &Context) -> Result<u8, Failure> {
    if !ctx.lock.exists() {
        eprintln!("Missing lock file: {}", ctx.lock.display());
        return Ok(EXIT_MISSING_LOCK);
    }
    let existing = LockArtifact::read_from_file(&ctx.lock).map_err(|e| {
        Failure::new(
            format!("invalid lock file {}: {e}", ctx.lock.display()),
            EXIT_MISSING_LOCK,
        )
    })?;

    let declared = ctx.load_declared()?;
    let fresh = LockArtifact::new(ctx.snapshot(&declared)?, Utc::now());
    let report = diff_locks(&existing, &fresh);

    if ctx.json {
        println!("{}", json_pretty(&report)?);
    } else if report.has_drift {
        println!("Feature updates detected:");
        for entry in &report.entries {
            println!("  - {}", colorize_drift(&entry.to_string()));
        }
        eprintln!("Run: featlock generate");
    } else {
        println!("All devcontainer features match features.lock");
    }

    Ok(if report.has_drift {
        EXIT_DRIFT
    } else {
        EXIT_SUCCESS
    })
}
