// ABOUTME: Handlers for the lock subcommands: acquire, release, list, check, cleanup

use anyhow::Result;

use super::{absolutize, App, LockCommand, EXIT_CONFLICT, EXIT_ERROR};
use crate::locks::LockError;
use crate::models::lock::short_hash;

pub fn run(app: &App, command: LockCommand) -> Result<u8> {
    let coordinator = app.coordinator();
    match command {
        LockCommand::Acquire {
            path,
            session,
            force,
        } => {
            let path = absolutize(path)?;
            match coordinator.acquire(&path, &session, force) {
                Ok(record) => {
                    println!(
                        "Locked {} for session {}",
                        record.relative_path.display(),
                        record.session
                    );
                    println!("  hash: {}", short_hash(&record.hash));
                    Ok(0)
                }
                Err(LockError::Conflict(holders)) => {
                    eprintln!("CONFLICT: {} is already locked", path.display());
                    for lock in &holders {
                        eprintln!(
                            "  held by {} since {}",
                            lock.session,
                            lock.locked_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                    eprintln!("hint: pass --force to take over the lock");
                    Ok(EXIT_CONFLICT)
                }
                Err(err) => Err(err.into()),
            }
        }

        LockCommand::Release {
            path,
            session,
            no_verify,
        } => {
            let path = absolutize(path)?;
            let outcome = coordinator.release(&path, &session, !no_verify)?;
            println!("Released {}", outcome.file_path.display());
            if outcome.conflict_detected {
                if let Some(warning) = &outcome.warning {
                    eprintln!("WARNING: {warning}");
                }
                eprintln!("hint: run 'worklock lock check' to audit the remaining locks");
                return Ok(EXIT_CONFLICT);
            }
            Ok(0)
        }

        LockCommand::List { session } => {
            let records = coordinator.store().list_all(session.as_ref());
            if records.is_empty() {
                println!("No locks held.");
                return Ok(0);
            }
            for record in &records {
                println!(
                    "{}  {}  {}  {}",
                    record.relative_path.display(),
                    record.session,
                    short_hash(&record.hash),
                    record.locked_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(0)
        }

        LockCommand::Check => {
            let conflicts = coordinator.scan_conflicts();
            if conflicts.is_empty() {
                println!("No conflicts detected.");
                return Ok(0);
            }
            for conflict in &conflicts {
                println!(
                    "{}: {} ({}, held by {})",
                    conflict.kind,
                    conflict.record.relative_path.display(),
                    conflict.message,
                    conflict.record.session
                );
            }
            eprintln!(
                "hint: release diverged locks with 'worklock lock cleanup <session> --force'"
            );
            Ok(EXIT_CONFLICT)
        }

        LockCommand::Cleanup { session, force } => {
            let report = coordinator.cleanup(&session, force)?;
            println!(
                "Released {} lock(s) for session {}",
                report.released.len(),
                report.session_id
            );
            for file in &report.released {
                println!("  {file}");
            }
            if !report.conflicts.is_empty() {
                eprintln!(
                    "WARNING: {} lock(s) left in place with diverged content:",
                    report.conflicts.len()
                );
                for conflict in &report.conflicts {
                    eprintln!(
                        "  {} (was {}, now {})",
                        conflict.file.display(),
                        short_hash(&conflict.original_hash),
                        short_hash(&conflict.current_hash)
                    );
                }
                eprintln!("hint: pass --force to release them anyway");
            }
            if !report.errors.is_empty() {
                for error in &report.errors {
                    eprintln!("ERROR: {}: {}", error.file, error.error);
                }
                return Ok(EXIT_ERROR);
            }
            Ok(0)
        }
    }
}
