// ABOUTME: Handlers for the session subcommands: start, end, active, list, wi, req

use anyhow::Result;

use super::{App, SessionCommand};

pub fn run(app: &App, command: SessionCommand) -> Result<u8> {
    let lifecycle = app.lifecycle();
    match command {
        SessionCommand::Start { req } => {
            let record = lifecycle.start(req.as_deref())?;
            println!("Started session {}", record.session_id);
            println!("  branch: {}", record.branch);
            if let Some(req) = record.req_ids.first() {
                println!("  req: {req}");
            }
            Ok(0)
        }

        SessionCommand::End {
            session,
            auto_merge,
            skip_lock_cleanup,
        } => {
            let report = lifecycle.end(&session, auto_merge, skip_lock_cleanup)?;
            println!(
                "Ended session {} ({})",
                report.record.session_id, report.record.status
            );
            if let Some(cleanup) = &report.cleanup {
                println!("  locks released: {}", cleanup.released.len());
                if !cleanup.conflicts.is_empty() {
                    eprintln!(
                        "WARNING: {} lock(s) left in place with diverged content",
                        cleanup.conflicts.len()
                    );
                    eprintln!(
                        "hint: run 'worklock lock cleanup {} --force' to release them",
                        report.record.session_id
                    );
                }
            }
            if report.merged {
                println!("  merged branch {}", report.record.branch);
            } else if let Some(err) = &report.merge_error {
                eprintln!("WARNING: auto-merge failed: {err}");
                eprintln!("hint: merge branch {} manually", report.record.branch);
            }
            if let Some(warning) = &report.branch_warning {
                eprintln!("WARNING: {warning}");
            }
            Ok(0)
        }

        SessionCommand::Active => {
            match lifecycle.active() {
                Some(record) => {
                    println!("{}", record.session_id);
                    println!("  branch: {}", record.branch);
                    println!(
                        "  started: {}",
                        record.started_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
                None => println!("No active session on the current branch."),
            }
            Ok(0)
        }

        SessionCommand::List { status } => {
            let records = lifecycle.registry().list(status);
            if records.is_empty() {
                println!("No sessions recorded.");
                return Ok(0);
            }
            for record in &records {
                println!(
                    "{} {}  branch {}  started {}",
                    record.status.indicator(),
                    record.session_id,
                    record.branch,
                    record.started_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(0)
        }

        SessionCommand::Wi { session, counter } => {
            let wi_id = lifecycle.generate_wi_id(&session, counter)?;
            println!("{wi_id}");
            Ok(0)
        }

        SessionCommand::Req { session, req_id } => {
            let record = lifecycle.add_requirement(&session, &req_id)?;
            println!(
                "Linked {} to session {} ({} requirement(s))",
                req_id,
                record.session_id,
                record.req_ids.len()
            );
            Ok(0)
        }
    }
}
