// ABOUTME: Command-line surface: clap definitions, context wiring, and dispatch

mod lock;
mod session;

use std::env;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::git::{GitRepository, GitVersionOracle};
use crate::locks::{LockCoordinator, LockStore};
use crate::models::{SessionId, SessionStatus};
use crate::session::{SessionLifecycle, SessionRegistry};

/// Exit code for operational errors.
pub const EXIT_ERROR: u8 = 1;
/// Exit code for detected conflicts, so automation can branch on outcome
/// without parsing text.
pub const EXIT_CONFLICT: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "worklock",
    version,
    about = "Session-scoped advisory file locking for agents working in parallel branches"
)]
pub struct Cli {
    /// Project root (defaults to git discovery from the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Acquire, release, and inspect file locks
    #[command(subcommand)]
    Lock(LockCommand),
    /// Start, end, and inspect work sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Debug, Subcommand)]
pub enum LockCommand {
    /// Lock a file for a session
    Acquire {
        path: PathBuf,
        session: SessionId,
        /// Steal any existing lock held by another session
        #[arg(long)]
        force: bool,
    },
    /// Release a session's lock on a file
    Release {
        path: PathBuf,
        session: SessionId,
        /// Skip the content-divergence check
        #[arg(long)]
        no_verify: bool,
    },
    /// List held locks, optionally for one session
    List { session: Option<SessionId> },
    /// Scan all locks for divergence and deleted targets
    Check,
    /// Release all of a session's locks
    Cleanup {
        session: SessionId,
        /// Release locks even when the locked content diverged
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Start a new session on a fresh branch
    Start {
        /// Requirement id to link to the new session
        #[arg(long, value_name = "ID")]
        req: Option<String>,
    },
    /// End a session: release its locks and close its record
    End {
        session: SessionId,
        /// Merge the session branch back into the originating branch
        #[arg(long)]
        auto_merge: bool,
        /// Leave the session's locks in place
        #[arg(long)]
        skip_lock_cleanup: bool,
    },
    /// Show the session owning the current branch
    Active,
    /// List sessions, newest first
    List {
        #[arg(long, value_name = "STATUS")]
        status: Option<SessionStatus>,
    },
    /// Generate a work-item id for a session
    Wi {
        session: SessionId,
        /// Format with this counter instead of bumping the session's
        #[arg(long, value_name = "N")]
        counter: Option<u32>,
    },
    /// Link a requirement id to a session
    Req { session: SessionId, req_id: String },
}

/// Wiring shared by every command: project root, configuration, and the
/// component constructors.
pub struct App {
    root: PathBuf,
    config: Config,
    repo: GitRepository,
}

impl App {
    pub fn new(project_root: Option<PathBuf>) -> Result<Self> {
        let repo = match project_root {
            Some(dir) => GitRepository::at(&dir)
                .with_context(|| format!("{} is not a git working tree", dir.display()))?,
            None => {
                let cwd = env::current_dir().context("cannot determine current directory")?;
                GitRepository::discover(&cwd)
                    .context("not inside a git repository (or pass --project-root)")?
            }
        };
        let root = repo.root().to_path_buf();
        let config = Config::load(&root)?;
        Ok(Self { root, config, repo })
    }

    fn coordinator(&self) -> LockCoordinator<GitVersionOracle> {
        let store = LockStore::new(self.config.locks_dir(&self.root), self.root.clone());
        LockCoordinator::new(store, GitVersionOracle::new(&self.root))
    }

    fn lifecycle(&self) -> SessionLifecycle<GitVersionOracle> {
        SessionLifecycle::new(
            SessionRegistry::new(self.config.sessions_dir(&self.root)),
            self.coordinator(),
            self.repo.clone(),
            self.config.branch_prefix.clone(),
            self.config.base_branch.clone(),
        )
    }
}

/// Dispatches a parsed invocation and returns the process exit code.
pub fn run(cli: Cli) -> Result<u8> {
    let app = App::new(cli.project_root)?;
    match cli.command {
        Command::Lock(command) => lock::run(&app, command),
        Command::Session(command) => session::run(&app, command),
    }
}

/// Makes a user-supplied path absolute against the current directory
/// without requiring it to exist.
fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()
            .context("cannot determine current directory")?
            .join(path))
    }
}
