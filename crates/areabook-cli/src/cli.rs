use std::path::PathBuf;

use areabook_core::{EntityType, ResolutionStrategy};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "areabook")]
#[command(about = "Detect and resolve sync conflicts in AreaBook records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Acting user (defaults to AREABOOK_USER, then "local")
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a record snapshot as the remote copy
    Put {
        #[arg(value_enum)]
        entity_type: EntityKind,
        /// JSON snapshot file (stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Print the remote copy of a record
    Get {
        #[arg(value_enum)]
        entity_type: EntityKind,
        id: String,
    },
    /// Compare a local snapshot against the remote copy
    Check {
        #[arg(value_enum)]
        entity_type: EntityKind,
        /// JSON snapshot file (stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List active conflicts
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve one active conflict
    Resolve {
        /// Conflict ID
        id: String,
        #[arg(value_enum)]
        strategy: StrategyArg,
    },
    /// Resolve every conflict whose type has an automatic strategy
    Sweep {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Entity leases
    Lock {
        #[command(subcommand)]
        command: LockCommands,
    },
    /// Collaborative editing presence
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Show resolved conflict history
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarise resolved conflict history
    Analytics {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum LockCommands {
    /// Take the lease on a record
    Acquire {
        #[arg(value_enum)]
        entity_type: EntityKind,
        id: String,
        /// Lease length in seconds (AREABOOK_LOCK_TTL_SECS when omitted)
        #[arg(long, value_name = "SECS")]
        ttl_secs: Option<u64>,
    },
    /// Drop the lease on a record
    Release {
        #[arg(value_enum)]
        entity_type: EntityKind,
        id: String,
    },
    /// Show who holds the lease on a record
    Status {
        #[arg(value_enum)]
        entity_type: EntityKind,
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Announce that the acting user is editing a record
    Join {
        #[arg(value_enum)]
        entity_type: EntityKind,
        id: String,
    },
    /// Stop editing a record
    Leave {
        #[arg(value_enum)]
        entity_type: EntityKind,
        id: String,
    },
    /// Show who is editing a record
    Show {
        #[arg(value_enum)]
        entity_type: EntityKind,
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EntityKind {
    Goal,
    Task,
    Event,
    Metric,
    Note,
    Group,
}

impl From<EntityKind> for EntityType {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Goal => Self::Goal,
            EntityKind::Task => Self::Task,
            EntityKind::Event => Self::Event,
            EntityKind::Metric => Self::Metric,
            EntityKind::Note => Self::Note,
            EntityKind::Group => Self::Group,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    KeepLocal,
    KeepRemote,
    Merge,
    Manual,
}

impl From<StrategyArg> for ResolutionStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::KeepLocal => Self::KeepLocal,
            StrategyArg::KeepRemote => Self::KeepRemote,
            StrategyArg::Merge => Self::Merge,
            StrategyArg::Manual => Self::Manual,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
