use clap::Parser;
use swarm_core::LogLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PredicateName {
    Compression,
    Prime,
    Hash,
    NumericMatch,
    Math,
}

impl PredicateName {
    pub fn as_kind(self) -> swarm_core::PredicateKind {
        match self {
            PredicateName::Compression => swarm_core::PredicateKind::Compression,
            PredicateName::Prime => swarm_core::PredicateKind::Prime,
            PredicateName::Hash => swarm_core::PredicateKind::Hash,
            PredicateName::NumericMatch => swarm_core::PredicateKind::NumericMatch,
            PredicateName::Math => swarm_core::PredicateKind::Math,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "swarm-coordinator", about = "Coordinator for the brute-force swarm engine")]
pub struct Cli {
    /// TCP port to listen on.
    #[arg(long, env = "SWARM_PORT", default_value_t = 7777)]
    pub port: u16,

    /// Inclusive start of the numeric task range. Ignored if `--tasks-file`
    /// is given.
    #[arg(long, default_value_t = 0)]
    pub start: u64,

    /// Exclusive end of the numeric task range. Ignored if `--tasks-file`
    /// is given.
    #[arg(long, default_value_t = 10_000_000)]
    pub end: u64,

    /// Base chunk size, multiplied by each node's reported core count at
    /// handshake.
    #[arg(long, default_value_t = 1000)]
    pub chunk: u32,

    /// Which predicate identity to advertise in DISPATCH_WORK headers.
    #[arg(long, value_enum, default_value = "numeric-match")]
    pub test: PredicateName,

    /// Path to the predicate shared library (informational; nodes load
    /// their own copy by the same path in single-host deployments).
    #[arg(long)]
    pub lib: Option<String>,

    /// Optional newline-delimited literal task list, overriding
    /// `--start`/`--end`.
    #[arg(long)]
    pub tasks_file: Option<String>,

    /// Decimal secret used by the `numeric_match` predicate's config blob
    /// and printed in the final verification line.
    #[arg(long)]
    pub secret: Option<u64>,

    /// Advisory per-node disconnect timeout.
    #[arg(long, default_value_t = 15)]
    pub heartbeat_timeout_secs: u64,

    /// Diagnostic verbosity.
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
