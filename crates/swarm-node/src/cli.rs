use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use clap::Parser;
use swarm_core::LogLevel;

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Parses the node's `--config` value: a filesystem path, if one exists at
/// that literal string, otherwise a hex-encoded byte string (an optional
/// `0x` prefix is accepted). Mirrors the teacher's custom value-parser
/// style for CLI fields that accept more than one literal shape.
fn parse_config_blob(raw: &str) -> Result<Vec<u8>, String> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    if Path::new(raw).is_file() {
        return fs::read(raw).map_err(|e| format!("failed to read config file {raw}: {e}"));
    }
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    decode_hex(hex).ok_or_else(|| format!("config value is neither an existing file nor valid hex: {raw}"))
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[derive(Parser, Debug)]
#[command(name = "swarm-node", about = "Compute node for the brute-force swarm engine")]
pub struct Cli {
    /// Coordinator address to connect to.
    #[arg(long, env = "SWARM_QUEEN", default_value = "127.0.0.1")]
    pub queen: String,

    /// Coordinator port.
    #[arg(long, env = "SWARM_PORT", default_value_t = 7777)]
    pub port: u16,

    /// Worker thread count. Defaults to the detected core count.
    #[arg(long, default_value_t = default_threads())]
    pub threads: usize,

    /// Path to the predicate shared library implementing the Predicate ABI.
    #[arg(long)]
    pub lib: String,

    /// Opaque configuration blob for the predicate: a path to a file, or a
    /// hex-encoded byte string. Defaults to an empty blob.
    #[arg(long, default_value = "", value_parser = parse_config_blob)]
    pub config: Vec<u8>,

    /// Seconds between HEARTBEAT messages.
    #[arg(long, default_value_t = 5)]
    pub heartbeat_interval_secs: u64,

    /// Diagnostic verbosity.
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hex_with_and_without_prefix() {
        assert_eq!(parse_config_blob("0x01ff").unwrap(), vec![0x01, 0xff]);
        assert_eq!(parse_config_blob("01ff").unwrap(), vec![0x01, 0xff]);
    }

    #[test]
    fn empty_config_is_empty_blob() {
        assert_eq!(parse_config_blob("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn odd_length_hex_is_rejected() {
        assert!(parse_config_blob("abc").is_err());
    }
}
