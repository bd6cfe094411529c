//! Runtime configuration structures and loaders.
use std::env;
use std::path::PathBuf;

/// Knobs shared by the game worker, the proof queue, and the miner.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    pub proof_queue_capacity: usize,
    /// Block hashes a location may be committed against (`latest - n + 1 ..= latest`).
    pub snark_hash_window: u64,
    /// Writes are refused locally below this balance.
    pub min_balance_wei: u128,
    /// Directory holding `<circuit>.wasm` / `<circuit>.zkey`.
    pub artifacts_dir: PathBuf,
    pub miner: MinerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 100,
            command_buffer_size: 32,
            proof_queue_capacity: 16,
            snark_hash_window: 32,
            min_balance_wei: 2_000_000_000_000_000,
            artifacts_dir: PathBuf::from("snarks"),
            miner: MinerConfig::default(),
        }
    }
}

/// Mining search parameters.
///
/// The spiral walk covers `search_steps` offsets around the start position.
/// Every visited cell costs `hash_window * salt_upper_bound` commitment
/// evaluations, so the walk is kept to a neighbourhood rather than the
/// whole grid.
#[derive(Clone, Debug)]
pub struct MinerConfig {
    /// Spiral steps per run; `None` walks `gridUpperBound` steps.
    pub search_steps: Option<u64>,
    /// Recent block hashes tried as commitment randomness.
    pub hash_window: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            search_steps: None,
            hash_window: 64,
        }
    }
}

impl MinerConfig {
    pub fn steps_for(&self, grid_upper_bound: u64) -> u64 {
        self.search_steps.unwrap_or(grid_upper_bound)
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `EVENT_BUFFER_SIZE` - Per-topic notification buffer (default: 100)
    /// - `COMMAND_BUFFER_SIZE` - Game worker command queue (default: 32)
    /// - `PROOF_QUEUE_CAPACITY` - Pending proof requests (default: 16)
    /// - `SNARK_HASH_WINDOW` - Blocks bound into each location proof (default: 32)
    /// - `MINING_HASH_WINDOW` - Blocks tried by the miner (default: 64)
    /// - `MINING_SEARCH_STEPS` - Spiral steps per mining run (default: grid size)
    /// - `MIN_BALANCE_WEI` - Local balance gate for writes (default: 2e15)
    /// - `SNARK_ARTIFACTS_DIR` - Circuit artifacts directory (default: `snarks`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(size) = parse_var::<usize>(lookup("EVENT_BUFFER_SIZE")) {
            config.event_buffer_size = size.max(1);
        }
        if let Some(size) = parse_var::<usize>(lookup("COMMAND_BUFFER_SIZE")) {
            config.command_buffer_size = size.max(1);
        }
        if let Some(capacity) = parse_var::<usize>(lookup("PROOF_QUEUE_CAPACITY")) {
            config.proof_queue_capacity = capacity.max(1);
        }
        if let Some(window) = parse_var::<u64>(lookup("SNARK_HASH_WINDOW")) {
            config.snark_hash_window = window.max(1);
        }
        if let Some(window) = parse_var::<u64>(lookup("MINING_HASH_WINDOW")) {
            config.miner.hash_window = window.max(1);
        }
        config.miner.search_steps = parse_var::<u64>(lookup("MINING_SEARCH_STEPS"));
        if let Some(balance) = parse_var::<u128>(lookup("MIN_BALANCE_WEI")) {
            config.min_balance_wei = balance;
        }
        if let Some(dir) = lookup("SNARK_ARTIFACTS_DIR") {
            config.artifacts_dir = PathBuf::from(dir);
        }

        config
    }
}

/// Reads and parses one environment variable; unset or malformed is `None`.
pub fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    parse_var(env::var(key).ok())
}

fn parse_var<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = RuntimeConfig::from_lookup(|_| None);
        assert_eq!(config.snark_hash_window, 32);
        assert_eq!(config.miner.hash_window, 64);
        assert_eq!(config.min_balance_wei, 2_000_000_000_000_000);
        assert_eq!(config.miner.steps_for(40), 40);
    }

    #[test]
    fn reads_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("MINING_SEARCH_STEPS", "9"),
            ("MIN_BALANCE_WEI", "5"),
            ("SNARK_ARTIFACTS_DIR", "/opt/snarks"),
            ("COMMAND_BUFFER_SIZE", "0"),
        ]));
        assert_eq!(config.miner.steps_for(40), 9);
        assert_eq!(config.min_balance_wei, 5);
        assert_eq!(config.artifacts_dir, PathBuf::from("/opt/snarks"));
        assert_eq!(config.command_buffer_size, 1);
    }

    #[test]
    fn parse_var_trims_and_rejects_garbage() {
        assert_eq!(parse_var::<u64>(Some(" 42 ".to_string())), Some(42));
        assert_eq!(parse_var::<u64>(Some("4x2".to_string())), None);
        assert_eq!(parse_var::<u64>(None), None);
        assert_eq!(read_env::<u64>("ZKGRID_CONFIG_TEST_SURELY_UNSET"), None);
    }

    #[test]
    fn ignores_garbage() {
        let config = RuntimeConfig::from_lookup(lookup(&[("SNARK_HASH_WINDOW", "lots")]));
        assert_eq!(config.snark_hash_window, 32);
    }
}
