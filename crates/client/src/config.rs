//! Session configuration for the local development client.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use client_blockchain_core::Address;
use runtime::WorldCoords;
use runtime::config::read_env;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Signing account of the local player.
    pub player: Address,
    /// Account of the scripted rival that shares the grid.
    pub rival: Address,
    pub spawn: WorldCoords,
    pub grid_upper_bound: u64,
    pub salt_upper_bound: u64,
    /// Artificial proving latency of the stub prover.
    pub prover_delay: Duration,
    pub log_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player: Address::from_low_u64(1),
            rival: Address::from_low_u64(2),
            spawn: WorldCoords::new(5, 5),
            grid_upper_bound: 32,
            salt_upper_bound: 4,
            prover_delay: Duration::from_millis(250),
            log_dir: None,
        }
    }
}

impl SessionConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `PLAYER_ADDRESS` / `RIVAL_ADDRESS` - `0x`-prefixed accounts
    /// - `SPAWN_X`, `SPAWN_Y` - initial location (default: 5, 5)
    /// - `GRID_UPPER_BOUND` - mock chain grid size (default: 32)
    /// - `SALT_UPPER_BOUND` - mock chain salt range (default: 4)
    /// - `STUB_PROVER_DELAY_MS` - stub proving latency (default: 250)
    /// - `LOG_DIR` - also write logs to `<LOG_DIR>/zkgrid.log`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            player: read_env("PLAYER_ADDRESS").unwrap_or(defaults.player),
            rival: read_env("RIVAL_ADDRESS").unwrap_or(defaults.rival),
            spawn: WorldCoords::new(
                read_env("SPAWN_X").unwrap_or(defaults.spawn.x),
                read_env("SPAWN_Y").unwrap_or(defaults.spawn.y),
            ),
            grid_upper_bound: read_env("GRID_UPPER_BOUND").unwrap_or(defaults.grid_upper_bound),
            salt_upper_bound: read_env("SALT_UPPER_BOUND").unwrap_or(defaults.salt_upper_bound),
            prover_delay: read_env("STUB_PROVER_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.prover_delay),
            log_dir: env::var_os("LOG_DIR").map(PathBuf::from),
        }
    }
}
