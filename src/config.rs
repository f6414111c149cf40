/// Engine configuration from environment variables
///
/// Controls the Bitcoin network, confirmation re-evaluation window, and
/// address-chain limits. Defaults are safe for testnet-family networks.
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Bitcoin network type (for address derivation)
    pub network: bitcoin::Network,
    /// How far below the tip records are re-evaluated on a height change
    pub confirm_scan_depth: u64,
    /// Lookahead beyond the highest issued index when computing the
    /// watched address set
    pub address_gap_limit: u32,
    /// Receive addresses pre-derived when a wallet is first opened
    pub initial_address_pool: u32,
    /// How long a watch registration may block before failing
    pub watch_timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `BITCOIN_NETWORK`: "signet" (default), "regtest", "testnet", or "bitcoin"
    /// - `CONFIRM_SCAN_DEPTH`: blocks below tip re-checked on height change (default 6)
    /// - `ADDRESS_GAP_LIMIT`: watch-set lookahead (default 20)
    /// - `INITIAL_ADDRESS_POOL`: receive addresses derived at first open (default 10)
    /// - `WATCH_TIMEOUT_SECS`: watcher registration timeout (default 30)
    pub fn from_env() -> Self {
        let network_str = env::var("BITCOIN_NETWORK")
            .unwrap_or_else(|_| "signet".to_string())
            .to_lowercase();

        let network = match network_str.as_str() {
            "bitcoin" | "mainnet" => bitcoin::Network::Bitcoin,
            "testnet" => bitcoin::Network::Testnet,
            "regtest" => bitcoin::Network::Regtest,
            "signet" | "" => bitcoin::Network::Signet,
            other => {
                log::warn!("Unknown BITCOIN_NETWORK '{}', falling back to signet", other);
                bitcoin::Network::Signet
            }
        };

        Self {
            network,
            confirm_scan_depth: env_u64("CONFIRM_SCAN_DEPTH", 6),
            address_gap_limit: env_u32("ADDRESS_GAP_LIMIT", 20),
            initial_address_pool: env_u32("INITIAL_ADDRESS_POOL", 10),
            watch_timeout: Duration::from_secs(env_u64("WATCH_TIMEOUT_SECS", 30)),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: bitcoin::Network::Signet,
            confirm_scan_depth: 6,
            address_gap_limit: 20,
            initial_address_pool: 10,
            watch_timeout: Duration::from_secs(30),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            log::warn!("Invalid {} '{}', using default {}", key, v, default);
            default
        }),
        Err(_) => default,
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            log::warn!("Invalid {} '{}', using default {}", key, v, default);
            default
        }),
        Err(_) => default,
    }
}
