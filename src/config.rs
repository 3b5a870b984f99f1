use std::env;

use crate::blockchain::MINE_RATE;
use crate::error::ConfigError;
use crate::wallet::Wallet;

/// Runtime settings of one node, read from the environment (`.env` is
/// loaded first by the binary).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub node_name: String,
    /// Retarget threshold for this node's miner, in milliseconds.
    pub mine_rate_ms: i64,
    pub wallet_private_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = match lookup("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: v,
            })?,
            None => 3000,
        };
        let mine_rate_ms = match lookup("MINE_RATE_MS") {
            Some(v) => match v.parse::<i64>() {
                Ok(ms) if ms >= 0 => ms,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "MINE_RATE_MS",
                        value: v,
                    });
                }
            },
            None => MINE_RATE,
        };
        let node_name = lookup("NODE_NAME").unwrap_or_else(|| format!("node-{port}"));
        let wallet_private_key = lookup("WALLET_PRIVATE_KEY").filter(|k| !k.trim().is_empty());

        Ok(Self {
            host,
            port,
            node_name,
            mine_rate_ms,
            wallet_private_key,
        })
    }

    /// Wallet restored from `WALLET_PRIVATE_KEY`, or a fresh one.
    pub fn wallet(&self) -> Result<Wallet, ConfigError> {
        match &self.wallet_private_key {
            Some(secret) => Ok(Wallet::from_secret_hex(secret)?),
            None => Ok(Wallet::new()),
        }
    }
}
