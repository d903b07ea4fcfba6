// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment at startup (a `.env` file is
//! honoured when present).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `users.redb` | `./data` |
//! | `JWT_SECRET` | HS256 secret for session tokens | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `FUND_ON_REGISTER` | Mirror new balances on-chain | `false` |
//! | `ETH_NETWORK` | Network name (`mainnet`, `sepolia`, `holesky`, `polygon`) | `sepolia` |
//! | `PROVIDER_API_KEY` | Node provider API key | Required unless `RPC_URL` |
//! | `RPC_URL` | Explicit JSON-RPC endpoint | Optional |
//! | `TOKEN_CONTRACT_ADDRESS` | ERC-20 contract to transfer from | Required when funding |
//! | `FUNDER_PRIVATE_KEY` | `0x`-prefixed signing key | Required when funding |
//! | `FEE_MODEL` | `eip1559` or `legacy` | `eip1559` |
//! | `FUNDING_POLL_INTERVAL_SECS` | Reconciler sweep interval | `30` |

use std::path::PathBuf;
use std::time::Duration;

use crate::blockchain::FeeModel;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the database directory.
///
/// The credential store is a single redb file, `users.redb`, inside it.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const FUND_ON_REGISTER_ENV: &str = "FUND_ON_REGISTER";
pub const NETWORK_ENV: &str = "ETH_NETWORK";
pub const PROVIDER_API_KEY_ENV: &str = "PROVIDER_API_KEY";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CONTRACT_ADDRESS_ENV: &str = "TOKEN_CONTRACT_ADDRESS";
pub const PRIVATE_KEY_ENV: &str = "FUNDER_PRIVATE_KEY";
pub const FEE_MODEL_ENV: &str = "FEE_MODEL";
pub const FUNDING_POLL_INTERVAL_ENV: &str = "FUNDING_POLL_INTERVAL_SECS";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_NETWORK: &str = "sepolia";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// File name of the credential store inside `DATA_DIR`.
pub const USER_DB_FILE: &str = "users.redb";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Settings for the on-chain funding path.
#[derive(Clone)]
pub struct FundingConfig {
    pub network: String,
    pub provider_api_key: Option<String>,
    pub rpc_url: Option<String>,
    pub contract_address: String,
    /// Checked by the funder, not here, so a bad key surfaces as a funding
    /// configuration error.
    pub private_key: Option<String>,
    pub fee_model: FeeModel,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for FundingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundingConfig")
            .field("network", &self.network)
            .field("provider_api_key", &self.provider_api_key.as_ref().map(|_| "<redacted>"))
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("fee_model", &self.fee_model)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Complete server configuration.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub log_format: LogFormat,
    /// `None` when `FUND_ON_REGISTER` is off.
    pub funding: Option<FundingConfig>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("jwt_secret", &"<redacted>")
            .field("log_format", &self.log_format)
            .field("funding", &self.funding)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let log_format = get(LOG_FORMAT_ENV).map(|v| v.to_ascii_lowercase());
        let log_format = match log_format.as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        let fund_on_register = match get(FUND_ON_REGISTER_ENV) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                name: FUND_ON_REGISTER_ENV,
                reason: format!("expected a boolean, got `{raw}`"),
            })?,
            None => false,
        };

        let funding = if fund_on_register {
            let fee_model = match get(FEE_MODEL_ENV) {
                Some(raw) => raw.parse::<FeeModel>().map_err(|reason| ConfigError::Invalid {
                    name: FEE_MODEL_ENV,
                    reason,
                })?,
                None => FeeModel::default(),
            };
            let poll_secs = match get(FUNDING_POLL_INTERVAL_ENV) {
                Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: FUNDING_POLL_INTERVAL_ENV,
                    reason: e.to_string(),
                })?,
                None => DEFAULT_POLL_INTERVAL_SECS,
            };

            Some(FundingConfig {
                network: get(NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
                provider_api_key: get(PROVIDER_API_KEY_ENV),
                rpc_url: get(RPC_URL_ENV),
                contract_address: get(CONTRACT_ADDRESS_ENV)
                    .ok_or(ConfigError::Missing(CONTRACT_ADDRESS_ENV))?,
                private_key: get(PRIVATE_KEY_ENV),
                fee_model,
                poll_interval: Duration::from_secs(poll_secs.max(1)),
            })
        } else {
            None
        };

        Ok(Self {
            host,
            port,
            data_dir,
            jwt_secret,
            log_format,
            funding,
        })
    }

    /// Full path of the credential store file.
    pub fn user_db_path(&self) -> PathBuf {
        self.data_dir.join(USER_DB_FILE)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
