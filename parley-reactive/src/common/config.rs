/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::message::Format;

/// Configuration for a Parley runtime
///
/// Every section falls back to its defaults when absent, so a configuration
/// file only needs to name the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    /// Delivery attempt ceiling
    pub retry: RetryConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Queue names
    pub queues: QueuesConfig,
    /// Processing lane configuration
    pub lanes: LanesConfig,
    /// In-memory transport configuration
    pub transport: TransportConfig,
    /// Payload codec configuration
    pub codec: CodecConfig,
    /// Tracing and logging configuration
    pub tracing: TracingConfig,
}

/// Receiver-side retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempt number at which a fault-injected message fails terminally
    pub max_attempts: u32,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a caller waits for a correlated reply, in milliseconds
    pub reply_timeout_ms: u64,
    /// How long shutdown waits for lanes to stop, in milliseconds
    pub shutdown_timeout_ms: u64,
}

/// Destination names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuesConfig {
    /// Fire-and-forget traffic
    pub send_only: String,
    /// Requests expecting a reply
    pub send_and_reply: String,
    /// Shared reply destination read by the requester's reply lane
    pub replies: String,
}

/// Processing lane configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanesConfig {
    /// Competing lanes started per inbound queue
    pub consumers_per_queue: usize,
}

/// In-memory transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Redeliveries allowed before a rejected message is dead-lettered
    pub max_redeliveries: u32,
}

/// Payload codec configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Format used for outgoing payloads
    pub format: Format,
}

/// Tracing and logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Directory for log files; console only when absent
    pub log_directory: Option<String>,
    /// Log file name inside `log_directory`
    pub log_file: String,
    /// Colored console output
    pub ansi: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 10 }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: 10_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            send_only: "parley.send-only".to_string(),
            send_and_reply: "parley.send-and-reply".to_string(),
            replies: "parley.replies".to_string(),
        }
    }
}

impl Default for LanesConfig {
    fn default() -> Self {
        Self {
            consumers_per_queue: 3,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_redeliveries: 10,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            log_directory: None,
            log_file: "parley.log".to_string(),
            ansi: true,
        }
    }
}

impl ParleyConfig {
    /// Reply timeout as a Duration
    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.reply_timeout_ms)
    }

    /// Shutdown timeout as a Duration
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_timeout_ms)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `$XDG_CONFIG_HOME/parley/config.toml` (falling back to
    /// `~/.config/parley/config.toml`). A missing file yields the defaults; a
    /// file that cannot be read or parsed is logged and also yields the defaults.
    #[must_use]
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("parley") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Self::load_from_path(&path) {
                    Ok(config) => {
                        info!("Successfully loaded configuration");
                        config
                    }
                    Err(e) => {
                        error!("{}", e);
                        Self::default()
                    }
                }
            }
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
