//! Plugin options.
//!
//! The host process supplies the chain id and data directory; the
//! remaining knobs are protocol timings with the defaults the FSM
//! expects. There is no file loading here.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Socket file created by the FSM inside the data directory.
pub const SOCKET_FILE_NAME: &str = "plugin.sock";

/// Default timeout for a single connection attempt.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default timeout for one outbound request/response exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default pause between reconnection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Hard cutoff when waiting for a clean close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_millis(100);

/// Runtime options for a [`PluginClient`](crate::PluginClient).
#[derive(Debug, Clone)]
pub struct PluginOptions {
    /// Chain this plugin instance serves.
    pub chain_id: u64,
    /// Directory holding the FSM's plugin socket.
    pub data_dir: PathBuf,
    /// Timeout for a single connection attempt.
    pub connection_timeout: Duration,
    /// Timeout for one outbound request/response exchange.
    pub request_timeout: Duration,
    /// Pause between reconnection attempts.
    pub reconnect_interval: Duration,
    /// Hard cutoff when waiting for a clean close.
    pub close_timeout: Duration,
}

impl PluginOptions {
    /// Options for a chain and data directory, with default timings.
    pub fn new(chain_id: u64, data_dir: impl AsRef<Path>) -> Self {
        Self {
            chain_id,
            data_dir: data_dir.as_ref().to_path_buf(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Full path of the FSM socket.
    pub fn socket_path(&self) -> PathBuf {
        self.data_dir.join(SOCKET_FILE_NAME)
    }
}
