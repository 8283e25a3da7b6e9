//! # send-plugin
//!
//! Plugin process implementing the `send` smart-contract family for a
//! host blockchain FSM.
//!
//! The plugin connects to the FSM over a Unix domain socket and speaks
//! a bidirectional, length-prefixed protobuf protocol on that single
//! stream. Inbound FSM requests (`genesis`, `beginBlock`, `checkTx`,
//! `deliverTx`, `endBlock`) drive the contract; mid-request, the
//! contract reads and writes chain state through the same socket, with
//! a `u64` correlation id pairing every request to its response.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use send_plugin::{PluginClient, PluginOptions, SendContract};
//!
//! #[tokio::main]
//! async fn main() {
//!     send_plugin::telemetry::init_tracing();
//!
//!     let options = PluginOptions::new(1, "/var/lib/chain");
//!     let contract = Arc::new(SendContract::new(options.chain_id));
//!     let client = PluginClient::start(options, contract);
//!
//!     // ... run until shutdown ...
//!     client.close().await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod framing;
pub mod keys;
pub mod proto;
pub mod state;
pub mod telemetry;
pub mod writer;

pub use client::{ConnectionState, PluginClient, StateClient};
pub use config::PluginOptions;
pub use contract::{Contract, SendContract};
pub use error::{PluginError, Result};
pub use state::StateStore;
