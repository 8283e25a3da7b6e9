//! Wire messages exchanged with the FSM.
//!
//! These mirror the FSM's `plugin.proto` schema and are written in the
//! form `prost-build` emits, so the encoding is byte-compatible with the
//! host's protobuf definitions. Every frame on the socket is exactly one
//! `FsmToPlugin` or `PluginToFsm` message; the `id` field is the
//! correlation id that pairs requests with responses, and the oneof
//! payload carries the kind discriminator.

/// Message from the FSM to the plugin.
///
/// Request kinds (`genesis`, `begin`, `check`, `deliver`, `end`) carry
/// request payloads; `state_read`/`state_write` only ever arrive as
/// responses to the plugin's own outbound calls.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FsmToPlugin {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(oneof = "fsm_to_plugin::Payload", tags = "2, 3, 4, 5, 6, 7, 8, 9, 10")]
    pub payload: ::core::option::Option<fsm_to_plugin::Payload>,
}

/// Nested types for `FsmToPlugin`.
pub mod fsm_to_plugin {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        Config(super::FsmConfig),
        #[prost(message, tag = "3")]
        Genesis(super::GenesisRequest),
        #[prost(message, tag = "4")]
        Begin(super::BeginBlockRequest),
        #[prost(message, tag = "5")]
        Check(super::CheckTxRequest),
        #[prost(message, tag = "6")]
        Deliver(super::DeliverTxRequest),
        #[prost(message, tag = "7")]
        End(super::EndBlockRequest),
        #[prost(message, tag = "8")]
        StateRead(super::StateReadResponse),
        #[prost(message, tag = "9")]
        StateWrite(super::StateWriteResponse),
        #[prost(message, tag = "10")]
        Error(super::ProtoError),
    }
}

/// Message from the plugin to the FSM.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PluginToFsm {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(oneof = "plugin_to_fsm::Payload", tags = "2, 3, 4, 5, 6, 7, 8, 9, 10")]
    pub payload: ::core::option::Option<plugin_to_fsm::Payload>,
}

/// Nested types for `PluginToFsm`.
pub mod plugin_to_fsm {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        Config(super::PluginConfig),
        #[prost(message, tag = "3")]
        Genesis(super::GenesisResponse),
        #[prost(message, tag = "4")]
        Begin(super::BeginBlockResponse),
        #[prost(message, tag = "5")]
        Check(super::CheckTxResponse),
        #[prost(message, tag = "6")]
        Deliver(super::DeliverTxResponse),
        #[prost(message, tag = "7")]
        End(super::EndBlockResponse),
        #[prost(message, tag = "8")]
        StateRead(super::StateReadRequest),
        #[prost(message, tag = "9")]
        StateWrite(super::StateWriteRequest),
        #[prost(message, tag = "10")]
        Error(super::ProtoError),
    }
}

/// Wire error shape embedded in replies.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoError {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub module: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub msg: ::prost::alloc::string::String,
}

/// Handshake payload announcing the plugin to the FSM.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PluginConfig {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(uint64, tag = "3")]
    pub version: u64,
    #[prost(string, repeated, tag = "4")]
    pub supported_transactions: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

/// Handshake acknowledgment from the FSM. The plugin only requires the
/// kind; the contents are ignored.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FsmConfig {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenesisRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenesisResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoError>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginBlockRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginBlockResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoError>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndBlockRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndBlockResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoError>,
}

/// Transaction envelope: the fee plus a polymorphic message payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxEnvelope {
    #[prost(uint64, tag = "1")]
    pub fee: u64,
    #[prost(message, optional, tag = "2")]
    pub msg: ::core::option::Option<::prost_types::Any>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckTxRequest {
    #[prost(message, optional, tag = "1")]
    pub tx: ::core::option::Option<TxEnvelope>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckTxResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub recipient: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub authorized_signers: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(message, optional, tag = "3")]
    pub error: ::core::option::Option<ProtoError>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeliverTxRequest {
    #[prost(message, optional, tag = "1")]
    pub tx: ::core::option::Option<TxEnvelope>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeliverTxResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoError>,
}

/// One key in a batched state read, tagged so the response entry can be
/// correlated back regardless of array position.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyQuery {
    #[prost(uint64, tag = "1")]
    pub query_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub key: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateReadRequest {
    #[prost(message, repeated, tag = "1")]
    pub keys: ::prost::alloc::vec::Vec<KeyQuery>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateEntry {
    #[prost(bytes = "vec", tag = "1")]
    pub key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResult {
    #[prost(uint64, tag = "1")]
    pub query_id: u64,
    #[prost(message, repeated, tag = "2")]
    pub entries: ::prost::alloc::vec::Vec<StateEntry>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateReadResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoError>,
    #[prost(message, repeated, tag = "2")]
    pub results: ::prost::alloc::vec::Vec<QueryResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyDelete {
    #[prost(bytes = "vec", tag = "1")]
    pub key: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateWriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub sets: ::prost::alloc::vec::Vec<StateEntry>,
    #[prost(message, repeated, tag = "2")]
    pub deletes: ::prost::alloc::vec::Vec<KeyDelete>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateWriteResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoError>,
}

/// A balance row stored under `key_for_account`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Account {
    #[prost(bytes = "vec", tag = "1")]
    pub address: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub amount: u64,
}

/// The per-chain fee pool stored under `key_for_fee_pool`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pool {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub amount: u64,
}

/// Governance-controlled fee parameters, read-only for the plugin.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeeParams {
    #[prost(uint64, tag = "1")]
    pub send_fee: u64,
}

/// The send transaction payload carried inside `TxEnvelope.msg`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageSend {
    #[prost(bytes = "vec", tag = "1")]
    pub from_address: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub to_address: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub amount: u64,
}

/// Kind name of an inbound payload, for diagnostics and error text.
pub fn fsm_payload_kind(payload: Option<&fsm_to_plugin::Payload>) -> &'static str {
    use fsm_to_plugin::Payload;
    match payload {
        Some(Payload::Config(_)) => "config",
        Some(Payload::Genesis(_)) => "genesis",
        Some(Payload::Begin(_)) => "begin",
        Some(Payload::Check(_)) => "check",
        Some(Payload::Deliver(_)) => "deliver",
        Some(Payload::End(_)) => "end",
        Some(Payload::StateRead(_)) => "stateRead",
        Some(Payload::StateWrite(_)) => "stateWrite",
        Some(Payload::Error(_)) => "error",
        None => "empty",
    }
}
