//! Error taxonomy for the plugin.
//!
//! The set is closed and the numeric codes are wire-visible: the FSM
//! keys off them, so codes and canonical messages must stay stable.
//! Every error converts to the wire [`ProtoError`] shape
//! `{code, module: "plugin", msg}`.

use thiserror::Error;

use crate::proto::ProtoError;

/// Module name stamped on every wire error.
pub const ERROR_MODULE: &str = "plugin";

/// All errors the plugin can produce.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Code 1. An outbound request to the FSM timed out.
    #[error("a plugin timeout occurred")]
    Timeout,

    /// Code 2. Encoding an outbound message failed.
    #[error("marshal() failed with err: {0}")]
    Marshal(String),

    /// Code 3. Decoding an inbound message or state entry failed.
    #[error("unmarshal() failed with err: {0}")]
    Unmarshal(String),

    /// Code 4. The socket read side failed or the connection dropped.
    #[error("a plugin read failed with err: {0}")]
    Read(String),

    /// Code 5. The socket write side failed.
    #[error("a plugin write failed with err: {0}")]
    Write(String),

    /// Code 6. A response carried an id the plugin never issued.
    #[error("plugin response id is invalid")]
    InvalidResponseId,

    /// Code 7. A response payload kind did not match the request.
    #[error("unexpected FSM to plugin: {0}")]
    UnexpectedFsmToPlugin(&'static str),

    /// Code 8. An inbound request carried no recognizable payload.
    #[error("invalid FSM to plugin: {0}")]
    InvalidFsmToPlugin(&'static str),

    /// Code 9. Sender balance below `amount + fee`.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Code 10. The polymorphic tx payload could not be unpacked.
    #[error("fromAny() failed with err: {0}")]
    FromAny(String),

    /// Code 11. The tx payload is not a recognized message kind.
    #[error("the message cast failed")]
    InvalidMessageCast,

    /// Code 12. An address is not exactly 20 bytes.
    #[error("address is invalid")]
    InvalidAddress,

    /// Code 13. An amount is zero (or otherwise out of domain).
    #[error("amount is invalid")]
    InvalidAmount,

    /// Code 14. The tx fee is below the governance fee floor.
    #[error("tx.fee is below state limit")]
    FeeBelowStateLimit,
}

impl PluginError {
    /// Stable numeric code for the wire.
    pub fn code(&self) -> u32 {
        match self {
            PluginError::Timeout => 1,
            PluginError::Marshal(_) => 2,
            PluginError::Unmarshal(_) => 3,
            PluginError::Read(_) => 4,
            PluginError::Write(_) => 5,
            PluginError::InvalidResponseId => 6,
            PluginError::UnexpectedFsmToPlugin(_) => 7,
            PluginError::InvalidFsmToPlugin(_) => 8,
            PluginError::InsufficientFunds => 9,
            PluginError::FromAny(_) => 10,
            PluginError::InvalidMessageCast => 11,
            PluginError::InvalidAddress => 12,
            PluginError::InvalidAmount => 13,
            PluginError::FeeBelowStateLimit => 14,
        }
    }

    /// Convert to the wire error shape.
    pub fn to_proto(&self) -> ProtoError {
        ProtoError {
            code: self.code(),
            module: ERROR_MODULE.to_string(),
            msg: self.to_string(),
        }
    }
}

impl From<prost::DecodeError> for PluginError {
    fn from(err: prost::DecodeError) -> Self {
        PluginError::Unmarshal(err.to_string())
    }
}

impl From<prost::EncodeError> for PluginError {
    fn from(err: prost::EncodeError) -> Self {
        PluginError::Marshal(err.to_string())
    }
}

impl From<PluginError> for ProtoError {
    fn from(err: PluginError) -> Self {
        err.to_proto()
    }
}

/// Result type alias using PluginError.
pub type Result<T> = std::result::Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let table: [(PluginError, u32); 14] = [
            (PluginError::Timeout, 1),
            (PluginError::Marshal("x".into()), 2),
            (PluginError::Unmarshal("x".into()), 3),
            (PluginError::Read("x".into()), 4),
            (PluginError::Write("x".into()), 5),
            (PluginError::InvalidResponseId, 6),
            (PluginError::UnexpectedFsmToPlugin("config"), 7),
            (PluginError::InvalidFsmToPlugin("empty"), 8),
            (PluginError::InsufficientFunds, 9),
            (PluginError::FromAny("x".into()), 10),
            (PluginError::InvalidMessageCast, 11),
            (PluginError::InvalidAddress, 12),
            (PluginError::InvalidAmount, 13),
            (PluginError::FeeBelowStateLimit, 14),
        ];
        for (err, code) in table {
            assert_eq!(err.code(), code, "code drifted for {err}");
        }
    }

    #[test]
    fn test_canonical_messages() {
        assert_eq!(PluginError::Timeout.to_string(), "a plugin timeout occurred");
        assert_eq!(
            PluginError::InsufficientFunds.to_string(),
            "insufficient funds"
        );
        assert_eq!(
            PluginError::FeeBelowStateLimit.to_string(),
            "tx.fee is below state limit"
        );
        assert_eq!(
            PluginError::Unmarshal("boom".into()).to_string(),
            "unmarshal() failed with err: boom"
        );
        assert_eq!(
            PluginError::UnexpectedFsmToPlugin("genesis").to_string(),
            "unexpected FSM to plugin: genesis"
        );
    }

    #[test]
    fn test_to_proto_shape() {
        let wire = PluginError::InvalidAddress.to_proto();
        assert_eq!(wire.code, 12);
        assert_eq!(wire.module, "plugin");
        assert_eq!(wire.msg, "address is invalid");
    }

    #[test]
    fn test_decode_error_maps_to_unmarshal() {
        use prost::Message;
        let err = crate::proto::Account::decode(&b"\xff\xff\xff"[..]).unwrap_err();
        let converted: PluginError = err.into();
        assert_eq!(converted.code(), 3);
    }
}
