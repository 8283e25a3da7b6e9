//! The send contract: balance transfers with fee accounting.
//!
//! All balance math is unsigned 64-bit with explicit checked
//! arithmetic; nothing on this path may silently wrap. State access is
//! batched: one read for `[pool, from, to]`, one write for the updated
//! rows.

use prost::Message;

use crate::error::PluginError;
use crate::keys::{
    key_for_account, key_for_fee_params, key_for_fee_pool, validate_address, validate_amount,
    Address,
};
use crate::proto::{
    Account, BeginBlockRequest, BeginBlockResponse, CheckTxRequest, CheckTxResponse,
    DeliverTxRequest, DeliverTxResponse, EndBlockRequest, EndBlockResponse, FeeParams,
    GenesisRequest, GenesisResponse, KeyDelete, KeyQuery, MessageSend, Pool, ProtoError,
    StateEntry, StateWriteRequest, TxEnvelope,
};
use crate::state::{decode_record, entry_value, BoxFuture, StateStore};

use super::Contract;

/// Recognized type URLs for the send payload.
const MESSAGE_SEND: &str = "MessageSend";
const MESSAGE_SEND_QUALIFIED: &str = "types.MessageSend";

/// Query id for the fee-params read in `check_tx`.
const FEE_PARAMS_QUERY: u64 = 1;

/// Query ids for the three-key read in `deliver_tx`.
const POOL_QUERY: u64 = 1;
const FROM_QUERY: u64 = 2;
const TO_QUERY: u64 = 3;

/// The send transaction family.
pub struct SendContract {
    chain_id: u64,
}

impl SendContract {
    /// Create the contract for a chain.
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    /// Chain this contract serves.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn check_send(
        &self,
        state: &dyn StateStore,
        req: CheckTxRequest,
    ) -> Result<(Vec<u8>, Vec<Vec<u8>>), ProtoError> {
        let results = state
            .read_batch(vec![KeyQuery {
                query_id: FEE_PARAMS_QUERY,
                key: key_for_fee_params(),
            }])
            .await?;
        let raw = entry_value(&results, FEE_PARAMS_QUERY).ok_or_else(|| {
            PluginError::Unmarshal("fee params not found".to_string()).to_proto()
        })?;
        let params: FeeParams = decode_record(raw)?;

        let tx = req
            .tx
            .as_ref()
            .ok_or_else(|| PluginError::FromAny("tx is missing".to_string()).to_proto())?;
        if tx.fee < params.send_fee {
            return Err(PluginError::FeeBelowStateLimit.into());
        }

        let msg = unpack_send(tx)?;
        if !validate_address(&msg.from_address) {
            return Err(PluginError::InvalidAddress.into());
        }
        if !validate_address(&msg.to_address) {
            return Err(PluginError::InvalidAddress.into());
        }
        if !validate_amount(msg.amount) {
            return Err(PluginError::InvalidAmount.into());
        }

        Ok((msg.to_address, vec![msg.from_address]))
    }

    async fn deliver_send(
        &self,
        state: &dyn StateStore,
        req: DeliverTxRequest,
    ) -> Result<(), ProtoError> {
        let tx = req
            .tx
            .ok_or_else(|| PluginError::FromAny("tx is missing".to_string()).to_proto())?;
        let msg = unpack_send(&tx)?;
        self.execute_send(state, msg, tx.fee).await
    }

    /// Move `msg.amount` from sender to recipient and `fee` into the
    /// pool, in one write batch.
    async fn execute_send(
        &self,
        state: &dyn StateStore,
        msg: MessageSend,
        fee: u64,
    ) -> Result<(), ProtoError> {
        let from = Address::from_slice(&msg.from_address)?;
        let to = Address::from_slice(&msg.to_address)?;

        let k_from = key_for_account(&from);
        let k_to = key_for_account(&to);
        let k_pool = key_for_fee_pool(self.chain_id);

        let results = state
            .read_batch(vec![
                KeyQuery {
                    query_id: POOL_QUERY,
                    key: k_pool.clone(),
                },
                KeyQuery {
                    query_id: FROM_QUERY,
                    key: k_from.clone(),
                },
                KeyQuery {
                    query_id: TO_QUERY,
                    key: k_to.clone(),
                },
            ])
            .await?;

        let pool = match entry_value(&results, POOL_QUERY) {
            Some(raw) => decode_record::<Pool>(raw)?,
            None => Pool {
                id: self.chain_id,
                amount: 0,
            },
        };
        let from_amount = match entry_value(&results, FROM_QUERY) {
            Some(raw) => decode_record::<Account>(raw)?.amount,
            None => 0,
        };
        let to_amount = match entry_value(&results, TO_QUERY) {
            Some(raw) => decode_record::<Account>(raw)?.amount,
            None => 0,
        };

        let deduction = msg.amount.checked_add(fee).ok_or_else(|| {
            PluginError::Marshal("amount + fee overflows u64".to_string()).to_proto()
        })?;
        if from_amount < deduction {
            return Err(PluginError::InsufficientFunds.into());
        }
        let new_from = from_amount - deduction;

        let updated_pool = Pool {
            id: self.chain_id,
            amount: pool.amount.checked_add(fee).ok_or_else(|| {
                PluginError::Marshal("fee pool amount overflows u64".to_string()).to_proto()
            })?,
        };

        let mut sets = vec![StateEntry {
            key: k_pool,
            value: updated_pool.encode_to_vec(),
        }];
        let mut deletes = Vec::new();

        if k_from == k_to {
            // Self-transfer: the principal nets out, only the fee leaves.
            let updated = Account {
                address: to.to_vec(),
                amount: from_amount - fee,
            };
            sets.push(StateEntry {
                key: k_from,
                value: updated.encode_to_vec(),
            });
        } else {
            if new_from == 0 {
                deletes.push(KeyDelete { key: k_from });
            } else {
                let updated = Account {
                    address: from.to_vec(),
                    amount: new_from,
                };
                sets.push(StateEntry {
                    key: k_from,
                    value: updated.encode_to_vec(),
                });
            }

            let new_to = to_amount.checked_add(msg.amount).ok_or_else(|| {
                PluginError::Marshal("recipient balance overflows u64".to_string()).to_proto()
            })?;
            let updated = Account {
                address: to.to_vec(),
                amount: new_to,
            };
            sets.push(StateEntry {
                key: k_to,
                value: updated.encode_to_vec(),
            });
        }

        state
            .write_batch(StateWriteRequest { sets, deletes })
            .await?;

        tracing::debug!(amount = msg.amount, fee, "send executed");
        Ok(())
    }
}

/// Unpack the polymorphic tx payload into a `MessageSend`.
fn unpack_send(tx: &TxEnvelope) -> Result<MessageSend, ProtoError> {
    let any = tx
        .msg
        .as_ref()
        .ok_or_else(|| PluginError::FromAny("tx message is missing".to_string()).to_proto())?;

    let kind = any.type_url.trim_start_matches('/');
    if kind != MESSAGE_SEND && kind != MESSAGE_SEND_QUALIFIED {
        return Err(PluginError::InvalidMessageCast.into());
    }

    MessageSend::decode(any.value.as_slice())
        .map_err(|e| PluginError::FromAny(e.to_string()).to_proto())
}

impl Contract for SendContract {
    fn genesis<'a>(
        &'a self,
        _state: &'a dyn StateStore,
        _req: GenesisRequest,
    ) -> BoxFuture<'a, GenesisResponse> {
        Box::pin(async { GenesisResponse { error: None } })
    }

    fn begin_block<'a>(
        &'a self,
        _state: &'a dyn StateStore,
        _req: BeginBlockRequest,
    ) -> BoxFuture<'a, BeginBlockResponse> {
        Box::pin(async { BeginBlockResponse { error: None } })
    }

    fn check_tx<'a>(
        &'a self,
        state: &'a dyn StateStore,
        req: CheckTxRequest,
    ) -> BoxFuture<'a, CheckTxResponse> {
        Box::pin(async move {
            match self.check_send(state, req).await {
                Ok((recipient, authorized_signers)) => CheckTxResponse {
                    recipient,
                    authorized_signers,
                    error: None,
                },
                Err(err) => CheckTxResponse {
                    recipient: Vec::new(),
                    authorized_signers: Vec::new(),
                    error: Some(err),
                },
            }
        })
    }

    fn deliver_tx<'a>(
        &'a self,
        state: &'a dyn StateStore,
        req: DeliverTxRequest,
    ) -> BoxFuture<'a, DeliverTxResponse> {
        Box::pin(async move {
            DeliverTxResponse {
                error: self.deliver_send(state, req).await.err(),
            }
        })
    }

    fn end_block<'a>(
        &'a self,
        _state: &'a dyn StateStore,
        _req: EndBlockRequest,
    ) -> BoxFuture<'a, EndBlockResponse> {
        Box::pin(async { EndBlockResponse { error: None } })
    }
}
