//! Contract module - transaction-family handlers driven by FSM requests.
//!
//! A [`Contract`] services the five FSM request kinds and reaches back
//! into chain state through the [`StateStore`](crate::state::StateStore)
//! seam mid-request. Handlers never fail the transport: domain errors
//! travel in the `error` field of the reply payload.

mod send;

pub use send::SendContract;

use crate::proto::{
    BeginBlockRequest, BeginBlockResponse, CheckTxRequest, CheckTxResponse, DeliverTxRequest,
    DeliverTxResponse, EndBlockRequest, EndBlockResponse, GenesisRequest, GenesisResponse,
};
use crate::state::{BoxFuture, StateStore};

/// Plugin-side handlers for one transaction family.
pub trait Contract: Send + Sync + 'static {
    /// Handle the chain genesis notification.
    fn genesis<'a>(
        &'a self,
        state: &'a dyn StateStore,
        req: GenesisRequest,
    ) -> BoxFuture<'a, GenesisResponse>;

    /// Handle the start of a block.
    fn begin_block<'a>(
        &'a self,
        state: &'a dyn StateStore,
        req: BeginBlockRequest,
    ) -> BoxFuture<'a, BeginBlockResponse>;

    /// Validate a transaction against current state.
    fn check_tx<'a>(
        &'a self,
        state: &'a dyn StateStore,
        req: CheckTxRequest,
    ) -> BoxFuture<'a, CheckTxResponse>;

    /// Execute a transaction, mutating chain state.
    fn deliver_tx<'a>(
        &'a self,
        state: &'a dyn StateStore,
        req: DeliverTxRequest,
    ) -> BoxFuture<'a, DeliverTxResponse>;

    /// Handle the end of a block.
    fn end_block<'a>(
        &'a self,
        state: &'a dyn StateStore,
        req: EndBlockRequest,
    ) -> BoxFuture<'a, EndBlockResponse>;
}
