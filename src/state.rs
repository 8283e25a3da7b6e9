//! State access seam between the contract and the protocol engine.
//!
//! Contracts never touch the socket directly: they issue batched reads
//! and writes through the [`StateStore`] trait. The engine's
//! `StateClient` implements it over the live connection; tests drive
//! contracts against an in-memory implementation instead.

use std::future::Future;
use std::pin::Pin;

use prost::Message;

use crate::error::PluginError;
use crate::proto::{KeyQuery, ProtoError, QueryResult, StateWriteRequest};

/// Boxed future used by the trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Batched key-value access backed by the FSM.
///
/// Errors are already in the wire shape: an implementation surfaces
/// both its own failures (timeout, transport) and errors the FSM
/// embedded in its response.
pub trait StateStore: Send + Sync {
    /// Read a batch of keys. Result entries are correlated by
    /// `query_id`, never by position.
    fn read_batch(
        &self,
        queries: Vec<KeyQuery>,
    ) -> BoxFuture<'_, Result<Vec<QueryResult>, ProtoError>>;

    /// Apply a batch of sets and deletes atomically.
    fn write_batch(&self, request: StateWriteRequest) -> BoxFuture<'_, Result<(), ProtoError>>;
}

/// Find the batch entry for a query id.
pub fn find_result(results: &[QueryResult], query_id: u64) -> Option<&QueryResult> {
    results.iter().find(|r| r.query_id == query_id)
}

/// The stored value for a query id, if the key existed.
pub fn entry_value(results: &[QueryResult], query_id: u64) -> Option<&[u8]> {
    find_result(results, query_id)
        .and_then(|r| r.entries.first())
        .map(|e| e.value.as_slice())
}

/// Decode a stored record, mapping failures into the error taxonomy.
pub fn decode_record<M: Message + Default>(value: &[u8]) -> Result<M, PluginError> {
    M::decode(value).map_err(PluginError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Account, StateEntry};

    fn result(query_id: u64, value: &[u8]) -> QueryResult {
        QueryResult {
            query_id,
            entries: vec![StateEntry {
                key: vec![1],
                value: value.to_vec(),
            }],
        }
    }

    #[test]
    fn test_results_matched_by_query_id_not_position() {
        let results = vec![result(3, b"c"), result(1, b"a"), result(2, b"b")];

        assert_eq!(entry_value(&results, 1), Some(&b"a"[..]));
        assert_eq!(entry_value(&results, 2), Some(&b"b"[..]));
        assert_eq!(entry_value(&results, 3), Some(&b"c"[..]));
        assert_eq!(entry_value(&results, 4), None);
    }

    #[test]
    fn test_missing_entry_is_none() {
        let results = vec![QueryResult {
            query_id: 1,
            entries: Vec::new(),
        }];
        assert!(find_result(&results, 1).is_some());
        assert_eq!(entry_value(&results, 1), None);
    }

    #[test]
    fn test_decode_record_maps_to_unmarshal() {
        let err = decode_record::<Account>(&[0xFF, 0xFF, 0xFF]).unwrap_err();
        assert_eq!(err.code(), 3);
    }
}
