//! Structural codec for container topology and value payloads
//!
//! The structural stream (see [`structure`]) persists only which
//! locations are occupied and their traversal order. Values are the
//! base layer's concern: the `*_with_values` helpers pair the topology
//! stream with a bincode-serialized value vector in declaration
//! (traversal) order.

/// MSB-first bit reading and writing
pub mod bitstream;
/// Candidate-set ranking and minimum-width computation
pub mod rank;
/// List/tree structural encode and decode
pub mod structure;

pub use bitstream::{BitReader, BitWriter};
pub use rank::{width_for, Candidates};

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::list::ListStore;
use crate::storage::slot_store::StoreValue;
use crate::storage::tree::TreeStore;
use crate::types::error::{CodecError, Result};

fn frame(topology: Bytes, payload: Vec<u8>) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + topology.len() + payload.len());
    buf.put_u32_le(topology.len() as u32);
    buf.extend_from_slice(&topology);
    buf.extend_from_slice(&payload);
    buf.freeze()
}

fn split_frame(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    if bytes.len() < 4 {
        return Err(CodecError::UnexpectedEof(bytes.len() * 8).into());
    }
    let topo_len = u32::from_le_bytes(bytes[0..4].try_into().expect("4 bytes")) as usize;
    let rest = &bytes[4..];
    if rest.len() < topo_len {
        return Err(CodecError::UnexpectedEof(rest.len() * 8).into());
    }
    Ok(rest.split_at(topo_len))
}

fn serialize_values<T: Serialize>(values: &[T]) -> Result<Vec<u8>> {
    bincode::serialize(values).map_err(|e| CodecError::ValuePayload(e.to_string()).into())
}

fn deserialize_values<T: DeserializeOwned>(payload: &[u8]) -> Result<Vec<T>> {
    bincode::deserialize(payload).map_err(|e| CodecError::ValuePayload(e.to_string()).into())
}

/// Encodes a list's topology and its values in traversal order.
pub fn encode_list_with_values<T>(store: &ListStore<T>) -> Result<Bytes>
where
    T: StoreValue + Serialize,
{
    let values: Vec<T> =
        store.iter_locations().map(|loc| store.get_ref(loc).expect("live").clone()).collect();
    Ok(frame(store.encode_structure(), serialize_values(&values)?))
}

/// Decodes a list produced by [`encode_list_with_values`].
pub fn decode_list_with_values<T>(bytes: &[u8]) -> Result<ListStore<T>>
where
    T: StoreValue + DeserializeOwned,
{
    let (topology, payload) = split_frame(bytes)?;
    ListStore::decode_structure(topology, deserialize_values(payload)?)
}

/// Encodes a tree's topology and its values in preorder.
pub fn encode_tree_with_values<T>(store: &TreeStore<T>) -> Result<Bytes>
where
    T: StoreValue + Serialize,
{
    let values: Vec<T> =
        store.iter_locations().map(|loc| store.get_ref(loc).expect("live").clone()).collect();
    Ok(frame(store.encode_structure(), serialize_values(&values)?))
}

/// Decodes a tree produced by [`encode_tree_with_values`].
pub fn decode_tree_with_values<T>(bytes: &[u8]) -> Result<TreeStore<T>>
where
    T: StoreValue + DeserializeOwned,
{
    let (topology, payload) = split_frame(bytes)?;
    TreeStore::decode_structure(topology, deserialize_values(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::slot_store::SlotStore;
    use crate::types::location::InsertPos;

    #[test]
    fn list_with_values_round_trips() {
        // Goal: topology and payload frames reassemble the full container
        let mut list: ListStore<String> = ListStore::new();
        let mut prev = 0;
        for v in ["alpha", "beta", "gamma"] {
            prev = list.insert_after(prev, v.to_string()).unwrap();
        }
        let first = list.first();
        list.remove_at(first).unwrap();

        let bytes = encode_list_with_values(&list).unwrap();
        let decoded: ListStore<String> = decode_list_with_values(&bytes).unwrap();

        let values: Vec<String> =
            decoded.iter_locations().map(|l| decoded.get_ref(l).unwrap().clone()).collect();
        assert_eq!(values, vec!["beta".to_string(), "gamma".to_string()]);
        decoded.verify().unwrap();
    }

    #[test]
    fn tree_with_values_round_trips() {
        let mut tree: TreeStore<String> = TreeStore::new();
        let r = tree.insert(InsertPos::FirstChildOf(0), "root".to_string()).unwrap();
        tree.insert(InsertPos::FirstChildOf(r), "leaf".to_string()).unwrap();

        let bytes = encode_tree_with_values(&tree).unwrap();
        let decoded: TreeStore<String> = decode_tree_with_values(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get_ref(r).map(String::as_str), Some("root"));
        decoded.verify().unwrap();
    }

    #[test]
    fn short_frame_is_rejected() {
        assert!(decode_list_with_values::<u32>(&[1, 2]).is_err());
        // Frame claims more topology bytes than are present
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(decode_list_with_values::<u32>(&bytes).is_err());
    }
}
