//! Structural serialization of list and tree containers
//!
//! Only the occupied-location topology is persisted: a little-endian
//! `u32` address limit, then minimum-width ranks over the shrinking
//! candidate set in traversal order, then the sentinel. The traversal
//! order is fixed: forward ring order for lists; preorder for trees,
//! where the sentinel doubles as the end-of-children marker and a
//! sentinel at depth zero terminates the stream.
//!
//! Decoding rebuilds link state and threads every unoccupied address
//! into a fresh free chain in address order; live-set membership and
//! traversal order round-trip exactly, free-chain internal order does
//! not. Value payloads are carried separately (see `codec::mod`).

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::bitstream::{BitReader, BitWriter};
use crate::codec::rank::{width_for, Candidates};
use crate::constants::{MAX_CODEC_ADDRESS_LIMIT, NIL};
use crate::storage::list::ListStore;
use crate::storage::slot_store::{SlotStore, StoreValue};
use crate::storage::tree::TreeStore;
use crate::types::error::{CodecError, Result};
use crate::types::location::{is_nil, InsertPos, Location};

fn header(limit: Location) -> BytesMut {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_u32_le(limit);
    buf
}

fn read_header(bytes: &[u8]) -> Result<(Location, BitReader<'_>)> {
    if bytes.len() < 4 {
        return Err(CodecError::UnexpectedEof(bytes.len() * 8).into());
    }
    let limit = u32::from_le_bytes(bytes[0..4].try_into().expect("4 bytes"));
    if limit > MAX_CODEC_ADDRESS_LIMIT {
        return Err(CodecError::AddressLimitTooLarge(limit).into());
    }
    Ok((limit, BitReader::new(&bytes[4..])))
}

impl<T: StoreValue> ListStore<T> {
    /// Serializes the occupied-location topology in forward ring order.
    pub fn encode_structure(&self) -> Bytes {
        let limit = self.iter_locations().max().unwrap_or(NIL);
        let mut writer = BitWriter::with_buffer(header(limit));
        let mut cands = Candidates::new(limit);
        for loc in self.iter_locations() {
            let k = cands.remaining();
            let rank = cands.take_address(loc).expect("live location within limit");
            writer.write_bits(rank, width_for(k));
        }
        let k = cands.remaining();
        writer.write_bits(k, width_for(k));
        writer.finish()
    }

    /// Rebuilds a list from an encoded topology, pairing decoded
    /// locations with `values` in traversal order.
    pub fn decode_structure(bytes: &[u8], values: Vec<T>) -> Result<Self> {
        let (limit, mut reader) = read_header(bytes)?;
        let mut cands = Candidates::new(limit);
        let mut store = ListStore::with_capacity(limit as usize);

        let supplied = values.len();
        let mut vals = values.into_iter();
        let mut decoded = 0usize;
        let mut prev = NIL;
        loop {
            let k = cands.remaining();
            let symbol = reader.read_bits(width_for(k))?;
            if symbol == k {
                break;
            }
            if symbol > k {
                return Err(CodecError::RankOutOfRange { rank: symbol, remaining: k }.into());
            }
            let location = cands.take_rank(symbol).expect("rank below remaining");
            let value = vals.next().ok_or(CodecError::ValueCountMismatch {
                expected: decoded + 1,
                actual: supplied,
            })?;
            store.insert_at(InsertPos::After(prev), location, value)?;
            decoded += 1;
            prev = location;
        }
        if vals.next().is_some() {
            return Err(CodecError::ValueCountMismatch { expected: decoded, actual: supplied }.into());
        }
        Ok(store)
    }
}

impl<T: StoreValue> TreeStore<T> {
    /// Serializes the occupied-location topology in preorder. Each
    /// node's child list is closed by the sentinel; the sentinel at
    /// depth zero ends the stream.
    pub fn encode_structure(&self) -> Bytes {
        let limit = self.iter_locations().max().unwrap_or(NIL);
        let mut writer = BitWriter::with_buffer(header(limit));
        let mut cands = Candidates::new(limit);
        self.encode_children(NIL, &mut writer, &mut cands);
        writer.finish()
    }

    fn encode_children(&self, parent: Location, writer: &mut BitWriter, cands: &mut Candidates) {
        let mut child = self.child_location(parent, true).expect("valid parent");
        while !is_nil(child) {
            let k = cands.remaining();
            let rank = cands.take_address(child).expect("live location within limit");
            writer.write_bits(rank, width_for(k));
            self.encode_children(child, writer, cands);
            child = self.sibling_location(child, true).expect("live child");
        }
        let k = cands.remaining();
        writer.write_bits(k, width_for(k));
    }

    /// Rebuilds a tree from an encoded topology, pairing decoded
    /// locations with `values` in preorder.
    pub fn decode_structure(bytes: &[u8], values: Vec<T>) -> Result<Self> {
        let (limit, mut reader) = read_header(bytes)?;
        let mut cands = Candidates::new(limit);
        let mut store = TreeStore::with_capacity(limit as usize);

        let supplied = values.len();
        let mut vals = values.into_iter();
        let mut decoded = 0usize;
        // (parent, last child rebuilt under it)
        let mut stack: Vec<(Location, Location)> = vec![(NIL, NIL)];
        loop {
            let k = cands.remaining();
            let symbol = reader.read_bits(width_for(k))?;
            if symbol == k {
                stack.pop();
                if stack.is_empty() {
                    break;
                }
                continue;
            }
            if symbol > k {
                return Err(CodecError::RankOutOfRange { rank: symbol, remaining: k }.into());
            }
            let location = cands.take_rank(symbol).expect("rank below remaining");
            let value = vals.next().ok_or(CodecError::ValueCountMismatch {
                expected: decoded + 1,
                actual: supplied,
            })?;
            let &(parent, last) = stack.last().expect("depth tracked");
            let pos = if is_nil(last) {
                InsertPos::FirstChildOf(parent)
            } else {
                InsertPos::After(last)
            };
            store.insert_at(pos, location, value)?;
            decoded += 1;
            stack.last_mut().expect("depth tracked").1 = location;
            stack.push((location, NIL));
        }
        if vals.next().is_some() {
            return Err(CodecError::ValueCountMismatch { expected: decoded, actual: supplied }.into());
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::error::Error;

    fn list_of(values: &[u32]) -> ListStore<u32> {
        let mut list = ListStore::new();
        let mut prev = 0;
        for &v in values {
            prev = list.insert_after(prev, v).unwrap();
        }
        list
    }

    #[test]
    fn list_round_trip_preserves_locations_and_order() {
        // Goal: decode(encode(S)) has S's occupied set and traversal order
        let mut list = list_of(&[10, 20, 30, 40]);
        // Punch a hole so the live set is sparse
        let hole = list.location_of(&20, 0, true);
        list.remove_at(hole).unwrap();

        let before: Vec<(Location, u32)> =
            list.iter_locations().map(|l| (l, *list.get_ref(l).unwrap())).collect();

        let encoded = list.encode_structure();
        let values: Vec<u32> = before.iter().map(|(_, v)| *v).collect();
        let decoded = ListStore::decode_structure(&encoded, values).unwrap();

        let after: Vec<(Location, u32)> =
            decoded.iter_locations().map(|l| (l, *decoded.get_ref(l).unwrap())).collect();
        assert_eq!(before, after);
        decoded.verify().unwrap();
    }

    #[test]
    fn decoded_list_recycles_the_holes() {
        // Goal: the rebuilt free chain serves unoccupied addresses again
        let mut list = list_of(&[1, 2, 3]);
        let hole = list.location_of(&2, 0, true);
        list.remove_at(hole).unwrap();

        let values: Vec<u32> = list.iter_locations().map(|l| *list.get_ref(l).unwrap()).collect();
        let mut decoded = ListStore::decode_structure(&list.encode_structure(), values).unwrap();
        let reused = decoded.insert_after(0, 99).unwrap();
        assert_eq!(reused, hole);
        decoded.verify().unwrap();
    }

    #[test]
    fn empty_list_round_trips() {
        let list: ListStore<u32> = ListStore::new();
        let encoded = list.encode_structure();
        assert_eq!(encoded.len(), 5, "header plus one sentinel byte");
        let decoded: ListStore<u32> = ListStore::decode_structure(&encoded, Vec::new()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn tree_round_trip_preserves_shape() {
        let mut tree: TreeStore<&str> = TreeStore::new();
        let r = tree.insert(InsertPos::FirstChildOf(0), "R").unwrap();
        let x = tree.insert(InsertPos::FirstChildOf(r), "X").unwrap();
        let y = tree.insert(InsertPos::After(x), "Y").unwrap();
        let w = tree.insert(InsertPos::FirstChildOf(y), "W").unwrap();
        let z = tree.insert(InsertPos::After(r), "Z").unwrap();
        // Sparse live set
        tree.remove_subtree(x).unwrap();

        let values: Vec<&str> = tree.iter_locations().map(|l| *tree.get_ref(l).unwrap()).collect();
        let decoded = TreeStore::decode_structure(&tree.encode_structure(), values).unwrap();

        let order: Vec<Location> = decoded.iter_locations().collect();
        assert_eq!(order, tree.iter_locations().collect::<Vec<_>>());
        assert_eq!(decoded.parent_location(w).unwrap(), y);
        assert_eq!(decoded.parent_location(y).unwrap(), r);
        assert_eq!(decoded.parent_location(z).unwrap(), 0);
        assert_eq!(decoded.child_location(r, true).unwrap(), y);
        decoded.verify().unwrap();
    }

    #[test]
    fn empty_tree_round_trips() {
        let tree: TreeStore<u32> = TreeStore::new();
        let decoded: TreeStore<u32> = TreeStore::decode_structure(&tree.encode_structure(), Vec::new()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let list = list_of(&[1, 2, 3]);
        let encoded = list.encode_structure();
        let err = ListStore::<u32>::decode_structure(&encoded[..4], vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::UnexpectedEof(_))));
        let err = ListStore::<u32>::decode_structure(&[], Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::UnexpectedEof(_))));
    }

    #[test]
    fn oversized_address_limit_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        let err = ListStore::<u32>::decode_structure(&bytes, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::AddressLimitTooLarge(_))));
    }

    #[test]
    fn value_count_must_match_topology() {
        let list = list_of(&[1, 2]);
        let encoded = list.encode_structure();
        let err = ListStore::<u32>::decode_structure(&encoded, vec![1]).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::ValueCountMismatch { .. })));
        let err = ListStore::<u32>::decode_structure(&encoded, vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::ValueCountMismatch { .. })));
    }

    #[test]
    fn encoding_is_compact() {
        // Goal: ranks shrink with the candidate set instead of storing
        // fixed-width indices
        let list = list_of(&(0..64).collect::<Vec<u32>>());
        let encoded = list.encode_structure();
        // 4-byte header + 64 ranks of at most 7 bits + sentinel
        assert!(encoded.len() <= 4 + (64 * 7 + 7) / 8 + 1, "got {}", encoded.len());
    }
}
