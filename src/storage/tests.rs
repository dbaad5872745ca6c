//! Property-based tests across the storage containers
//!
//! Model-based checks: every generated operation sequence is mirrored
//! against a plain Vec (list) or a parent map (tree), and the structural
//! invariants (traversal reversal, postorder removal events, codec
//! round-trips, minimize idempotence, free-chain exhaustiveness) are
//! asserted after each step.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use proptest::prelude::*;

use crate::storage::list::ListStore;
use crate::storage::slot_store::SlotStore;
use crate::storage::tree::TreeStore;
use crate::types::event::StoreEvent;
use crate::types::location::{InsertPos, Location};

#[derive(Debug, Clone)]
enum ListOp {
    Insert { after: usize, value: u16 },
    Remove { pick: usize },
    Set { pick: usize, value: u16 },
    Minimize,
}

fn list_ops() -> impl Strategy<Value = Vec<ListOp>> {
    prop::collection::vec(
        prop_oneof![
            4 => (any::<usize>(), any::<u16>())
                .prop_map(|(after, value)| ListOp::Insert { after, value }),
            2 => any::<usize>().prop_map(|pick| ListOp::Remove { pick }),
            1 => (any::<usize>(), any::<u16>())
                .prop_map(|(pick, value)| ListOp::Set { pick, value }),
            1 => Just(ListOp::Minimize),
        ],
        0..60,
    )
}

proptest! {
    #[test]
    fn list_tracks_model_and_invariants(ops in list_ops()) {
        let mut list: ListStore<u16> = ListStore::with_capacity(4);
        let mut model: Vec<u16> = Vec::new();
        let mut locs: Vec<Location> = Vec::new();

        for op in ops {
            match op {
                ListOp::Insert { after, value } => {
                    if model.is_empty() {
                        let loc = list.insert_after(0, value).unwrap();
                        model.insert(0, value);
                        locs.insert(0, loc);
                    } else {
                        let i = after % model.len();
                        let loc = list.insert_after(locs[i], value).unwrap();
                        model.insert(i + 1, value);
                        locs.insert(i + 1, loc);
                    }
                }
                ListOp::Remove { pick } => {
                    if !model.is_empty() {
                        let i = pick % model.len();
                        let removed = list.remove_at(locs[i]).unwrap();
                        prop_assert_eq!(removed, model.remove(i));
                        locs.remove(i);
                    }
                }
                ListOp::Set { pick, value } => {
                    if !model.is_empty() {
                        let i = pick % model.len();
                        list.set_at(locs[i], Some(value)).unwrap();
                        model[i] = value;
                    }
                }
                ListOp::Minimize => {
                    // Idempotence: a second shrink changes nothing
                    let once = list.minimize_capacity();
                    prop_assert_eq!(once, list.minimize_capacity());
                }
            }
            // Free-chain and ring invariants hold after every step
            list.verify().unwrap();
        }

        // The container holds exactly the model, in order
        let contents: Vec<u16> =
            list.iter_locations().map(|l| *list.get_ref(l).unwrap()).collect();
        prop_assert_eq!(&contents, &model);

        // Backward traversal from the last element reverses the forward walk
        let forward: Vec<Location> = list.iter_locations().collect();
        let mut backward = Vec::new();
        let mut cur = list.child_location(0, false).unwrap();
        while cur != 0 {
            backward.push(cur);
            cur = list.sibling_location(cur, false).unwrap();
        }
        backward.reverse();
        prop_assert_eq!(&backward, &forward);

        // Structural codec round-trip: same occupied set, same order
        let decoded = ListStore::decode_structure(&list.encode_structure(), model).unwrap();
        prop_assert_eq!(decoded.iter_locations().collect::<Vec<_>>(), forward);
        decoded.verify().unwrap();
    }
}

#[derive(Debug, Clone)]
enum TreeOp {
    InsertChild { parent: usize, value: u16 },
    InsertAfter { sibling: usize, value: u16 },
    Remove { pick: usize },
    Minimize,
}

fn tree_ops() -> impl Strategy<Value = Vec<TreeOp>> {
    prop::collection::vec(
        prop_oneof![
            3 => (any::<usize>(), any::<u16>())
                .prop_map(|(parent, value)| TreeOp::InsertChild { parent, value }),
            3 => (any::<usize>(), any::<u16>())
                .prop_map(|(sibling, value)| TreeOp::InsertAfter { sibling, value }),
            2 => any::<usize>().prop_map(|pick| TreeOp::Remove { pick }),
            1 => Just(TreeOp::Minimize),
        ],
        0..50,
    )
}

proptest! {
    #[test]
    fn tree_removal_is_postorder_and_codec_round_trips(ops in tree_ops()) {
        let mut tree: TreeStore<u16> = TreeStore::with_capacity(4);
        let events: Rc<RefCell<Vec<StoreEvent<u16>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        tree.add_observer(Box::new(move |e| {
            if e.is_removal() {
                sink.borrow_mut().push(e.clone());
            }
        }))
        .unwrap();

        let mut locs: Vec<Location> = Vec::new();
        for op in ops {
            match op {
                TreeOp::InsertChild { parent, value } => {
                    let p = if locs.is_empty() { 0 } else {
                        let i = parent % (locs.len() + 1);
                        if i == locs.len() { 0 } else { locs[i] }
                    };
                    let loc = tree.insert(InsertPos::FirstChildOf(p), value).unwrap();
                    locs.push(loc);
                }
                TreeOp::InsertAfter { sibling, value } => {
                    if locs.is_empty() {
                        let loc = tree.insert(InsertPos::After(0), value).unwrap();
                        locs.push(loc);
                    } else {
                        let s = locs[sibling % locs.len()];
                        let loc = tree.insert(InsertPos::After(s), value).unwrap();
                        locs.push(loc);
                    }
                }
                TreeOp::Remove { pick } => {
                    if !locs.is_empty() {
                        let target = locs[pick % locs.len()];
                        let parents: HashMap<Location, Location> = tree
                            .iter_locations()
                            .map(|l| (l, tree.parent_location(l).unwrap()))
                            .collect();
                        let in_subtree = |mut l: Location| loop {
                            if l == target {
                                return true;
                            }
                            if l == 0 {
                                return false;
                            }
                            l = parents[&l];
                        };
                        let expected: HashSet<Location> =
                            parents.keys().copied().filter(|&l| in_subtree(l)).collect();

                        events.borrow_mut().clear();
                        tree.remove_subtree(target).unwrap();

                        // k descendants emit exactly k + 1 events,
                        // never a node before any of its descendants
                        let seen = events.borrow();
                        prop_assert_eq!(seen.len(), expected.len());
                        let mut removed: HashSet<Location> = HashSet::new();
                        for event in seen.iter() {
                            let mut ancestor = parents[&event.location];
                            while ancestor != 0 {
                                prop_assert!(
                                    !removed.contains(&ancestor),
                                    "ancestor {} removed before {}",
                                    ancestor,
                                    event.location
                                );
                                ancestor = parents[&ancestor];
                            }
                            removed.insert(event.location);
                        }
                        prop_assert_eq!(removed, expected);
                        drop(seen);
                        locs = tree.iter_locations().collect();
                    }
                }
                TreeOp::Minimize => {
                    let once = tree.minimize_capacity();
                    prop_assert_eq!(once, tree.minimize_capacity());
                }
            }
            tree.verify().unwrap();
        }

        // Structural codec round-trip preserves preorder and parentage
        let values: Vec<u16> =
            tree.iter_locations().map(|l| *tree.get_ref(l).unwrap()).collect();
        let decoded = TreeStore::decode_structure(&tree.encode_structure(), values).unwrap();
        prop_assert_eq!(
            decoded.iter_locations().collect::<Vec<_>>(),
            tree.iter_locations().collect::<Vec<_>>()
        );
        for loc in tree.iter_locations() {
            prop_assert_eq!(
                decoded.parent_location(loc).unwrap(),
                tree.parent_location(loc).unwrap()
            );
        }
        decoded.verify().unwrap();
    }
}
