#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can reach
// diagnostics alongside the public API.

use crate::failure::TableError;
use crate::fnv::{fnv1a, FNV_SEED};
use crate::hash_table::{Handle, StringTable};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    Replace(usize, i32),
    Remove(usize),
    RemoveTwice(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::RemoveTwice),
            idx.clone().prop_map(OpI::Get),
            prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Runs `ops` against a table with `buckets` chains and a std HashMap model.
// Invariants checked after every op:
// - lookup results and `len` match the model;
// - every handle of a removed entry stays stale;
// - chain lengths sum to `len` and iteration visits buckets in index order.
fn run_state_machine(
    buckets: usize,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut sut: StringTable<String, i32> = StringTable::for_strings(buckets).unwrap();
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut live: HashMap<String, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.insert(k.clone(), v) {
                    Ok(h) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        live.insert(k.clone(), h);
                        model.insert(k, v);
                    }
                    Err(TableError::DuplicateKey) => prop_assert!(already),
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::InsertWith(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                let mut ran = false;
                match sut.insert_with(k.clone(), || {
                    ran = true;
                    v
                }) {
                    Ok(h) => {
                        prop_assert!(!already);
                        live.insert(k.clone(), h);
                        model.insert(k, v);
                    }
                    Err(_) => prop_assert!(already),
                }
                prop_assert_eq!(ran, !already, "default runs only on success");
            }
            OpI::Replace(i, v) => {
                let k = pool[i].clone();
                let prev = sut.replace(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k.clone(), v));
                if prev.is_none() {
                    let h = sut.find(k.as_str()).expect("replaced key present");
                    live.insert(k, h);
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k.as_str()), model.remove(k));
                if let Some(h) = live.remove(k) {
                    stale.push(h);
                }
            }
            OpI::RemoveTwice(i) => {
                let k = &pool[i];
                let first = sut.remove_entry(k.as_str());
                prop_assert_eq!(first.map(|(_, v)| v), model.remove(k));
                prop_assert!(sut.remove(k.as_str()).is_none(), "second remove misses");
                if let Some(h) = live.remove(k) {
                    stale.push(h);
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k.as_str()), model.get(k));
                if let Some(h) = sut.find(k.as_str()) {
                    prop_assert_eq!(Some(&h), live.get(k));
                }
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model.contains_key(&s));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(&h) = live.get(k) {
                    let vr = h.value_mut(&mut sut);
                    prop_assert!(vr.is_some(), "live handle should resolve");
                    if let Some(vr) = vr {
                        *vr = vr.saturating_add(d);
                    }
                    if let Some(mv) = model.get_mut(k) {
                        *mv = mv.saturating_add(d);
                    }
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());

        let chained: usize = (0..buckets).filter_map(|b| sut.chain_len(b)).sum();
        prop_assert_eq!(chained, sut.len());
        let order: Vec<usize> = sut.keys().map(|k| sut.bucket_of(k.as_str())).collect();
        prop_assert!(order.windows(2).all(|w| w[0] <= w[1]), "bucket order: {:?}", order);
        for k in sut.keys() {
            let expected = (fnv1a(k.as_bytes(), FNV_SEED) as usize) % buckets;
            prop_assert_eq!(sut.bucket_of(k.as_str()), expected);
        }
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap
// with a typical bucket count.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(8, &pool, ops)?;
    }
}

// Property: the same invariants with a single bucket, so every key shares
// one chain and every lookup resolves by equality alone.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_single_bucket((pool, ops) in arb_scenario()) {
        run_state_machine(1, &pool, ops)?;
    }
}

proptest! {
    // Equal byte strings hash and compare equal; distinct ones never compare equal.
    #[test]
    fn prop_hash_equality_consistency(a in "[a-c]{0,4}", b in "[a-c]{0,4}") {
        use crate::fnv::{StringEq, StringHash};
        use crate::strategy::{EqualityStrategy, HashStrategy};
        let h = StringHash::new();
        if a == b {
            prop_assert_eq!(h.hash_key(a.as_str()), h.hash_key(b.as_str()));
            prop_assert!(StringEq.equals(a.as_str(), b.as_str()));
        } else {
            prop_assert!(!StringEq.equals(a.as_str(), b.as_str()));
        }
    }

    #[test]
    fn prop_fnv_deterministic(bytes in proptest::collection::vec(1u8..=255, 0..32), seed in any::<u32>()) {
        prop_assert_eq!(fnv1a(&bytes, seed), fnv1a(&bytes, seed));
        if bytes.is_empty() {
            prop_assert_eq!(fnv1a(&bytes, seed), 0);
        }
    }
}
