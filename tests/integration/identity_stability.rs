#![allow(missing_docs)]

use std::collections::HashMap;

use biograph::{
    builder::BuildContext,
    emit::{CsvEmitter, CsvOptions},
    identity::{Backing, IdentityCache, IdentityOptions, UidAllocator},
    model::{EntityType, Node},
    types::{BuildError, Uid},
};
use proptest::prelude::*;
use tempfile::TempDir;

fn context(dir: &TempDir) -> BuildContext {
    let emitter = CsvEmitter::create(dir.path().join("out"), CsvOptions::default()).expect("emitter");
    BuildContext::new(IdentityCache::in_memory(), emitter)
}

#[test]
fn same_gene_key_resolves_to_one_identity() {
    let dir = TempDir::new().expect("tempdir");
    let mut ctx = context(&dir);

    let first = ctx
        .resolve_or_create("BRCA1", EntityType::Gene, |uid| {
            Node::new(uid, EntityType::Gene, "BRCA1", "BRCA1")
        })
        .unwrap();
    let second = ctx
        .resolve_or_create("BRCA1", EntityType::Gene, |_| {
            panic!("factory must not run for a known key")
        })
        .unwrap();

    assert_eq!(first.uid, second.uid);
    assert!(first.created);
    assert!(!second.created);

    let finished = ctx.finish().unwrap();
    assert_eq!(finished.emitted.nodes.get("GENE"), Some(&1));
}

#[test]
fn key_spaces_are_separated_by_entity_type() {
    let mut cache = IdentityCache::in_memory();
    let mut alloc = UidAllocator::new();
    let gene = cache
        .resolve_or_create("X1", EntityType::Gene, &mut alloc, |_| Ok(()))
        .unwrap();
    let protein = cache
        .resolve_or_create("X1", EntityType::Protein, &mut alloc, |_| Ok(()))
        .unwrap();
    assert_ne!(gene.uid, protein.uid);
    assert_eq!(cache.len(), 2);
}

#[test]
fn conflicting_rebind_is_rejected() {
    let mut cache = IdentityCache::in_memory();
    cache.bind("TP53", EntityType::Gene, Uid(4)).unwrap();
    cache.bind("TP53", EntityType::Gene, Uid(4)).unwrap();
    let err = cache.bind("TP53", EntityType::Gene, Uid(9)).unwrap_err();
    assert!(matches!(
        err,
        BuildError::IdentityConflict { existing: Uid(4), attempted: Uid(9), .. }
    ));
}

#[test]
fn failing_factory_leaves_key_unbound() {
    let mut cache = IdentityCache::in_memory();
    let mut alloc = UidAllocator::new();
    let err = cache.resolve_or_create("ENSG1", EntityType::Gene, &mut alloc, |_| {
        Err(BuildError::resource("disk full"))
    });
    assert!(err.is_err());
    assert_eq!(cache.resolve("ENSG1", EntityType::Gene).unwrap(), None);
}

#[test]
fn disk_backing_survives_hot_tier_eviction() {
    let dir = TempDir::new().expect("tempdir");
    let opts = IdentityOptions {
        backing: Backing::Disk,
        path: Some(dir.path().join("identity.sqlite")),
        hot_capacity: 2,
        commit_every: 3,
    };
    let mut cache = IdentityCache::open(&opts).unwrap();
    let mut alloc = UidAllocator::new();
    let mut seen = Vec::new();
    for i in 0..10 {
        let key = format!("ENSG{i}");
        seen.push(cache.resolve_or_create(&key, EntityType::Gene, &mut alloc, |_| Ok(())).unwrap().uid);
    }
    cache.flush().unwrap();
    for (i, uid) in seen.iter().enumerate() {
        let key = format!("ENSG{i}");
        assert_eq!(cache.resolve(&key, EntityType::Gene).unwrap(), Some(*uid));
    }
    assert!(cache.stats().store_hits > 0);
}

proptest! {
    #[test]
    fn prop_identities_are_stable_and_distinct(
        keys in prop::collection::vec(("[A-Z]{1,3}[0-9]{0,2}", 0usize..3), 1..80)
    ) {
        let types = [EntityType::Gene, EntityType::Protein, EntityType::Mirna];
        let mut cache = IdentityCache::in_memory();
        let mut alloc = UidAllocator::new();
        let mut expected: HashMap<(String, usize), Uid> = HashMap::new();

        for (key, ty) in keys {
            let resolved = cache
                .resolve_or_create(&key, types[ty], &mut alloc, |_| Ok(()))
                .unwrap();
            match expected.get(&(key.clone(), ty)) {
                Some(uid) => {
                    prop_assert_eq!(*uid, resolved.uid);
                    prop_assert!(!resolved.created);
                }
                None => {
                    prop_assert!(resolved.created);
                    prop_assert!(!expected.values().any(|u| *u == resolved.uid));
                    expected.insert((key, ty), resolved.uid);
                }
            }
        }
        prop_assert_eq!(cache.len(), expected.len() as u64);
        prop_assert_eq!(alloc.peek(), Uid(expected.len() as u64 + 1));
    }
}
