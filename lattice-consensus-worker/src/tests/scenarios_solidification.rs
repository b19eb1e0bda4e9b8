// Copyright (c) 2023 MASSA LABS <info@massa.net>

use super::block_factory::BlockFactory;
use super::tools::{dag_fixture, EventCollector};
use lattice_consensus_exports::block_status::BlockStatus;
use lattice_models::slot::Slot;
use lattice_time::LatticeTime;

#[test]
fn test_linear_solidification_out_of_order() {
    let fixture = dag_fixture();
    let mut attached = EventCollector::new(&fixture.channels.block_attached);
    let mut missing = EventCollector::new(&fixture.channels.block_missing);
    let mut missing_attached = EventCollector::new(&fixture.channels.missing_block_attached);
    let mut solid = EventCollector::new(&fixture.channels.block_solid);
    let mut invalid = EventCollector::new(&fixture.channels.block_invalid);

    let mut factory = BlockFactory::new(fixture.genesis.id());
    let b1 = factory.block(Slot(1), &[fixture.genesis_block.id]);
    let b2 = factory.block(Slot(2), &[b1.id()]);
    let b3 = factory.block(Slot(2), &[b2.id()]);

    // receive B1, then B3 (whose parent B2 is unknown), then B2
    fixture.dag.attach(b1.clone()).unwrap();
    assert_eq!(attached.drain(), vec![b1.id()]);
    assert_eq!(solid.drain(), vec![b1.id()]);

    fixture.dag.attach(b3.clone()).unwrap();
    assert_eq!(attached.drain(), vec![b3.id()]);
    assert_eq!(missing.drain(), vec![b2.id()]);
    assert!(solid.drain().is_empty());

    fixture.dag.attach(b2.clone()).unwrap();
    assert_eq!(missing_attached.drain(), vec![b2.id()]);
    assert_eq!(attached.drain(), vec![b2.id()]);
    assert_eq!(solid.drain(), vec![b2.id(), b3.id()]);

    assert!(invalid.drain().is_empty());
    for block in [&b1, &b2, &b3] {
        assert_eq!(fixture.dag.block_status(&block.id()), BlockStatus::Solid);
    }
}

#[test]
fn test_commitment_monotonicity_violation() {
    let fixture = dag_fixture();
    let c1 = fixture.store.commit_until(Slot(1));

    let mut solid = EventCollector::new(&fixture.channels.block_solid);
    let mut invalid = EventCollector::new(&fixture.channels.block_invalid);

    let mut factory = BlockFactory::new(c1.id());
    // B1 commits to slot 1, its child B2 commits back to slot 0
    let b1 = factory.block(Slot(1), &[fixture.genesis_block.id]);
    let b2 = factory.block_with_commitment(Slot(2), fixture.genesis.id(), &[b1.id()]);

    fixture.dag.attach(b1.clone()).unwrap();
    fixture.dag.attach(b2.clone()).unwrap();

    assert_eq!(solid.drain(), vec![b1.id()]);
    let invalid_events = invalid.drain();
    assert_eq!(invalid_events.len(), 1);
    assert_eq!(invalid_events[0].block_id, b2.id());
    assert!(invalid_events[0]
        .reason
        .contains("commitment monotonicity check failed"));
    assert_eq!(fixture.dag.block_status(&b2.id()), BlockStatus::Invalid);
}

#[test]
fn test_timestamp_monotonicity_violation() {
    let fixture = dag_fixture();
    let mut solid = EventCollector::new(&fixture.channels.block_solid);
    let mut invalid = EventCollector::new(&fixture.channels.block_invalid);

    let mut factory = BlockFactory::new(fixture.genesis.id());
    let b1 = factory.block_with_time(
        Slot(1),
        LatticeTime::from_millis(2_000),
        &[fixture.genesis_block.id],
    );
    // the child is stamped before its parent
    let b2 = factory.block_with_time(Slot(2), LatticeTime::from_millis(1_000), &[b1.id()]);

    fixture.dag.attach(b1.clone()).unwrap();
    fixture.dag.attach(b2.clone()).unwrap();

    assert_eq!(solid.drain(), vec![b1.id()]);
    let invalid_events = invalid.drain();
    assert_eq!(invalid_events.len(), 1);
    assert_eq!(invalid_events[0].block_id, b2.id());
    assert!(invalid_events[0]
        .reason
        .contains("timestamp monotonicity check failed"));
}

#[test]
fn test_invalidity_propagates_to_waiting_descendants() {
    let fixture = dag_fixture();
    let c1 = fixture.store.commit_until(Slot(1));

    let mut invalid = EventCollector::new(&fixture.channels.block_invalid);
    let mut solid = EventCollector::new(&fixture.channels.block_solid);

    let mut factory = BlockFactory::new(c1.id());
    let b1 = factory.block(Slot(1), &[fixture.genesis_block.id]);
    // bad commits backwards relative to its parent and will be rejected
    let bad = factory.block_with_commitment(Slot(2), fixture.genesis.id(), &[b1.id()]);
    let waiting = factory.block(Slot(3), &[bad.id()]);

    fixture.dag.attach(b1.clone()).unwrap();
    // the descendant arrives before its parent and waits on it
    fixture.dag.attach(waiting.clone()).unwrap();
    fixture.dag.attach(bad.clone()).unwrap();

    let invalid_ids: Vec<_> = invalid.drain().into_iter().map(|e| e.block_id).collect();
    assert_eq!(invalid_ids, vec![bad.id(), waiting.id()]);
    assert_eq!(solid.drain(), vec![b1.id()]);

    // a late child of an invalid block is rejected on arrival
    let late = factory.block(Slot(3), &[bad.id()]);
    fixture.dag.attach(late.clone()).unwrap();
    let invalid_ids: Vec<_> = invalid.drain().into_iter().map(|e| e.block_id).collect();
    assert_eq!(invalid_ids, vec![late.id()]);
}

#[test]
fn test_double_attach_is_ignored() {
    let fixture = dag_fixture();
    let mut attached = EventCollector::new(&fixture.channels.block_attached);
    let mut solid = EventCollector::new(&fixture.channels.block_solid);

    let mut factory = BlockFactory::new(fixture.genesis.id());
    let b1 = factory.block(Slot(1), &[fixture.genesis_block.id]);

    let (_, was_new) = fixture.dag.attach(b1.clone()).unwrap();
    assert!(was_new);
    let (_, was_new) = fixture.dag.attach(b1.clone()).unwrap();
    assert!(!was_new);

    assert_eq!(attached.drain(), vec![b1.id()]);
    assert_eq!(solid.drain(), vec![b1.id()]);
}

#[test]
fn test_solidity_closure_on_reversed_chain() {
    let fixture = dag_fixture();
    let mut solid = EventCollector::new(&fixture.channels.block_solid);

    let mut factory = BlockFactory::new(fixture.genesis.id());
    let mut blocks = Vec::new();
    let mut parent_id = fixture.genesis_block.id;
    for index in 1..=5u64 {
        let block = factory.block(Slot(index), &[parent_id]);
        parent_id = block.id();
        blocks.push(block);
    }

    // attach newest first: everything waits until the slot-1 block arrives
    for block in blocks.iter().rev() {
        fixture.dag.attach(block.clone()).unwrap();
    }

    let solid_ids = solid.drain();
    assert_eq!(solid_ids.len(), 5);
    assert_eq!(
        solid_ids,
        blocks.iter().map(|b| b.id()).collect::<Vec<_>>()
    );
    for block in &blocks {
        assert_eq!(fixture.dag.block_status(&block.id()), BlockStatus::Solid);
    }
}

#[test]
fn test_attach_below_eviction_horizon_is_refused() {
    let fixture = dag_fixture();
    let mut factory = BlockFactory::new(fixture.genesis.id());
    let b1 = factory.block(Slot(1), &[fixture.genesis_block.id]);
    let b2 = factory.block(Slot(2), &[b1.id()]);

    fixture.dag.attach(b1.clone()).unwrap();
    fixture.dag.evict_until(Slot(1));

    // the evicted block is gone and cannot be re-attached
    assert_eq!(fixture.dag.block_status(&b1.id()), BlockStatus::NotFound);
    assert!(fixture.dag.attach(b1).is_err());
    // a block referencing an evicted non-root parent is refused as well
    assert!(fixture.dag.attach(b2).is_err());
}

#[test]
fn test_orphaned_block_fires_event_once() {
    let fixture = dag_fixture();
    let mut orphaned = EventCollector::new(&fixture.channels.block_orphaned);

    let mut factory = BlockFactory::new(fixture.genesis.id());
    let b1 = factory.block(Slot(1), &[fixture.genesis_block.id]);
    let (block, _) = fixture.dag.attach(b1.clone()).unwrap();

    assert!(fixture.dag.set_orphaned(&block));
    assert!(!fixture.dag.set_orphaned(&block));
    assert_eq!(orphaned.drain(), vec![b1.id()]);
    assert_eq!(fixture.dag.block_status(&b1.id()), BlockStatus::Orphaned);
}
