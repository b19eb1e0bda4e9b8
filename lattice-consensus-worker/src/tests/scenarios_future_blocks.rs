// Copyright (c) 2023 MASSA LABS <info@massa.net>

use super::block_factory::BlockFactory;
use super::tools::{commitment_for, dag_fixture, EventCollector};
use lattice_consensus_exports::block_status::BlockStatus;
use lattice_models::slot::Slot;

#[test]
fn test_future_parking_and_promotion() {
    let fixture = dag_fixture();
    // the local node has only committed up to slot 4
    fixture.store.commit_until(Slot(4));
    let c7 = commitment_for(Slot(7));

    let mut solid = EventCollector::new(&fixture.channels.block_solid);

    let mut factory = BlockFactory::new(c7.id());
    let block = factory.block(Slot(5), &[fixture.genesis_block.id]);
    fixture.dag.attach(block.clone()).unwrap();

    // parked: flagged future, no solid event
    assert!(solid.drain().is_empty());
    assert_eq!(fixture.dag.block_status(&block.id()), BlockStatus::Future);

    // commit slots 5..=7 and promote
    fixture.store.commit_until(Slot(7));
    fixture.dag.promote_future_blocks_until(Slot(7));

    assert_eq!(solid.drain(), vec![block.id()]);
    assert_eq!(fixture.dag.block_status(&block.id()), BlockStatus::Solid);
}

#[test]
fn test_promotion_is_idempotent() {
    let fixture = dag_fixture();
    fixture.store.commit_until(Slot(4));
    let c6 = commitment_for(Slot(6));

    let mut solid = EventCollector::new(&fixture.channels.block_solid);

    let mut factory = BlockFactory::new(c6.id());
    let block = factory.block(Slot(5), &[fixture.genesis_block.id]);
    fixture.dag.attach(block.clone()).unwrap();

    fixture.store.commit_until(Slot(6));
    fixture.dag.promote_future_blocks_until(Slot(6));
    fixture.dag.promote_future_blocks_until(Slot(6));

    // promoted exactly once
    assert_eq!(solid.drain(), vec![block.id()]);
}

#[test]
fn test_children_of_parked_block_wait_for_promotion() {
    let fixture = dag_fixture();
    fixture.store.commit_until(Slot(4));
    let c6 = commitment_for(Slot(6));

    let mut solid = EventCollector::new(&fixture.channels.block_solid);

    let mut factory = BlockFactory::new(c6.id());
    let parked = factory.block(Slot(5), &[fixture.genesis_block.id]);
    let child = factory.block(Slot(6), &[parked.id()]);

    fixture.dag.attach(parked.clone()).unwrap();
    fixture.dag.attach(child.clone()).unwrap();

    // neither solidifies while the declared slot is uncommitted
    assert!(solid.drain().is_empty());
    assert_eq!(fixture.dag.block_status(&parked.id()), BlockStatus::Future);
    assert_eq!(fixture.dag.block_status(&child.id()), BlockStatus::Attached);

    fixture.store.commit_until(Slot(6));
    fixture.dag.promote_future_blocks_until(Slot(6));

    // the parked block solidifies first, its child follows
    assert_eq!(solid.drain(), vec![parked.id(), child.id()]);
}

#[test]
fn test_blocks_parked_under_unsealed_commitment_stay_parked() {
    let fixture = dag_fixture();
    fixture.store.commit_until(Slot(4));

    // the block commits to a slot-6 commitment that the local pipeline will
    // never produce (different roots)
    let alien = super::tools::commitment_chain_from(&commitment_for(Slot(5)), 1, "alien")
        .pop()
        .unwrap();
    assert_eq!(alien.slot(), Slot(6));

    let mut solid = EventCollector::new(&fixture.channels.block_solid);

    let mut factory = BlockFactory::new(alien.id());
    let block = factory.block(Slot(5), &[fixture.genesis_block.id]);
    fixture.dag.attach(block.clone()).unwrap();
    assert_eq!(fixture.dag.block_status(&block.id()), BlockStatus::Future);

    fixture.store.commit_until(Slot(6));
    fixture.dag.promote_future_blocks_until(Slot(6));

    // the local slot-6 commitment differs from the declared one: the bucket
    // is dropped and the block never solidifies
    assert!(solid.drain().is_empty());
    assert_eq!(fixture.dag.block_status(&block.id()), BlockStatus::Future);
}
