// Copyright (c) 2023 MASSA LABS <info@massa.net>

use super::tools::{chain_fixture, commitment_chain_from, EventCollector};
use crate::chain::ChainId;
use lattice_consensus_exports::error::ConsensusError;
use lattice_hash::Hash;
use lattice_models::commitment::Commitment;
use lattice_models::slot::Slot;

#[test]
fn test_initialize_root() {
    let fixture = chain_fixture(3);
    let root = fixture.manager.root_commitment();
    assert!(root.is_solid());
    assert_eq!(root.id(), fixture.genesis.id());
    assert_eq!(root.chain(), Some(ChainId(fixture.genesis.id())));

    // processing the root commitment again returns it as solid and known
    let (is_solid, chain) = fixture.manager.process_candidate_commitment(fixture.genesis);
    assert!(is_solid);
    assert_eq!(chain, Some(ChainId(fixture.genesis.id())));
}

#[test]
fn test_commitment_below_root_is_refused() {
    let fixture = chain_fixture(3);
    let mut below_root = EventCollector::new(&fixture.channels.commitment_below_root);

    // another slot-0 commitment that is not the root
    let stranger = Commitment::new(
        fixture.genesis.prev_id(),
        Slot(0),
        Hash::compute_from(b"other roots"),
    )
    .unwrap();
    let (is_solid, chain) = fixture.manager.process_candidate_commitment(stranger);
    assert!(!is_solid);
    assert!(chain.is_none());
    assert_eq!(below_root.drain(), vec![stranger.id()]);
}

#[test]
fn test_in_order_registration_extends_main_chain() {
    let fixture = chain_fixture(3);
    let chain = commitment_chain_from(&fixture.genesis, 3, "main");
    for commitment in &chain {
        let (is_solid, chain_id) = fixture.manager.process_candidate_commitment(*commitment);
        assert!(is_solid);
        assert_eq!(chain_id, Some(ChainId(fixture.genesis.id())));
    }
    assert_eq!(
        fixture.manager.chain_of(chain[2].id()),
        Some(ChainId(fixture.genesis.id()))
    );
}

#[test]
fn test_out_of_order_registration_requests_missing_parent() {
    let fixture = chain_fixture(3);
    let mut missing = EventCollector::new(&fixture.channels.commitment_missing);
    let mut received = EventCollector::new(&fixture.channels.missing_commitment_received);
    let mut requested = EventCollector::new(&fixture.channels.request_commitment);

    let chain = commitment_chain_from(&fixture.genesis, 2, "main");
    let (m1, m2) = (chain[0], chain[1]);

    // the child arrives first: its parent is synthesised and requested
    let (is_solid, _) = fixture.manager.process_candidate_commitment(m2);
    assert!(!is_solid);
    assert_eq!(missing.drain(), vec![m1.id()]);
    assert_eq!(requested.drain(), vec![m1.id()]);
    assert_eq!(fixture.manager.requested_commitments(), vec![m1.id()]);

    // the parent arrives: the placeholder is filled, the request stops, and
    // solidity propagates to the child
    let (is_solid, _) = fixture.manager.process_candidate_commitment(m1);
    assert!(is_solid);
    assert_eq!(received.drain(), vec![m1.id()]);
    assert!(fixture.manager.requested_commitments().is_empty());
    let m2_commitment = fixture.manager.commitment(&m2.id()).unwrap();
    assert!(m2_commitment.is_solid());
    assert_eq!(m2_commitment.chain(), Some(ChainId(fixture.genesis.id())));
}

#[test]
fn test_duplicate_registration_is_ignored() {
    let fixture = chain_fixture(3);
    let mut missing = EventCollector::new(&fixture.channels.commitment_missing);
    let chain = commitment_chain_from(&fixture.genesis, 1, "main");
    fixture.manager.process_candidate_commitment(chain[0]);
    fixture.manager.process_candidate_commitment(chain[0]);
    assert!(missing.drain().is_empty());
    let root = fixture.manager.root_commitment();
    assert_eq!(root.children(), vec![chain[0].id()]);
}

#[test]
fn test_commitments_walk_back_to_root() {
    let fixture = chain_fixture(3);
    let chain = commitment_chain_from(&fixture.genesis, 3, "main");
    for commitment in &chain {
        fixture.manager.process_candidate_commitment(*commitment);
    }

    let walked = fixture.manager.commitments(chain[2].id(), 4).unwrap();
    let walked_ids: Vec<_> = walked.iter().map(|c| c.id()).collect();
    assert_eq!(
        walked_ids,
        vec![
            chain[2].id(),
            chain[1].id(),
            chain[0].id(),
            fixture.genesis.id()
        ]
    );

    // walking past the root crosses the horizon
    assert!(matches!(
        fixture.manager.commitments(chain[2].id(), 5),
        Err(ConsensusError::CommitmentUnknown(_))
    ));
}

#[test]
fn test_set_root_commitment_advances_root() {
    let fixture = chain_fixture(3);
    let chain = commitment_chain_from(&fixture.genesis, 2, "main");
    for commitment in &chain {
        fixture.manager.process_candidate_commitment(*commitment);
    }

    fixture.manager.set_root_commitment(&chain[1]);
    assert_eq!(fixture.manager.root_commitment().id(), chain[1].id());

    // a commitment at or below the new root is now refused
    let mut below_root = EventCollector::new(&fixture.channels.commitment_below_root);
    let sibling = Commitment::new(
        fixture.genesis.id(),
        Slot(1),
        Hash::compute_from(b"sibling roots"),
    )
    .unwrap();
    fixture.manager.process_candidate_commitment(sibling);
    assert_eq!(below_root.drain(), vec![sibling.id()]);
}

#[test]
fn test_eviction_drops_chain_state() {
    let fixture = chain_fixture(3);
    let chain = commitment_chain_from(&fixture.genesis, 3, "main");
    for commitment in &chain {
        fixture.manager.process_candidate_commitment(*commitment);
    }

    fixture.manager.evict_until(Slot(2));
    assert!(fixture.manager.commitment(&chain[0].id()).is_none());
    assert!(fixture.manager.commitment(&chain[1].id()).is_none());
    assert!(fixture.manager.commitment(&chain[2].id()).is_some());
    // the root stays resolvable even though its slot storage is gone
    assert_eq!(
        fixture.manager.root_commitment().id(),
        fixture.genesis.id()
    );
}

#[test]
fn test_solidity_propagates_through_gap_fill() {
    let fixture = chain_fixture(3);
    let chain = commitment_chain_from(&fixture.genesis, 4, "main");

    // register everything except the first link
    for commitment in chain.iter().skip(1) {
        let (is_solid, _) = fixture.manager.process_candidate_commitment(*commitment);
        assert!(!is_solid);
    }
    // filling the gap solidifies the whole run
    let (is_solid, _) = fixture.manager.process_candidate_commitment(chain[0]);
    assert!(is_solid);
    for commitment in &chain {
        assert!(fixture
            .manager
            .commitment(&commitment.id())
            .unwrap()
            .is_solid());
    }
}
