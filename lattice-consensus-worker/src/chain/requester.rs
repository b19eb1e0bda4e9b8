// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_consensus_exports::channels::ChainManagerChannels;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::prehash::PreHashMap;
use lattice_models::slot::Slot;
use lattice_time::LatticeTime;
use parking_lot::Mutex;
use tracing::debug;

/// Drives the retransmission of unknown commitments: a ticker is started when
/// a commitment turns out to be missing, re-fires `request_commitment`
/// periodically, and is stopped when the commitment arrives or falls below
/// the root. Eviction forgets tickers wholesale.
pub(crate) struct CommitmentRequester {
    channels: ChainManagerChannels,
    period: LatticeTime,
    /// pending commitment ids with their next fire time
    pending: Mutex<PreHashMap<CommitmentId, LatticeTime>>,
}

impl CommitmentRequester {
    pub(crate) fn new(channels: ChainManagerChannels, period: LatticeTime) -> Self {
        CommitmentRequester {
            channels,
            period,
            pending: Mutex::new(PreHashMap::default()),
        }
    }

    /// Starts requesting a commitment: fires `request_commitment` right away
    /// and schedules retransmissions.
    pub(crate) fn start_ticker(&self, id: CommitmentId) {
        let mut pending = self.pending.lock();
        if pending.contains_key(&id) {
            return;
        }
        let _ = self.channels.request_commitment.send(id);
        let next = LatticeTime::now()
            .unwrap_or(LatticeTime::from_millis(0))
            .saturating_add(self.period);
        pending.insert(id, next);
    }

    /// Stops requesting a commitment
    pub(crate) fn stop_ticker(&self, id: &CommitmentId) {
        self.pending.lock().remove(id);
    }

    /// Forgets all pending requests at or below `slot`
    pub(crate) fn evict_until(&self, slot: Slot) {
        self.pending.lock().retain(|id, _| id.slot() > slot);
    }

    /// Re-fires every due request and returns the next deadline, if any
    /// request is still pending.
    pub(crate) fn tick(&self) -> Option<LatticeTime> {
        let now = LatticeTime::now().unwrap_or(LatticeTime::from_millis(0));
        let mut pending = self.pending.lock();
        let mut next_deadline: Option<LatticeTime> = None;
        for (id, next) in pending.iter_mut() {
            if *next <= now {
                debug!("re-requesting missing commitment {}", id);
                let _ = self.channels.request_commitment.send(*id);
                *next = now.saturating_add(self.period);
            }
            next_deadline = Some(match next_deadline {
                Some(deadline) => deadline.min(*next),
                None => *next,
            });
        }
        next_deadline
    }

    /// Ids currently being requested
    pub(crate) fn pending_ids(&self) -> Vec<CommitmentId> {
        self.pending.lock().keys().copied().collect()
    }
}
