// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::commands::ConsensusCommand;
use lattice_channel::sender::LatticeSender;
use lattice_consensus_exports::ConsensusManager;
use std::thread::JoinHandle;
use tracing::info;

pub struct ConsensusManagerImpl {
    pub(crate) consensus_thread: Option<(LatticeSender<ConsensusCommand>, JoinHandle<()>)>,
}

impl ConsensusManager for ConsensusManagerImpl {
    fn stop(&mut self) {
        info!("stopping consensus worker...");
        if let Some((tx, join_handle)) = self.consensus_thread.take() {
            let _ = tx.send(ConsensusCommand::Stop);
            drop(tx);
            join_handle
                .join()
                .expect("consensus thread panicked on try to join");
        }
        info!("consensus worker stopped");
    }
}
