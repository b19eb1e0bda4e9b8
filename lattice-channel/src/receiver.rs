use std::ops::{Deref, DerefMut};

use crossbeam::channel::{Receiver, RecvError, TryRecvError};
use tracing::debug;

#[derive(Clone)]
pub struct LatticeReceiver<T> {
    pub(crate) receiver: Receiver<T>,
    pub(crate) name: String,
}

impl<T> LatticeReceiver<T> {
    /// attempt to receive a message from the channel
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        match self.receiver.try_recv() {
            Ok(msg) => Ok(msg),
            Err(TryRecvError::Empty) => Err(TryRecvError::Empty),
            Err(TryRecvError::Disconnected) => {
                debug!("channel {} disconnected", self.name);
                Err(TryRecvError::Disconnected)
            }
        }
    }

    pub fn recv(&self) -> Result<T, RecvError> {
        match self.receiver.recv() {
            Ok(msg) => Ok(msg),
            Err(e) => {
                debug!("channel {} disconnected", self.name);
                Err(e)
            }
        }
    }

    /// Name the channel was created with
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Deref for LatticeReceiver<T> {
    type Target = Receiver<T>;

    fn deref(&self) -> &Self::Target {
        &self.receiver
    }
}

impl<T> DerefMut for LatticeReceiver<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.receiver
    }
}
