use std::ops::Deref;

use crossbeam::channel::{SendError, Sender};

#[derive(Clone, Debug)]
pub struct LatticeSender<T> {
    pub(crate) sender: Sender<T>,
    #[allow(dead_code)]
    pub(crate) name: String,
}

impl<T> LatticeSender<T> {
    /// Send a message to the channel
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        self.sender.send(msg)
    }

    /// Name the channel was created with
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Deref for LatticeSender<T> {
    type Target = Sender<T>;

    fn deref(&self) -> &Self::Target {
        &self.sender
    }
}
