//! Lattice Channel is a crossbeam channel wrapper that names each channel so
//! that the endpoints can be traced across threads.
//!
//! # Example
//! ```
//! use lattice_channel::LatticeChannel;
//! let (sender, receiver) = LatticeChannel::new::<String>("test".to_string(), None);
//! ```

use receiver::LatticeReceiver;
use sender::LatticeSender;

pub mod receiver;
pub mod sender;

#[derive(Clone)]
pub struct LatticeChannel {}

impl LatticeChannel {
    #[allow(clippy::new_ret_no_self)]
    pub fn new<T>(name: String, capacity: Option<usize>) -> (LatticeSender<T>, LatticeReceiver<T>) {
        let (s, r) = if let Some(capacity) = capacity {
            crossbeam::channel::bounded::<T>(capacity)
        } else {
            crossbeam::channel::unbounded::<T>()
        };

        let sender = LatticeSender {
            sender: s,
            name: name.clone(),
        };

        let receiver = LatticeReceiver { receiver: r, name };

        (sender, receiver)
    }
}
