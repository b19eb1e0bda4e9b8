// Copyright (c) 2023 MASSA LABS <info@massa.net>
//! Content hashing used for block, commitment and identity ids.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod error;
mod hash;
mod settings;

pub use error::LatticeHashError;
pub use hash::{Hash, HashDeserializer, HashSerializer};
pub use settings::HASH_SIZE_BYTES;
