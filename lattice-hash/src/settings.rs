// Copyright (c) 2023 MASSA LABS <info@massa.net>

/// Size in bytes of a serialized `Hash`
pub const HASH_SIZE_BYTES: usize = 32;
