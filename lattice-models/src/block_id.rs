// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use crate::prehash::PreHashed;
use crate::slot::{Slot, SlotDeserializer, SlotSerializer};
use lattice_hash::{Hash, HashDeserializer};
use lattice_serialization::{
    DeserializeError, Deserializer, SerializeError, Serializer, U64VarIntDeserializer,
    U64VarIntSerializer,
};
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::collections::Bound::Included;
use std::str::FromStr;

/// Identifier of a block. It factors as the slot the block belongs to and the
/// hash of the block content, so that the slot can be recovered from the id
/// alone (needed for slot-indexed storage and eviction decisions).
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct BlockId {
    slot: Slot,
    hash: Hash,
}

impl PreHashed for BlockId {}

const BLOCKID_PREFIX: char = 'B';
const BLOCKID_VERSION: u64 = 0;

impl BlockId {
    /// Builds a block id from its factors
    pub const fn new(slot: Slot, hash: Hash) -> Self {
        BlockId { slot, hash }
    }

    /// Slot the block belongs to
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// Hash of the block content
    pub const fn hash(&self) -> Hash {
        self.hash
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let u64_serializer = U64VarIntSerializer::new();
        let mut bytes: Vec<u8> = Vec::new();
        u64_serializer
            .serialize(&BLOCKID_VERSION, &mut bytes)
            .map_err(|_| std::fmt::Error)?;
        u64_serializer
            .serialize(&self.slot.0, &mut bytes)
            .map_err(|_| std::fmt::Error)?;
        bytes.extend(self.hash.to_bytes());
        write!(
            f,
            "{}{}",
            BLOCKID_PREFIX,
            bs58::encode(bytes).with_check().into_string()
        )
    }
}

impl std::fmt::Debug for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for BlockId {
    type Err = ModelsError;
    /// ## Example
    /// ```rust
    /// # use lattice_hash::Hash;
    /// # use std::str::FromStr;
    /// # use lattice_models::block_id::BlockId;
    /// # use lattice_models::slot::Slot;
    /// # let block_id = BlockId::new(Slot(4), Hash::compute_from(b"test"));
    /// let ser = block_id.to_string();
    /// let res_block_id = BlockId::from_str(&ser).unwrap();
    /// assert_eq!(block_id, res_block_id);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(prefix) if prefix == BLOCKID_PREFIX => {
                let data = chars.collect::<String>();
                let decoded_bs58_check = bs58::decode(data)
                    .with_check(None)
                    .into_vec()
                    .map_err(|_| ModelsError::BlockIdParseError)?;
                let u64_deserializer = U64VarIntDeserializer::new(Included(0), Included(u64::MAX));
                let (rest, _version) = u64_deserializer
                    .deserialize::<DeserializeError>(&decoded_bs58_check[..])
                    .map_err(|_| ModelsError::BlockIdParseError)?;
                let (rest, slot) = u64_deserializer
                    .deserialize::<DeserializeError>(rest)
                    .map_err(|_| ModelsError::BlockIdParseError)?;
                Ok(BlockId::new(
                    Slot(slot),
                    Hash::from_bytes(
                        rest.try_into()
                            .map_err(|_| ModelsError::BlockIdParseError)?,
                    ),
                ))
            }
            _ => Err(ModelsError::BlockIdParseError),
        }
    }
}

/// Serializer for `BlockId`
#[derive(Default, Clone)]
pub struct BlockIdSerializer {
    slot_serializer: SlotSerializer,
}

impl BlockIdSerializer {
    /// Creates a new serializer for `BlockId`
    pub fn new() -> Self {
        Self {
            slot_serializer: SlotSerializer::new(),
        }
    }
}

impl Serializer<BlockId> for BlockIdSerializer {
    fn serialize(&self, value: &BlockId, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.slot_serializer.serialize(&value.slot, buffer)?;
        buffer.extend(value.hash.to_bytes());
        Ok(())
    }
}

/// Deserializer for `BlockId`
#[derive(Default, Clone)]
pub struct BlockIdDeserializer {
    slot_deserializer: SlotDeserializer,
    hash_deserializer: HashDeserializer,
}

impl BlockIdDeserializer {
    /// Creates a new deserializer for `BlockId`
    pub fn new() -> Self {
        Self {
            slot_deserializer: SlotDeserializer::default(),
            hash_deserializer: HashDeserializer::new(),
        }
    }
}

impl Deserializer<BlockId> for BlockIdDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], BlockId, E> {
        context("Failed BlockId deserialization", |input| {
            let (rest, slot) = self.slot_deserializer.deserialize(input)?;
            let (rest, hash) = self.hash_deserializer.deserialize(rest)?;
            Ok((rest, BlockId::new(slot, hash)))
        })(buffer)
    }
}
