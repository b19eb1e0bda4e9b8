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

/// Identifier of a slot commitment, factored as (slot, content hash) like a
/// block id.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct CommitmentId {
    slot: Slot,
    hash: Hash,
}

impl PreHashed for CommitmentId {}

const COMMITMENTID_PREFIX: char = 'C';
const COMMITMENTID_VERSION: u64 = 0;

impl CommitmentId {
    /// Builds a commitment id from its factors
    pub const fn new(slot: Slot, hash: Hash) -> Self {
        CommitmentId { slot, hash }
    }

    /// Slot the commitment seals
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// Hash of the commitment content
    pub const fn hash(&self) -> Hash {
        self.hash
    }
}

impl std::fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let u64_serializer = U64VarIntSerializer::new();
        let mut bytes: Vec<u8> = Vec::new();
        u64_serializer
            .serialize(&COMMITMENTID_VERSION, &mut bytes)
            .map_err(|_| std::fmt::Error)?;
        u64_serializer
            .serialize(&self.slot.0, &mut bytes)
            .map_err(|_| std::fmt::Error)?;
        bytes.extend(self.hash.to_bytes());
        write!(
            f,
            "{}{}",
            COMMITMENTID_PREFIX,
            bs58::encode(bytes).with_check().into_string()
        )
    }
}

impl std::fmt::Debug for CommitmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for CommitmentId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(prefix) if prefix == COMMITMENTID_PREFIX => {
                let data = chars.collect::<String>();
                let decoded_bs58_check = bs58::decode(data)
                    .with_check(None)
                    .into_vec()
                    .map_err(|_| ModelsError::CommitmentIdParseError)?;
                let u64_deserializer = U64VarIntDeserializer::new(Included(0), Included(u64::MAX));
                let (rest, _version) = u64_deserializer
                    .deserialize::<DeserializeError>(&decoded_bs58_check[..])
                    .map_err(|_| ModelsError::CommitmentIdParseError)?;
                let (rest, slot) = u64_deserializer
                    .deserialize::<DeserializeError>(rest)
                    .map_err(|_| ModelsError::CommitmentIdParseError)?;
                Ok(CommitmentId::new(
                    Slot(slot),
                    Hash::from_bytes(
                        rest.try_into()
                            .map_err(|_| ModelsError::CommitmentIdParseError)?,
                    ),
                ))
            }
            _ => Err(ModelsError::CommitmentIdParseError),
        }
    }
}

/// Serializer for `CommitmentId`
#[derive(Default, Clone)]
pub struct CommitmentIdSerializer {
    slot_serializer: SlotSerializer,
}

impl CommitmentIdSerializer {
    /// Creates a new serializer for `CommitmentId`
    pub fn new() -> Self {
        Self {
            slot_serializer: SlotSerializer::new(),
        }
    }
}

impl Serializer<CommitmentId> for CommitmentIdSerializer {
    fn serialize(&self, value: &CommitmentId, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.slot_serializer.serialize(&value.slot, buffer)?;
        buffer.extend(value.hash.to_bytes());
        Ok(())
    }
}

/// Deserializer for `CommitmentId`
#[derive(Default, Clone)]
pub struct CommitmentIdDeserializer {
    slot_deserializer: SlotDeserializer,
    hash_deserializer: HashDeserializer,
}

impl CommitmentIdDeserializer {
    /// Creates a new deserializer for `CommitmentId`
    pub fn new() -> Self {
        Self {
            slot_deserializer: SlotDeserializer::default(),
            hash_deserializer: HashDeserializer::new(),
        }
    }
}

impl Deserializer<CommitmentId> for CommitmentIdDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], CommitmentId, E> {
        context("Failed CommitmentId deserialization", |input| {
            let (rest, slot) = self.slot_deserializer.deserialize(input)?;
            let (rest, hash) = self.hash_deserializer.deserialize(rest)?;
            Ok((rest, CommitmentId::new(slot, hash)))
        })(buffer)
    }
}
