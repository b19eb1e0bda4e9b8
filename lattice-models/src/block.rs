// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::block_id::{BlockId, BlockIdDeserializer, BlockIdSerializer};
use crate::commitment_id::{CommitmentId, CommitmentIdDeserializer, CommitmentIdSerializer};
use crate::error::ModelsError;
use crate::slot::{Slot, SlotDeserializer, SlotSerializer};
use lattice_hash::Hash;
use lattice_serialization::{
    Deserializer, SerializeError, Serializer, U32VarIntDeserializer, U32VarIntSerializer,
};
use lattice_time::{LatticeTime, LatticeTimeDeserializer, LatticeTimeSerializer};
use nom::bytes::complete::take;
use nom::error::{context, ContextError, ParseError};
use nom::multi::length_count;
use nom::IResult;
use serde::{Deserialize, Serialize};
use std::ops::Bound;

/// Maximum number of parents a block may reference, across all edge kinds
pub const MAX_BLOCK_PARENTS: u32 = 64;

/// Maximum byte size of a block payload
pub const MAX_BLOCK_PAYLOAD_SIZE: u32 = 1_000_000;

/// The kind of edge a parent reference represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParentKind {
    /// the parent is part of the causal history the block builds on
    Strong,
    /// the parent is referenced without endorsing its past cone
    Weak,
    /// the parent is liked instead of a conflicting alternative
    ShallowLike,
}

impl ParentKind {
    fn to_u8(self) -> u8 {
        match self {
            ParentKind::Strong => 0,
            ParentKind::Weak => 1,
            ParentKind::ShallowLike => 2,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ParentKind::Strong),
            1 => Some(ParentKind::Weak),
            2 => Some(ParentKind::ShallowLike),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ParentKind::Strong => write!(f, "strong"),
            ParentKind::Weak => write!(f, "weak"),
            ParentKind::ShallowLike => write!(f, "shallow-like"),
        }
    }
}

/// A typed parent reference of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent {
    /// referenced block
    pub id: BlockId,
    /// edge kind of the reference
    pub kind: ParentKind,
}

/// A gossiped block. The id is computed from the serialized content at
/// construction time and never trusted from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    issuing_time: LatticeTime,
    slot_commitment_id: CommitmentId,
    parents: Vec<Parent>,
    payload: Vec<u8>,
}

impl Block {
    /// Assembles a block and computes its content-derived id.
    pub fn new(
        slot: Slot,
        issuing_time: LatticeTime,
        slot_commitment_id: CommitmentId,
        parents: Vec<Parent>,
        payload: Vec<u8>,
    ) -> Result<Self, ModelsError> {
        let mut content = Vec::new();
        serialize_content(
            slot,
            issuing_time,
            &slot_commitment_id,
            &parents,
            &payload,
            &mut content,
        )?;
        let id = BlockId::new(slot, Hash::compute_from(&content));
        Ok(Block {
            id,
            issuing_time,
            slot_commitment_id,
            parents,
            payload,
        })
    }

    /// Content-derived block id
    pub const fn id(&self) -> BlockId {
        self.id
    }

    /// Slot the block belongs to
    pub const fn slot(&self) -> Slot {
        self.id.slot()
    }

    /// Wall-clock time the issuer stamped the block with
    pub const fn issuing_time(&self) -> LatticeTime {
        self.issuing_time
    }

    /// The slot commitment the issuer committed to when issuing this block
    pub const fn slot_commitment_id(&self) -> CommitmentId {
        self.slot_commitment_id
    }

    /// Typed parent references
    pub fn parents(&self) -> &[Parent] {
        &self.parents
    }

    /// Iterator over the referenced parent ids, all edge kinds included
    pub fn parent_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.parents.iter().map(|p| p.id)
    }

    /// Opaque payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

fn serialize_content(
    slot: Slot,
    issuing_time: LatticeTime,
    slot_commitment_id: &CommitmentId,
    parents: &[Parent],
    payload: &[u8],
    buffer: &mut Vec<u8>,
) -> Result<(), SerializeError> {
    let slot_serializer = SlotSerializer::new();
    let time_serializer = LatticeTimeSerializer::new();
    let commitment_id_serializer = CommitmentIdSerializer::new();
    let block_id_serializer = BlockIdSerializer::new();
    let u32_serializer = U32VarIntSerializer::new();

    slot_serializer.serialize(&slot, buffer)?;
    time_serializer.serialize(&issuing_time, buffer)?;
    commitment_id_serializer.serialize(slot_commitment_id, buffer)?;
    let parents_count: u32 = parents.len().try_into().map_err(|_| {
        SerializeError::NumberTooBig("number of block parents does not fit in u32".to_string())
    })?;
    u32_serializer.serialize(&parents_count, buffer)?;
    for parent in parents {
        buffer.push(parent.kind.to_u8());
        block_id_serializer.serialize(&parent.id, buffer)?;
    }
    let payload_len: u32 = payload.len().try_into().map_err(|_| {
        SerializeError::NumberTooBig("block payload size does not fit in u32".to_string())
    })?;
    u32_serializer.serialize(&payload_len, buffer)?;
    buffer.extend_from_slice(payload);
    Ok(())
}

/// Serializer for `Block`
#[derive(Default, Clone)]
pub struct BlockSerializer;

impl BlockSerializer {
    /// Creates a new serializer for `Block`
    pub fn new() -> Self {
        Self
    }
}

impl Serializer<Block> for BlockSerializer {
    fn serialize(&self, value: &Block, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        serialize_content(
            value.slot(),
            value.issuing_time,
            &value.slot_commitment_id,
            &value.parents,
            &value.payload,
            buffer,
        )
    }
}

/// Deserializer for `Block`. The id is recomputed from the decoded content.
#[derive(Clone)]
pub struct BlockDeserializer {
    slot_deserializer: SlotDeserializer,
    time_deserializer: LatticeTimeDeserializer,
    commitment_id_deserializer: CommitmentIdDeserializer,
    block_id_deserializer: BlockIdDeserializer,
    parents_count_deserializer: U32VarIntDeserializer,
    payload_len_deserializer: U32VarIntDeserializer,
}

impl BlockDeserializer {
    /// Creates a new deserializer for `Block`
    pub fn new() -> Self {
        Self {
            slot_deserializer: SlotDeserializer::default(),
            time_deserializer: LatticeTimeDeserializer::new(),
            commitment_id_deserializer: CommitmentIdDeserializer::new(),
            block_id_deserializer: BlockIdDeserializer::new(),
            parents_count_deserializer: U32VarIntDeserializer::new(
                Bound::Included(0),
                Bound::Included(MAX_BLOCK_PARENTS),
            ),
            payload_len_deserializer: U32VarIntDeserializer::new(
                Bound::Included(0),
                Bound::Included(MAX_BLOCK_PAYLOAD_SIZE),
            ),
        }
    }
}

impl Default for BlockDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<Block> for BlockDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Block, E> {
        context("Failed Block deserialization", |input: &'a [u8]| {
            let (rest, slot) = self.slot_deserializer.deserialize(input)?;
            let (rest, issuing_time) = self.time_deserializer.deserialize(rest)?;
            let (rest, slot_commitment_id) = self.commitment_id_deserializer.deserialize(rest)?;
            let (rest, parents) = length_count(
                |input| self.parents_count_deserializer.deserialize(input),
                |input: &'a [u8]| {
                    let (rest, kind_byte) = take(1usize)(input)?;
                    let kind = ParentKind::from_u8(kind_byte[0]).ok_or_else(|| {
                        nom::Err::Error(ParseError::from_error_kind(
                            input,
                            nom::error::ErrorKind::Fail,
                        ))
                    })?;
                    let (rest, id) = self.block_id_deserializer.deserialize(rest)?;
                    Ok((rest, Parent { id, kind }))
                },
            )(rest)?;
            let (rest, payload_len) = self.payload_len_deserializer.deserialize(rest)?;
            let (rest, payload) = take(payload_len as usize)(rest)?;
            let block = Block::new(
                slot,
                issuing_time,
                slot_commitment_id,
                parents,
                payload.to_vec(),
            )
            .map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Fail,
                ))
            })?;
            Ok((rest, block))
        })(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_serialization::DeserializeError;

    fn commitment_id(slot: u64, seed: &[u8]) -> CommitmentId {
        CommitmentId::new(Slot(slot), Hash::compute_from(seed))
    }

    #[test]
    fn test_block_id_is_content_derived() {
        let parents = vec![Parent {
            id: BlockId::new(Slot(1), Hash::compute_from(b"parent")),
            kind: ParentKind::Strong,
        }];
        let b1 = Block::new(
            Slot(2),
            LatticeTime::from_millis(1000),
            commitment_id(1, b"c1"),
            parents.clone(),
            vec![1, 2, 3],
        )
        .unwrap();
        let b2 = Block::new(
            Slot(2),
            LatticeTime::from_millis(1000),
            commitment_id(1, b"c1"),
            parents,
            vec![1, 2, 3],
        )
        .unwrap();
        assert_eq!(b1.id(), b2.id());
        assert_eq!(b1.id().slot(), Slot(2));
    }

    #[test]
    fn test_block_serialization_roundtrip() {
        let block = Block::new(
            Slot(3),
            LatticeTime::from_millis(42),
            commitment_id(2, b"commitment"),
            vec![
                Parent {
                    id: BlockId::new(Slot(2), Hash::compute_from(b"a")),
                    kind: ParentKind::Strong,
                },
                Parent {
                    id: BlockId::new(Slot(3), Hash::compute_from(b"b")),
                    kind: ParentKind::ShallowLike,
                },
            ],
            b"some payload".to_vec(),
        )
        .unwrap();
        let mut buffer = Vec::new();
        BlockSerializer::new().serialize(&block, &mut buffer).unwrap();
        let (rest, decoded) = BlockDeserializer::new()
            .deserialize::<DeserializeError>(&buffer)
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, block);
        assert_eq!(decoded.id(), block.id());
    }
}
