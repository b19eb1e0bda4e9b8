// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::commitment_id::{CommitmentId, CommitmentIdDeserializer, CommitmentIdSerializer};
use crate::error::ModelsError;
use crate::slot::{Slot, SlotDeserializer, SlotSerializer};
use lattice_hash::{Hash, HashDeserializer};
use lattice_serialization::{Deserializer, SerializeError, Serializer};
use nom::error::{context, ContextError, ParseError};
use nom::IResult;

/// A slot commitment: the sealed summary of the ledger state up to a slot,
/// chained to its predecessor by hash. Its id is the hash of the serialized
/// `(prev_id, slot, roots_id)` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    id: CommitmentId,
    prev_id: CommitmentId,
    slot: Slot,
    roots_id: Hash,
}

impl Commitment {
    /// Assembles a commitment and computes its content-derived id.
    pub fn new(prev_id: CommitmentId, slot: Slot, roots_id: Hash) -> Result<Self, ModelsError> {
        let mut content = Vec::new();
        serialize_content(&prev_id, slot, &roots_id, &mut content)?;
        let id = CommitmentId::new(slot, Hash::compute_from(&content));
        Ok(Commitment {
            id,
            prev_id,
            slot,
            roots_id,
        })
    }

    /// Content-derived commitment id
    pub const fn id(&self) -> CommitmentId {
        self.id
    }

    /// Id of the previous commitment in the chain
    pub const fn prev_id(&self) -> CommitmentId {
        self.prev_id
    }

    /// Slot this commitment seals
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// Roots summarizing the committed state
    pub const fn roots_id(&self) -> Hash {
        self.roots_id
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} (slot: {}, prev: {})", self.id, self.slot, self.prev_id)
    }
}

fn serialize_content(
    prev_id: &CommitmentId,
    slot: Slot,
    roots_id: &Hash,
    buffer: &mut Vec<u8>,
) -> Result<(), SerializeError> {
    CommitmentIdSerializer::new().serialize(prev_id, buffer)?;
    SlotSerializer::new().serialize(&slot, buffer)?;
    buffer.extend(roots_id.to_bytes());
    Ok(())
}

/// Serializer for `Commitment`
#[derive(Default, Clone)]
pub struct CommitmentSerializer;

impl CommitmentSerializer {
    /// Creates a new serializer for `Commitment`
    pub fn new() -> Self {
        Self
    }
}

impl Serializer<Commitment> for CommitmentSerializer {
    fn serialize(&self, value: &Commitment, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        serialize_content(&value.prev_id, value.slot, &value.roots_id, buffer)
    }
}

/// Deserializer for `Commitment`. The id is recomputed from the decoded
/// content.
#[derive(Clone)]
pub struct CommitmentDeserializer {
    commitment_id_deserializer: CommitmentIdDeserializer,
    slot_deserializer: SlotDeserializer,
    hash_deserializer: HashDeserializer,
}

impl CommitmentDeserializer {
    /// Creates a new deserializer for `Commitment`
    pub fn new() -> Self {
        Self {
            commitment_id_deserializer: CommitmentIdDeserializer::new(),
            slot_deserializer: SlotDeserializer::default(),
            hash_deserializer: HashDeserializer::new(),
        }
    }
}

impl Default for CommitmentDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<Commitment> for CommitmentDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Commitment, E> {
        context("Failed Commitment deserialization", |input: &'a [u8]| {
            let (rest, prev_id) = self.commitment_id_deserializer.deserialize(input)?;
            let (rest, slot) = self.slot_deserializer.deserialize(rest)?;
            let (rest, roots_id) = self.hash_deserializer.deserialize(rest)?;
            let commitment = Commitment::new(prev_id, slot, roots_id).map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Fail,
                ))
            })?;
            Ok((rest, commitment))
        })(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_serialization::DeserializeError;

    #[test]
    fn test_commitment_chaining_and_roundtrip() {
        let genesis = Commitment::new(
            CommitmentId::new(Slot(0), Hash::compute_from(b"")),
            Slot(0),
            Hash::compute_from(b"genesis roots"),
        )
        .unwrap();
        let next = Commitment::new(genesis.id(), Slot(1), Hash::compute_from(b"roots 1")).unwrap();
        assert_eq!(next.prev_id(), genesis.id());
        assert_eq!(next.id().slot(), Slot(1));
        assert_ne!(next.id(), genesis.id());

        let mut buffer = Vec::new();
        CommitmentSerializer::new()
            .serialize(&next, &mut buffer)
            .unwrap();
        let (rest, decoded) = CommitmentDeserializer::new()
            .deserialize::<DeserializeError>(&buffer)
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, next);
        assert_eq!(decoded.id(), next.id());
    }
}
