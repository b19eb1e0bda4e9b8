// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use lattice_serialization::{
    Deserializer, SerializeError, Serializer, U64VarIntDeserializer, U64VarIntSerializer,
};
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use serde::{Deserialize, Serialize};
use std::ops::Bound;
use std::str::FromStr;

/// Size in bytes of the fixed-size sortable binary key of a slot
pub const SLOT_KEY_SIZE: usize = 8;

/// Index of a slot: the protocol time is divided into contiguous slots and
/// every block and commitment is anchored to one of them.
#[derive(
    Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Slot(pub u64);

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Slot {
    type Err = ModelsError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Slot(s
            .parse::<u64>()
            .map_err(|_| ModelsError::DeserializeError("invalid slot".to_string()))?))
    }
}

impl Slot {
    /// new slot from its index
    pub const fn new(index: u64) -> Slot {
        Slot(index)
    }

    /// returns the minimal slot
    pub const fn min() -> Slot {
        Slot(0)
    }

    /// returns the maximal slot
    pub const fn max() -> Slot {
        Slot(u64::MAX)
    }

    /// the slot immediately after this one
    pub const fn next(&self) -> Slot {
        Slot(self.0.saturating_add(1))
    }

    /// the slot immediately before this one, saturating at zero
    pub const fn prev(&self) -> Slot {
        Slot(self.0.saturating_sub(1))
    }

    /// Returns a fixed-size sortable binary key
    pub fn to_bytes_key(&self) -> [u8; SLOT_KEY_SIZE] {
        self.0.to_be_bytes()
    }

    /// Deserializes a slot from its fixed-size sortable binary key representation
    pub fn from_bytes_key(key: &[u8; SLOT_KEY_SIZE]) -> Slot {
        Slot(u64::from_be_bytes(*key))
    }
}

/// Serializer for `Slot`
#[derive(Clone)]
pub struct SlotSerializer {
    u64_serializer: U64VarIntSerializer,
}

impl SlotSerializer {
    /// Creates a `SlotSerializer`
    pub const fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
        }
    }
}

impl Default for SlotSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<Slot> for SlotSerializer {
    fn serialize(&self, value: &Slot, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.u64_serializer.serialize(&value.0, buffer)
    }
}

/// Deserializer for `Slot`
#[derive(Clone)]
pub struct SlotDeserializer {
    u64_deserializer: U64VarIntDeserializer,
}

impl SlotDeserializer {
    /// Creates a `SlotDeserializer` accepting slot indices in the given range
    pub const fn new(range: (Bound<u64>, Bound<u64>)) -> Self {
        Self {
            u64_deserializer: U64VarIntDeserializer::new(range.0, range.1),
        }
    }
}

impl Default for SlotDeserializer {
    fn default() -> Self {
        Self::new((Bound::Included(0), Bound::Included(u64::MAX)))
    }
}

impl Deserializer<Slot> for SlotDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Slot, E> {
        context("Failed Slot deserialization", |input| {
            self.u64_deserializer
                .deserialize(input)
                .map(|(rest, index)| (rest, Slot(index)))
        })(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_serialization::DeserializeError;

    #[test]
    fn test_slot_ordering_and_keys() {
        assert!(Slot(1) < Slot(2));
        assert_eq!(Slot(3).next(), Slot(4));
        assert_eq!(Slot(0).prev(), Slot(0));
        let slot = Slot(10);
        assert_eq!(Slot::from_bytes_key(&slot.to_bytes_key()), slot);
        // big-endian keys sort like the indices themselves
        assert!(Slot(255).to_bytes_key() < Slot(256).to_bytes_key());
    }

    #[test]
    fn test_slot_serialization_roundtrip() {
        let slot = Slot(123_456);
        let mut buffer = Vec::new();
        SlotSerializer::new().serialize(&slot, &mut buffer).unwrap();
        let (rest, decoded) = SlotDeserializer::default()
            .deserialize::<DeserializeError>(&buffer)
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, slot);
    }
}
