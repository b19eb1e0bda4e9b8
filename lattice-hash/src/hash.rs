// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::error::LatticeHashError;
use crate::settings::HASH_SIZE_BYTES;
use lattice_serialization::{Deserializer, SerializeError, Serializer};
use nom::bytes::complete::take;
use nom::{
    error::{context, ContextError, ErrorKind, ParseError},
    IResult,
};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer as SerdeDeserializer, Serialize, Serializer as SerdeSerializer,
};
use std::{cmp::Ordering, str::FromStr};

/// Hash wrapper, the underlying hash type is `Blake3`.
///
/// Blake3 was selected for its speed on modern CPU architectures and its
/// resistance to length-extension and timing attacks; every identifier of the
/// system (block ids, commitment ids, peer ids) is derived from it.
#[derive(Eq, PartialEq, Copy, Clone, Hash)]
pub struct Hash(blake3::Hash);

impl Hash {
    /// Compute a hash from data.
    ///
    /// # Example
    ///  ```
    /// # use lattice_hash::Hash;
    /// let hash = Hash::compute_from(&"hello world".as_bytes());
    /// ```
    pub fn compute_from(data: &[u8]) -> Self {
        Hash(blake3::hash(data))
    }

    /// Reference to the raw hash bytes.
    pub fn to_bytes(&self) -> &[u8; HASH_SIZE_BYTES] {
        self.0.as_bytes()
    }

    /// Rebuild a hash from its raw bytes.
    pub fn from_bytes(data: &[u8; HASH_SIZE_BYTES]) -> Hash {
        Hash(blake3::Hash::from(*data))
    }

    /// Render using `bs58` encoding with checksum.
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Parse from a `bs58`-check encoded string.
    ///
    /// # Example
    ///  ```
    /// # use lattice_hash::Hash;
    /// let hash = Hash::compute_from(&"hello world".as_bytes());
    /// let serialized: String = hash.to_bs58_check();
    /// let deserialized: Hash = Hash::from_bs58_check(&serialized).unwrap();
    /// ```
    pub fn from_bs58_check(data: &str) -> Result<Hash, LatticeHashError> {
        let decoded = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| LatticeHashError::ParsingError(err.to_string()))?;
        Hash::try_from(decoded.as_slice())
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = LatticeHashError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: &[u8; HASH_SIZE_BYTES] = value.try_into().map_err(|_| {
            LatticeHashError::ParsingError(format!(
                "expected {} hash bytes, got {}",
                HASH_SIZE_BYTES,
                value.len()
            ))
        })?;
        Ok(Hash::from_bytes(bytes))
    }
}

impl PartialOrd for Hash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl FromStr for Hash {
    type Err = LatticeHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_bs58_check(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: SerdeSerializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(self)
        } else {
            s.serialize_bytes(self.to_bytes())
        }
    }
}

/// One visitor serves both serde shapes: bs58-check strings for
/// human-readable formats, raw bytes otherwise.
struct HashVisitor;

impl<'de> Visitor<'de> for HashVisitor {
    type Value = Hash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "a bs58-check string or {} raw bytes",
            HASH_SIZE_BYTES
        )
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Hash::from_bs58_check(v).map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Hash::try_from(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: SerdeDeserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        if d.is_human_readable() {
            d.deserialize_str(HashVisitor)
        } else {
            d.deserialize_bytes(HashVisitor)
        }
    }
}

/// Serializer for `Hash`
#[derive(Default, Clone)]
pub struct HashSerializer;

impl HashSerializer {
    /// Creates a serializer for `Hash`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<Hash> for HashSerializer {
    fn serialize(&self, value: &Hash, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend(value.to_bytes());
        Ok(())
    }
}

/// Deserializer for `Hash`
#[derive(Default, Clone)]
pub struct HashDeserializer;

impl HashDeserializer {
    /// Creates a deserializer for `Hash`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<Hash> for HashDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Hash, E> {
        context("Failed hash deserialization", |input: &'a [u8]| {
            let (rest, bytes) = take(HASH_SIZE_BYTES)(input)?;
            let hash = Hash::try_from(bytes).map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(input, ErrorKind::Fail))
            })?;
            Ok((rest, hash))
        })(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bs58_check_roundtrip() {
        let hash = Hash::compute_from("hello world".as_bytes());
        let serialized = hash.to_bs58_check();
        assert_eq!(hash, Hash::from_bs58_check(&serialized).unwrap());
    }

    #[test]
    fn test_hash_try_from_rejects_bad_lengths() {
        assert!(Hash::try_from(&[0u8; 16][..]).is_err());
        let hash = Hash::compute_from(b"payload");
        assert_eq!(Hash::try_from(&hash.to_bytes()[..]).unwrap(), hash);
    }

    #[test]
    fn test_hash_deserializer() {
        use lattice_serialization::DeserializeError;
        let hash = Hash::compute_from(b"payload");
        let mut buffer = Vec::new();
        HashSerializer::new().serialize(&hash, &mut buffer).unwrap();
        let (rest, decoded) = HashDeserializer::new()
            .deserialize::<DeserializeError>(&buffer)
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, hash);
    }
}
