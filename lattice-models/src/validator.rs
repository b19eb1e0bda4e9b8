// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use crate::prehash::PreHashed;
use lattice_hash::Hash;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::str::FromStr;

/// Identity of a validator of the committee, used as a voter id when tracking
/// acceptance weights.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct ValidatorId(pub Hash);

impl PreHashed for ValidatorId {}

const VALIDATORID_PREFIX: char = 'V';

impl std::fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            VALIDATORID_PREFIX,
            bs58::encode(self.0.to_bytes()).with_check().into_string()
        )
    }
}

impl std::fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for ValidatorId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(prefix) if prefix == VALIDATORID_PREFIX => {
                let data = chars.collect::<String>();
                let decoded = bs58::decode(data)
                    .with_check(None)
                    .into_vec()
                    .map_err(|_| ModelsError::ValidatorIdParseError)?;
                Ok(ValidatorId(Hash::from_bytes(
                    decoded
                        .as_slice()
                        .try_into()
                        .map_err(|_| ModelsError::ValidatorIdParseError)?,
                )))
            }
            _ => Err(ModelsError::ValidatorIdParseError),
        }
    }
}
