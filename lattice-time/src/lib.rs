// Copyright (c) 2023 MASSA LABS <info@massa.net>
//! Unsigned time management
#![warn(missing_docs)]

mod error;
pub use error::TimeError;
use lattice_serialization::{Deserializer, Serializer, U64VarIntDeserializer, U64VarIntSerializer};
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Bound;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Time structure used everywhere.
/// milliseconds since 01/01/1970.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LatticeTime(u64);

/// Serializer for `LatticeTime`
#[derive(Default, Clone)]
pub struct LatticeTimeSerializer {
    u64_serializer: U64VarIntSerializer,
}

impl LatticeTimeSerializer {
    /// Creates a `LatticeTimeSerializer`
    pub fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
        }
    }
}

impl Serializer<LatticeTime> for LatticeTimeSerializer {
    fn serialize(
        &self,
        value: &LatticeTime,
        buffer: &mut Vec<u8>,
    ) -> Result<(), lattice_serialization::SerializeError> {
        self.u64_serializer.serialize(&value.to_millis(), buffer)
    }
}

/// Deserializer for `LatticeTime`
#[derive(Clone)]
pub struct LatticeTimeDeserializer {
    u64_deserializer: U64VarIntDeserializer,
}

impl LatticeTimeDeserializer {
    /// Creates a `LatticeTimeDeserializer`
    pub fn new() -> Self {
        Self {
            u64_deserializer: U64VarIntDeserializer::new(
                Bound::Included(0),
                Bound::Included(u64::MAX),
            ),
        }
    }
}

impl Default for LatticeTimeDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<LatticeTime> for LatticeTimeDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], LatticeTime, E> {
        context("Failed LatticeTime deserialization", |input| {
            self.u64_deserializer
                .deserialize(input)
                .map(|(rest, res)| (rest, LatticeTime::from_millis(res)))
        })(buffer)
    }
}

impl fmt::Display for LatticeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_millis())
    }
}

impl TryFrom<Duration> for LatticeTime {
    type Error = TimeError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Ok(LatticeTime(
            value
                .as_millis()
                .try_into()
                .map_err(|_| TimeError::ConversionError)?,
        ))
    }
}

impl From<LatticeTime> for Duration {
    fn from(value: LatticeTime) -> Self {
        Duration::from_millis(value.to_millis())
    }
}

impl LatticeTime {
    /// Smallest time interval
    pub const EPSILON: LatticeTime = LatticeTime(1);

    /// Gets the current unix timestamp
    pub fn now() -> Result<Self, TimeError> {
        let duration: Duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeError::TimeOverflowError)?;
        Ok(LatticeTime(
            duration
                .as_millis()
                .try_into()
                .map_err(|_| TimeError::TimeOverflowError)?,
        ))
    }

    /// Create a `LatticeTime` from a number of milliseconds since the unix epoch
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Conversion to `u64` milliseconds
    pub const fn to_millis(&self) -> u64 {
        self.0
    }

    /// Conversion to `std::time::Duration`
    pub const fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// ```
    /// # use lattice_time::*;
    /// let time_1 : LatticeTime = LatticeTime::from_millis(42);
    /// let time_2 : LatticeTime = LatticeTime::from_millis(7);
    /// let res : LatticeTime = time_1.checked_sub(time_2).unwrap();
    /// assert_eq!(res, LatticeTime::from_millis(42 - 7))
    /// ```
    pub fn checked_sub(self, t: LatticeTime) -> Result<Self, TimeError> {
        self.0
            .checked_sub(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("subtraction error".to_string()))
            .map(LatticeTime)
    }

    /// ```
    /// # use lattice_time::*;
    /// let time_1 : LatticeTime = LatticeTime::from_millis(42);
    /// let time_2 : LatticeTime = LatticeTime::from_millis(7);
    /// let res : LatticeTime = time_1.checked_add(time_2).unwrap();
    /// assert_eq!(res, LatticeTime::from_millis(42 + 7))
    /// ```
    pub fn checked_add(self, t: LatticeTime) -> Result<Self, TimeError> {
        self.0
            .checked_add(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("addition error".to_string()))
            .map(LatticeTime)
    }

    /// ```
    /// # use lattice_time::*;
    /// let time_1 : LatticeTime = LatticeTime::from_millis(42);
    /// let res : LatticeTime = time_1.checked_mul(3).unwrap();
    /// assert_eq!(res, LatticeTime::from_millis(42 * 3))
    /// ```
    pub fn checked_mul(self, n: u64) -> Result<Self, TimeError> {
        self.0
            .checked_mul(n)
            .ok_or_else(|| TimeError::CheckedOperationError("multiplication error".to_string()))
            .map(LatticeTime)
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, t: LatticeTime) -> Self {
        LatticeTime(self.0.saturating_sub(t.0))
    }

    /// Saturating addition
    pub fn saturating_add(self, t: LatticeTime) -> Self {
        LatticeTime(self.0.saturating_add(t.0))
    }

    /// RFC-3339 rendering, for logs and interfaces
    ///
    /// ```
    /// # use lattice_time::*;
    /// let time : LatticeTime = LatticeTime::from_millis(1_640_995_200_000);
    /// assert_eq!(time.format_instant(), "2022-01-01T00:00:00Z");
    /// ```
    pub fn format_instant(&self) -> String {
        let naive = OffsetDateTime::from_unix_timestamp_nanos((self.0 as i128) * 1_000_000)
            .expect("could not convert time to instant");
        naive
            .format(&Rfc3339)
            .expect("could not format instant to rfc3339")
    }
}
