// Copyright (c) 2023 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Errors of the hash crate
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum LatticeHashError {
    /// Parsing error: {0}
    ParsingError(String),
}
