//! Published updates and their identifiers

use crate::error::{Error, Result};
use std::fmt;
use std::time::Instant;

/// Identifier of a published update.
///
/// Ids are assigned from a single monotonic sequence, so they are strictly
/// increasing and gap-free in assignment order. The string form is a
/// fixed-width zero-padded decimal, which makes lexicographic order agree
/// with numeric (and therefore temporal) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateId(u64);

impl UpdateId {
    /// Sentinel preceding every assigned id.
    pub const ZERO: UpdateId = UpdateId(0);

    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Parse an id from its string form. Plain decimal is accepted with or
    /// without zero padding.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| Error::InvalidArgument(format!("invalid update id \"{s}\"")))
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:020}", self.0)
    }
}

/// An immutable published update.
#[derive(Debug, Clone)]
pub struct Update {
    /// Monotonically increasing identifier, assigned on append.
    pub id: UpdateId,
    /// Topic URIs the update is addressed to, in the order supplied.
    pub topics: Vec<String>,
    /// Opaque payload.
    pub payload: Vec<u8>,
    /// Visible only to subscribers holding an explicit (non-`*`) claim for
    /// one of the topics.
    pub private: bool,
    /// Append time, used for age-based retention.
    pub appended_at: Instant,
}
