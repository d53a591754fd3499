//! Player identifiers.
//!
//! A [`PlayerId`] is a small integer that doubles as the player's color key
//! for renderers. It is unique among live players only: once a player has
//! been sunset its identifier can be handed to a new occupant.

use serde::{Deserialize, Serialize};

/// Identifier of a player slot (and its color key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

impl PlayerId {
    /// Create an identifier from its raw color value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Return the raw color value.
    pub const fn into_inner(self) -> u16 {
        self.0
    }
}

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for PlayerId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<PlayerId> for u16 {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_raw_value() {
        assert!(PlayerId::new(3) < PlayerId::new(12));
        assert_eq!(PlayerId::from(7).into_inner(), 7);
        assert_eq!(PlayerId::new(42).to_string(), "42");
    }
}
