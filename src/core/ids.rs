//! Identifier types.
//!
//! Everything the game definition names (zones, actions, phases, token types,
//! triggers, data tables) is identified by a string newtype. The compiler
//! that produces a `GameDef` owns the naming scheme; the kernel only compares
//! and orders identifiers.
//!
//! Tokens are the exception: they are created at runtime, so they get a
//! compact `TokenId(u32)` allocated from `GameState::next_token_id`.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Zone identifier. Player-owned zones are expanded by the compiler into
    /// one zone per seat, named `<base>:<seat>` (e.g. `hand:0`).
    ZoneId
);

impl ZoneId {
    /// Name of the per-seat instance of an owned zone.
    #[must_use]
    pub fn owned(base: &str, seat: u8) -> Self {
        Self(format!("{base}:{seat}"))
    }
}

string_id!(
    /// Action identifier.
    ActionId
);
string_id!(
    /// Phase identifier.
    PhaseId
);
string_id!(
    /// Token type identifier.
    TokenTypeId
);
string_id!(
    /// Trigger identifier.
    TriggerId
);
string_id!(
    /// Runtime data table identifier.
    TableId
);

/// Runtime token identifier.
///
/// Allocated in creation order, never reused within a game. Token identity is
/// part of the hashed and serialized state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u32);

impl TokenId {
    /// Create a token ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tok{}", self.0)
    }
}
