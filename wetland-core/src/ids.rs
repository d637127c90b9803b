//! Strongly typed identifiers shared across the crate.
//!
//! Identifiers wrap the `i64` keys used by the relational schema so that a
//! user id cannot be passed where a dataset id is expected.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

identifier!(
    /// Identifier of a persisted wetland record.
    WetlandId
);
identifier!(
    /// Identifier of a platform user (role).
    UserId
);
identifier!(
    /// Identifier of the organism a user belongs to.
    OrganismId
);
identifier!(
    /// Identifier of a dataset grouping records.
    DatasetId
);
