//! Identifiers for documents (units), their sheets (sub-units) and cached resources.

use core::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Document identifier.
    UnitId
);
string_id!(
    /// Sheet identifier, unique within one unit.
    SubUnitId
);
string_id!(
    /// Opaque resource identifier, unique within one `(unit, sub_unit)` scope.
    ResourceKey
);

/// Ownership scope of a cache and its watches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId {
    pub unit: UnitId,
    pub sub_unit: SubUnitId,
}

impl ScopeId {
    pub fn new(unit: impl Into<UnitId>, sub_unit: impl Into<SubUnitId>) -> Self {
        Self {
            unit: unit.into(),
            sub_unit: sub_unit.into(),
        }
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.unit, self.sub_unit)
    }
}
