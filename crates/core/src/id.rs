//! Identifiers for propagation runs and the work items they fan out to.

use serde::{Deserialize, Serialize};

/// Errors raised when parsing an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The run key was empty or only whitespace
    #[error("run key must not be empty")]
    EmptyRunKey,

    /// The run key contains the key separator
    #[error("run key {0:?} must not contain ':'")]
    InvalidRunKey(String),

    /// A numeric id could not be parsed
    #[error("invalid numeric id {value:?}: {source}")]
    InvalidNumber {
        /// The rejected input
        value: String,
        /// Underlying parse failure
        source: std::num::ParseIntError,
    },
}

/// Identifier scoping one propagation run (the policy configuration id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunKey(String);

impl RunKey {
    /// Create a run key, rejecting empty keys and keys containing `:`.
    pub fn new(key: impl Into<String>) -> Result<Self, IdError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(IdError::EmptyRunKey);
        }
        if key.contains(':') {
            return Err(IdError::InvalidRunKey(key));
        }
        Ok(Self(key))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RunKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<u64> for RunKey {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// The raw numeric value.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse()
                    .map(Self)
                    .map_err(|source| IdError::InvalidNumber {
                        value: s.to_string(),
                        source,
                    })
            }
        }
    };
}

numeric_id!(
    /// Identifier of a project receiving the propagated policy.
    ProjectId
);

numeric_id!(
    /// Identifier of a merge request re-evaluated against the policy.
    MergeRequestId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_key_rejects_empty_and_separator() {
        assert_eq!(RunKey::new("  "), Err(IdError::EmptyRunKey));
        assert!(matches!(RunKey::new("a:b"), Err(IdError::InvalidRunKey(_))));
        assert_eq!(RunKey::new("42").unwrap().as_str(), "42");
        assert_eq!(RunKey::from(7).to_string(), "7");
    }

    #[test]
    fn test_numeric_id_parse() {
        let id: ProjectId = " 15 ".parse().unwrap();
        assert_eq!(id, ProjectId(15));
        assert_eq!(id.to_string(), "15");

        let err = "x".parse::<MergeRequestId>().unwrap_err();
        assert!(matches!(err, IdError::InvalidNumber { .. }));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ProjectId(3)).unwrap();
        assert_eq!(json, "3");
        let key: RunKey = serde_json::from_str("\"cfg\"").unwrap();
        assert_eq!(key.as_str(), "cfg");
    }
}
