//! Principals and document ownership.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value written to `userId` when a document is created without a principal.
pub const UNSET_OWNER: &str = "unset";

/// Sentinel written by older clients; read back as [`Owner::Unset`].
pub const LEGACY_UNSET_OWNER: &str = "was undefined";

/// Errors that can occur when parsing a [`PrincipalId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrincipalIdError {
    /// The input string is empty.
    #[error("principal id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("principal id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace or control characters.
    #[error("principal id contains invalid characters")]
    InvalidCharacter,
    /// The input collides with an ownership sentinel.
    #[error("principal id cannot be the reserved value '{0}'")]
    Reserved(String),
}

/// The identity of an authenticated session.
///
/// Opaque to everything except equality. A `PrincipalId` can never equal
/// [`UNSET_OWNER`] or [`LEGACY_UNSET_OWNER`], so an ownership query for a real
/// principal never matches documents that were created anonymously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Maximum length of a principal id.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `PrincipalId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 128 characters,
    /// contains whitespace or control characters, or equals an ownership
    /// sentinel.
    pub fn parse(s: &str) -> Result<Self, PrincipalIdError> {
        if s.is_empty() {
            return Err(PrincipalIdError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(PrincipalIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(PrincipalIdError::InvalidCharacter);
        }

        if s == UNSET_OWNER || s == LEGACY_UNSET_OWNER {
            return Err(PrincipalIdError::Reserved(s.to_owned()));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the principal id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PrincipalId {
    type Err = PrincipalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for PrincipalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Who owns a store or rating document.
///
/// Stored in the `userId` field. Documents created without an authenticated
/// principal carry an explicit [`UNSET_OWNER`] marker instead of a missing
/// field, so "nobody" and "not yet loaded" are never confused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Created without a principal.
    #[default]
    Unset,
    /// Created by this principal.
    Owned(PrincipalId),
}

impl Owner {
    /// Stamp ownership for a write made by `principal`.
    ///
    /// Takes the principal of the current call only, so an earlier session's
    /// identity can never leak into a new document.
    #[must_use]
    pub fn from_principal(principal: Option<&PrincipalId>) -> Self {
        principal.map_or(Self::Unset, |p| Self::Owned(p.clone()))
    }

    /// Returns the owning principal, if any.
    #[must_use]
    pub const fn principal(&self) -> Option<&PrincipalId> {
        match self {
            Self::Unset => None,
            Self::Owned(p) => Some(p),
        }
    }

    /// Returns `true` if the document is owned by `principal`.
    #[must_use]
    pub fn is_owned_by(&self, principal: &PrincipalId) -> bool {
        self.principal() == Some(principal)
    }

    /// The string stored in the document's `userId` field.
    #[must_use]
    pub fn as_field_value(&self) -> &str {
        match self {
            Self::Unset => UNSET_OWNER,
            Self::Owned(p) => p.as_str(),
        }
    }
}

impl Serialize for Owner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_field_value())
    }
}

impl<'de> Deserialize<'de> for Owner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some(UNSET_OWNER | LEGACY_UNSET_OWNER) => Ok(Self::Unset),
            Some(id) => PrincipalId::parse(id)
                .map(Self::Owned)
                .map_err(serde::de::Error::custom),
        }
    }
}
