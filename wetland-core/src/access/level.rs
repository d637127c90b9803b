//! CRUVED actions, access levels and per-user permission tables.

use std::{collections::BTreeMap, fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scope of the records a user may act on.
///
/// Levels are ordered: `None < OwnOnly < Organization < All`. At the
/// boundary they keep their historical single-character encoding `"0"` to
/// `"3"`.
///
/// # Examples
/// ```
/// use wetland_core::AccessLevel;
///
/// let level: AccessLevel = "2".parse().expect("known code");
/// assert_eq!(level, AccessLevel::Organization);
/// assert!(level > AccessLevel::OwnOnly);
/// assert_eq!(AccessLevel::All.code(), "3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AccessLevel {
    /// No access.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "0"))]
    None,
    /// Records the user digitised or observed.
    #[cfg_attr(feature = "serde", serde(rename = "1"))]
    OwnOnly,
    /// Records of datasets the user's organism acts on.
    #[cfg_attr(feature = "serde", serde(rename = "2"))]
    Organization,
    /// Every record.
    #[cfg_attr(feature = "serde", serde(rename = "3"))]
    All,
}

impl AccessLevel {
    /// Return the boundary encoding of the level.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::None => "0",
            Self::OwnOnly => "1",
            Self::Organization => "2",
            Self::All => "3",
        }
    }

    /// Decode a boundary code, returning `None` for unknown codes.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::None),
            "1" => Some(Self::OwnOnly),
            "2" => Some(Self::Organization),
            "3" => Some(Self::All),
            _ => None,
        }
    }

    const fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Self::None),
            '1' => Some(Self::OwnOnly),
            '2' => Some(Self::Organization),
            '3' => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error raised when decoding access levels, actions or CRUVED tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CruvedParseError {
    /// The access level code is not one of `0` to `3`.
    #[error("unknown access level '{code}'")]
    UnknownLevel {
        /// Offending input.
        code: String,
    },
    /// The action code is not one of `C R U V E D`.
    #[error("unknown CRUVED action '{code}'")]
    UnknownAction {
        /// Offending input.
        code: String,
    },
    /// The table did not follow either accepted layout.
    #[error("malformed CRUVED table '{input}'; expected e.g. 'C3R2U1V1E0D1' or '321101'")]
    Malformed {
        /// Offending input.
        input: String,
    },
}

impl FromStr for AccessLevel {
    type Err = CruvedParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| CruvedParseError::UnknownLevel { code: s.to_owned() })
    }
}

/// One of the six actions of the permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CruvedAction {
    /// Create records.
    #[cfg_attr(feature = "serde", serde(rename = "C"))]
    Create,
    /// Read records.
    #[cfg_attr(feature = "serde", serde(rename = "R"))]
    Read,
    /// Update records.
    #[cfg_attr(feature = "serde", serde(rename = "U"))]
    Update,
    /// Validate records.
    #[cfg_attr(feature = "serde", serde(rename = "V"))]
    View,
    /// Export records.
    #[cfg_attr(feature = "serde", serde(rename = "E"))]
    Export,
    /// Delete records.
    #[cfg_attr(feature = "serde", serde(rename = "D"))]
    Delete,
}

impl CruvedAction {
    /// Every action in CRUVED order.
    pub const ALL: [Self; 6] = [
        Self::Create,
        Self::Read,
        Self::Update,
        Self::View,
        Self::Export,
        Self::Delete,
    ];

    /// Return the single-letter code of the action.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Create => 'C',
            Self::Read => 'R',
            Self::Update => 'U',
            Self::View => 'V',
            Self::Export => 'E',
            Self::Delete => 'D',
        }
    }

    const fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'C' => Some(Self::Create),
            'R' => Some(Self::Read),
            'U' => Some(Self::Update),
            'V' => Some(Self::View),
            'E' => Some(Self::Export),
            'D' => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for CruvedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for CruvedAction {
    type Err = CruvedParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let action = match (chars.next(), chars.next()) {
            (Some(code), None) => Self::from_code(code),
            _ => None,
        };
        action.ok_or_else(|| CruvedParseError::UnknownAction { code: s.to_owned() })
    }
}

/// Access level held by one user for each action of a module.
///
/// Actions that were never granted resolve to [`AccessLevel::None`].
///
/// # Examples
/// ```
/// use wetland_core::{AccessLevel, CruvedAction, UserCruved};
///
/// let cruved: UserCruved = "C1R3U1V0E3D1".parse().expect("valid table");
/// assert_eq!(cruved.level(CruvedAction::Read), AccessLevel::All);
/// assert_eq!(cruved.level(CruvedAction::View), AccessLevel::None);
///
/// let compact: UserCruved = "131031".parse().expect("digits in CRUVED order");
/// assert_eq!(compact, cruved);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct UserCruved {
    levels: BTreeMap<CruvedAction, AccessLevel>,
}

impl UserCruved {
    /// Table granting nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `level` for `action` while returning `self` for chaining.
    #[must_use]
    pub fn with_level(mut self, action: CruvedAction, level: AccessLevel) -> Self {
        self.set_level(action, level);
        self
    }

    /// Insert or update the level for an action.
    pub fn set_level(&mut self, action: CruvedAction, level: AccessLevel) {
        self.levels.insert(action, level);
    }

    /// Level held for `action`.
    #[must_use]
    pub fn level(&self, action: CruvedAction) -> AccessLevel {
        self.levels.get(&action).copied().unwrap_or_default()
    }

    /// Iterate over every action with its resolved level, in CRUVED order.
    pub fn iter(&self) -> impl Iterator<Item = (CruvedAction, AccessLevel)> + '_ {
        CruvedAction::ALL
            .into_iter()
            .map(|action| (action, self.level(action)))
    }

    fn parse_pairs(input: &str) -> Result<Self, CruvedParseError> {
        let mut table = Self::new();
        let mut chars = input.chars();
        while let Some(action_code) = chars.next() {
            let action = CruvedAction::from_code(action_code).ok_or_else(|| {
                CruvedParseError::UnknownAction {
                    code: action_code.to_string(),
                }
            })?;
            let level_code = chars.next().ok_or_else(|| CruvedParseError::Malformed {
                input: input.to_owned(),
            })?;
            let level = AccessLevel::from_digit(level_code).ok_or_else(|| {
                CruvedParseError::UnknownLevel {
                    code: level_code.to_string(),
                }
            })?;
            table.set_level(action, level);
        }
        Ok(table)
    }

    fn parse_digits(input: &str) -> Result<Self, CruvedParseError> {
        let mut table = Self::new();
        for (action, digit) in CruvedAction::ALL.into_iter().zip(input.chars()) {
            let level =
                AccessLevel::from_digit(digit).ok_or_else(|| CruvedParseError::UnknownLevel {
                    code: digit.to_string(),
                })?;
            table.set_level(action, level);
        }
        Ok(table)
    }
}

impl FromStr for UserCruved {
    type Err = CruvedParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(CruvedParseError::Malformed {
                input: s.to_owned(),
            });
        }
        if input.chars().all(|c| c.is_ascii_digit()) {
            if input.chars().count() != CruvedAction::ALL.len() {
                return Err(CruvedParseError::Malformed {
                    input: s.to_owned(),
                });
            }
            return Self::parse_digits(input);
        }
        Self::parse_pairs(input)
    }
}

impl fmt::Display for UserCruved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (action, level) in self.iter() {
            write!(f, "{action}{level}")?;
        }
        Ok(())
    }
}

/// Effective permission of the current user on one record, per action.
///
/// Listings attach this view to every row so that a client can enable or
/// disable actions without another round trip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct CruvedView {
    allowed: BTreeMap<CruvedAction, bool>,
}

impl CruvedView {
    pub(crate) const fn new(allowed: BTreeMap<CruvedAction, bool>) -> Self {
        Self { allowed }
    }

    /// Whether `action` is allowed on the record.
    #[must_use]
    pub fn allows(&self, action: CruvedAction) -> bool {
        self.allowed.get(&action).copied().unwrap_or(false)
    }
}
