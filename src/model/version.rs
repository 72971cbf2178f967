//! Module versions and version ranges
//!
//! Versions follow the `major[.minor[.micro[.qualifier]]]` form used by module
//! manifests. Missing numeric parts default to zero.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::traits::ResolverError;

/// A module or package version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    /// Create a version without qualifier
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// The empty version `0.0.0`
    pub const fn empty() -> Self {
        Self::new(0, 0, 0)
    }
}

impl FromStr for Version {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ResolverError::InvalidVersion("empty version".to_string()));
        }

        let mut parts = s.splitn(4, '.');
        let mut numbers = [0u32; 3];
        for (i, slot) in numbers.iter_mut().enumerate() {
            match parts.next() {
                Some(part) => {
                    *slot = part.parse::<u32>().map_err(|_| {
                        ResolverError::InvalidVersion(format!(
                            "{}: component {} is not a number",
                            s,
                            i + 1
                        ))
                    })?;
                }
                None => break,
            }
        }

        let qualifier = parts.next().unwrap_or_default().to_string();
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ResolverError::InvalidVersion(format!(
                "{}: invalid qualifier",
                s
            )));
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.micro, &self.qualifier).cmp(&(
            other.major,
            other.minor,
            other.micro,
            &other.qualifier,
        ))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A version interval such as `[1.0,2.0)`
///
/// A bare version (`1.2`) means "at least this version" with no ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub floor: Version,
    pub floor_inclusive: bool,
    pub ceiling: Option<Version>,
    pub ceiling_inclusive: bool,
}

impl VersionRange {
    /// Range that accepts every version
    pub fn any() -> Self {
        Self::at_least(Version::empty())
    }

    /// `[floor, ∞)`
    pub fn at_least(floor: Version) -> Self {
        Self {
            floor,
            floor_inclusive: true,
            ceiling: None,
            ceiling_inclusive: false,
        }
    }

    /// Check whether a version lies within this range
    pub fn includes(&self, version: &Version) -> bool {
        let above_floor = if self.floor_inclusive {
            version >= &self.floor
        } else {
            version > &self.floor
        };
        let below_ceiling = match &self.ceiling {
            None => true,
            Some(c) if self.ceiling_inclusive => version <= c,
            Some(c) => version < c,
        };
        above_floor && below_ceiling
    }

    /// Render this range as a filter fragment over `attribute`
    ///
    /// `[1.0,2.0)` over `version` becomes `(&(version>=1.0.0)(!(version>=2.0.0)))`.
    pub fn to_filter_string(&self, attribute: &str) -> String {
        let floor = if self.floor_inclusive {
            format!("({}>={})", attribute, self.floor)
        } else {
            format!("(!({}<={}))", attribute, self.floor)
        };

        match &self.ceiling {
            None => floor,
            Some(ceiling) => {
                let ceiling = if self.ceiling_inclusive {
                    format!("({}<={})", attribute, ceiling)
                } else {
                    format!("(!({}>={}))", attribute, ceiling)
                };
                format!("(&{}{})", floor, ceiling)
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let first = s.chars().next();
        if !matches!(first, Some('[') | Some('(')) {
            return Ok(Self::at_least(s.parse()?));
        }

        let last = s.chars().last();
        let ceiling_inclusive = match last {
            Some(']') => true,
            Some(')') => false,
            _ => {
                return Err(ResolverError::InvalidVersion(format!(
                    "{}: unterminated range",
                    s
                )))
            }
        };

        let body = &s[1..s.len() - 1];
        let (floor, ceiling) = body.split_once(',').ok_or_else(|| {
            ResolverError::InvalidVersion(format!("{}: range needs two bounds", s))
        })?;

        let floor: Version = floor.parse()?;
        let ceiling: Version = ceiling.parse()?;
        if ceiling < floor {
            return Err(ResolverError::InvalidVersion(format!(
                "{}: ceiling below floor",
                s
            )));
        }

        Ok(Self {
            floor,
            floor_inclusive: first == Some('['),
            ceiling: Some(ceiling),
            ceiling_inclusive,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ceiling {
            None => write!(f, "{}", self.floor),
            Some(ceiling) => write!(
                f,
                "{}{},{}{}",
                if self.floor_inclusive { '[' } else { '(' },
                self.floor,
                ceiling,
                if self.ceiling_inclusive { ']' } else { ')' }
            ),
        }
    }
}
