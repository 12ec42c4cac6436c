// ── Core identity types ──
//
// EntityId and MacAddress are the keys every resource is matched and
// addressed by. Identifiers are always assigned by the cloud; MACs are
// the natural key of devices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ── EntityId ────────────────────────────────────────────────────────

/// Identifier of a remote resource.
///
/// Mist hands out UUIDs; anything else it returns (older objects, test
/// fixtures) is kept verbatim as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Uuid(Uuid),
    Opaque(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Opaque(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        match Uuid::parse_str(&s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Opaque(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address in canonical form: 12 lowercase hex digits, no separators.
///
/// Accepts `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF`, `aabb.ccdd.eeff`
/// and bare hex. Displays colon-separated; [`compact`](Self::compact) is
/// the form used in API paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

/// Error for input that is not a 48-bit MAC address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address: {0:?}")]
pub struct InvalidMac(pub String);

impl MacAddress {
    /// Parse any common MAC notation.
    pub fn parse(raw: &str) -> Result<Self, InvalidMac> {
        let digits: String = raw
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if digits.len() == 12 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(digits))
        } else {
            Err(InvalidMac(raw.to_owned()))
        }
    }

    /// The 12-digit form, e.g. `aabbccddeeff`.
    pub fn compact(&self) -> &str {
        &self.0
    }

    /// Whether a MAC string reported by the cloud denotes this address.
    /// Values that do not parse never match.
    pub fn matches(&self, remote: &str) -> bool {
        Self::parse(remote).is_ok_and(|other| other == *self)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        for (i, c) in self.0.chars().enumerate() {
            if i > 0 && i % 2 == 0 {
                f.write_char(':')?;
            }
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl FromStr for MacAddress {
    type Err = InvalidMac;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = InvalidMac;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}
