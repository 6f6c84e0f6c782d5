//! Typed zoning entities extracted from switch output.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Port world-wide name, stored as its 64-bit value.
///
/// Parsing accepts 16 hex digits, optionally grouped with `:`, `.` or `-`, in
/// any case. Display is always the lowercase colon form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pwwn(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pwwn '{0}': expected 16 hex digits")]
pub struct InvalidPwwn(pub String);

impl Pwwn {
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl FromStr for Pwwn {
    type Err = InvalidPwwn;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let digits: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '.' | '-'))
            .collect();
        if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidPwwn(raw.to_string()));
        }
        u64::from_str_radix(&digits, 16)
            .map(Pwwn)
            .map_err(|_| InvalidPwwn(raw.to_string()))
    }
}

impl Display for Pwwn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        for (idx, byte) in bytes.iter().enumerate() {
            if idx > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for Pwwn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Virtual SAN identifier (1..=4094).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Vsan(u16);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid vsan '{0}': expected an integer between 1 and 4094")]
pub struct InvalidVsan(pub String);

impl Vsan {
    pub const MAX: u16 = 4094;

    pub fn new(id: u16) -> Result<Self, InvalidVsan> {
        if id == 0 || id > Self::MAX {
            return Err(InvalidVsan(id.to_string()));
        }
        Ok(Self(id))
    }

    pub fn id(self) -> u16 {
        self.0
    }
}

impl FromStr for Vsan {
    type Err = InvalidVsan;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let id: u16 = raw
            .trim()
            .parse()
            .map_err(|_| InvalidVsan(raw.to_string()))?;
        Vsan::new(id).map_err(|_| InvalidVsan(raw.to_string()))
    }
}

impl Display for Vsan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Smart zoning role of a zone member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    Target,
    Both,
}

impl Role {
    /// Parse a role keyword as printed by the switch (`init` is accepted).
    pub fn parse_keyword(raw: &str) -> Option<Role> {
        match raw.to_ascii_lowercase().as_str() {
            "init" | "initiator" => Some(Role::Initiator),
            "target" => Some(Role::Target),
            "both" => Some(Role::Both),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Target => "target",
            Role::Both => "both",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceAlias {
    pub name: String,
    pub pwwn: Pwwn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FcAlias {
    pub name: String,
    pub vsan: Vsan,
    pub pwwns: Vec<Pwwn>,
}

/// One entry of a zone's flattened member list.
///
/// An `FcAliasRef` is immediately followed by the `PwwnRef`s the switch
/// printed underneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Member {
    FcAliasRef {
        name: Option<String>,
    },
    PwwnRef {
        pwwn: Pwwn,
        role: Option<Role>,
    },
    DeviceAliasRef {
        name: String,
        role: Option<Role>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub name: String,
    pub vsan: Vsan,
    pub members: Vec<Member>,
}

impl Zone {
    /// Pwwns listed under the fcalias reference at `index`, in order.
    pub fn alias_members(&self, index: usize) -> Vec<Pwwn> {
        let mut out = Vec::new();
        if !matches!(self.members.get(index), Some(Member::FcAliasRef { .. })) {
            return out;
        }
        for member in &self.members[index + 1..] {
            match member {
                Member::PwwnRef { pwwn, .. } => out.push(*pwwn),
                _ => break,
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSet {
    pub name: String,
    pub vsan: Vsan,
    pub zones: Vec<String>,
}

/// The zone set a generate or check run is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationTarget {
    pub zoneset: String,
    pub vsan: Vsan,
}

impl ValidationTarget {
    pub fn new(zoneset: impl Into<String>, vsan: Vsan) -> Self {
        Self {
            zoneset: zoneset.into(),
            vsan,
        }
    }
}

impl Display for ValidationTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "zoneset {} vsan {}", self.zoneset, self.vsan)
    }
}
