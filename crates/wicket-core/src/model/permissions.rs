//! Platform permission bitmask.
//!
//! The platform encodes permissions as a 64-bit mask serialised as a decimal
//! string. [`Permissions`] is a thin newtype over that mask with the bits the
//! interaction core cares about named as constants.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A platform permission bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions(u64);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u64::MAX);
    pub const CREATE_INSTANT_INVITE: Self = Self(1 << 0);
    pub const KICK_MEMBERS: Self = Self(1 << 1);
    pub const BAN_MEMBERS: Self = Self(1 << 2);
    /// Grants every permission and bypasses channel overwrites.
    pub const ADMINISTRATOR: Self = Self(1 << 3);
    pub const MANAGE_CHANNELS: Self = Self(1 << 4);
    pub const MANAGE_GUILD: Self = Self(1 << 5);
    pub const ADD_REACTIONS: Self = Self(1 << 6);
    pub const VIEW_AUDIT_LOG: Self = Self(1 << 7);
    pub const VIEW_CHANNEL: Self = Self(1 << 10);
    pub const SEND_MESSAGES: Self = Self(1 << 11);
    pub const MANAGE_MESSAGES: Self = Self(1 << 13);
    pub const EMBED_LINKS: Self = Self(1 << 14);
    pub const ATTACH_FILES: Self = Self(1 << 15);
    pub const READ_MESSAGE_HISTORY: Self = Self(1 << 16);
    pub const MENTION_EVERYONE: Self = Self(1 << 17);
    pub const USE_EXTERNAL_EMOJIS: Self = Self(1 << 18);
    pub const MANAGE_ROLES: Self = Self(1 << 28);
    pub const MANAGE_WEBHOOKS: Self = Self(1 << 29);
    pub const MANAGE_THREADS: Self = Self(1 << 34);
    pub const SEND_MESSAGES_IN_THREADS: Self = Self(1 << 38);

    /// Creates a mask from raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Applies one overwrite layer: the `deny` bits are cleared first, then
    /// the `allow` bits are set.
    pub const fn apply_overwrite(self, allow: Self, deny: Self) -> Self {
        Self((self.0 & !deny.0) | allow.0)
    }

    /// Returns `true` if this mask grants everything in `required`.
    ///
    /// A mask holding [`ADMINISTRATOR`](Self::ADMINISTRATOR) grants any
    /// request.
    pub const fn has_all(self, required: Self) -> bool {
        self.contains(Self::ADMINISTRATOR) || self.contains(required)
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Permissions {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Permissions {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl FromIterator<Permissions> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permissions>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |acc, p| acc | p)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The platform sends a decimal string; config files may carry a number.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(bits) => Ok(Self(bits)),
            Repr::Str(s) => s
                .parse::<u64>()
                .map(Self)
                .map_err(|e| serde::de::Error::custom(format!("invalid permission bits {s:?}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_clears_deny_before_allow() {
        let base = Permissions::from_bits(0b011);
        let result = base.apply_overwrite(Permissions::from_bits(0b001), Permissions::from_bits(0b001));
        assert_eq!(result.bits(), 0b011);

        let result = base.apply_overwrite(Permissions::NONE, Permissions::from_bits(0b010));
        assert_eq!(result.bits(), 0b001);
    }

    #[test]
    fn test_administrator_grants_everything() {
        let admin = Permissions::ADMINISTRATOR;
        assert!(admin.has_all(Permissions::MANAGE_GUILD | Permissions::MANAGE_ROLES));
        assert!(!Permissions::VIEW_CHANNEL.has_all(Permissions::MANAGE_GUILD));
        assert!(Permissions::VIEW_CHANNEL.has_all(Permissions::NONE));
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let p: Permissions = serde_json::from_str("\"8\"").unwrap();
        assert_eq!(p, Permissions::ADMINISTRATOR);
        let p: Permissions = serde_json::from_str("1024").unwrap();
        assert_eq!(p, Permissions::VIEW_CHANNEL);
        assert!(serde_json::from_str::<Permissions>("\"nope\"").is_err());
    }
}
