//! Authorization and billing tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ApplicationId;

/// Authorization tier of a user within a guild.
///
/// Totally ordered: `Everyone < Support < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionTier {
    #[default]
    Everyone = 0,
    Support = 1,
    Admin = 2,
}

impl PermissionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Support => "support",
            Self::Admin => "admin",
        }
    }

    /// Decodes a stored tier value; unknown values map to `None`.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Everyone),
            1 => Some(Self::Support),
            2 => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing-derived capability tier, orthogonal to [`PermissionTier`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PremiumTier {
    #[default]
    None,
    Premium,
    Whitelabel,
}

impl PremiumTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Premium => "premium",
            Self::Whitelabel => "whitelabel",
        }
    }

    pub fn is_premium(&self) -> bool {
        *self > Self::None
    }
}

impl fmt::Display for PremiumTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the bot instance receiving interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub application_id: ApplicationId,
    /// `true` for a white-labelled instance, `false` for the first-party bot.
    pub whitelabel: bool,
}

impl BotIdentity {
    pub fn new(application_id: ApplicationId, whitelabel: bool) -> Self {
        Self {
            application_id,
            whitelabel,
        }
    }

    /// The pseudo premium tier used for DM interactions, where no guild
    /// subscription can be looked up.
    pub fn dm_premium_tier(&self) -> PremiumTier {
        if self.whitelabel {
            PremiumTier::Whitelabel
        } else {
            PremiumTier::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(PermissionTier::Everyone < PermissionTier::Support);
        assert!(PermissionTier::Support < PermissionTier::Admin);
        assert_eq!(PermissionTier::from_u8(2), Some(PermissionTier::Admin));
        assert_eq!(PermissionTier::from_u8(7), None);
    }

    #[test]
    fn test_dm_premium_tier() {
        assert_eq!(BotIdentity::new(1, false).dm_premium_tier(), PremiumTier::None);
        assert_eq!(
            BotIdentity::new(1, true).dm_premium_tier(),
            PremiumTier::Whitelabel
        );
    }
}
