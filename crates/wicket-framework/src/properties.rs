//! Per-handler dispatch properties.

use std::time::Duration;

use wicket_core::PermissionTier;

/// Declared once per handler and read at dispatch time.
///
/// The default allows guild interactions only, requires no tier and uses
/// the dispatcher's default timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub dms_allowed: bool,
    pub guild_allowed: bool,
    /// The original message may still be edited through the synchronous cycle.
    pub can_edit_original: bool,
    pub permission_level: PermissionTier,
    /// How long the acknowledgment owner waits for the initial response.
    pub timeout: Option<Duration>,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            dms_allowed: false,
            guild_allowed: true,
            can_edit_original: false,
            permission_level: PermissionTier::Everyone,
            timeout: None,
        }
    }
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_dms(mut self) -> Self {
        self.dms_allowed = true;
        self
    }

    pub fn dm_only(mut self) -> Self {
        self.dms_allowed = true;
        self.guild_allowed = false;
        self
    }

    pub fn can_edit_original(mut self) -> Self {
        self.can_edit_original = true;
        self
    }

    pub fn permission_level(mut self, tier: PermissionTier) -> Self {
        self.permission_level = tier;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` if the handler accepts an interaction in this location.
    pub fn allows_location(&self, in_guild: bool) -> bool {
        if in_guild {
            self.guild_allowed
        } else {
            self.dms_allowed
        }
    }
}
