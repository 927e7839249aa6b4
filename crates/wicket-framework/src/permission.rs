//! Permission-tier resolution.
//!
//! - [`PermissionResolver`] computes the [`PermissionTier`] of a guild
//!   member through a short-circuiting cascade of authority sources and
//!   handles explicit grants and revocations.
//! - [`EffectivePermissionCalculator`] computes the platform permission
//!   bitmask of a member, optionally scoped to a channel.
//! - [`PermissionCache`] stores resolved tiers; [`MemoryPermissionCache`] is
//!   the in-process implementation.
//!
//! [`PermissionTier`]: wicket_core::PermissionTier

mod cache;
mod effective;
mod resolver;

pub use cache::{DEFAULT_CACHE_TTL, MemoryPermissionCache, PermissionCache};
pub use effective::{EffectivePermissionCalculator, compute_permissions};
pub use resolver::PermissionResolver;
