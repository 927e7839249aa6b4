//! Interaction dispatcher.
//!
//! The [`Dispatcher`] turns one inbound [`Interaction`] into at most one
//! handler task. For each interaction:
//!
//! 1. Structural validation: a guild interaction needs a member record and a
//!    DM interaction a user record.
//! 2. The registry of the interaction's kind is asked for the owning handler.
//! 3. The handler's [`Properties`] must allow the interaction's location.
//! 4. The premium tier is resolved: a side lookup for guilds, a pseudo tier
//!    from the [`BotIdentity`] for DMs. Failure aborts the dispatch.
//! 5. The kind-specific context is built around the response sink.
//! 6. The handler runs on its own task, after the permission tier check.
//!
//! Steps 1–3 reject silently (logged at `trace`); they are normal outcomes
//! for stale components and malformed events. The dispatcher itself never
//! performs a response call.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(registry, api, resolver, premium, identity);
//! let (sink, receiver) = response_channel();
//!
//! match dispatcher.dispatch(interaction, sink).await? {
//!     Dispatch::Spawned { timeout, .. } => owner.run(receiver, timeout).await,
//!     Dispatch::Rejected(reason) => drop(receiver),
//! }
//! ```

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span, trace};

use wicket_core::{
    BotIdentity, Interaction, InteractionApi, InteractionKind, PermissionTier, PremiumLookup,
    PremiumTier,
};

use crate::context::{ContextSettings, DEFAULT_REPLY_LIMIT, InteractionContext};
use crate::error::DispatchError;
use crate::handoff::ResponseSink;
use crate::permission::PermissionResolver;
use crate::registry::{InteractionRegistry, Registry};

/// How long the acknowledgment owner waits when a handler declares no timeout.
///
/// Stays under the platform's three-second window for the initial response.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_millis(2500);

/// Why an interaction was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A guild interaction without a member record.
    MissingMember,
    /// A DM interaction without a user record.
    MissingUser,
    /// No registered handler owns the identifier.
    UnknownHandler,
    /// The handler does not accept DM interactions.
    DmNotAllowed,
    /// The handler does not accept guild interactions.
    GuildNotAllowed,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingMember => "missing_member",
            Self::MissingUser => "missing_user",
            Self::UnknownHandler => "unknown_handler",
            Self::DmNotAllowed => "dm_not_allowed",
            Self::GuildNotAllowed => "guild_not_allowed",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a dispatch.
#[derive(Debug)]
pub enum Dispatch {
    /// A handler task was started.
    Spawned {
        /// The original message may still be edited through the synchronous cycle.
        can_edit_original: bool,
        /// How long the acknowledgment owner should wait for the initial response.
        timeout: Duration,
        handle: JoinHandle<()>,
    },
    /// Nothing was started.
    Rejected(Rejection),
}

impl Dispatch {
    /// Whether the transport may keep editing the original message.
    pub fn can_edit_original(&self) -> bool {
        matches!(
            self,
            Self::Spawned {
                can_edit_original: true,
                ..
            }
        )
    }

    pub fn is_spawned(&self) -> bool {
        matches!(self, Self::Spawned { .. })
    }
}

/// Routes interactions to handlers.
///
/// `Dispatcher` is cheap to share behind an `Arc`; all of its state is
/// immutable after construction.
pub struct Dispatcher {
    registry: Arc<InteractionRegistry>,
    api: Arc<dyn InteractionApi>,
    resolver: Arc<PermissionResolver>,
    premium: Arc<dyn PremiumLookup>,
    identity: BotIdentity,
    reply_limit: u32,
    default_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<InteractionRegistry>,
        api: Arc<dyn InteractionApi>,
        resolver: Arc<PermissionResolver>,
        premium: Arc<dyn PremiumLookup>,
        identity: BotIdentity,
    ) -> Self {
        Self {
            registry,
            api,
            resolver,
            premium,
            identity,
            reply_limit: DEFAULT_REPLY_LIMIT,
            default_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    pub fn with_reply_limit(mut self, limit: u32) -> Self {
        self.reply_limit = limit;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &InteractionRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    pub fn identity(&self) -> BotIdentity {
        self.identity
    }

    /// Dispatches one interaction, wiring its context to `sink`.
    pub async fn dispatch(
        &self,
        interaction: Interaction,
        sink: ResponseSink,
    ) -> Result<Dispatch, DispatchError> {
        if interaction.is_guild() && interaction.member.is_none() {
            return Ok(self.reject(&interaction, Rejection::MissingMember));
        }
        if interaction.is_dm() && interaction.user.is_none() {
            return Ok(self.reject(&interaction, Rejection::MissingUser));
        }

        let interaction = Arc::new(interaction);
        match interaction.kind() {
            InteractionKind::Command => {
                self.route(&self.registry.commands, interaction, sink).await
            }
            InteractionKind::Button => self.route(&self.registry.buttons, interaction, sink).await,
            InteractionKind::SelectMenu => {
                self.route(&self.registry.select_menus, interaction, sink)
                    .await
            }
            InteractionKind::ModalSubmit => {
                self.route(&self.registry.modals, interaction, sink).await
            }
        }
    }

    async fn route<C>(
        &self,
        registry: &Registry<C>,
        interaction: Arc<Interaction>,
        sink: ResponseSink,
    ) -> Result<Dispatch, DispatchError>
    where
        C: From<InteractionContext> + Send + 'static,
    {
        let Some(route) = registry.find(&interaction.routing_id()) else {
            return Ok(self.reject(&interaction, Rejection::UnknownHandler));
        };

        let properties = route.properties;
        if !properties.allows_location(interaction.is_guild()) {
            let reason = if interaction.is_guild() {
                Rejection::GuildNotAllowed
            } else {
                Rejection::DmNotAllowed
            };
            return Ok(self.reject(&interaction, reason));
        }

        let premium_tier = self.premium_tier(&interaction).await?;
        let settings = ContextSettings {
            properties,
            premium_tier,
            reply_limit: self.reply_limit,
        };
        let Some(ctx) = InteractionContext::new(interaction.clone(), self.api.clone(), sink, settings)
        else {
            return Ok(self.reject(&interaction, Rejection::MissingUser));
        };

        let span = info_span!(
            "interaction",
            kind = interaction.kind().as_str(),
            id = %interaction.routing_id(),
            guild_id = ?interaction.guild_id,
            user_id = ctx.user_id(),
        );
        let resolver = self.resolver.clone();
        let handler = route.handler;

        let handle = tokio::spawn(
            async move {
                if !authorize(&resolver, &ctx, properties.permission_level).await {
                    return;
                }
                debug!(tier = %ctx.permission_tier(), "Executing handler");

                let run = AssertUnwindSafe(handler.execute(C::from(ctx))).catch_unwind();
                if let Err(panic) = run.await {
                    error!(panic = panic_message(&*panic), "Handler panicked");
                }
            }
            .instrument(span),
        );

        Ok(Dispatch::Spawned {
            can_edit_original: properties.can_edit_original,
            timeout: properties.timeout.unwrap_or(self.default_timeout),
            handle,
        })
    }

    async fn premium_tier(&self, interaction: &Interaction) -> Result<PremiumTier, DispatchError> {
        match interaction.guild_id {
            Some(guild_id) => self
                .premium
                .get_tier_by_guild(guild_id)
                .await
                .map_err(|source| DispatchError::Premium { guild_id, source }),
            None => Ok(self.identity.dm_premium_tier()),
        }
    }

    fn reject(&self, interaction: &Interaction, reason: Rejection) -> Dispatch {
        trace!(
            kind = interaction.kind().as_str(),
            id = %interaction.routing_id(),
            guild_id = ?interaction.guild_id,
            %reason,
            "Interaction rejected"
        );
        Dispatch::Rejected(reason)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.registry.len())
            .field("identity", &self.identity)
            .field("reply_limit", &self.reply_limit)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

/// Resolves the caller's tier and enforces `required`.
///
/// Returns `false` once the user has been answered with a refusal or an
/// error reply. DM interactions always resolve to `Everyone`.
async fn authorize(
    resolver: &PermissionResolver,
    ctx: &InteractionContext,
    required: PermissionTier,
) -> bool {
    if let (Some(guild_id), Some(member)) = (ctx.guild_id(), ctx.member()) {
        match resolver.resolve(guild_id, member).await {
            Ok(tier) => ctx.set_permission_tier(tier),
            Err(e) => {
                ctx.handle_error(&e).await;
                return false;
            }
        }
    }

    if ctx.permission_tier() < required {
        debug!(
            tier = %ctx.permission_tier(),
            required = %required,
            "Permission tier too low"
        );
        if let Err(e) = ctx.reply_no_permission().await {
            debug!(error = %e, "Could not deliver no-permission reply");
        }
        return false;
    }
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
