//! Per-interaction context and response protocol.
//!
//! One [`InteractionContext`] exists per dispatched interaction. It carries
//! the interaction snapshot, the resolved tiers, and the response-protocol
//! state machine:
//!
//! ```text
//!                    ┌──────────────┐ reply / defer / edit ┌──────────────┐
//!                    │Unacknowledged│─────────────────────▶│ Acknowledged │──▶ follow-ups
//!                    └──────┬───────┘                      └──────────────┘
//!                           │ open_modal
//!                           ▼
//!                    ┌──────────────┐
//!                    │ ModalOpened  │ (terminal)
//!                    └──────────────┘
//! ```
//!
//! The first transition is guarded by an atomic compare-exchange, so only
//! one of several racing calls delivers the initial response through the
//! handoff slot. Every later reply is a follow-up network call, capped at
//! the configured reply limit.
//!
//! Kind-specific wrappers ([`CommandContext`], [`ButtonContext`],
//! [`SelectMenuContext`], [`ModalContext`]) deref to the shared context and
//! add accessors for their payload.

mod variants;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use wicket_core::{
    ChannelId, Embed, GuildId, InitialResponse, Interaction, InteractionApi, InteractionKind,
    Member, MessageId, MessageResponse, ModalResponse, PermissionTier, PremiumTier, User, UserId,
    colour,
};

use crate::error::{ResponseError, ResponseResult};
use crate::handoff::{Delivery, HandoffSender, ResponseSink};
use crate::properties::Properties;

pub use variants::{ButtonContext, CommandContext, ModalContext, SelectMenuContext};

/// Platform cap on replies per interaction.
pub const DEFAULT_REPLY_LIMIT: u32 = 5;

// =============================================================================
// Response phase
// =============================================================================

/// Where a context stands in the response protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    Unacknowledged,
    Acknowledged,
    ModalOpened,
}

impl ResponsePhase {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Unacknowledged => 0,
            Self::Acknowledged => 1,
            Self::ModalOpened => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Acknowledged,
            2 => Self::ModalOpened,
            _ => Self::Unacknowledged,
        }
    }
}

/// Settings the dispatcher resolves before building a context.
#[derive(Debug, Clone, Copy)]
pub struct ContextSettings {
    pub properties: Properties,
    pub premium_tier: PremiumTier,
    pub reply_limit: u32,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            properties: Properties::default(),
            premium_tier: PremiumTier::None,
            reply_limit: DEFAULT_REPLY_LIMIT,
        }
    }
}

// =============================================================================
// InteractionContext
// =============================================================================

/// Shared state and response operations for one interaction.
pub struct InteractionContext {
    interaction: Arc<Interaction>,
    author: User,
    api: Arc<dyn InteractionApi>,
    settings: ContextSettings,
    permission_tier: AtomicU8,

    phase: AtomicU8,
    replies: AtomicU32,
    initial: Mutex<Option<HandoffSender<InitialResponse>>>,
    edit: Mutex<Option<HandoffSender<MessageResponse>>>,
    acknowledged: watch::Receiver<bool>,
}

impl InteractionContext {
    /// Builds the context for `interaction`.
    ///
    /// Returns `None` when the interaction carries neither a member nor a
    /// user record.
    pub fn new(
        interaction: Arc<Interaction>,
        api: Arc<dyn InteractionApi>,
        sink: ResponseSink,
        settings: ContextSettings,
    ) -> Option<Self> {
        let author = interaction.author()?.clone();
        let ResponseSink {
            initial,
            edit,
            acknowledged,
        } = sink;
        // Without the capability the edit slot is dropped and edits go direct.
        let edit = settings.properties.can_edit_original.then_some(edit);

        Some(Self {
            interaction,
            author,
            api,
            settings,
            permission_tier: AtomicU8::new(PermissionTier::Everyone as u8),
            phase: AtomicU8::new(ResponsePhase::Unacknowledged.as_u8()),
            replies: AtomicU32::new(0),
            initial: Mutex::new(Some(initial)),
            edit: Mutex::new(edit),
            acknowledged,
        })
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn kind(&self) -> InteractionKind {
        self.interaction.kind()
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.interaction.guild_id
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        self.interaction.channel_id
    }

    pub fn user(&self) -> &User {
        &self.author
    }

    pub fn user_id(&self) -> UserId {
        self.author.id
    }

    pub fn member(&self) -> Option<&Member> {
        self.interaction.member.as_ref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.interaction
            .locale
            .as_deref()
            .or(self.interaction.guild_locale.as_deref())
    }

    pub fn properties(&self) -> &Properties {
        &self.settings.properties
    }

    // =========================================================================
    // Tiers
    // =========================================================================

    pub fn permission_tier(&self) -> PermissionTier {
        PermissionTier::from_u8(self.permission_tier.load(Ordering::Acquire))
            .unwrap_or_default()
    }

    pub(crate) fn set_permission_tier(&self, tier: PermissionTier) {
        self.permission_tier.store(tier as u8, Ordering::Release);
    }

    pub fn premium_tier(&self) -> PremiumTier {
        self.settings.premium_tier
    }

    pub fn is_premium(&self) -> bool {
        self.settings.premium_tier.is_premium()
    }

    // =========================================================================
    // Protocol state
    // =========================================================================

    pub fn phase(&self) -> ResponsePhase {
        ResponsePhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Replies counted against the limit so far, including attempts the
    /// limit refused. Replies refused because a modal was opened are not
    /// counted.
    pub fn reply_count(&self) -> u32 {
        self.replies.load(Ordering::SeqCst)
    }

    pub fn reply_limit(&self) -> u32 {
        self.settings.reply_limit
    }

    /// Attempts the one transition out of `Unacknowledged`.
    fn claim(&self, target: ResponsePhase) -> bool {
        self.phase
            .compare_exchange(
                ResponsePhase::Unacknowledged.as_u8(),
                target.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Waits until the owner has finished the initial acknowledgment.
    async fn wait_acknowledged(&self) {
        let mut rx = self.acknowledged.clone();
        // An error means the owner is gone; nothing left to wait for.
        let _ = rx.wait_for(|done| *done).await;
    }

    // =========================================================================
    // Replies
    // =========================================================================

    /// Sends a message: the initial response if none was sent yet, a
    /// follow-up otherwise.
    ///
    /// Returns the follow-up message id, or `None` for an initial response.
    pub async fn reply_with(&self, message: MessageResponse) -> ResponseResult<Option<MessageId>> {
        if self.phase() == ResponsePhase::ModalOpened {
            return Err(ResponseError::ModalAlreadyOpened);
        }

        let previous = self.replies.fetch_add(1, Ordering::SeqCst);
        if previous >= self.settings.reply_limit {
            debug!(
                limit = self.settings.reply_limit,
                "Reply refused, limit reached"
            );
            return Err(ResponseError::ReplyLimitReached {
                limit: self.settings.reply_limit,
            });
        }

        if self.claim(ResponsePhase::Acknowledged) {
            return self.send_initial(InitialResponse::Message(message)).await;
        }
        if self.phase() == ResponsePhase::ModalOpened {
            // Lost the race to a modal; this attempt never counted.
            self.replies.fetch_sub(1, Ordering::SeqCst);
            return Err(ResponseError::ModalAlreadyOpened);
        }
        self.followup(message).await.map(Some)
    }

    pub async fn reply(&self, content: impl Into<String>) -> ResponseResult<Option<MessageId>> {
        self.reply_with(MessageResponse::text(content)).await
    }

    pub async fn reply_ephemeral(
        &self,
        content: impl Into<String>,
    ) -> ResponseResult<Option<MessageId>> {
        self.reply_with(MessageResponse::text(content).ephemeral(true))
            .await
    }

    pub async fn reply_embed(&self, embed: Embed) -> ResponseResult<Option<MessageId>> {
        self.reply_with(MessageResponse::new().embed(embed)).await
    }

    /// Acknowledges now and replies later. A no-op once acknowledged.
    pub async fn defer(&self, ephemeral: bool) -> ResponseResult<()> {
        self.acknowledge_with(InitialResponse::DeferredMessage { ephemeral })
            .await
    }

    pub(crate) async fn acknowledge_with(&self, response: InitialResponse) -> ResponseResult<()> {
        if self.claim(ResponsePhase::Acknowledged) {
            return self.send_initial(response).await.map(|_| ());
        }
        match self.phase() {
            ResponsePhase::ModalOpened => Err(ResponseError::ModalAlreadyOpened),
            _ => Ok(()),
        }
    }

    /// Edits the original message.
    ///
    /// Before acknowledgment this becomes the initial response (an in-place
    /// update for components that may edit their original). Afterwards it
    /// goes through the edit slot while the synchronous cycle is still
    /// open, and as a direct edit call otherwise.
    pub async fn edit(&self, message: MessageResponse) -> ResponseResult<()> {
        if self.claim(ResponsePhase::Acknowledged) {
            let response = if self.kind().is_component() && self.settings.properties.can_edit_original
            {
                InitialResponse::UpdateMessage(message)
            } else {
                InitialResponse::Message(message)
            };
            return self.send_initial(response).await.map(|_| ());
        }
        if self.phase() == ResponsePhase::ModalOpened {
            return Err(ResponseError::ModalAlreadyOpened);
        }

        self.wait_acknowledged().await;
        let slot = self.edit.lock().take();
        match slot {
            Some(sender) => match sender.deliver(message).await {
                Delivery::Completed(result) => result.map_err(|e| self.log_failure("edit", e)),
                Delivery::Undelivered(message) => self.edit_original(message).await,
            },
            None => self.edit_original(message).await,
        }
    }

    /// Opens a modal as the initial response.
    pub async fn open_modal(&self, modal: ModalResponse) -> ResponseResult<()> {
        if self.kind() == InteractionKind::ModalSubmit {
            return Err(ResponseError::ModalNotAllowed);
        }
        if !self.claim(ResponsePhase::ModalOpened) {
            return Err(ResponseError::AlreadyAcknowledged);
        }
        self.send_initial(InitialResponse::Modal(modal))
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Canned replies
    // =========================================================================

    /// Ephemeral reply telling the user they lack the required tier.
    pub async fn reply_no_permission(&self) -> ResponseResult<Option<MessageId>> {
        let embed = Embed::new()
            .title("No permission")
            .description("You do not have permission to use this.")
            .colour(colour::FAILURE);
        self.reply_with(MessageResponse::new().embed(embed).ephemeral(true))
            .await
    }

    /// Logs `err` with the interaction's context and sends the user a
    /// generic ephemeral error reply.
    pub async fn handle_error(&self, err: &(dyn fmt::Display + Send + Sync)) {
        error!(
            guild_id = ?self.guild_id(),
            user_id = self.user_id(),
            channel_id = ?self.channel_id(),
            error = %err,
            "Interaction failed"
        );

        let embed = Embed::new()
            .title("Error")
            .description("An error occurred while processing this interaction.")
            .colour(colour::FAILURE);
        if let Err(e) = self
            .reply_with(MessageResponse::new().embed(embed).ephemeral(true))
            .await
        {
            debug!(error = %e, "Could not deliver error reply");
        }
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Delivers the initial response through the handoff slot, degrading to
    /// the follow-up path if the owner has already gone.
    async fn send_initial(&self, response: InitialResponse) -> ResponseResult<Option<MessageId>> {
        let sender = self.initial.lock().take();
        let Some(sender) = sender else {
            return self.degrade(response).await;
        };

        let kind = response.name();
        match sender.deliver(response).await {
            Delivery::Completed(Ok(())) => {
                debug!(response = kind, "Initial response delivered");
                Ok(None)
            }
            Delivery::Completed(Err(e)) => Err(self.log_failure(kind, e)),
            Delivery::Undelivered(response) => {
                debug!(response = kind, "Acknowledgment window closed, degrading");
                self.degrade(response).await
            }
        }
    }

    /// The owner already deferred on our behalf; express `response` in the
    /// post-acknowledgment protocol.
    async fn degrade(&self, response: InitialResponse) -> ResponseResult<Option<MessageId>> {
        match response {
            InitialResponse::Message(message) => self.followup(message).await.map(Some),
            InitialResponse::UpdateMessage(message) => {
                self.edit_original(message).await.map(|_| None)
            }
            InitialResponse::DeferredMessage { .. } | InitialResponse::DeferredUpdate => Ok(None),
            InitialResponse::Modal(_) => Err(ResponseError::WindowClosed),
        }
    }

    async fn followup(&self, message: MessageResponse) -> ResponseResult<MessageId> {
        self.wait_acknowledged().await;
        self.api
            .create_followup(
                self.interaction.application_id,
                &self.interaction.token,
                &message,
            )
            .await
            .map_err(|e| self.log_failure("followup", e))
    }

    async fn edit_original(&self, message: MessageResponse) -> ResponseResult<()> {
        self.wait_acknowledged().await;
        self.api
            .edit_original(
                self.interaction.application_id,
                &self.interaction.token,
                &message,
            )
            .await
            .map_err(|e| self.log_failure("edit_original", e))
    }

    fn log_failure(&self, call: &'static str, err: wicket_core::ApiError) -> ResponseError {
        warn!(
            call,
            guild_id = ?self.guild_id(),
            user_id = self.user_id(),
            channel_id = ?self.channel_id(),
            error = %err,
            "Interaction response failed"
        );
        ResponseError::Api(err)
    }
}

impl fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction_id", &self.interaction.id)
            .field("kind", &self.kind())
            .field("phase", &self.phase())
            .field("replies", &self.reply_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use wicket_core::{ApiError, InteractionData, TextInput, TextInputStyle};

    use super::*;
    use crate::handoff::response_channel;
    use crate::testing::{MockApi, guild_interaction, spawn_owner};

    fn context(
        data: InteractionData,
        properties: Properties,
    ) -> (InteractionContext, Arc<MockApi>, crate::handoff::ResponseReceiver) {
        let api = Arc::new(MockApi::default());
        let (sink, receiver) = response_channel();
        let settings = ContextSettings {
            properties,
            ..Default::default()
        };
        let ctx = InteractionContext::new(
            Arc::new(guild_interaction(data)),
            api.clone(),
            sink,
            settings,
        )
        .unwrap();
        (ctx, api, receiver)
    }

    #[tokio::test]
    async fn test_first_reply_is_initial_rest_are_followups() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        let owner = spawn_owner(api.clone(), receiver);

        assert_eq!(ctx.reply("one").await.unwrap(), None);
        assert!(ctx.reply("two").await.unwrap().is_some());

        assert_eq!(ctx.phase(), ResponsePhase::Acknowledged);
        assert_eq!(api.responses(), vec!["message"]);
        assert_eq!(api.followups.load(Ordering::SeqCst), 1);
        owner.await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_cap_boundary() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        let _owner = spawn_owner(api.clone(), receiver);

        for i in 0..5 {
            assert!(ctx.reply(format!("reply {i}")).await.is_ok(), "reply {i}");
        }
        let calls_before = api.total_calls();

        let sixth = ctx.reply("one too many").await;
        assert!(matches!(
            sixth,
            Err(ResponseError::ReplyLimitReached { limit: 5 })
        ));
        assert_eq!(api.total_calls(), calls_before);
        assert_eq!(api.responses().len(), 1);
        assert_eq!(api.followups.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_concurrent_replies_acknowledge_exactly_once() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        let _owner = spawn_owner(api.clone(), receiver);
        let ctx = Arc::new(ctx);

        let mut tasks = Vec::new();
        for i in 0..4 {
            let ctx = ctx.clone();
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    ctx.reply("hi").await.map(|_| ())
                } else {
                    ctx.edit(MessageResponse::text("edited")).await
                }
            }));
        }
        let modal_ctx = ctx.clone();
        let modal = tokio::spawn(async move {
            modal_ctx
                .open_modal(ModalResponse::new("m", "Modal"))
                .await
        });

        let mut ok = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        let modal_result = modal.await.unwrap();

        assert_eq!(api.responses().len(), 1);
        match ctx.phase() {
            ResponsePhase::ModalOpened => {
                assert!(modal_result.is_ok());
                assert_eq!(ok, 0);
                assert_eq!(api.responses(), vec!["modal"]);
            }
            ResponsePhase::Acknowledged => {
                assert!(matches!(
                    modal_result,
                    Err(ResponseError::AlreadyAcknowledged)
                ));
                assert_eq!(ok, 4);
                let direct = api.followups.load(Ordering::SeqCst) + api.edits.load(Ordering::SeqCst);
                assert_eq!(direct, 3);
            }
            ResponsePhase::Unacknowledged => panic!("no acknowledgment happened"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replies_racing_a_modal_are_not_counted() {
        for _ in 0..50 {
            let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
            let _owner = spawn_owner(api.clone(), receiver);
            let ctx = Arc::new(ctx);

            let replies: Vec<_> = (0..3)
                .map(|_| {
                    let ctx = ctx.clone();
                    tokio::spawn(async move { ctx.reply("hi").await })
                })
                .collect();
            let modal_ctx = ctx.clone();
            let modal =
                tokio::spawn(async move { modal_ctx.open_modal(ModalResponse::new("m", "M")).await });

            let mut accepted = 0;
            for reply in replies {
                match reply.await.unwrap() {
                    Ok(_) => accepted += 1,
                    Err(e) => assert!(matches!(e, ResponseError::ModalAlreadyOpened)),
                }
            }
            let _ = modal.await.unwrap();

            assert_eq!(ctx.reply_count(), accepted);
        }
    }

    #[tokio::test]
    async fn test_modal_then_reply_is_misuse() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        let _owner = spawn_owner(api.clone(), receiver);

        let modal = ModalResponse::new("rename", "Rename")
            .input(TextInput::new("name", "Name", TextInputStyle::Short));
        ctx.open_modal(modal).await.unwrap();

        assert!(matches!(
            ctx.reply("x").await,
            Err(ResponseError::ModalAlreadyOpened)
        ));
        assert!(matches!(
            ctx.defer(true).await,
            Err(ResponseError::ModalAlreadyOpened)
        ));
        assert!(matches!(
            ctx.edit(MessageResponse::text("x")).await,
            Err(ResponseError::ModalAlreadyOpened)
        ));
        // Refused replies are not counted.
        assert_eq!(ctx.reply_count(), 0);
        assert_eq!(api.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_modal_after_ack_and_on_modal_submit() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        let _owner = spawn_owner(api.clone(), receiver);
        ctx.defer(false).await.unwrap();
        assert!(matches!(
            ctx.open_modal(ModalResponse::new("m", "M")).await,
            Err(ResponseError::AlreadyAcknowledged)
        ));

        let submit = InteractionData::ModalSubmit(wicket_core::ModalSubmitData {
            custom_id: "m".into(),
            fields: vec![],
        });
        let (ctx, _api, _receiver) = context(submit, Properties::new());
        assert!(matches!(
            ctx.open_modal(ModalResponse::new("m", "M")).await,
            Err(ResponseError::ModalNotAllowed)
        ));
        assert_eq!(ctx.phase(), ResponsePhase::Unacknowledged);
    }

    #[tokio::test]
    async fn test_defer_after_ack_is_noop() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        let _owner = spawn_owner(api.clone(), receiver);

        ctx.defer(true).await.unwrap();
        ctx.defer(true).await.unwrap();
        assert_eq!(api.responses(), vec!["deferred_message"]);
    }

    #[tokio::test]
    async fn test_reply_without_owner_degrades_to_followup() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        drop(receiver);

        let id = ctx.reply("late").await.unwrap();
        assert!(id.is_some());
        assert!(api.responses().is_empty());
        assert_eq!(api.followups.load(Ordering::SeqCst), 1);

        let (ctx, _api, receiver) = context(InteractionData::button("b"), Properties::new());
        drop(receiver);
        assert!(matches!(
            ctx.open_modal(ModalResponse::new("m", "M")).await,
            Err(ResponseError::WindowClosed)
        ));
    }

    #[tokio::test]
    async fn test_edit_before_ack_updates_component_message() {
        let (ctx, api, receiver) = context(
            InteractionData::button("b"),
            Properties::new().can_edit_original(),
        );
        let _owner = spawn_owner(api.clone(), receiver);

        ctx.edit(MessageResponse::text("updated")).await.unwrap();
        assert_eq!(api.responses(), vec!["update_message"]);
    }

    #[tokio::test]
    async fn test_initial_failure_is_returned() {
        let (ctx, api, receiver) = context(InteractionData::button("b"), Properties::new());
        api.fail_responses.store(true, Ordering::SeqCst);
        let _owner = spawn_owner(api.clone(), receiver);

        let result = ctx.reply("x").await;
        assert!(matches!(result, Err(ResponseError::Api(ApiError::Http { .. }))));
        assert_eq!(ctx.phase(), ResponsePhase::Acknowledged);
    }
}
