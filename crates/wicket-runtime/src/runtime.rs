//! Runtime orchestration.
//!
//! [`WicketRuntime`] ties the layers together: it owns the validated
//! configuration, the [`Dispatcher`] and the [`AckOwner`], and drives one
//! interaction at a time through dispatch and acknowledgment. The ingestion
//! loop ([`WicketRuntime::run`]) handles each interaction on its own task
//! until the shutdown token fires or Ctrl-C arrives.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use wicket_runtime::WicketRuntime;
//!
//! let runtime = WicketRuntime::builder()
//!     .config_file("wicket.toml")
//!     .interaction_api(rest.clone())
//!     .guild_data(cache.clone())
//!     .grant_store(database.clone())
//!     .premium_lookup(billing.clone())
//!     .button(CloseButton)
//!     .build()?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(64);
//! runtime.run(rx).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use wicket_core::{GrantStore, GuildData, Interaction, InteractionApi, PremiumLookup};
use wicket_framework::{
    ButtonContext, CommandContext, Dispatch, Dispatcher, Handler, InteractionRegistry,
    MemoryPermissionCache, ModalContext, PermissionCache, PermissionResolver, SelectMenuContext,
    response_channel,
};

use crate::config::{ConfigLoader, WicketConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::owner::{AckOwner, AckTarget};

struct RuntimeInner {
    config: WicketConfig,
    dispatcher: Dispatcher,
    owner: AckOwner,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// The Wicket runtime.
///
/// Cheap to clone; clones share the dispatcher, the shutdown token and the
/// set of in-flight interactions.
#[derive(Clone)]
pub struct WicketRuntime {
    inner: Arc<RuntimeInner>,
}

impl WicketRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &WicketConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// The token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Requests shutdown of the ingestion loop.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Dispatches one interaction and runs its acknowledgment cycle.
    ///
    /// Returns once the initial acknowledgment is settled; the handler may
    /// still be running. `Ok(false)` means the interaction was rejected.
    pub async fn handle_interaction(&self, interaction: Interaction) -> RuntimeResult<bool> {
        let target = AckTarget::of(&interaction);
        let (sink, receiver) = response_channel();

        match self.inner.dispatcher.dispatch(interaction, sink).await? {
            Dispatch::Spawned {
                can_edit_original,
                timeout,
                handle,
            } => {
                let outcome = self
                    .inner
                    .owner
                    .run(&target, receiver, timeout, can_edit_original)
                    .await;
                debug!(
                    interaction_id = target.interaction_id,
                    kind = target.kind.as_str(),
                    %outcome,
                    "Acknowledgment settled"
                );

                self.inner.tracker.spawn(async move {
                    if let Err(e) = handle.await {
                        warn!(error = %e, "Handler task did not complete");
                    }
                });
                Ok(true)
            }
            Dispatch::Rejected(_) => Ok(false),
        }
    }

    /// Decodes a raw interaction event and handles it.
    pub async fn handle_raw(&self, json: &str) -> RuntimeResult<bool> {
        let interaction = Interaction::from_json(json).map_err(|e| {
            warn!(error = %e, "Dropping undecodable interaction");
            e
        })?;
        self.handle_interaction(interaction).await
    }

    /// Handles interactions from `interactions` until the channel closes,
    /// the shutdown token fires or Ctrl-C arrives, then waits up to the
    /// configured grace period for in-flight interactions.
    pub async fn run(&self, mut interactions: mpsc::Receiver<Interaction>) -> RuntimeResult<()> {
        info!("Wicket runtime is now running. Press Ctrl+C to stop.");

        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut signal_available = true;

        loop {
            tokio::select! {
                biased;

                _ = self.inner.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                result = &mut ctrl_c, if signal_available => match result {
                    Ok(()) => {
                        info!("Received Ctrl+C, shutting down");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to listen for Ctrl+C");
                        signal_available = false;
                    }
                },
                next = interactions.recv() => match next {
                    Some(interaction) => {
                        let runtime = self.clone();
                        self.inner.tracker.spawn(async move {
                            if let Err(e) = runtime.handle_interaction(interaction).await {
                                warn!(error = %e, "Interaction dropped");
                            }
                        });
                    }
                    None => {
                        debug!("Interaction source closed");
                        break;
                    }
                },
            }
        }

        self.drain().await;
        info!("Runtime stopped");
        Ok(())
    }

    async fn drain(&self) {
        let tracker = &self.inner.tracker;
        tracker.close();

        let grace = self.inner.config.interactions.shutdown_grace();
        if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
            warn!(
                in_flight = tracker.len(),
                "Grace period elapsed with interactions still running"
            );
        }
    }
}

impl std::fmt::Debug for WicketRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WicketRuntime")
            .field("application_id", &self.inner.config.bot.application_id)
            .field("in_flight", &self.inner.tracker.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`WicketRuntime`].
///
/// Configuration is loaded through a [`ConfigLoader`] unless a complete
/// [`WicketConfig`] is supplied with [`config`](Self::config). The
/// interaction API, guild data, grant store and premium lookup are required;
/// the permission cache defaults to a [`MemoryPermissionCache`] using the
/// configured TTL.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<WicketConfig>,
    registry: InteractionRegistry,
    api: Option<Arc<dyn InteractionApi>>,
    guild_data: Option<Arc<dyn GuildData>>,
    grants: Option<Arc<dyn GrantStore>>,
    premium: Option<Arc<dyn PremiumLookup>>,
    cache: Option<Arc<dyn PermissionCache>>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            registry: InteractionRegistry::new(),
            api: None,
            guild_data: None,
            grants: None,
            premium: None,
            cache: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: WicketConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, skipping file and environment loading.
    pub fn config(mut self, config: WicketConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Whether `build` installs the global tracing subscriber (default `true`).
    pub fn logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Replaces the handler registry.
    pub fn registry(mut self, registry: InteractionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn command(mut self, handler: impl Handler<CommandContext>) -> Self {
        self.registry = self.registry.command(handler);
        self
    }

    pub fn button(mut self, handler: impl Handler<ButtonContext>) -> Self {
        self.registry = self.registry.button(handler);
        self
    }

    pub fn select_menu(mut self, handler: impl Handler<SelectMenuContext>) -> Self {
        self.registry = self.registry.select_menu(handler);
        self
    }

    pub fn modal(mut self, handler: impl Handler<ModalContext>) -> Self {
        self.registry = self.registry.modal(handler);
        self
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    pub fn interaction_api(mut self, api: Arc<dyn InteractionApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn guild_data(mut self, guild_data: Arc<dyn GuildData>) -> Self {
        self.guild_data = Some(guild_data);
        self
    }

    pub fn grant_store(mut self, grants: Arc<dyn GrantStore>) -> Self {
        self.grants = Some(grants);
        self
    }

    pub fn premium_lookup(mut self, premium: Arc<dyn PremiumLookup>) -> Self {
        self.premium = Some(premium);
        self
    }

    /// Shares a permission cache, e.g. with a resolver used for grants.
    pub fn permission_cache(mut self, cache: Arc<dyn PermissionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<WicketRuntime> {
        let api = self
            .api
            .ok_or(RuntimeError::MissingCollaborator("interaction_api"))?;
        let guild_data = self
            .guild_data
            .ok_or(RuntimeError::MissingCollaborator("guild_data"))?;
        let grants = self
            .grants
            .ok_or(RuntimeError::MissingCollaborator("grant_store"))?;
        let premium = self
            .premium
            .ok_or(RuntimeError::MissingCollaborator("premium_lookup"))?;

        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(MemoryPermissionCache::new(config.permissions.cache_ttl()))
        });
        let resolver = PermissionResolver::new(guild_data, grants, cache)
            .with_operators(config.bot.operators.iter().copied());

        info!(
            application_id = config.bot.application_id,
            handlers = self.registry.len(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        let dispatcher = Dispatcher::new(
            Arc::new(self.registry),
            api.clone(),
            Arc::new(resolver),
            premium,
            config.bot.identity(),
        )
        .with_reply_limit(config.interactions.reply_limit)
        .with_default_timeout(config.interactions.default_timeout());

        Ok(WicketRuntime {
            inner: Arc::new(RuntimeInner {
                config,
                dispatcher,
                owner: AckOwner::new(api),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
            }),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wicket_core::{InteractionData, Member, PermissionTier, User};
    use wicket_framework::{Matcher, Properties, handler_fn};

    use super::*;
    use crate::testing::{NoPremium, NoGrants, RecordingApi, StaticGuild};

    fn config() -> WicketConfig {
        let mut config = WicketConfig::default();
        config.bot.application_id = 2;
        config.interactions.shutdown_grace_secs = 1;
        config
    }

    fn builder(api: Arc<RecordingApi>) -> RuntimeBuilder {
        WicketRuntime::builder()
            .config(config())
            .logging(false)
            .interaction_api(api)
            .guild_data(Arc::new(StaticGuild::new(100, 1)))
            .grant_store(Arc::new(NoGrants))
            .premium_lookup(Arc::new(NoPremium))
            .button(handler_fn(
                Matcher::exact("open"),
                Properties::new(),
                |ctx: ButtonContext| async move {
                    let _ = ctx.reply("Ticket opened").await;
                },
            ))
            .button(handler_fn(
                Matcher::exact("close"),
                Properties::new().permission_level(PermissionTier::Support),
                |ctx: ButtonContext| async move {
                    let _ = ctx.reply("Ticket closed").await;
                },
            ))
    }

    fn button(id: u64, custom_id: &str) -> Interaction {
        Interaction::new(id, 2, "token", InteractionData::button(custom_id))
            .in_guild(100, Member::new(User::new(10, "alice"), vec![]))
            .with_channel(500)
    }

    #[test]
    fn test_build_requires_collaborators() {
        let result = WicketRuntime::builder()
            .config(config())
            .logging(false)
            .build();
        assert!(matches!(
            result,
            Err(RuntimeError::MissingCollaborator("interaction_api"))
        ));
    }

    #[test]
    fn test_build_validates_config() {
        let result = builder(Arc::new(RecordingApi::default()))
            .config(WicketConfig::default())
            .build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[tokio::test]
    async fn test_handle_interaction_acknowledges() {
        let api = Arc::new(RecordingApi::default());
        let runtime = builder(api.clone()).build().unwrap();

        assert!(runtime.handle_interaction(button(1, "open")).await.unwrap());
        assert_eq!(api.calls(), vec!["message"]);
    }

    #[tokio::test]
    async fn test_insufficient_tier_gets_refusal() {
        let api = Arc::new(RecordingApi::default());
        let runtime = builder(api.clone()).build().unwrap();

        assert!(runtime.handle_interaction(button(1, "close")).await.unwrap());
        // The refusal is the handler task's one initial response.
        assert_eq!(api.calls(), vec!["message"]);
    }

    #[tokio::test]
    async fn test_unknown_handler_is_rejected_silently() {
        let api = Arc::new(RecordingApi::default());
        let runtime = builder(api.clone()).build().unwrap();

        assert!(!runtime.handle_interaction(button(1, "stale")).await.unwrap());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handle_raw_rejects_malformed_payload() {
        let runtime = builder(Arc::new(RecordingApi::default())).build().unwrap();

        let result = runtime.handle_raw("{\"type\": 3").await;
        assert!(matches!(result, Err(RuntimeError::Wire(_))));
    }

    #[tokio::test]
    async fn test_run_drains_until_source_closes() {
        let api = Arc::new(RecordingApi::default());
        let runtime = builder(api.clone()).build().unwrap();

        let (tx, rx) = mpsc::channel(8);
        for id in 1..=3 {
            tx.send(button(id, "open")).await.unwrap();
        }
        drop(tx);

        runtime.run(rx).await.unwrap();
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let runtime = builder(Arc::new(RecordingApi::default())).build().unwrap();
        let (_tx, rx) = mpsc::channel(8);

        runtime.shutdown();
        let result = tokio::time::timeout(Duration::from_secs(5), runtime.run(rx)).await;
        assert!(matches!(result, Ok(Ok(()))));
        assert!(runtime.shutdown_token().is_cancelled());
    }
}
