//! Handler system for the Wicket framework.
//!
//! A [`Handler`] owns a slice of the identifier namespace of one interaction
//! kind. It declares a [`Matcher`], dispatch [`Properties`] and an `execute`
//! body receiving the kind-specific context.
//!
//! # Example
//!
//! ```rust,ignore
//! struct CloseButton;
//!
//! #[async_trait]
//! impl Handler<ButtonContext> for CloseButton {
//!     fn matcher(&self) -> Matcher {
//!         Matcher::exact("close")
//!     }
//!
//!     fn properties(&self) -> Properties {
//!         Properties::new().permission_level(PermissionTier::Support)
//!     }
//!
//!     async fn execute(&self, ctx: ButtonContext) {
//!         let _ = ctx.reply("Closing ticket...").await;
//!     }
//! }
//!
//! // Or, for small handlers, from a closure:
//! let ping = handler_fn(Matcher::exact("ping"), Properties::new().allow_dms(), |ctx: CommandContext| async move {
//!     let _ = ctx.reply("pong").await;
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::matcher::Matcher;
use crate::properties::Properties;

// ============================================================================
// Handler Trait
// ============================================================================

/// One bot action, registered once at startup.
#[async_trait]
pub trait Handler<C>: Send + Sync + 'static {
    /// The identifiers this handler owns.
    fn matcher(&self) -> Matcher;

    /// Location, tier and timeout requirements.
    fn properties(&self) -> Properties;

    /// Runs the handler body on its own task.
    async fn execute(&self, ctx: C);
}

/// A type-erased handler stored in a registry.
pub type BoxedHandler<C> = Arc<dyn Handler<C>>;

// ============================================================================
// Closure handlers
// ============================================================================

/// A handler built from a matcher, properties and an async closure.
pub struct HandlerFn<F> {
    matcher: Matcher,
    properties: Properties,
    f: F,
}

#[async_trait]
impl<C, F, Fut> Handler<C> for HandlerFn<F>
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn matcher(&self) -> Matcher {
        self.matcher.clone()
    }

    fn properties(&self) -> Properties {
        self.properties
    }

    async fn execute(&self, ctx: C) {
        (self.f)(ctx).await;
    }
}

/// Builds a handler from an async closure.
pub fn handler_fn<C, F, Fut>(matcher: Matcher, properties: Properties, f: F) -> HandlerFn<F>
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    HandlerFn {
        matcher,
        properties,
        f,
    }
}
