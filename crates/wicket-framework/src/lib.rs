//! # Wicket Framework
//!
//! The interaction core: everything between a decoded [`Interaction`] and
//! the handler body that answers it.
//!
//! This layer provides:
//! - [`Matcher`], [`Properties`] and the [`Handler`] trait
//! - per-kind handler [`Registry`]s, grouped in an [`InteractionRegistry`]
//! - the [`Dispatcher`], which validates, routes and spawns handlers
//! - the [`PermissionResolver`] and [`EffectivePermissionCalculator`]
//! - [`InteractionContext`] and its response-protocol state machine
//! - the [`handoff`] channel to the task owning the acknowledgment
//!
//! The framework performs no I/O of its own. Network and storage access go
//! through the collaborator traits of `wicket-core`.
//!
//! [`Interaction`]: wicket_core::Interaction

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod handoff;
pub mod matcher;
pub mod permission;
pub mod properties;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{
    ButtonContext, CommandContext, ContextSettings, DEFAULT_REPLY_LIMIT, InteractionContext,
    ModalContext, ResponsePhase, SelectMenuContext,
};
pub use dispatcher::{DEFAULT_HANDLER_TIMEOUT, Dispatch, Dispatcher, Rejection};
pub use error::{
    CacheError, DispatchError, PermissionError, PermissionResult, ResponseError, ResponseResult,
};
pub use handler::{BoxedHandler, Handler, HandlerFn, handler_fn};
pub use handoff::{
    Delivery, Handoff, HandoffReceiver, HandoffSender, ResponseReceiver, ResponseSink,
    response_channel,
};
pub use matcher::{Matcher, PredicateFn};
pub use permission::{
    DEFAULT_CACHE_TTL, EffectivePermissionCalculator, MemoryPermissionCache, PermissionCache,
    PermissionResolver, compute_permissions,
};
pub use properties::Properties;
pub use registry::{InteractionRegistry, Registry, Route};
