//! Handler registries.
//!
//! A [`Registry`] is an ordered list of handlers for one interaction kind.
//! Lookup is a linear scan: registries are small and built once at startup.
//! Handlers with an exact or predicate matcher always take precedence over a
//! catch-all, whatever the registration order.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::{ButtonContext, CommandContext, ModalContext, SelectMenuContext};
use crate::handler::{BoxedHandler, Handler};
use crate::matcher::Matcher;
use crate::properties::Properties;

struct Entry<C> {
    matcher: Matcher,
    properties: Properties,
    handler: BoxedHandler<C>,
}

/// The handler selected for an identifier.
pub struct Route<C> {
    pub properties: Properties,
    pub handler: BoxedHandler<C>,
}

impl<C> fmt::Debug for Route<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Ordered handlers for one interaction kind.
pub struct Registry<C> {
    entries: Vec<Entry<C>>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a handler. Its matcher and properties are read once, here.
    pub fn register(&mut self, handler: impl Handler<C>) -> &mut Self {
        let matcher = handler.matcher();
        let properties = handler.properties();
        debug!(matcher = ?matcher, "Registering handler");
        self.entries.push(Entry {
            matcher,
            properties,
            handler: Arc::new(handler),
        });
        self
    }

    /// Finds the handler owning `id`.
    ///
    /// `None` is a normal outcome for unknown or expired identifiers.
    pub fn find(&self, id: &str) -> Option<Route<C>> {
        let entry = self
            .entries
            .iter()
            .find(|e| !e.matcher.is_catch_all() && e.matcher.matches(id))
            .or_else(|| self.entries.iter().find(|e| e.matcher.is_catch_all()));

        match entry {
            Some(entry) => {
                trace!(id, matcher = ?entry.matcher, "Handler matched");
                Some(Route {
                    properties: entry.properties,
                    handler: Arc::clone(&entry.handler),
                })
            }
            None => {
                trace!(id, "No handler matched");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One registry per interaction identifier namespace.
#[derive(Default)]
pub struct InteractionRegistry {
    pub commands: Registry<CommandContext>,
    pub buttons: Registry<ButtonContext>,
    pub select_menus: Registry<SelectMenuContext>,
    pub modals: Registry<ModalContext>,
}

impl InteractionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, handler: impl Handler<CommandContext>) -> Self {
        self.commands.register(handler);
        self
    }

    pub fn button(mut self, handler: impl Handler<ButtonContext>) -> Self {
        self.buttons.register(handler);
        self
    }

    pub fn select_menu(mut self, handler: impl Handler<SelectMenuContext>) -> Self {
        self.select_menus.register(handler);
        self
    }

    pub fn modal(mut self, handler: impl Handler<ModalContext>) -> Self {
        self.modals.register(handler);
        self
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.commands.len() + self.buttons.len() + self.select_menus.len() + self.modals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
