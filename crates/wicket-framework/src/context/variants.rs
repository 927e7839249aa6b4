//! Kind-specific context wrappers.

use std::ops::Deref;

use wicket_core::{
    CommandData, InitialResponse, InteractionData, ModalSubmitData, OptionValue, SelectMenuData,
};

use super::InteractionContext;
use crate::error::ResponseResult;

macro_rules! context_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            inner: InteractionContext,
        }

        impl From<InteractionContext> for $name {
            fn from(inner: InteractionContext) -> Self {
                Self { inner }
            }
        }

        impl Deref for $name {
            type Target = InteractionContext;

            fn deref(&self) -> &InteractionContext {
                &self.inner
            }
        }
    };
}

context_wrapper!(
    /// Context for a slash command invocation.
    CommandContext
);
context_wrapper!(
    /// Context for a button click.
    ButtonContext
);
context_wrapper!(
    /// Context for a select-menu choice.
    SelectMenuContext
);
context_wrapper!(
    /// Context for a modal submission.
    ModalContext
);

impl CommandContext {
    pub fn data(&self) -> Option<&CommandData> {
        match &self.interaction().data {
            InteractionData::Command(data) => Some(data),
            _ => None,
        }
    }

    /// Full invoked path, e.g. `"ticket close"`.
    pub fn command_path(&self) -> String {
        self.data().map(CommandData::path).unwrap_or_default()
    }

    /// Looks up an option of the invoked (sub)command.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.data()?.option(name)
    }
}

impl ButtonContext {
    pub fn custom_id(&self) -> &str {
        self.interaction().custom_id().unwrap_or_default()
    }

    /// Acknowledges without changing the message the button is on.
    pub async fn defer_update(&self) -> ResponseResult<()> {
        self.acknowledge_with(InitialResponse::DeferredUpdate).await
    }
}

impl SelectMenuContext {
    pub fn data(&self) -> Option<&SelectMenuData> {
        match &self.interaction().data {
            InteractionData::SelectMenu(data) => Some(data),
            _ => None,
        }
    }

    pub fn custom_id(&self) -> &str {
        self.interaction().custom_id().unwrap_or_default()
    }

    pub fn values(&self) -> &[String] {
        self.data().map(|d| d.values.as_slice()).unwrap_or_default()
    }

    /// Acknowledges without changing the message the menu is on.
    pub async fn defer_update(&self) -> ResponseResult<()> {
        self.acknowledge_with(InitialResponse::DeferredUpdate).await
    }
}

impl ModalContext {
    pub fn data(&self) -> Option<&ModalSubmitData> {
        match &self.interaction().data {
            InteractionData::ModalSubmit(data) => Some(data),
            _ => None,
        }
    }

    pub fn custom_id(&self) -> &str {
        self.interaction().custom_id().unwrap_or_default()
    }

    /// A submitted text-input value.
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.data()?.field(custom_id)
    }
}
