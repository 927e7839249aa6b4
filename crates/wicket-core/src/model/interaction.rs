//! Inbound interaction snapshot.
//!
//! An [`Interaction`] is immutable once decoded. Handlers read it through
//! their context; the dispatcher reads its location and routing id.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::guild::{Member, User};
use super::permissions::Permissions;
use super::{ApplicationId, ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};

// =============================================================================
// Interaction
// =============================================================================

/// The four interaction kinds the core routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Command,
    Button,
    SelectMenu,
    ModalSubmit,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Button => "button",
            Self::SelectMenu => "select_menu",
            Self::ModalSubmit => "modal_submit",
        }
    }

    /// Returns `true` for interactions attached to an existing message.
    pub fn is_component(&self) -> bool {
        matches!(self, Self::Button | Self::SelectMenu)
    }
}

/// One inbound event from the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub id: InteractionId,
    pub application_id: ApplicationId,
    /// Time-boxed response token.
    pub token: String,
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    /// Present for guild interactions.
    pub member: Option<Member>,
    /// Present for DM interactions.
    pub user: Option<User>,
    pub locale: Option<String>,
    pub guild_locale: Option<String>,
    /// Permissions the application holds in the channel.
    pub app_permissions: Option<Permissions>,
    /// Message the component is attached to.
    pub message_id: Option<MessageId>,
    pub data: InteractionData,
}

impl Interaction {
    /// Creates a location-less interaction; use [`in_guild`](Self::in_guild)
    /// or [`in_dm`](Self::in_dm) to place it.
    pub fn new(
        id: InteractionId,
        application_id: ApplicationId,
        token: impl Into<String>,
        data: InteractionData,
    ) -> Self {
        Self {
            id,
            application_id,
            token: token.into(),
            guild_id: None,
            channel_id: None,
            member: None,
            user: None,
            locale: None,
            guild_locale: None,
            app_permissions: None,
            message_id: None,
            data,
        }
    }

    pub fn in_guild(mut self, guild_id: GuildId, member: Member) -> Self {
        self.guild_id = Some(guild_id);
        self.member = Some(member);
        self.user = None;
        self
    }

    pub fn in_dm(mut self, user: User) -> Self {
        self.guild_id = None;
        self.member = None;
        self.user = Some(user);
        self
    }

    pub fn with_channel(mut self, channel_id: ChannelId) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn kind(&self) -> InteractionKind {
        self.data.kind()
    }

    /// The identifier handlers are matched against: the custom id for
    /// components and modals, the invoked path for commands.
    pub fn routing_id(&self) -> Cow<'_, str> {
        match &self.data {
            InteractionData::Command(data) => Cow::Owned(data.path()),
            InteractionData::Button(data) => Cow::Borrowed(&data.custom_id),
            InteractionData::SelectMenu(data) => Cow::Borrowed(&data.custom_id),
            InteractionData::ModalSubmit(data) => Cow::Borrowed(&data.custom_id),
        }
    }

    /// The component or modal custom id, if any.
    pub fn custom_id(&self) -> Option<&str> {
        match &self.data {
            InteractionData::Command(_) => None,
            InteractionData::Button(data) => Some(&data.custom_id),
            InteractionData::SelectMenu(data) => Some(&data.custom_id),
            InteractionData::ModalSubmit(data) => Some(&data.custom_id),
        }
    }

    pub fn is_guild(&self) -> bool {
        self.guild_id.is_some()
    }

    pub fn is_dm(&self) -> bool {
        self.guild_id.is_none()
    }

    /// The acting user, taken from the member record in guilds.
    pub fn author(&self) -> Option<&User> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.author().map(|u| u.id)
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionData {
    Command(CommandData),
    Button(ButtonData),
    SelectMenu(SelectMenuData),
    ModalSubmit(ModalSubmitData),
}

impl InteractionData {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::Command(_) => InteractionKind::Command,
            Self::Button(_) => InteractionKind::Button,
            Self::SelectMenu(_) => InteractionKind::SelectMenu,
            Self::ModalSubmit(_) => InteractionKind::ModalSubmit,
        }
    }

    pub fn button(custom_id: impl Into<String>) -> Self {
        Self::Button(ButtonData {
            custom_id: custom_id.into(),
        })
    }

    pub fn command(name: impl Into<String>, options: Vec<CommandOption>) -> Self {
        Self::Command(CommandData {
            id: 0,
            name: name.into(),
            options,
        })
    }
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CommandData {
    pub id: u64,
    pub name: String,
    pub options: Vec<CommandOption>,
}

impl CommandData {
    /// Full invoked path, e.g. `"ticket close"` for a subcommand.
    pub fn path(&self) -> String {
        let mut path = self.name.clone();
        let mut options = self.options.as_slice();
        while let Some(CommandOption {
            name,
            value: OptionValue::SubCommand(inner) | OptionValue::SubCommandGroup(inner),
        }) = options.first()
        {
            path.push(' ');
            path.push_str(name);
            options = inner.as_slice();
        }
        path
    }

    /// The value options of the innermost invoked subcommand.
    pub fn leaf_options(&self) -> &[CommandOption] {
        let mut options = self.options.as_slice();
        while let Some(CommandOption {
            value: OptionValue::SubCommand(inner) | OptionValue::SubCommandGroup(inner),
            ..
        }) = options.first()
        {
            options = inner.as_slice();
        }
        options
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.leaf_options()
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A command option value as sent by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    SubCommand(Vec<CommandOption>),
    SubCommandGroup(Vec<CommandOption>),
    String(String),
    Integer(i64),
    Boolean(bool),
    User(UserId),
    Channel(ChannelId),
    Role(RoleId),
    Mentionable(u64),
    Number(f64),
    Attachment(u64),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Any id-valued option.
    pub fn as_snowflake(&self) -> Option<u64> {
        match self {
            Self::User(id)
            | Self::Channel(id)
            | Self::Role(id)
            | Self::Mentionable(id)
            | Self::Attachment(id) => Some(*id),
            _ => None,
        }
    }
}

// =============================================================================
// Components and modals
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonData {
    pub custom_id: String,
}

/// Which select-menu variant produced the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectMenuKind {
    String,
    User,
    Role,
    Mentionable,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenuData {
    pub custom_id: String,
    pub kind: SelectMenuKind,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalSubmitData {
    pub custom_id: String,
    pub fields: Vec<ModalField>,
}

impl ModalSubmitData {
    /// Looks up a submitted text-input value by its custom id.
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.custom_id == custom_id)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalField {
    pub custom_id: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subcommand(name: &str, inner: Vec<CommandOption>) -> CommandOption {
        CommandOption::new(name, OptionValue::SubCommand(inner))
    }

    #[test]
    fn test_command_path_descends_subcommands() {
        let data = CommandData {
            id: 1,
            name: "ticket".into(),
            options: vec![subcommand(
                "close",
                vec![CommandOption::new("reason", OptionValue::String("done".into()))],
            )],
        };

        assert_eq!(data.path(), "ticket close");
        assert_eq!(
            data.option("reason").and_then(OptionValue::as_str),
            Some("done")
        );
    }

    #[test]
    fn test_routing_id_per_kind() {
        let button = Interaction::new(1, 2, "tok", InteractionData::button("open-ticket"));
        assert_eq!(button.routing_id(), "open-ticket");
        assert_eq!(button.kind(), InteractionKind::Button);

        let command = Interaction::new(1, 2, "tok", InteractionData::command("help", vec![]));
        assert_eq!(command.routing_id(), "help");
        assert!(command.custom_id().is_none());
    }

    #[test]
    fn test_author_prefers_member() {
        let member = Member::new(User::new(10, "alice"), vec![]);
        let interaction = Interaction::new(1, 2, "tok", InteractionData::button("x"))
            .in_guild(100, member);

        assert_eq!(interaction.user_id(), Some(10));
        assert!(interaction.is_guild());

        let dm = interaction.in_dm(User::new(11, "bob"));
        assert_eq!(dm.user_id(), Some(11));
        assert!(dm.is_dm());
    }
}
