//! Decoding of the platform's interaction JSON.
//!
//! The raw shapes mirror the platform payload and stay private; decoding
//! produces the owned [`Interaction`] model. Snowflakes arrive as decimal
//! strings and are parsed here.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{WireError, WireResult};
use crate::model::{
    ButtonData, CommandData, CommandOption, Interaction, InteractionData, Member, ModalField,
    ModalSubmitData, OptionValue, Permissions, SelectMenuData, SelectMenuKind, User,
};

const TYPE_PING: u8 = 1;
const TYPE_APPLICATION_COMMAND: u8 = 2;
const TYPE_MESSAGE_COMPONENT: u8 = 3;
const TYPE_AUTOCOMPLETE: u8 = 4;
const TYPE_MODAL_SUBMIT: u8 = 5;

// =============================================================================
// Raw shapes
// =============================================================================

#[derive(Deserialize)]
struct RawInteraction {
    id: String,
    application_id: String,
    #[serde(rename = "type")]
    kind: u8,
    token: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    member: Option<RawMember>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    guild_locale: Option<String>,
    #[serde(default)]
    app_permissions: Option<Permissions>,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    bot: bool,
}

#[derive(Deserialize)]
struct RawMember {
    user: RawUser,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    nick: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    id: String,
}

#[derive(Deserialize)]
struct RawCommandData {
    id: String,
    name: String,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Deserialize)]
struct RawComponentData {
    custom_id: String,
    component_type: u8,
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Deserialize)]
struct RawModalData {
    custom_id: String,
    #[serde(default)]
    components: Vec<RawModalRow>,
}

#[derive(Deserialize)]
struct RawModalRow {
    #[serde(default)]
    components: Vec<RawTextInput>,
}

#[derive(Deserialize)]
struct RawTextInput {
    custom_id: String,
    #[serde(default)]
    value: Option<String>,
}

// =============================================================================
// Decoding
// =============================================================================

fn snowflake(field: &'static str, value: &str) -> WireResult<u64> {
    value.parse().map_err(|_| WireError::InvalidSnowflake {
        field,
        value: value.to_owned(),
    })
}

fn optional_snowflake(field: &'static str, value: Option<&str>) -> WireResult<Option<u64>> {
    value.map(|v| snowflake(field, v)).transpose()
}

impl RawUser {
    fn decode(self) -> WireResult<User> {
        Ok(User {
            id: snowflake("user.id", &self.id)?,
            username: self.username,
            global_name: self.global_name,
            bot: self.bot,
        })
    }
}

impl RawMember {
    fn decode(self) -> WireResult<Member> {
        let roles = self
            .roles
            .iter()
            .map(|r| snowflake("member.roles", r))
            .collect::<WireResult<Vec<_>>>()?;
        Ok(Member {
            user: self.user.decode()?,
            roles,
            nick: self.nick,
        })
    }
}

impl RawOption {
    fn decode(self) -> WireResult<CommandOption> {
        let invalid = |reason: &str| WireError::InvalidOption {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };

        let value = match (self.kind, &self.value) {
            (1, _) => OptionValue::SubCommand(decode_options(self.options)?),
            (2, _) => OptionValue::SubCommandGroup(decode_options(self.options)?),
            (3, Some(Value::String(s))) => OptionValue::String(s.clone()),
            (4, Some(v)) => OptionValue::Integer(v.as_i64().ok_or_else(|| invalid("expected integer"))?),
            (5, Some(Value::Bool(b))) => OptionValue::Boolean(*b),
            (6..=9 | 11, Some(Value::String(s))) => {
                let id = s.parse().map_err(|_| invalid("expected snowflake"))?;
                match self.kind {
                    6 => OptionValue::User(id),
                    7 => OptionValue::Channel(id),
                    8 => OptionValue::Role(id),
                    9 => OptionValue::Mentionable(id),
                    _ => OptionValue::Attachment(id),
                }
            }
            (10, Some(v)) => OptionValue::Number(v.as_f64().ok_or_else(|| invalid("expected number"))?),
            (kind, None) if kind > 2 => return Err(invalid("missing value")),
            (kind, _) => return Err(invalid(&format!("unexpected value for option type {kind}"))),
        };

        Ok(CommandOption {
            name: self.name,
            value,
        })
    }
}

fn decode_options(options: Vec<RawOption>) -> WireResult<Vec<CommandOption>> {
    options.into_iter().map(RawOption::decode).collect()
}

fn select_kind(component_type: u8) -> Option<SelectMenuKind> {
    match component_type {
        3 => Some(SelectMenuKind::String),
        5 => Some(SelectMenuKind::User),
        6 => Some(SelectMenuKind::Role),
        7 => Some(SelectMenuKind::Mentionable),
        8 => Some(SelectMenuKind::Channel),
        _ => None,
    }
}

fn decode_data(kind: u8, data: Value) -> WireResult<InteractionData> {
    match kind {
        TYPE_APPLICATION_COMMAND => {
            let raw: RawCommandData = serde_json::from_value(data)?;
            Ok(InteractionData::Command(CommandData {
                id: snowflake("data.id", &raw.id)?,
                name: raw.name,
                options: decode_options(raw.options)?,
            }))
        }
        TYPE_MESSAGE_COMPONENT => {
            let raw: RawComponentData = serde_json::from_value(data)?;
            match raw.component_type {
                2 => Ok(InteractionData::Button(ButtonData {
                    custom_id: raw.custom_id,
                })),
                other => {
                    let kind = select_kind(other).ok_or(WireError::UnsupportedComponent(other))?;
                    Ok(InteractionData::SelectMenu(SelectMenuData {
                        custom_id: raw.custom_id,
                        kind,
                        values: raw.values,
                    }))
                }
            }
        }
        TYPE_MODAL_SUBMIT => {
            let raw: RawModalData = serde_json::from_value(data)?;
            let fields = raw
                .components
                .into_iter()
                .flat_map(|row| row.components)
                .map(|input| ModalField {
                    custom_id: input.custom_id,
                    value: input.value.unwrap_or_default(),
                })
                .collect();
            Ok(InteractionData::ModalSubmit(ModalSubmitData {
                custom_id: raw.custom_id,
                fields,
            }))
        }
        other => Err(WireError::UnsupportedType(other)),
    }
}

impl Interaction {
    /// Decodes a platform interaction payload.
    ///
    /// Pings and autocomplete requests are rejected with
    /// [`WireError::UnsupportedType`]; they never reach the dispatcher.
    pub fn from_json(json: &str) -> WireResult<Self> {
        let raw: RawInteraction = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Decodes an already-parsed JSON value.
    pub fn from_value(value: Value) -> WireResult<Self> {
        let raw: RawInteraction = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawInteraction) -> WireResult<Self> {
        if matches!(raw.kind, TYPE_PING | TYPE_AUTOCOMPLETE) {
            return Err(WireError::UnsupportedType(raw.kind));
        }
        let data = raw.data.ok_or(WireError::MissingField("data"))?;

        Ok(Self {
            id: snowflake("id", &raw.id)?,
            application_id: snowflake("application_id", &raw.application_id)?,
            token: raw.token,
            guild_id: optional_snowflake("guild_id", raw.guild_id.as_deref())?,
            channel_id: optional_snowflake("channel_id", raw.channel_id.as_deref())?,
            member: raw.member.map(RawMember::decode).transpose()?,
            user: raw.user.map(RawUser::decode).transpose()?,
            locale: raw.locale,
            guild_locale: raw.guild_locale,
            app_permissions: raw.app_permissions,
            message_id: optional_snowflake(
                "message.id",
                raw.message.as_ref().map(|m| m.id.as_str()),
            )?,
            data: decode_data(raw.kind, data)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InteractionKind;
    use serde_json::json;

    fn guild_envelope(kind: u8, data: Value) -> Value {
        json!({
            "id": "1001",
            "application_id": "42",
            "type": kind,
            "token": "tok",
            "guild_id": "500",
            "channel_id": "600",
            "member": {
                "user": { "id": "7", "username": "alice" },
                "roles": ["501", "502"]
            },
            "app_permissions": "2048",
            "message": { "id": "900" },
            "data": data
        })
    }

    #[test]
    fn test_decode_guild_button() {
        let value = guild_envelope(3, json!({ "custom_id": "close", "component_type": 2 }));
        let interaction = Interaction::from_value(value).unwrap();

        assert_eq!(interaction.id, 1001);
        assert_eq!(interaction.guild_id, Some(500));
        assert_eq!(interaction.user_id(), Some(7));
        assert_eq!(interaction.member.as_ref().unwrap().roles, vec![501, 502]);
        assert_eq!(interaction.app_permissions, Some(Permissions::SEND_MESSAGES));
        assert_eq!(interaction.message_id, Some(900));
        assert_eq!(interaction.kind(), InteractionKind::Button);
        assert_eq!(interaction.routing_id(), "close");
    }

    #[test]
    fn test_decode_subcommand_options() {
        let value = guild_envelope(
            2,
            json!({
                "id": "77",
                "name": "ticket",
                "options": [{
                    "name": "add",
                    "type": 1,
                    "options": [
                        { "name": "user", "type": 6, "value": "123" },
                        { "name": "silent", "type": 5, "value": true }
                    ]
                }]
            }),
        );
        let interaction = Interaction::from_value(value).unwrap();
        let InteractionData::Command(data) = &interaction.data else {
            panic!("expected command");
        };

        assert_eq!(interaction.routing_id(), "ticket add");
        assert_eq!(data.option("user"), Some(&OptionValue::User(123)));
        assert_eq!(data.option("silent").and_then(OptionValue::as_bool), Some(true));
    }

    #[test]
    fn test_decode_dm_select_and_modal() {
        let select = json!({
            "id": "1", "application_id": "2", "type": 3, "token": "t",
            "user": { "id": "9", "username": "bob" },
            "data": { "custom_id": "panel", "component_type": 3, "values": ["a", "b"] }
        });
        let interaction = Interaction::from_value(select).unwrap();
        assert!(interaction.is_dm());
        let InteractionData::SelectMenu(data) = &interaction.data else {
            panic!("expected select menu");
        };
        assert_eq!(data.values, vec!["a", "b"]);

        let modal = guild_envelope(
            5,
            json!({
                "custom_id": "rename",
                "components": [{ "components": [{ "custom_id": "name", "value": "billing" }] }]
            }),
        );
        let interaction = Interaction::from_value(modal).unwrap();
        let InteractionData::ModalSubmit(data) = &interaction.data else {
            panic!("expected modal");
        };
        assert_eq!(data.field("name"), Some("billing"));
    }

    #[test]
    fn test_reject_unsupported_and_malformed() {
        let ping = json!({ "id": "1", "application_id": "2", "type": 1, "token": "t" });
        assert!(matches!(
            Interaction::from_value(ping),
            Err(WireError::UnsupportedType(1))
        ));

        let mut bad = guild_envelope(3, json!({ "custom_id": "x", "component_type": 2 }));
        bad["guild_id"] = json!("not-a-number");
        assert!(matches!(
            Interaction::from_value(bad),
            Err(WireError::InvalidSnowflake { field: "guild_id", .. })
        ));

        let text_input = guild_envelope(3, json!({ "custom_id": "x", "component_type": 4 }));
        assert!(matches!(
            Interaction::from_value(text_input),
            Err(WireError::UnsupportedComponent(4))
        ));

        assert!(matches!(
            Interaction::from_json("{ nope"),
            Err(WireError::Json(_))
        ));
    }
}
