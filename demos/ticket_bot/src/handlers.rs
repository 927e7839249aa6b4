//! The demo's handlers.
//!
//! | kind        | matcher               | tier     |
//! |-------------|-----------------------|----------|
//! | command     | `ping`                | everyone (DMs too) |
//! | command     | `ticket open`         | everyone |
//! | command     | `admin grant`         | admin    |
//! | command     | `admin revoke`        | admin    |
//! | button      | `close`               | support  |
//! | button      | `claim:<ticket>`      | support  |
//! | button      | `rename`              | everyone |
//! | button      | catch-all             | everyone |
//! | select menu | `priority`            | everyone |
//! | modal       | `rename_modal`        | everyone |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use wicket::core::{
    ActionRow, Button, ButtonStyle, Embed, GrantSubject, MessageResponse, ModalResponse,
    OptionValue, PermissionTier, Permissions, SelectMenu, SelectOption, TextInput,
    TextInputStyle, colour,
};
use wicket::framework::{
    ButtonContext, CommandContext, Handler, InteractionRegistry, Matcher, ModalContext,
    PermissionResolver, Properties, SelectMenuContext, handler_fn,
};

/// Builds the registry of every demo handler.
pub fn registry(resolver: Arc<PermissionResolver>) -> InteractionRegistry {
    InteractionRegistry::new()
        .command(handler_fn(
            Matcher::exact("ping"),
            Properties::new().allow_dms(),
            |ctx: CommandContext| async move {
                let _ = ctx.reply_ephemeral("Pong!").await;
            },
        ))
        .command(handler_fn(
            Matcher::exact("ticket open"),
            Properties::new(),
            open_ticket,
        ))
        .command(GrantCommand {
            resolver: resolver.clone(),
        })
        .command(RevokeCommand {
            resolver: resolver.clone(),
        })
        .button(handler_fn(
            Matcher::exact("close"),
            Properties::new()
                .permission_level(PermissionTier::Support)
                .can_edit_original(),
            close_ticket,
        ))
        .button(ClaimButton { resolver })
        .button(handler_fn(
            Matcher::exact("rename"),
            Properties::new(),
            |ctx: ButtonContext| async move {
                let modal = ModalResponse::new("rename_modal", "Rename ticket").input(
                    TextInput::new("name", "New name", TextInputStyle::Short)
                        .required(true)
                        .length(1, 32),
                );
                if let Err(e) = ctx.open_modal(modal).await {
                    ctx.handle_error(&e).await;
                }
            },
        ))
        .button(handler_fn(
            Matcher::catch_all(),
            Properties::new().allow_dms(),
            |ctx: ButtonContext| async move {
                let _ = ctx
                    .reply_ephemeral("This button is no longer active.")
                    .await;
            },
        ))
        .select_menu(handler_fn(
            Matcher::exact("priority"),
            Properties::new(),
            |ctx: SelectMenuContext| async move {
                let chosen = ctx.values().join(", ");
                let _ = ctx.reply(format!("Priority set to {chosen}.")).await;
            },
        ))
        .modal(handler_fn(
            Matcher::exact("rename_modal"),
            Properties::new(),
            |ctx: ModalContext| async move {
                let name = ctx.field("name").unwrap_or("ticket").to_string();
                let _ = ctx.reply(format!("Ticket renamed to `{name}`.")).await;
            },
        ))
}

async fn open_ticket(ctx: CommandContext) {
    let panel = Embed::new()
        .title("Ticket opened")
        .description(format!(
            "<@{}>, staff will be with you shortly.",
            ctx.user_id()
        ))
        .colour(colour::INFO)
        .footer(format!("premium: {}", ctx.premium_tier()));

    let buttons = ActionRow::new()
        .with(Button::new("close", "Close", ButtonStyle::Danger))
        .with(Button::new("claim:1", "Claim", ButtonStyle::Success))
        .with(Button::new("rename", "Rename", ButtonStyle::Secondary));
    let priority = ActionRow::new().with(
        SelectMenu::new(
            "priority",
            vec![
                SelectOption::new("Low", "low"),
                SelectOption::new("Normal", "normal"),
                SelectOption::new("High", "high"),
            ],
        )
        .placeholder("Priority"),
    );

    let message = MessageResponse::new()
        .embed(panel)
        .component(buttons)
        .component(priority);
    if let Err(e) = ctx.reply_with(message).await {
        ctx.handle_error(&e).await;
    }
}

async fn close_ticket(ctx: ButtonContext) {
    // Simulated archive work; the edit still lands inside the window.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let closed = Embed::new()
        .title("Ticket closed")
        .description(format!("Closed by <@{}>.", ctx.user_id()))
        .colour(colour::FAILURE);
    if let Err(e) = ctx.edit(MessageResponse::new().embed(closed)).await {
        ctx.handle_error(&e).await;
    }
}

/// Claims the ticket a `claim:<ticket>` button belongs to. The claimer
/// must be able to read the ticket channel's history.
struct ClaimButton {
    resolver: Arc<PermissionResolver>,
}

#[async_trait]
impl Handler<ButtonContext> for ClaimButton {
    fn matcher(&self) -> Matcher {
        Matcher::prefix("claim:")
    }

    fn properties(&self) -> Properties {
        Properties::new().permission_level(PermissionTier::Support)
    }

    async fn execute(&self, ctx: ButtonContext) {
        let ticket = ctx
            .custom_id()
            .strip_prefix("claim:")
            .unwrap_or_default()
            .to_string();
        let (Some(guild_id), channel_id) = (ctx.guild_id(), ctx.channel_id()) else {
            return;
        };

        let can_read = self
            .resolver
            .calculator()
            .has_permissions(
                guild_id,
                ctx.user_id(),
                channel_id,
                Permissions::READ_MESSAGE_HISTORY,
            )
            .await;
        match can_read {
            Ok(true) => {}
            Ok(false) => {
                let _ = ctx
                    .reply_ephemeral("You cannot read this ticket's history.")
                    .await;
                return;
            }
            Err(e) => {
                ctx.handle_error(&e).await;
                return;
            }
        }

        if let Err(e) = ctx.defer_update().await {
            warn!(error = %e, "Could not acknowledge claim");
            return;
        }
        let _ = ctx
            .reply(format!("<@{}> claimed ticket #{ticket}.", ctx.user_id()))
            .await;
    }
}

// =============================================================================
// Admin commands
// =============================================================================

/// The subject of an `admin` command: its `user` or `role` option.
fn subject(ctx: &CommandContext) -> Option<GrantSubject> {
    match (ctx.option("user"), ctx.option("role")) {
        (Some(OptionValue::User(id)), _) => Some(GrantSubject::User(*id)),
        (_, Some(OptionValue::Role(id))) => Some(GrantSubject::Role(*id)),
        _ => None,
    }
}

fn describe(subject: GrantSubject) -> String {
    match subject {
        GrantSubject::User(id) => format!("<@{id}>"),
        GrantSubject::Role(id) => format!("<@&{id}>"),
    }
}

/// `/admin grant (user|role) tier`
struct GrantCommand {
    resolver: Arc<PermissionResolver>,
}

#[async_trait]
impl Handler<CommandContext> for GrantCommand {
    fn matcher(&self) -> Matcher {
        Matcher::exact("admin grant")
    }

    fn properties(&self) -> Properties {
        Properties::new().permission_level(PermissionTier::Admin)
    }

    async fn execute(&self, ctx: CommandContext) {
        let (Some(guild_id), Some(subject)) = (ctx.guild_id(), subject(&ctx)) else {
            let _ = ctx.reply_ephemeral("Specify a user or a role.").await;
            return;
        };
        let tier = match ctx.option("tier").and_then(OptionValue::as_str) {
            Some("admin") => PermissionTier::Admin,
            Some("support") => PermissionTier::Support,
            _ => {
                let _ = ctx.reply_ephemeral("Tier must be `admin` or `support`.").await;
                return;
            }
        };

        match self.resolver.grant(guild_id, subject, tier).await {
            Ok(()) => {
                let embed = Embed::new()
                    .title("Permissions updated")
                    .description(format!("{} is now {tier}.", describe(subject)))
                    .colour(colour::SUCCESS);
                let _ = ctx.reply_embed(embed).await;
            }
            Err(e) => ctx.handle_error(&e).await,
        }
    }
}

/// `/admin revoke (user|role)`
struct RevokeCommand {
    resolver: Arc<PermissionResolver>,
}

#[async_trait]
impl Handler<CommandContext> for RevokeCommand {
    fn matcher(&self) -> Matcher {
        Matcher::exact("admin revoke")
    }

    fn properties(&self) -> Properties {
        Properties::new().permission_level(PermissionTier::Admin)
    }

    async fn execute(&self, ctx: CommandContext) {
        let (Some(guild_id), Some(subject)) = (ctx.guild_id(), subject(&ctx)) else {
            let _ = ctx.reply_ephemeral("Specify a user or a role.").await;
            return;
        };

        match self.resolver.revoke(guild_id, subject).await {
            Ok(()) => {
                let _ = ctx
                    .reply(format!("Removed every grant of {}.", describe(subject)))
                    .await;
            }
            Err(e) => ctx.handle_error(&e).await,
        }
    }
}
