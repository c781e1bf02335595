use crate::core::logging::{LogConfig, LogEventKind};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum LogEventChoice {
    #[name = "Member join"]
    MemberJoin,
    #[name = "Member leave"]
    MemberLeave,
    #[name = "Message delete"]
    MessageDelete,
    #[name = "Message edit"]
    MessageEdit,
    #[name = "Voice join/leave/move"]
    VoiceMove,
    #[name = "Role change"]
    RoleChange,
    #[name = "Nickname change"]
    NicknameChange,
}

impl From<LogEventChoice> for LogEventKind {
    fn from(choice: LogEventChoice) -> Self {
        match choice {
            LogEventChoice::MemberJoin => LogEventKind::MemberJoin,
            LogEventChoice::MemberLeave => LogEventKind::MemberLeave,
            LogEventChoice::MessageDelete => LogEventKind::MessageDelete,
            LogEventChoice::MessageEdit => LogEventKind::MessageEdit,
            LogEventChoice::VoiceMove => LogEventKind::VoiceMove,
            LogEventChoice::RoleChange => LogEventKind::RoleChange,
            LogEventChoice::NicknameChange => LogEventKind::NicknameChange,
        }
    }
}

/// Manage activity logging configuration.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands("status", "set_channel", "enable", "disable", "toggle")
)]
pub async fn logging(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show current logging configuration.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let config = ctx.data().logging.get_config(guild_id).await?;

    let status = if config.enabled && config.channel_id.is_some() {
        "Enabled"
    } else {
        "Disabled"
    };
    let channel_mention = config
        .channel_id
        .map(|id| format!("<#{}>", id))
        .unwrap_or_else(|| "Not set".to_string());

    let embed = serenity::CreateEmbed::default()
        .title("Activity Logging Configuration")
        .color(serenity::Color::BLURPLE)
        .field("Status", status, false)
        .field("Log Channel", channel_mention, false)
        .field("Events", event_list(&config), false)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Guild ID: {}",
            guild_id
        )))
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Select the text channel used for logging.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn set_channel(
    ctx: Context<'_>,
    #[description = "Channel to log to"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let channel_id = channel.id().get();

    ctx.data()
        .logging
        .set_log_channel(guild_id, channel_id)
        .await?;
    ctx.say(format!(
        "✅ Logging channel set to <#{}> and logging is on.",
        channel_id
    ))
    .await?;
    Ok(())
}

/// Enable activity logging.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn enable(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    if ctx.data().logging.set_enabled(guild_id, true).await? {
        ctx.say("✅ Activity logging enabled.").await?;
    } else {
        ctx.say("Please configure a logging channel first using `/logging set_channel #channel`.")
            .await?;
    }
    Ok(())
}

/// Disable activity logging.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    ctx.data().logging.set_enabled(guild_id, false).await?;
    ctx.say("🛑 Activity logging disabled.").await?;
    Ok(())
}

/// Turn logging of a single event type on or off.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "Event type"] event: LogEventChoice,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let kind: LogEventKind = event.into();

    let now_enabled = ctx.data().logging.toggle_event(guild_id, kind).await?;
    ctx.say(format!(
        "`{}` events will {} be logged.",
        kind,
        if now_enabled { "now" } else { "no longer" }
    ))
    .await?;
    Ok(())
}

fn event_list(config: &LogConfig) -> String {
    LogEventKind::ALL
        .iter()
        .map(|kind| {
            let mark = if config.is_event_enabled(*kind) { "✅" } else { "❌" };
            format!("{} `{}`", mark, kind)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
