use crate::core::logging::{LogEvent, VoiceTransition};
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter};

const DESCRIPTION_LIMIT: usize = 4096;
const FIELD_LIMIT: usize = 1024;

pub fn format_log_event(event: &LogEvent) -> CreateEmbed {
    let embed = match event {
        LogEvent::MemberJoined {
            user_mention,
            avatar_url,
            created_at,
            ..
        } => {
            let mut embed = CreateEmbed::default()
                .title("Member Joined Server")
                .description(format!("{} has joined the server.", user_mention))
                .color(serenity::Color::from_rgb(0, 255, 0))
                .field(
                    "Account Created",
                    format!("<t:{}:R>", created_at.timestamp()),
                    false,
                );

            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::MemberLeft {
            user_mention,
            avatar_url,
            joined_at,
            ..
        } => {
            let joined_str = joined_at
                .map(|joined| format!("<t:{}:R>", joined.timestamp()))
                .unwrap_or_else(|| "Unknown".to_string());

            let mut embed = CreateEmbed::default()
                .title("Member Left Server")
                .description(format!("{} has left the server.", user_mention))
                .color(serenity::Color::RED)
                .field("Joined Server", joined_str, false);

            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::MessageDeleted {
            author_id,
            author_name,
            channel_id,
            content,
            attachments,
            avatar_url,
            ..
        } => {
            let mut embed = CreateEmbed::default()
                .title("Message Deleted")
                .description(display_content(content, DESCRIPTION_LIMIT))
                .color(serenity::Color::from_rgb(255, 165, 0))
                .field("Author", format!("{} (`{}`)", author_name, author_id), false)
                .field("Channel", format!("<#{}>", channel_id), false);

            if !attachments.is_empty() {
                embed = embed.field(
                    "Attachments",
                    truncate_chars(&attachments.join("\n"), FIELD_LIMIT),
                    false,
                );
            }
            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::MessageEdited {
            author_id,
            author_name,
            channel_id,
            before_content,
            after_content,
            avatar_url,
            ..
        } => {
            let mut embed = CreateEmbed::default()
                .title("Message Edited")
                .description(format!("Message edited in <#{}>", channel_id))
                .color(serenity::Color::BLURPLE)
                .field("Author", format!("{} (`{}`)", author_name, author_id), false)
                .field("Before", display_content(before_content, FIELD_LIMIT), false)
                .field("After", display_content(after_content, FIELD_LIMIT), false);

            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::Voice {
            user_id,
            user_name,
            transition,
            ..
        } => {
            let (title, description, color) = match transition {
                VoiceTransition::Joined { channel_id } => (
                    "Joined Voice",
                    format!("<@{}> joined <#{}>", user_id, channel_id),
                    serenity::Color::from_rgb(0, 255, 0),
                ),
                VoiceTransition::Left { channel_id } => (
                    "Left Voice",
                    format!("<@{}> left <#{}>", user_id, channel_id),
                    serenity::Color::from_rgb(255, 165, 0),
                ),
                VoiceTransition::Moved { from, to } => (
                    "Moved Voice Channel",
                    format!("<@{}> moved from <#{}> to <#{}>", user_id, from, to),
                    serenity::Color::BLUE,
                ),
            };

            CreateEmbed::default()
                .title(title)
                .description(description)
                .color(color)
                .field("Member", format!("{} (`{}`)", user_name, user_id), false)
        }

        LogEvent::RolesChanged {
            user_id,
            user_name,
            added,
            removed,
            ..
        } => {
            let mut embed = CreateEmbed::default()
                .title("Roles Updated")
                .description(format!("<@{}>'s roles changed.", user_id))
                .color(serenity::Color::DARK_TEAL)
                .field("Member", format!("{} (`{}`)", user_name, user_id), false);

            if !added.is_empty() {
                embed = embed.field("Added", role_mentions(added), false);
            }
            if !removed.is_empty() {
                embed = embed.field("Removed", role_mentions(removed), false);
            }
            embed
        }

        LogEvent::NicknameChanged {
            user_id,
            user_name,
            before,
            after,
            ..
        } => CreateEmbed::default()
            .title("Nickname Changed")
            .description(format!("<@{}> changed their nickname.", user_id))
            .color(serenity::Color::BLURPLE)
            .field("Member", format!("{} (`{}`)", user_name, user_id), false)
            .field("Before", nickname_display(before.as_deref()), true)
            .field("After", nickname_display(after.as_deref()), true),
    };

    embed
        .footer(CreateEmbedFooter::new(format!("Guild ID: {}", event.guild_id())))
        .timestamp(serenity::Timestamp::now())
}

fn display_content(content: &str, limit: usize) -> String {
    if content.is_empty() {
        "*No content*".to_string()
    } else {
        truncate_chars(content, limit)
    }
}

fn nickname_display(nick: Option<&str>) -> String {
    nick.map(|n| truncate_chars(n, FIELD_LIMIT))
        .unwrap_or_else(|| "*None*".to_string())
}

fn role_mentions(roles: &[u64]) -> String {
    let joined = roles
        .iter()
        .map(|id| format!("<@&{}>", id))
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&joined, FIELD_LIMIT)
}

/// Cuts on a char boundary and marks the cut with an ellipsis.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}
