use crate::core::logging::{
    member_update_changes, voice_transition, LogEvent, TrackedMessage,
};
use crate::discord::logging::formatter::format_log_event;
use crate::discord::Data;
use anyhow::Result;
use poise::serenity_prelude::{self as serenity, Context, Mentionable};

fn snapshot_of(message: &serenity::Message, guild_id: u64) -> TrackedMessage {
    TrackedMessage {
        message_id: message.id.get(),
        guild_id,
        channel_id: message.channel_id.get(),
        author_id: message.author.id.get(),
        author_name: message.author.name.clone(),
        content: message.content.clone(),
        attachments: message
            .attachments
            .iter()
            .map(|a| a.filename.clone())
            .collect(),
        avatar_url: message.author.avatar_url(),
    }
}

/// Keep a snapshot of every human guild message for later edit/delete logs.
pub fn remember_message(data: &Data, message: &serenity::Message) {
    if message.author.bot {
        return;
    }
    if let Some(guild_id) = message.guild_id {
        data.logging.remember_message(snapshot_of(message, guild_id.get()));
    }
}

pub async fn handle_voice_state_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
) -> Result<()> {
    let Some(guild_id) = new.guild_id.map(|id| id.get()) else {
        return Ok(());
    };

    let Some(member) = new.member.as_ref() else {
        return Ok(());
    };
    if member.user.bot {
        return Ok(());
    }

    let old_channel_id = old.and_then(|s| s.channel_id.map(|id| id.get()));
    let new_channel_id = new.channel_id.map(|id| id.get());

    // Mute/deafen/stream toggles arrive here too; they don't move anyone.
    let Some(transition) = voice_transition(old_channel_id, new_channel_id) else {
        return Ok(());
    };

    let event = LogEvent::Voice {
        guild_id,
        user_id: member.user.id.get(),
        user_name: member.user.name.clone(),
        transition,
    };
    send_log(ctx, data, event).await
}

pub async fn handle_member_join(
    ctx: &Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<()> {
    let event = LogEvent::MemberJoined {
        guild_id: member.guild_id.get(),
        user_id: member.user.id.get(),
        user_mention: member.mention().to_string(),
        avatar_url: member.user.avatar_url(),
        created_at: *member.user.created_at(),
    };

    send_log(ctx, data, event).await
}

pub async fn handle_member_remove(
    ctx: &Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    member_data: Option<&serenity::Member>,
) -> Result<()> {
    let event = LogEvent::MemberLeft {
        guild_id: guild_id.get(),
        user_id: user.id.get(),
        user_mention: user.mention().to_string(),
        avatar_url: user.avatar_url(),
        joined_at: member_data.and_then(|m| m.joined_at).map(|t| *t),
    };

    send_log(ctx, data, event).await
}

/// Role and nickname changes. `old` is only present when the member was cached.
pub async fn handle_member_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::Member>,
    event: &serenity::GuildMemberUpdateEvent,
) -> Result<()> {
    let Some(old) = old else {
        return Ok(());
    };
    if event.user.bot {
        return Ok(());
    }

    let old_roles: Vec<u64> = old.roles.iter().map(|r| r.get()).collect();
    let new_roles: Vec<u64> = event.roles.iter().map(|r| r.get()).collect();
    let changes = member_update_changes(
        &old_roles,
        &new_roles,
        old.nick.as_deref(),
        event.nick.as_deref(),
    );

    let guild_id = event.guild_id.get();
    let user_id = event.user.id.get();

    if changes.roles_changed() {
        let log = LogEvent::RolesChanged {
            guild_id,
            user_id,
            user_name: event.user.name.clone(),
            added: changes.added_roles,
            removed: changes.removed_roles,
        };
        send_log(ctx, data, log).await?;
    }

    if let Some((before, after)) = changes.nickname {
        let log = LogEvent::NicknameChanged {
            guild_id,
            user_id,
            user_name: event.user.name.clone(),
            before,
            after,
        };
        send_log(ctx, data, log).await?;
    }

    Ok(())
}

pub async fn handle_message_delete(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    guild_id: Option<serenity::GuildId>,
) -> Result<()> {
    let Some(guild_id) = guild_id.map(|id| id.get()) else {
        return Ok(());
    };

    // Prefer our own snapshot over the Serenity cache so we never miss deletes.
    let snapshot = data
        .logging
        .take_tracked_message(message_id.get())
        .or_else(|| {
            ctx.cache
                .message(channel_id, message_id)
                .filter(|message| !message.author.bot)
                .map(|message| snapshot_of(&message, guild_id))
        });

    let Some(snapshot) = snapshot else {
        return Ok(());
    };
    if snapshot.guild_id != guild_id {
        return Ok(());
    }

    let event = LogEvent::MessageDeleted {
        guild_id,
        author_id: snapshot.author_id,
        author_name: snapshot.author_name,
        channel_id: snapshot.channel_id,
        content: snapshot.content,
        attachments: snapshot.attachments,
        avatar_url: snapshot.avatar_url,
    };

    send_log(ctx, data, event).await
}

pub async fn handle_message_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) -> Result<()> {
    let Some(guild_id) = event.guild_id.map(|id| id.get()) else {
        return Ok(());
    };
    // Embed-only updates carry no content.
    let Some(new_content) = event.content.clone() else {
        return Ok(());
    };
    let message_id = event.id.get();

    let before = match data.logging.get_tracked_message(message_id) {
        Some(tracked) => tracked,
        None => {
            // Never tracked: fall back to the cached message if serenity had it.
            let Some(old_msg) = old else {
                return Ok(());
            };
            if old_msg.author.bot {
                return Ok(());
            }
            let tracked = snapshot_of(old_msg, guild_id);
            data.logging.remember_message(tracked.clone());
            tracked
        }
    };

    if before.guild_id != guild_id || before.content == new_content {
        return Ok(());
    }
    data.logging
        .update_tracked_content(message_id, new_content.clone());

    let event = LogEvent::MessageEdited {
        guild_id,
        author_id: before.author_id,
        author_name: before.author_name,
        channel_id: before.channel_id,
        before_content: before.content,
        after_content: new_content,
        avatar_url: before.avatar_url,
    };

    send_log(ctx, data, event).await
}

async fn send_log(ctx: &Context, data: &Data, event: LogEvent) -> Result<()> {
    let guild_id = event.guild_id();
    let Some(channel_id) = data.logging.target_channel(guild_id, event.kind()).await? else {
        return Ok(());
    };

    let embed = format_log_event(&event);
    let channel = serenity::ChannelId::new(channel_id);
    if let Err(e) = channel
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!(guild_id, channel_id, "Failed to send log: {}", e);
    }
    Ok(())
}
