use crate::core::expressions::{parse_all, parse_emoji, EmojiRef, StickerFormat, StickerSource};
use crate::discord::{colors, Context, Error};
use poise::serenity_prelude as serenity;

// Discord rejects bulk copies past this in one go anyway (emoji slots).
const MAX_BULK_COPY: usize = 25;

/// Copy custom emoji from other servers into this one.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD_EXPRESSIONS",
    subcommands("copy", "copy_all", "info")
)]
pub async fn emoji(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Copy one emoji, optionally under a new name.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD_EXPRESSIONS"
)]
pub async fn copy(
    ctx: Context<'_>,
    #[description = "Emoji, emoji ID or emoji URL"] emoji: String,
    #[description = "Name for the copy"] name: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    let emoji_ref = match parse_emoji(&emoji) {
        Ok(e) => e,
        Err(e) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    ctx.defer().await?;
    match copy_one(ctx, guild_id, &emoji_ref, name.as_deref()).await {
        Ok(created) => {
            ctx.say(format!("✅ Added {} as `:{}:`", created, created.name))
                .await?;
        }
        Err(reason) => {
            ctx.say(format!("❌ Couldn't copy that emoji: {}", reason))
                .await?;
        }
    }
    Ok(())
}

/// Copy every custom emoji found in a message or text.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD_EXPRESSIONS"
)]
pub async fn copy_all(
    ctx: Context<'_>,
    #[description = "Text containing custom emoji"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    let emojis = parse_all(&text);
    if emojis.is_empty() {
        ctx.say("No custom emoji found in that text.").await?;
        return Ok(());
    }

    ctx.defer().await?;

    let mut lines = Vec::new();
    for emoji_ref in emojis.iter().take(MAX_BULK_COPY) {
        let label = emoji_ref
            .name
            .clone()
            .unwrap_or_else(|| emoji_ref.id.to_string());
        match copy_one(ctx, guild_id, emoji_ref, None).await {
            Ok(created) => lines.push(format!("✅ {} `:{}:`", created, created.name)),
            Err(reason) => lines.push(format!("❌ `{}`: {}", label, reason)),
        }
    }
    if emojis.len() > MAX_BULK_COPY {
        lines.push(format!(
            "… skipped {} more (limit {} per command)",
            emojis.len() - MAX_BULK_COPY,
            MAX_BULK_COPY
        ));
    }

    let copied = lines.iter().filter(|l| l.starts_with('✅')).count();
    let embed = serenity::CreateEmbed::new()
        .title(format!("Copied {}/{} emoji", copied, emojis.len().min(MAX_BULK_COPY)))
        .description(lines.join("\n"))
        .color(if copied > 0 { colors::SUCCESS } else { colors::DANGER });

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show details about a custom emoji.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Emoji, emoji ID or emoji URL"] emoji: String,
) -> Result<(), Error> {
    let emoji_ref = match parse_emoji(&emoji) {
        Ok(e) => e,
        Err(e) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let created_at = serenity::EmojiId::new(emoji_ref.id).created_at();
    let mut embed = serenity::CreateEmbed::new()
        .title(emoji_ref.name.clone().unwrap_or_else(|| "Custom emoji".to_string()))
        .thumbnail(emoji_ref.cdn_url())
        .field("ID", format!("`{}`", emoji_ref.id), true)
        .field("Animated", if emoji_ref.animated { "Yes" } else { "No" }, true)
        .field("Created", format!("<t:{}:R>", created_at.unix_timestamp()), true)
        .field("Image", format!("[Open]({})", emoji_ref.cdn_url()), true)
        .color(colors::INFO);

    if let Some(markup) = emoji_ref.markup() {
        embed = embed.field("Markup", format!("`{}`", markup), false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Copy the first sticker of a message into this server.
#[poise::command(
    context_menu_command = "Copy Sticker",
    guild_only,
    required_permissions = "MANAGE_GUILD_EXPRESSIONS"
)]
pub async fn copy_sticker(ctx: Context<'_>, message: serenity::Message) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    let Some(item) = message.sticker_items.first() else {
        ctx.send(
            poise::CreateReply::default()
                .content("That message has no sticker.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    ctx.defer().await?;

    // The full sticker carries tags and description; guild stickers from
    // servers we can't see fall back to what the message gives us.
    let (tags, description) = match item.to_sticker(ctx.http()).await {
        Ok(sticker) => (Some(sticker.tags.join(",")), sticker.description),
        Err(e) => {
            tracing::debug!(sticker_id = item.id.get(), "Sticker lookup failed: {}", e);
            (None, None)
        }
    };

    let source = StickerSource {
        id: item.id.get(),
        name: item.name.clone(),
        format: sticker_format(item.format_type),
        tags,
        description,
    };

    let prepared = match ctx.data().expressions.prepare_sticker(&source, None).await {
        Ok(p) => p,
        Err(e) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let attachment = serenity::CreateAttachment::bytes(prepared.bytes, prepared.filename);
    let builder = serenity::CreateSticker::new(prepared.name.clone(), attachment)
        .tags(prepared.tags)
        .description(prepared.description);

    match guild_id.create_sticker(ctx.http(), builder).await {
        Ok(sticker) => {
            tracing::info!(guild_id = guild_id.get(), sticker_id = sticker.id.get(), "Copied sticker");
            ctx.say(format!("✅ Added sticker **{}**", sticker.name)).await?;
        }
        Err(e) => {
            tracing::warn!(guild_id = guild_id.get(), "Sticker upload failed: {}", e);
            ctx.say(format!("❌ Discord rejected the sticker: {}", e)).await?;
        }
    }
    Ok(())
}

fn sticker_format(format: serenity::StickerFormatType) -> StickerFormat {
    match format {
        serenity::StickerFormatType::Apng => StickerFormat::Apng,
        serenity::StickerFormatType::Gif => StickerFormat::Gif,
        serenity::StickerFormatType::Lottie => StickerFormat::Lottie,
        _ => StickerFormat::Png,
    }
}

/// Download, encode and upload one emoji. Errors come back as display text.
async fn copy_one(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    emoji_ref: &EmojiRef,
    name: Option<&str>,
) -> Result<serenity::Emoji, String> {
    let prepared = ctx
        .data()
        .expressions
        .prepare_emoji(emoji_ref, name)
        .await
        .map_err(|e| e.to_string())?;

    guild_id
        .create_emoji(ctx.http(), &prepared.name, &prepared.data_uri)
        .await
        .map_err(|e| {
            tracing::warn!(guild_id = guild_id.get(), emoji_id = emoji_ref.id, "Emoji upload failed: {}", e);
            e.to_string()
        })
}
