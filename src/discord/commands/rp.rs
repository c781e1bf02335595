// RP tracker commands. Validation failures are replied to; storage failures
// bubble up to the framework error handler.

use crate::core::rp::{Character, CharacterStats, RpEntry, RpError, SyncReport};
use crate::discord::{author_has_permission, colors, Context, Error};
use poise::serenity_prelude as serenity;

const DEFAULT_LIST_LIMIT: usize = 10;
/// Stays under Discord's 4096-character embed description.
const DESCRIPTION_BUDGET: usize = 3900;

/// Track roleplay characters and activity.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands(
        "register",
        "retire",
        "characters",
        "play",
        "log",
        "stats",
        "leaderboard",
        "recent",
        "track",
        "untrack",
        "sync",
        "settings",
        "sync_all"
    )
)]
pub async fn rp(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Register a new character.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn register(
    ctx: Context<'_>,
    #[description = "Character name"] name: String,
    #[description = "Short description"] description: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx
        .data()
        .rp
        .register_character(guild_id, ctx.author().id.get(), &name, description)
        .await
    {
        Ok(character) => {
            ctx.say(format!(
                "✅ Registered **{}**. Use `/rp play {}` to post as them in tracked channels.",
                character.name, character.name
            ))
            .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Retire one of your characters (admins can retire anyone's).
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn retire(
    ctx: Context<'_>,
    #[description = "Character name"]
    #[autocomplete = "autocomplete_character"]
    name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let is_admin = author_has_permission(ctx, serenity::Permissions::MANAGE_GUILD).await;

    match ctx
        .data()
        .rp
        .retire_character(guild_id, ctx.author().id.get(), &name, is_admin)
        .await
    {
        Ok(character) => {
            ctx.say(format!("🪦 **{}** has been retired.", character.name))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// List registered characters.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn characters(
    ctx: Context<'_>,
    #[description = "Only show this user's characters"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let owner = user.as_ref().map(|u| u.id.get());

    let list = ctx.data().rp.list_characters(guild_id, owner).await?;
    if list.is_empty() {
        ctx.say("No characters registered yet. Use `/rp register` to add one.")
            .await?;
        return Ok(());
    }

    let title = match &user {
        Some(u) => format!("{}'s characters", u.name),
        None => "Characters".to_string(),
    };
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(character_listing(&list))
        .footer(serenity::CreateEmbedFooter::new(format!("{} total", list.len())))
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Choose the character your messages in tracked channels count for.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Character name (leave empty to stop tracking)"]
    #[autocomplete = "autocomplete_character"]
    name: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx
        .data()
        .rp
        .set_active_character(guild_id, ctx.author().id.get(), name.as_deref())
        .await
    {
        Ok(Some(character)) => {
            ctx.say(format!("🎭 You are now playing **{}**.", character.name))
                .await?;
            Ok(())
        }
        Ok(None) => {
            ctx.say("Stopped automatic tracking for you.").await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Log a scene or session by hand.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn log(
    ctx: Context<'_>,
    #[description = "Character name"]
    #[autocomplete = "autocomplete_character"]
    character: String,
    #[description = "What happened"] summary: Option<String>,
    #[description = "Word count (defaults to the summary's)"] words: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    ctx.defer().await?;

    let result = ctx
        .data()
        .rp
        .log_entry(
            guild_id,
            ctx.channel_id().get(),
            ctx.author().id.get(),
            &character,
            summary,
            words,
        )
        .await;

    match result {
        Ok((entry, report)) => {
            let mut embed = serenity::CreateEmbed::new()
                .title(format!("📝 Logged for {}", entry.character))
                .field("Words", entry.words.to_string(), true)
                .field("Entry", format!("#{}", entry.id), true)
                .color(sync_colour(&report));
            if let Some(summary) = &entry.summary {
                embed = embed.description(truncate(summary, 1000));
            }
            if let Some(sync) = report.summary() {
                embed = embed.field("Sync", sync, false);
            }
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Activity totals for a character.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "Character name"]
    #[autocomplete = "autocomplete_character"]
    character: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let stats = match ctx.data().rp.character_stats(guild_id, &character).await {
        Ok(s) => s,
        Err(e) => return reply_error(ctx, e).await,
    };

    let last_active = stats
        .last_active
        .map(|t| format!("<t:{}:R>", t.timestamp()))
        .unwrap_or_else(|| "never".to_string());

    let embed = serenity::CreateEmbed::new()
        .title(format!("📊 {}", stats.character))
        .field("Player", format!("<@{}>", stats.owner_id), true)
        .field("Posts", stats.posts.to_string(), true)
        .field("Words", stats.words.to_string(), true)
        .field("Last active", last_active, true)
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Most active characters by word count.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "How many to show (max 25)"] limit: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let board = ctx
        .data()
        .rp
        .leaderboard(guild_id, limit.map_or(DEFAULT_LIST_LIMIT, |l| l as usize))
        .await?;
    if board.is_empty() {
        ctx.say("Nobody has logged any roleplay yet.").await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title("🏆 RP Leaderboard")
        .description(leaderboard_lines(&board))
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Latest logged entries.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn recent(
    ctx: Context<'_>,
    #[description = "Only this character"]
    #[autocomplete = "autocomplete_character"]
    character: Option<String>,
    #[description = "How many to show (max 25)"] limit: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let entries = ctx
        .data()
        .rp
        .recent_entries(
            guild_id,
            character.as_deref(),
            limit.map_or(DEFAULT_LIST_LIMIT, |l| l as usize),
        )
        .await?;
    if entries.is_empty() {
        ctx.say("No entries found.").await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title("🕰️ Recent RP")
        .description(entries.iter().map(entry_line).collect::<Vec<_>>().join("\n"))
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Count messages in a channel as roleplay.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn track(
    ctx: Context<'_>,
    #[description = "Channel (defaults to this one)"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());

    if ctx.data().rp.track_channel(guild_id, channel_id.get()).await? {
        ctx.say(format!("✅ Now tracking <#{}>.", channel_id)).await?;
    } else {
        ctx.say(format!("<#{}> is already tracked.", channel_id)).await?;
    }
    Ok(())
}

/// Stop counting messages in a channel.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn untrack(
    ctx: Context<'_>,
    #[description = "Channel (defaults to this one)"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());

    if ctx.data().rp.untrack_channel(guild_id, channel_id.get()).await? {
        ctx.say(format!("✅ Stopped tracking <#{}>.", channel_id)).await?;
    } else {
        ctx.say(format!("<#{}> wasn't tracked.", channel_id)).await?;
    }
    Ok(())
}

/// Set the Google Sheet and/or Doc entries are mirrored to. Pass "none" to clear.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn sync(
    ctx: Context<'_>,
    #[description = "Spreadsheet link or ID"] sheet: Option<String>,
    #[description = "Document link or ID"] doc: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    if sheet.is_none() && doc.is_none() {
        ctx.say("Give a `sheet`, a `doc`, or both.").await?;
        return Ok(());
    }

    let clear = |value: Option<String>| {
        value.map(|v| {
            if v.trim().eq_ignore_ascii_case("none") {
                String::new()
            } else {
                v
            }
        })
    };
    let sheet = clear(sheet);
    let doc = clear(doc);

    match ctx
        .data()
        .rp
        .set_sync_targets(guild_id, sheet.as_deref(), doc.as_deref())
        .await
    {
        Ok(settings) => {
            let mut reply = format!(
                "✅ Sync targets updated.\nSheet: {}\nDoc: {}",
                settings.sheet_id.as_deref().unwrap_or("none"),
                settings.doc_id.as_deref().unwrap_or("none"),
            );
            if !ctx.data().rp.sync_available() {
                reply.push_str(
                    "\n⚠️ No Google service account is configured, so nothing will be pushed yet.",
                );
            }
            ctx.say(reply).await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Show RP tracking settings for this server.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let settings = ctx.data().rp.settings(guild_id).await?;

    let channels = if settings.tracked_channels.is_empty() {
        "none".to_string()
    } else {
        settings
            .tracked_channels
            .iter()
            .map(|id| format!("<#{}>", id))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let active = ctx
        .data()
        .rp
        .active_character(guild_id, ctx.author().id.get())
        .await?;

    let embed = serenity::CreateEmbed::new()
        .title("⚙️ RP settings")
        .field("Tracked channels", channels, false)
        .field("Sheet", settings.sheet_id.as_deref().unwrap_or("none"), true)
        .field("Doc", settings.doc_id.as_deref().unwrap_or("none"), true)
        .field(
            "Google sync",
            if ctx.data().rp.sync_available() { "available" } else { "not configured" },
            true,
        )
        .field("You are playing", active.as_deref().unwrap_or("nobody"), true)
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Push the latest 100 entries to the spreadsheet again.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn sync_all(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    if !ctx.data().rp.sync_available() {
        ctx.say("Google sync isn't configured on this bot.").await?;
        return Ok(());
    }

    ctx.defer().await?;
    match ctx.data().rp.resync_sheet(guild_id).await {
        Ok((count, report)) => {
            let detail = report
                .summary()
                .unwrap_or_else(|| "No spreadsheet is configured.".to_string());
            ctx.say(format!("Re-sent {} entries.\n{}", count, detail))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Feed a guild message to the tracker. Called from the event handler.
pub async fn track_message(
    data: &crate::discord::Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    if message.author.bot {
        return Ok(());
    }

    if let Some(entry) = data
        .rp
        .record_message(
            guild_id.get(),
            message.channel_id.get(),
            message.author.id.get(),
            &message.content,
        )
        .await?
    {
        tracing::debug!(
            guild_id = guild_id.get(),
            character = %entry.character,
            words = entry.words,
            "Recorded RP post"
        );
    }
    Ok(())
}

async fn reply_error(ctx: Context<'_>, err: RpError) -> Result<(), Error> {
    match err {
        RpError::Storage(_) => Err(err.into()),
        other => {
            ctx.say(format!("❌ {}", other)).await?;
            Ok(())
        }
    }
}

async fn autocomplete_character<'a>(
    ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    let names = match ctx.guild_id() {
        Some(guild_id) => ctx
            .data()
            .rp
            .list_characters(guild_id.get(), None)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.name)
            .collect(),
        None => Vec::new(),
    };

    let partial = partial.to_lowercase();
    names
        .into_iter()
        .filter(move |name| name.to_lowercase().contains(&partial))
        .take(25)
}

fn character_line(character: &Character) -> String {
    match &character.description {
        Some(desc) => format!(
            "**{}** (<@{}>): {}",
            character.name,
            character.owner_id,
            truncate(desc, 80)
        ),
        None => format!("**{}** (<@{}>)", character.name, character.owner_id),
    }
}

/// One line per character, cut off with a count of what didn't fit.
fn character_listing(list: &[Character]) -> String {
    let mut text = String::new();
    let mut used = 0;
    for (shown, character) in list.iter().enumerate() {
        let line = character_line(character);
        let len = line.chars().count() + 1;
        if used + len > DESCRIPTION_BUDGET {
            text.push_str(&format!("…and {} more", list.len() - shown));
            break;
        }
        text.push_str(&line);
        text.push('\n');
        used += len;
    }
    text.trim_end().to_string()
}

fn entry_line(entry: &RpEntry) -> String {
    let what = entry
        .summary
        .as_deref()
        .map(|s| truncate(s, 60))
        .unwrap_or_else(|| format!("post in <#{}>", entry.channel_id));
    format!(
        "<t:{}:R> **{}**: {} ({} words)",
        entry.logged_at.timestamp(),
        entry.character,
        what,
        entry.words
    )
}

fn leaderboard_lines(board: &[CharacterStats]) -> String {
    board
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let medal = match i {
                0 => "🥇".to_string(),
                1 => "🥈".to_string(),
                2 => "🥉".to_string(),
                _ => format!("`{}.`", i + 1),
            };
            format!(
                "{} **{}** (<@{}>): {} words, {} posts",
                medal, s.character, s.owner_id, s.words, s.posts
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn sync_colour(report: &SyncReport) -> serenity::Colour {
    if report.failures.is_empty() {
        colors::SUCCESS
    } else {
        colors::WARNING
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("héllo", 10), "héllo");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn leaderboard_uses_medals_then_numbers() {
        let row = |name: &str| CharacterStats {
            character: name.to_string(),
            owner_id: 1,
            posts: 2,
            words: 30,
            last_active: None,
        };
        let text = leaderboard_lines(&[row("A"), row("B"), row("C"), row("D")]);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("🥇"));
        assert!(lines[3].starts_with("`4.`"));
    }

    #[test]
    fn character_listing_fits_in_an_embed() {
        let list: Vec<Character> = (0..300)
            .map(|i| Character {
                guild_id: 1,
                owner_id: 123456789012345678,
                name: format!("Character {}", i),
                description: Some("x".repeat(100)),
                created_at: Utc::now(),
            })
            .collect();
        let text = character_listing(&list);
        assert!(text.chars().count() <= 4096);
        assert!(text.ends_with("more"));

        let short = character_listing(&list[..2]);
        assert_eq!(short.lines().count(), 2);
        assert!(!short.contains("more"));
    }

    #[test]
    fn entry_line_falls_back_to_channel() {
        let entry = RpEntry {
            id: 1,
            guild_id: 1,
            channel_id: 42,
            author_id: 7,
            character: "Nyx".to_string(),
            words: 12,
            summary: None,
            logged_at: Utc::now(),
        };
        assert!(entry_line(&entry).contains("<#42>"));
    }
}
