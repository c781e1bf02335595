use crate::discord::{colors, Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

const CATEGORY_ORDER: &[&str] = &[
    "Dice & Games",
    "Roleplay",
    "Calendar",
    "Emoji & Roles",
    "Server Admin",
    "Utilities",
];

const FOOTER: &str = "Use /help <command> for details. Text commands work with the prefix or a mention.";

fn get_category_emoji(category: &str) -> &'static str {
    match category {
        "Dice & Games" => "🎲",
        "Roleplay" => "🎭",
        "Calendar" => "📅",
        "Emoji & Roles" => "✨",
        "Server Admin" => "🛠️",
        _ => "🧰",
    }
}

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    note: Option<&'static str>,
}

fn get_command_metadata(name: &str) -> CommandMetadata {
    let (category, priority, note) = match name {
        "roll" => ("Dice & Games", 100, Some("e.g. `2d6+3`, `4d6kh3`, `d%`")),
        "flip" => ("Dice & Games", 90, None),
        "choose" => ("Dice & Games", 80, Some("Separate options with `|`")),
        "paranoia" => ("Dice & Games", 70, Some("start, join, begin, answer, skip, next, end")),
        "rp" => ("Roleplay", 100, Some("register, play, log, stats, leaderboard, recent")),
        "calendar" => ("Calendar", 100, Some("today, status, set_channel, timezone, enable")),
        "moon" => ("Calendar", 90, None),
        "emoji" => ("Emoji & Roles", 100, Some("copy, copy_all, info")),
        "copy_sticker" => ("Emoji & Roles", 90, Some("Right-click a message > Apps")),
        "role" => ("Emoji & Roles", 80, Some("give, drop, list")),
        "roleadmin" => ("Server Admin", 80, Some("allow, disallow, autorole_add, grant, revoke")),
        "logging" => ("Server Admin", 70, Some("status, set_channel, enable, disable, toggle")),
        "whmcs" => ("Server Admin", 60, Some("client, invoices, tickets")),
        _ => ("Utilities", 0, None),
    };
    CommandMetadata {
        category,
        priority,
        note,
    }
}

/// Show what the bot can do, or details about one command.
#[poise::command(slash_command, prefix_command, track_edits)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to explain"]
    #[rest]
    command: Option<String>,
) -> Result<(), Error> {
    if command.is_some() {
        let config = poise::builtins::HelpConfiguration {
            extra_text_at_bottom: FOOTER,
            ephemeral: true,
            ..Default::default()
        };
        poise::builtins::help(ctx, command.as_deref(), config).await?;
        return Ok(());
    }

    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        let metadata = get_command_metadata(&command.name);
        let description = command
            .description
            .as_deref()
            .or(command.help_text.as_deref())
            .unwrap_or("No description provided.");

        let mut entry = if let Some(menu_name) = &command.context_menu_name {
            format!("• **{}** (message menu): {}", menu_name, description)
        } else {
            format!("• **/{}**: {}", command.name, description)
        };
        if let Some(note) = metadata.note {
            entry.push_str(&format!("\n  ⤷ {}", note));
        }

        categories
            .entry(metadata.category)
            .or_default()
            .push((metadata.priority, entry));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Command Guide")
        .description("Slash commands are grouped by what they're for; the most used sit at the top.")
        .color(colors::INFO)
        .timestamp(serenity::Timestamp::now());

    if let Ok(user) = ctx.framework().bot_id.to_user(&ctx).await {
        embed = embed.thumbnail(user.face());
    }

    let mut sorted_categories: Vec<_> = categories.keys().cloned().collect();
    sorted_categories.sort_by(|a, b| {
        let pos_a = CATEGORY_ORDER.iter().position(|&x| x == *a).unwrap_or(999);
        let pos_b = CATEGORY_ORDER.iter().position(|&x| x == *b).unwrap_or(999);
        pos_a.cmp(&pos_b).then(a.cmp(b))
    });

    for category in sorted_categories {
        if let Some(entries) = categories.get_mut(category) {
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let title = format!("{} {}", get_category_emoji(category), category);
            let formatted: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

            for (i, chunk) in chunk_entries(&formatted).iter().enumerate() {
                let field_name = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (cont.)", title)
                };
                embed = embed.field(field_name, chunk.join("\n"), false);
            }
        }
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(FOOTER));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Field values cap at 1024.
        if current_length + entry_len + 1 > 1000 && !current_chunk.is_empty() {
            chunks.push(current_chunk);
            current_chunk = Vec::new();
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1;
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_stay_under_field_limit() {
        let entries: Vec<String> = (0..40).map(|i| format!("{:0>50}", i)).collect();
        let chunks = chunk_entries(&entries);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.join("\n").len() <= 1024);
        }
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 40);
    }

    #[test]
    fn unknown_commands_land_in_utilities() {
        assert_eq!(get_command_metadata("nope").category, "Utilities");
        assert_eq!(get_command_metadata("roll").category, "Dice & Games");
    }
}
