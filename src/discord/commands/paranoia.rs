// Paranoia party game. Questions go out by DM; answers come back through
// `/paranoia answer` (works in DMs too) and are revealed in the game channel.

use crate::core::paranoia::{Answer, AnswerOutcome, Game, ParanoiaError, Phase, Prompt, Reveal};
use crate::discord::{author_has_permission, colors, Context, Error};
use poise::serenity_prelude as serenity;

/// Play Paranoia: answer secret questions out loud.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands(
        "start",
        "join",
        "leave",
        "begin",
        "answer",
        "skip",
        "next",
        "end",
        "status",
        "question_add",
        "question_remove",
        "questions"
    )
)]
pub async fn paranoia(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Open a game lobby in this channel.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx
        .data()
        .paranoia
        .create_game(guild_id, ctx.channel_id().get(), ctx.author().id.get())
    {
        Ok(_) => {
            let embed = serenity::CreateEmbed::new()
                .title("🤫 Paranoia")
                .description(format!(
                    "<@{}> opened a lobby.\nJoin with `/paranoia join`; the host starts with `/paranoia begin` once 3 or more players are in.",
                    ctx.author().id
                ))
                .color(colors::INFO);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Join the game in this channel.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn join(ctx: Context<'_>) -> Result<(), Error> {
    match ctx
        .data()
        .paranoia
        .join(ctx.channel_id().get(), ctx.author().id.get())
    {
        Ok(count) => {
            ctx.say(format!("✅ <@{}> joined ({} players).", ctx.author().id, count))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Leave the game in this channel.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn leave(ctx: Context<'_>) -> Result<(), Error> {
    let channel_id = ctx.channel_id();
    let outcome = match ctx.data().paranoia.leave(channel_id.get(), ctx.author().id.get()) {
        Ok(o) => o,
        Err(e) => return reply_error(ctx, e).await,
    };

    let mut lines = vec![format!("👋 <@{}> left the game.", ctx.author().id)];
    if outcome.game_over {
        lines.push("Nobody is left, so the game is over.".to_string());
    }
    if let Some(host) = outcome.new_host {
        lines.push(format!("<@{}> is the new host.", host));
    }
    if outcome.returned_to_lobby {
        lines.push("Not enough players to continue; back to the lobby.".to_string());
    }
    ctx.say(lines.join("\n")).await?;

    if let Some(reveals) = outcome.reveals {
        announce_reveals(ctx, channel_id, &reveals).await?;
    }
    Ok(())
}

/// Host: start the first round.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn begin(ctx: Context<'_>) -> Result<(), Error> {
    run_round(ctx).await
}

/// Host: start the next round after a reveal.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn next(ctx: Context<'_>) -> Result<(), Error> {
    run_round(ctx).await
}

/// Answer your question by naming another player.
#[poise::command(slash_command, prefix_command, ephemeral)]
pub async fn answer(
    ctx: Context<'_>,
    #[description = "The player your answer is"] player: serenity::User,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let paranoia = &ctx.data().paranoia;

    let Some(channel) = paranoia.answer_channel(ctx.channel_id().get(), user_id) else {
        ctx.say("You're not playing Paranoia anywhere right now.")
            .await?;
        return Ok(());
    };

    match paranoia.answer(channel, user_id, player.id.get()) {
        Ok(AnswerOutcome::Waiting { remaining }) => {
            ctx.say(format!(
                "✅ Answer locked in. Waiting on {} more player(s).",
                remaining
            ))
            .await?;
            Ok(())
        }
        Ok(AnswerOutcome::AllAnswered(reveals)) => {
            ctx.say("✅ Answer locked in. That was the last one, revealing now!")
                .await?;
            announce_reveals(ctx, serenity::ChannelId::new(channel), &reveals).await
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Host: reveal now, skipping anyone who hasn't answered.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    let channel_id = ctx.channel_id();
    match ctx
        .data()
        .paranoia
        .force_reveal(channel_id.get(), ctx.author().id.get())
    {
        Ok(reveals) => announce_reveals(ctx, channel_id, &reveals).await,
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Host or moderator: end the game.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn end(ctx: Context<'_>) -> Result<(), Error> {
    let is_moderator = author_has_permission(ctx, serenity::Permissions::MANAGE_MESSAGES).await;

    match ctx
        .data()
        .paranoia
        .end_game(ctx.channel_id().get(), ctx.author().id.get(), is_moderator)
    {
        Ok(game) => {
            ctx.say(format!(
                "🏁 Game over after {} round(s). Thanks for playing!",
                game.rounds_played()
            ))
            .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Show the game in this channel.
#[poise::command(slash_command, prefix_command, guild_only, ephemeral)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let Some(game) = ctx.data().paranoia.game(ctx.channel_id().get()) else {
        ctx.say("There is no game in this channel. Start one with `/paranoia start`.")
            .await?;
        return Ok(());
    };

    let mut embed = status_embed(&game);
    if let Some(prompt) = game.prompt_for(ctx.author().id.get()) {
        if prompt.answer.is_none() {
            embed = embed.field("Your question", &prompt.question, false);
        }
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Add a custom question for this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn question_add(
    ctx: Context<'_>,
    #[description = "e.g. Who is most likely to ...?"]
    #[rest]
    question: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx.data().paranoia.add_question(guild_id, &question).await {
        Ok(count) => {
            ctx.say(format!("✅ Added question #{}.", count)).await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Remove a custom question by its number in `/paranoia questions`.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn question_remove(
    ctx: Context<'_>,
    #[description = "Question number"] number: u32,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx
        .data()
        .paranoia
        .remove_question(guild_id, number as usize)
        .await
    {
        Ok(removed) => {
            ctx.say(format!("🗑️ Removed: {}", removed)).await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// List this server's custom questions.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn questions(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let custom = ctx.data().paranoia.custom_questions(guild_id).await?;

    let description = if custom.is_empty() {
        "No custom questions yet. Built-in questions are always used.".to_string()
    } else {
        custom
            .iter()
            .enumerate()
            .map(|(i, q)| format!("`{}.` {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title("Custom Paranoia questions")
        .description(description)
        .color(colors::INFO);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn run_round(ctx: Context<'_>) -> Result<(), Error> {
    let channel_id = ctx.channel_id();
    let prompts = match ctx
        .data()
        .paranoia
        .start_round(channel_id.get(), ctx.author().id.get())
        .await
    {
        Ok(p) => p,
        Err(e) => return reply_error(ctx, e).await,
    };

    ctx.defer().await?;

    let mut unreachable = Vec::new();
    for prompt in &prompts {
        let dm = serenity::CreateMessage::new().embed(prompt_embed(prompt, channel_id));
        if let Err(e) = serenity::UserId::new(prompt.target_id)
            .direct_message(ctx.http(), dm)
            .await
        {
            tracing::warn!(user_id = prompt.target_id, "Couldn't DM Paranoia question: {}", e);
            unreachable.push(prompt.target_id);
        }
    }

    let round = ctx
        .data()
        .paranoia
        .game(channel_id.get())
        .map(|g| g.rounds_played())
        .unwrap_or_default();

    let mut description = format!(
        "Questions have been sent by DM to {} players. Answer with `/paranoia answer`.",
        prompts.len()
    );
    if !unreachable.is_empty() {
        let mentions: Vec<String> = unreachable.iter().map(|id| format!("<@{}>", id)).collect();
        description.push_str(&format!(
            "\n\n⚠️ Couldn't DM {}. Use `/paranoia status` here to see your question.",
            mentions.join(", ")
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title(format!("🤫 Round {}", round))
        .description(description)
        .color(colors::INFO);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn announce_reveals(
    ctx: Context<'_>,
    channel_id: serenity::ChannelId,
    reveals: &[Reveal],
) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("👀 The answers are in")
        .description(reveal_lines(reveals))
        .footer(serenity::CreateEmbedFooter::new(
            "Host: /paranoia next for another round, /paranoia end to stop",
        ))
        .color(colors::WARNING);

    channel_id
        .send_message(ctx.http(), serenity::CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

fn prompt_embed(prompt: &Prompt, channel_id: serenity::ChannelId) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("🤫 Your Paranoia question")
        .description(format!(
            "<@{}> asks:\n> {}\n\nAnswer by naming a player with `/paranoia answer` (here or in <#{}>).",
            prompt.asker_id, prompt.question, channel_id
        ))
        .color(colors::INFO)
}

fn reveal_lines(reveals: &[Reveal]) -> String {
    reveals
        .iter()
        .map(|r| match r.answer {
            Answer::Named(named) => {
                let question = if r.question_revealed {
                    format!("\n> ❓ {}", r.question)
                } else {
                    "\n> 🤫 The question stays secret.".to_string()
                };
                format!("<@{}> answered **<@{}>**{}", r.target_id, named, question)
            }
            Answer::Skipped => format!("<@{}> didn't answer.", r.target_id),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn status_embed(game: &Game) -> serenity::CreateEmbed {
    let players = game
        .players()
        .iter()
        .map(|id| {
            if *id == game.host_id() {
                format!("<@{}> 👑", id)
            } else {
                format!("<@{}>", id)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let phase = match game.phase() {
        Phase::Lobby => "Waiting in the lobby".to_string(),
        Phase::Collecting { round, .. } => format!(
            "Round {}: waiting on {} answer(s)",
            round,
            game.pending_targets().len()
        ),
        Phase::Revealed { round, .. } => format!("Round {} revealed", round),
    };

    serenity::CreateEmbed::new()
        .title("🤫 Paranoia")
        .field("Phase", phase, false)
        .field(format!("Players ({})", game.players().len()), players, false)
        .color(colors::INFO)
}

async fn reply_error(ctx: Context<'_>, err: ParanoiaError) -> Result<(), Error> {
    match err {
        ParanoiaError::Store(_) => Err(err.into()),
        other => {
            ctx.say(format!("❌ {}", other)).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_lines_hide_unflipped_questions() {
        let reveals = vec![
            Reveal {
                asker_id: 1,
                target_id: 2,
                answer: Answer::Named(3),
                question: "Who snores?".to_string(),
                question_revealed: true,
            },
            Reveal {
                asker_id: 2,
                target_id: 3,
                answer: Answer::Named(1),
                question: "Who lies?".to_string(),
                question_revealed: false,
            },
            Reveal {
                asker_id: 3,
                target_id: 1,
                answer: Answer::Skipped,
                question: "Who cheats?".to_string(),
                question_revealed: false,
            },
        ];

        let text = reveal_lines(&reveals);
        assert!(text.contains("Who snores?"));
        assert!(!text.contains("Who lies?"));
        assert!(!text.contains("Who cheats?"));
        assert!(text.contains("<@1> didn't answer."));
    }
}
