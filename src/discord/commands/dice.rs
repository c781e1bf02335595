use crate::core::dice::{self, Natural};
use crate::discord::{colors, Context, Error};
use poise::serenity_prelude as serenity;

/// Roll dice, e.g. `2d6+3`, `4d6kh3`, `d20-1`.
#[poise::command(slash_command, prefix_command, aliases("r"))]
pub async fn roll(
    ctx: Context<'_>,
    #[description = "Dice expression (default 1d20)"]
    #[rest]
    expression: Option<String>,
) -> Result<(), Error> {
    let input = expression.unwrap_or_else(|| "1d20".to_string());

    let parsed = match dice::parse(&input) {
        Ok(parsed) => parsed,
        Err(e) => {
            ctx.say(format!("🎲 {}", e)).await?;
            return Ok(());
        }
    };

    // thread_rng is not Send; keep it out of any await
    let outcome = parsed.roll(&mut rand::thread_rng());

    let (title, color) = match outcome.natural() {
        Some(Natural::Twenty) => ("🎉 Natural 20!", colors::SUCCESS),
        Some(Natural::One) => ("💀 Natural 1", colors::DANGER),
        None => ("🎲 Roll", colors::INFO),
    };

    let mut breakdown = outcome.breakdown();
    if breakdown.chars().count() > 4000 {
        breakdown = breakdown.chars().take(4000).collect::<String>() + "…";
    }

    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(breakdown)
        .field("Total", format!("**{}**", outcome.total), true)
        .field("Expression", format!("`{}`", outcome.expression), true)
        .color(color)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Rolled by {}",
            ctx.author().name
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Flip a coin.
#[poise::command(slash_command, prefix_command)]
pub async fn flip(ctx: Context<'_>) -> Result<(), Error> {
    let side = dice::flip_coin(&mut rand::thread_rng());
    ctx.say(format!("🪙 **{}**", side)).await?;
    Ok(())
}

/// Pick one option: `pizza | tacos | sushi`.
#[poise::command(slash_command, prefix_command)]
pub async fn choose(
    ctx: Context<'_>,
    #[description = "Options separated by | or ,"]
    #[rest]
    options: String,
) -> Result<(), Error> {
    let reply = match dice::choose(&options, &mut rand::thread_rng()) {
        Ok(pick) => format!("🤔 I choose **{}**", pick),
        Err(e) => e.to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}
