use crate::core::calendar::{
    moon_phase, parse_date, CalendarConfig, CalendarError, Hemisphere,
};
use crate::discord::calendar_poster::{moon_line, report_embed};
use crate::discord::{colors, Context, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;

#[derive(Debug, poise::ChoiceParameter)]
pub enum HemisphereChoice {
    #[name = "Northern"]
    Northern,
    #[name = "Southern"]
    Southern,
}

impl From<HemisphereChoice> for Hemisphere {
    fn from(choice: HemisphereChoice) -> Self {
        match choice {
            HemisphereChoice::Northern => Hemisphere::Northern,
            HemisphereChoice::Southern => Hemisphere::Southern,
        }
    }
}

/// Daily calendar posts with moon phase, season and weather.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands(
        "set_channel",
        "timezone",
        "enable",
        "disable",
        "weather",
        "hemisphere",
        "status",
        "today"
    )
)]
pub async fn calendar(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set the channel the daily calendar is posted in.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn set_channel(
    ctx: Context<'_>,
    #[description = "Channel (defaults to this one)"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let channel_id = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());

    match ctx.data().calendar.set_channel(guild_id, channel_id.get()).await {
        Ok(config) => {
            let mut reply = format!("✅ Calendar will be posted in <#{}>.", channel_id);
            if !config.enabled {
                reply.push_str(" Turn it on with `/calendar enable`.");
            }
            ctx.say(reply).await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Set the timezone that decides when a new day starts.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn timezone(
    ctx: Context<'_>,
    #[description = "IANA timezone, e.g. Europe/London"] timezone: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx.data().calendar.set_timezone(guild_id, &timezone).await {
        Ok(config) => {
            ctx.say(format!("✅ Calendar timezone set to `{}`.", config.timezone))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Start posting the daily calendar.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn enable(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx.data().calendar.set_enabled(guild_id, true).await {
        Ok(config) => {
            ctx.say(format!(
                "✅ Daily calendar enabled. The next post goes out when the day rolls over in `{}`.",
                config.timezone
            ))
            .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Stop posting the daily calendar.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx.data().calendar.set_enabled(guild_id, false).await {
        Ok(_) => {
            ctx.say("🛑 Daily calendar disabled.").await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Include the weather roll in daily posts.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn weather(
    ctx: Context<'_>,
    #[description = "Show weather?"] on: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx.data().calendar.set_weather(guild_id, on).await {
        Ok(_) => {
            ctx.say(if on {
                "🌦️ Weather will be included."
            } else {
                "Weather will be left out."
            })
            .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Pick which hemisphere's seasons to use.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn hemisphere(
    ctx: Context<'_>,
    #[description = "Hemisphere"] hemisphere: HemisphereChoice,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx
        .data()
        .calendar
        .set_hemisphere(guild_id, hemisphere.into())
        .await
    {
        Ok(config) => {
            ctx.say(format!("✅ Using {:?} hemisphere seasons.", config.hemisphere))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Show this server's calendar settings.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let config = ctx.data().calendar.config(guild_id).await?;

    ctx.send(poise::CreateReply::default().embed(status_embed(&config)))
        .await?;
    Ok(())
}

/// Show today's calendar.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn today(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let config = ctx.data().calendar.config(guild_id).await?;

    let report = ctx
        .data()
        .calendar
        .report_for(&config, Utc::now(), &mut rand::thread_rng());
    match report {
        Ok(report) => {
            let embed = report_embed(&report, &config.timezone);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Moon phase for today or a given date.
#[poise::command(slash_command, prefix_command)]
pub async fn moon(
    ctx: Context<'_>,
    #[description = "Date as YYYY-MM-DD (defaults to today, UTC)"] date: Option<String>,
) -> Result<(), Error> {
    let date = match date {
        Some(input) => match parse_date(&input) {
            Ok(d) => d,
            Err(e) => return reply_error(ctx, e).await,
        },
        None => Utc::now().date_naive(),
    };

    let info = moon_phase(date);
    let embed = serenity::CreateEmbed::new()
        .title(format!("{} {}", info.phase.emoji(), date.format("%B %-d, %Y")))
        .description(moon_line(&info))
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn status_embed(config: &CalendarConfig) -> serenity::CreateEmbed {
    let channel = config
        .channel_id
        .map(|id| format!("<#{}>", id))
        .unwrap_or_else(|| "not set".to_string());
    let last = config
        .last_posted
        .map(|d| d.to_string())
        .unwrap_or_else(|| "never".to_string());

    serenity::CreateEmbed::new()
        .title("📅 Calendar settings")
        .field("Enabled", if config.enabled { "Yes" } else { "No" }, true)
        .field("Channel", channel, true)
        .field("Timezone", &config.timezone, true)
        .field("Weather", if config.include_weather { "On" } else { "Off" }, true)
        .field("Hemisphere", format!("{:?}", config.hemisphere), true)
        .field("Last posted", last, true)
        .color(if config.enabled { colors::SUCCESS } else { colors::WARNING })
}

async fn reply_error(ctx: Context<'_>, err: CalendarError) -> Result<(), Error> {
    match err {
        CalendarError::Storage(_) => Err(err.into()),
        other => {
            ctx.say(format!("❌ {}", other)).await?;
            Ok(())
        }
    }
}
