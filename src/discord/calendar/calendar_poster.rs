// Daily calendar posts.
//
// One loop for every guild: each tick asks the service which guilds have
// rolled over into a new local day, posts their report and marks the date.

use crate::core::calendar::{CalendarService, CalendarStore, DailyReport, MoonInfo};
use crate::discord::colors;
use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::sleep;

pub fn spawn_calendar_poster<S>(
    http: Arc<serenity::Http>,
    calendar: Arc<CalendarService<S>>,
    poll_secs: u64,
) where
    S: CalendarStore + 'static,
{
    tokio::spawn(async move {
        tracing::info!(poll_secs, "Calendar poster started");
        loop {
            post_due_reports(&http, &calendar).await;
            sleep(StdDuration::from_secs(poll_secs)).await;
        }
    });
}

async fn post_due_reports<S: CalendarStore>(http: &serenity::Http, calendar: &CalendarService<S>) {
    let now = Utc::now();
    let due = match calendar.due_posts(now).await {
        Ok(due) => due,
        Err(e) => {
            tracing::error!("Failed to load calendar configs: {}", e);
            return;
        }
    };
    tracing::debug!(count = due.len(), "Calendar poll");

    for post in due {
        let guild_id = post.config.guild_id;
        let Some(channel_id) = post.config.channel_id else {
            continue;
        };

        // Rng is scoped so it never lives across an await.
        let report = calendar.report_for(&post.config, now, &mut rand::thread_rng());
        match report {
            Ok(report) => {
                let message = serenity::CreateMessage::new()
                    .embed(report_embed(&report, &post.config.timezone));
                if let Err(e) = serenity::ChannelId::new(channel_id)
                    .send_message(http, message)
                    .await
                {
                    tracing::warn!(guild_id, channel_id, "Failed to post calendar: {}", e);
                } else {
                    tracing::info!(guild_id, date = %post.local_date, "Posted daily calendar");
                }
            }
            Err(e) => tracing::warn!(guild_id, "Couldn't build calendar report: {}", e),
        }

        // Marked even on failure, otherwise a broken channel is retried every tick.
        if let Err(e) = calendar.mark_posted(guild_id, post.local_date).await {
            tracing::error!(guild_id, "Failed to mark calendar as posted: {}", e);
        }
    }
}

pub fn report_embed(report: &DailyReport, timezone: &str) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📅 {}", report.date.format("%A, %B %-d, %Y")))
        .field("Day of year", report.day_of_year.to_string(), true)
        .field(
            "Season",
            format!("{} {}", report.season.emoji(), report.season),
            true,
        )
        .field("Moon", moon_line(&report.moon), false)
        .footer(serenity::CreateEmbedFooter::new(format!("Timezone: {}", timezone)))
        .color(colors::INFO);

    if let Some(weather) = &report.weather {
        embed = embed.field(
            "Weather",
            format!(
                "{} {}, {}°C / {}°F",
                weather.condition.emoji(),
                weather.condition.label(),
                weather.temperature_c,
                weather.temperature_f()
            ),
            false,
        );
    }
    embed
}

pub fn moon_line(moon: &MoonInfo) -> String {
    format!(
        "{} {} ({:.0}% lit, day {:.1} of the cycle)",
        moon.phase.emoji(),
        moon.phase.name(),
        moon.illumination * 100.0,
        moon.age_days
    )
}
