// Bot presence. Discord-layer glue only.

use poise::serenity_prelude as serenity;

const DEFAULT_ACTIVITY: &str = "Rolling dice | /help";

pub fn reset_status(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::playing(DEFAULT_ACTIVITY);
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context) {
    reset_status(ctx);
}
