// Discord layer - commands and event handlers.

use crate::core::billing::BillingService;
use crate::core::calendar::CalendarService;
use crate::core::expressions::ExpressionService;
use crate::core::logging::LoggingService;
use crate::core::paranoia::ParanoiaService;
use crate::core::roles::RoleService;
use crate::core::rp::RpService;
use crate::infra::calendar::JsonCalendarStore;
use crate::infra::expressions::HttpAssetFetcher;
use crate::infra::logging::SqliteLogStore;
use crate::infra::paranoia::JsonQuestionStore;
use crate::infra::roles::JsonRoleStore;
use crate::infra::rp::SqliteRpStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "logging/mod.rs"]
pub mod logging;

#[path = "calendar/calendar_poster.rs"]
pub mod calendar_poster;

#[path = "roles/join_roles.rs"]
pub mod join_roles;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub expressions: Arc<ExpressionService<HttpAssetFetcher>>,
    pub rp: Arc<RpService<SqliteRpStore>>,
    pub paranoia: Arc<ParanoiaService<JsonQuestionStore>>,
    pub calendar: Arc<CalendarService<JsonCalendarStore>>,
    pub billing: Arc<BillingService>,
    pub logging: Arc<LoggingService<SqliteLogStore>>,
    pub roles: Arc<RoleService<JsonRoleStore>>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Whether the invoking member holds `permission` (administrators always do).
/// Slash invocations carry resolved permissions; prefix ones fall back to the cache.
pub async fn author_has_permission(ctx: Context<'_>, permission: serenity::Permissions) -> bool {
    let Some(guild_id) = ctx.guild_id() else {
        return false;
    };
    let Some(member) = ctx.author_member().await else {
        return false;
    };

    let permissions = match member.permissions {
        Some(p) => Some(p),
        None => ctx
            .cache()
            .guild(guild_id)
            .map(|guild| guild.member_permissions(&member)),
    };

    permissions.is_some_and(|p| p.administrator() || p.contains(permission))
}

/// Standard colours so every cog's embeds look related.
pub mod colors {
    use poise::serenity_prelude::Colour;

    pub const INFO: Colour = Colour::from_rgb(88, 101, 242);
    pub const SUCCESS: Colour = Colour::from_rgb(87, 242, 135);
    pub const WARNING: Colour = Colour::from_rgb(254, 231, 92);
    pub const DANGER: Colour = Colour::from_rgb(237, 66, 69);
}
