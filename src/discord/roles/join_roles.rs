// Hands out the configured join roles when a member arrives.

use crate::core::roles::{RoleService, RoleStore};
use poise::serenity_prelude as serenity;

pub async fn grant_join_roles<S: RoleStore>(
    ctx: &serenity::Context,
    roles: &RoleService<S>,
    member: &serenity::Member,
) {
    if member.user.bot {
        return;
    }

    let guild_id = member.guild_id;
    let role_ids = match roles.join_roles(guild_id.get()).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(guild_id = guild_id.get(), "Failed to load join roles: {}", e);
            return;
        }
    };

    for role_id in role_ids {
        let role_id = serenity::RoleId::new(role_id);
        if let Err(e) = ctx
            .http
            .add_member_role(guild_id, member.user.id, role_id, Some("Join role"))
            .await
        {
            tracing::warn!(
                guild_id = guild_id.get(),
                user_id = member.user.id.get(),
                role_id = role_id.get(),
                "Failed to grant join role: {}",
                e
            );
        }
    }
}
