// Self-assignable roles for members, plus the admin side that manages the
// lists and hands roles out directly.

use crate::core::roles::{Invoker, RoleError, RoleInfo};
use crate::discord::{colors, Context, Error};
use poise::serenity_prelude as serenity;

fn role_info(role: &serenity::Role) -> RoleInfo {
    let elevated = serenity::Permissions::ADMINISTRATOR
        | serenity::Permissions::MANAGE_GUILD
        | serenity::Permissions::MANAGE_ROLES;
    RoleInfo {
        id: role.id.get(),
        guild_id: role.guild_id.get(),
        managed: role.managed,
        position: role.position,
        elevated: role.permissions.intersects(elevated),
    }
}

/// Rank of the member running the command, read from the guild cache.
async fn invoking_member(ctx: Context<'_>) -> Result<Invoker, Error> {
    let member = ctx
        .author_member()
        .await
        .ok_or("Couldn't load your member data")?;
    let guild = ctx.guild().ok_or("Guild not in cache")?;
    Ok(Invoker {
        is_owner: guild.owner_id == member.user.id,
        top_position: guild
            .member_highest_role(&member)
            .map_or(0, |role| role.position),
    })
}

/// Give yourself or drop a self-assignable role.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("give", "drop", "list")
)]
pub async fn role(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Take a self-assignable role.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn give(
    ctx: Context<'_>,
    #[description = "Role to take"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    if let Err(e) = ctx.data().roles.check_self_assign(&role_info(&role)).await {
        return reply_error(ctx, e).await;
    }

    apply_role(ctx, guild_id, ctx.author().id, &role, true, "Self-assigned role").await
}

/// Drop a self-assignable role.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn drop(
    ctx: Context<'_>,
    #[description = "Role to drop"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    if let Err(e) = ctx.data().roles.check_self_assign(&role_info(&role)).await {
        return reply_error(ctx, e).await;
    }

    apply_role(ctx, guild_id, ctx.author().id, &role, false, "Self-removed role").await
}

/// Show roles you can give yourself.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let config = ctx.data().roles.config(guild_id).await?;

    let mention_all = |ids: &[u64]| {
        if ids.is_empty() {
            "none".to_string()
        } else {
            ids.iter()
                .map(|id| format!("<@&{}>", id))
                .collect::<Vec<_>>()
                .join(" ")
        }
    };

    let embed = serenity::CreateEmbed::new()
        .title("🎭 Roles")
        .field("Self-assignable", mention_all(&config.self_assignable), false)
        .field("Given on join", mention_all(&config.join_roles), false)
        .footer(serenity::CreateEmbedFooter::new("Use /role give <role> to take one"))
        .color(colors::INFO);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Manage self-assignable and join roles.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES",
    subcommands(
        "allow",
        "disallow",
        "autorole_add",
        "autorole_remove",
        "grant",
        "revoke"
    )
)]
pub async fn roleadmin(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Let members give themselves a role.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn allow(
    ctx: Context<'_>,
    #[description = "Role"] role: serenity::Role,
) -> Result<(), Error> {
    let invoker = invoking_member(ctx).await?;
    match ctx.data().roles.allow(&role_info(&role), &invoker).await {
        Ok(()) => {
            ctx.say(format!("✅ <@&{}> is now self-assignable.", role.id))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Stop a role from being self-assignable.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn disallow(
    ctx: Context<'_>,
    #[description = "Role"] role: serenity::Role,
) -> Result<(), Error> {
    match ctx
        .data()
        .roles
        .disallow(role.guild_id.get(), role.id.get())
        .await
    {
        Ok(()) => {
            ctx.say(format!("✅ <@&{}> is no longer self-assignable.", role.id))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Give a role to everyone who joins.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn autorole_add(
    ctx: Context<'_>,
    #[description = "Role"] role: serenity::Role,
) -> Result<(), Error> {
    let invoker = invoking_member(ctx).await?;
    match ctx.data().roles.add_join_role(&role_info(&role), &invoker).await {
        Ok(()) => {
            ctx.say(format!("✅ New members will get <@&{}>.", role.id))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Stop giving a role on join.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn autorole_remove(
    ctx: Context<'_>,
    #[description = "Role"] role: serenity::Role,
) -> Result<(), Error> {
    match ctx
        .data()
        .roles
        .remove_join_role(role.guild_id.get(), role.id.get())
        .await
    {
        Ok(()) => {
            ctx.say(format!("✅ New members will no longer get <@&{}>.", role.id))
                .await?;
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

/// Give a member a role.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn grant(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
    #[description = "Role"] role: serenity::Role,
) -> Result<(), Error> {
    let invoker = invoking_member(ctx).await?;
    if let Err(e) = ctx.data().roles.check_admin_assign(&role_info(&role), &invoker) {
        return reply_error(ctx, e).await;
    }

    let reason = format!("Granted by {}", ctx.author().name);
    apply_role(ctx, member.guild_id, member.user.id, &role, true, &reason).await
}

/// Take a role from a member.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn revoke(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
    #[description = "Role"] role: serenity::Role,
) -> Result<(), Error> {
    let invoker = invoking_member(ctx).await?;
    if let Err(e) = ctx.data().roles.check_admin_assign(&role_info(&role), &invoker) {
        return reply_error(ctx, e).await;
    }

    let reason = format!("Revoked by {}", ctx.author().name);
    apply_role(ctx, member.guild_id, member.user.id, &role, false, &reason).await
}

async fn apply_role(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    role: &serenity::Role,
    add: bool,
    reason: &str,
) -> Result<(), Error> {
    let result = if add {
        ctx.http()
            .add_member_role(guild_id, user_id, role.id, Some(reason))
            .await
    } else {
        ctx.http()
            .remove_member_role(guild_id, user_id, role.id, Some(reason))
            .await
    };

    match result {
        Ok(()) => {
            let verb = if add { "now has" } else { "no longer has" };
            ctx.say(format!("✅ <@{}> {} <@&{}>.", user_id, verb, role.id))
                .await?;
        }
        Err(e) => {
            tracing::warn!(
                guild_id = guild_id.get(),
                role_id = role.id.get(),
                "Role update failed: {}",
                e
            );
            ctx.say("❌ I couldn't change that role. Make sure my role sits above it and I have Manage Roles.")
                .await?;
        }
    }
    Ok(())
}

async fn reply_error(ctx: Context<'_>, err: RoleError) -> Result<(), Error> {
    match err {
        RoleError::Storage(_) => Err(err.into()),
        other => {
            ctx.say(format!("❌ {}", other)).await?;
            Ok(())
        }
    }
}
