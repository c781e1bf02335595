// Entry point of the bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, event handlers and background pollers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::billing::{BillingApi, BillingService};
use crate::core::calendar::CalendarService;
use crate::core::expressions::ExpressionService;
use crate::core::logging::LoggingService;
use crate::core::paranoia::ParanoiaService;
use crate::core::roles::RoleService;
use crate::core::rp::{RpService, RpSync};
use crate::discord::calendar_poster::spawn_calendar_poster;
use crate::discord::commands::{self as cmds, presence};
use crate::discord::join_roles::grant_join_roles;
use crate::discord::logging::events as logging_events;
use crate::discord::{Data, Error};
use crate::infra::billing::WhmcsClient;
use crate::infra::calendar::JsonCalendarStore;
use crate::infra::expressions::HttpAssetFetcher;
use crate::infra::google::{GoogleRpSync, ServiceAccountAuth, SCOPE_DOCUMENTS, SCOPE_SPREADSHEETS};
use crate::infra::logging::SqliteLogStore;
use crate::infra::paranoia::JsonQuestionStore;
use crate::infra::roles::JsonRoleStore;
use crate::infra::rp::SqliteRpStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,guild_cogs=debug";

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot {
                return Ok(());
            }

            // Snapshot first so an immediate edit/delete still has something to log.
            logging_events::remember_message(data, new_message);

            if let Err(e) = cmds::rp::track_message(data, new_message).await {
                tracing::error!("Error recording RP message: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = logging_events::handle_member_join(ctx, data, new_member).await {
                tracing::error!("Error handling member join log: {}", e);
            }
            grant_join_roles(ctx, &data.roles, new_member).await;
        }
        serenity::FullEvent::GuildMemberRemoval {
            guild_id,
            user,
            member_data_if_available,
        } => {
            if let Err(e) = logging_events::handle_member_remove(
                ctx,
                data,
                *guild_id,
                user,
                member_data_if_available.as_ref(),
            )
            .await
            {
                tracing::error!("Error handling member remove log: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberUpdate {
            old_if_available,
            event,
            ..
        } => {
            if let Err(e) =
                logging_events::handle_member_update(ctx, data, old_if_available.as_ref(), event)
                    .await
            {
                tracing::error!("Error handling member update: {}", e);
            }
        }
        serenity::FullEvent::GuildRoleDelete {
            guild_id,
            removed_role_id,
            ..
        } => {
            if let Err(e) = data
                .roles
                .forget_role(guild_id.get(), removed_role_id.get())
                .await
            {
                tracing::error!("Error forgetting deleted role: {}", e);
            }
        }
        serenity::FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => {
            if let Err(e) = logging_events::handle_message_delete(
                ctx,
                data,
                *channel_id,
                *deleted_message_id,
                *guild_id,
            )
            .await
            {
                tracing::error!("Error handling message delete: {}", e);
            }
        }
        serenity::FullEvent::MessageUpdate {
            old_if_available,
            event,
            ..
        } => {
            if let Err(e) = logging_events::handle_message_update(
                ctx,
                data,
                old_if_available.as_ref(),
                event,
            )
            .await
            {
                tracing::error!("Error handling message update: {}", e);
            }
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            if let Err(e) =
                logging_events::handle_voice_state_update(ctx, data, old.as_ref(), new).await
            {
                tracing::error!("Error handling voice state update: {}", e);
            }
        }

        _ => {}
    }

    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            tracing::error!("Failed to start bot: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                guild_id = ctx.guild_id().map(|g| g.get()),
                "Command error: {}",
                error
            );
            let reply = poise::CreateReply::default()
                .content("⚠️ Something went wrong running that command.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::warn!("Couldn't report command error: {}", e);
            }
        }
        other => {
            tracing::error!("Framework error: {}", other);
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
            EnvFilter::try_new(level)
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Optional RP sync; a bad key disables sync instead of stopping the bot.
async fn build_rp_sync(config: &BotConfig) -> Option<Arc<dyn RpSync>> {
    if !config.google_configured() {
        tracing::info!("No Google service account configured, RP sync disabled");
        return None;
    }

    match ServiceAccountAuth::from_sources(
        config.google_key_path.as_deref(),
        config.google_key_json.as_deref(),
        &[SCOPE_SPREADSHEETS, SCOPE_DOCUMENTS],
    )
    .await
    {
        Ok(auth) => {
            tracing::info!(account = auth.client_email(), "RP sync enabled");
            Some(Arc::new(GoogleRpSync::new(auth)))
        }
        Err(e) => {
            tracing::warn!("Google service account unusable, RP sync disabled: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so LOG_LEVEL from the file is honoured.
    dotenv::dotenv().ok();
    init_tracing();

    let config = BotConfig::from_env()?;

    // Keep runtime data in a dedicated folder so the repo root stays tidy.
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {}", config.data_dir.display()))?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let expression_service = Arc::new(ExpressionService::new(HttpAssetFetcher::new()?));

    let rp_db_path = config.data_file("rp_tracker.db");
    let rp_store = SqliteRpStore::new(&rp_db_path.to_string_lossy())
        .await
        .context("Failed to initialize RP database")?;
    let rp_service = Arc::new(RpService::new(rp_store, build_rp_sync(&config).await));

    let question_store = JsonQuestionStore::new(config.data_file("paranoia_questions.json"))?;
    let paranoia_service = Arc::new(ParanoiaService::new(question_store));

    let calendar_store = JsonCalendarStore::new(config.data_file("calendar.json"))?;
    let calendar_service = Arc::new(CalendarService::new(calendar_store));

    let billing_api: Option<Arc<dyn BillingApi>> = match config.whmcs.clone() {
        Some(whmcs) => {
            tracing::info!(url = %whmcs.url, "WHMCS billing enabled");
            Some(Arc::new(WhmcsClient::new(whmcs)?))
        }
        None => None,
    };
    let billing_service = Arc::new(BillingService::new(billing_api));

    let logging_db_path = config.data_file("logging.db");
    let log_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite://{}?mode=rwc", logging_db_path.display()))
        .await
        .context("Failed to connect to logging DB")?;
    let log_store = SqliteLogStore::new(log_pool);
    log_store
        .migrate()
        .await
        .context("Failed to migrate logging DB")?;
    let logging_service = Arc::new(LoggingService::new(log_store));

    let role_store = JsonRoleStore::new(config.data_file("roles.json"))?;
    let role_service = Arc::new(RoleService::new(role_store));

    let data = Data {
        expressions: expression_service,
        rp: rp_service,
        paranoia: paranoia_service,
        calendar: calendar_service,
        billing: billing_service,
        logging: logging_service,
        roles: role_service,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_VOICE_STATES
        | serenity::GatewayIntents::DIRECT_MESSAGES; // Paranoia answers

    let dev_guild_id = config.dev_guild_id;
    let calendar_poll_secs = config.calendar_poll_secs;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: cmds::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                mention_as_prefix: true,
                edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                    StdDuration::from_secs(3600),
                ))),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::debug!(
                        command = %ctx.command().qualified_name,
                        user_id = ctx.author().id.get(),
                        "Running command"
                    );
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(bot = %ready.user.name, "Bot is starting up");

                match dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        tracing::info!(guild_id, "Commands registered in dev guild");
                    }
                    None => {
                        // Global registration can take up to an hour to propagate.
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        tracing::info!("Commands registered globally");
                    }
                }

                presence::on_ready(ctx);

                spawn_calendar_poster(
                    ctx.http.clone(),
                    Arc::clone(&data.calendar),
                    calendar_poll_secs,
                );

                tracing::info!("Bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut settings = serenity::cache::Settings::default();
    settings.max_messages = 10000;

    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .cache_settings(settings)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
