// Calendar settings per guild and the "has the local day rolled over" check
// the poster loop relies on.

use super::calendar_models::{daily_report, CalendarConfig, DailyReport, Hemisphere};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("`{0}` is not a known IANA timezone (try something like `Europe/London`)")]
    InvalidTimezone(String),

    #[error("Set a calendar channel first")]
    NoChannel,

    #[error("`{0}` is not a date, use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn get_config(&self, guild_id: u64) -> Result<Option<CalendarConfig>, CalendarError>;
    async fn save_config(&self, config: CalendarConfig) -> Result<(), CalendarError>;
    async fn all_configs(&self) -> Result<Vec<CalendarConfig>, CalendarError>;
}

/// A guild whose local day has rolled over since its last post.
#[derive(Debug, Clone)]
pub struct DuePost {
    pub config: CalendarConfig,
    pub local_date: NaiveDate,
}

pub fn parse_timezone(name: &str) -> Result<Tz, CalendarError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CalendarError::InvalidTimezone(name.trim().to_string()))
}

pub fn parse_date(input: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| CalendarError::InvalidDate(input.trim().to_string()))
}

/// Today's date as seen from the configured timezone.
pub fn local_date(config: &CalendarConfig, now: DateTime<Utc>) -> Result<NaiveDate, CalendarError> {
    let tz = parse_timezone(&config.timezone)?;
    Ok(now.with_timezone(&tz).date_naive())
}

pub struct CalendarService<S: CalendarStore> {
    store: S,
}

impl<S: CalendarStore> CalendarService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Saved config, or the defaults for a guild that never configured one.
    pub async fn config(&self, guild_id: u64) -> Result<CalendarConfig, CalendarError> {
        Ok(self
            .store
            .get_config(guild_id)
            .await?
            .unwrap_or_else(|| CalendarConfig::new(guild_id)))
    }

    pub async fn set_channel(&self, guild_id: u64, channel_id: u64) -> Result<CalendarConfig, CalendarError> {
        let mut config = self.config(guild_id).await?;
        config.channel_id = Some(channel_id);
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    /// Stores the canonical zone name chrono-tz knows it by.
    pub async fn set_timezone(&self, guild_id: u64, name: &str) -> Result<CalendarConfig, CalendarError> {
        let tz = parse_timezone(name)?;
        let mut config = self.config(guild_id).await?;
        config.timezone = tz.name().to_string();
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    pub async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<CalendarConfig, CalendarError> {
        let mut config = self.config(guild_id).await?;
        if enabled && config.channel_id.is_none() {
            return Err(CalendarError::NoChannel);
        }
        config.enabled = enabled;
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    pub async fn set_weather(&self, guild_id: u64, include_weather: bool) -> Result<CalendarConfig, CalendarError> {
        let mut config = self.config(guild_id).await?;
        config.include_weather = include_weather;
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    pub async fn set_hemisphere(&self, guild_id: u64, hemisphere: Hemisphere) -> Result<CalendarConfig, CalendarError> {
        let mut config = self.config(guild_id).await?;
        config.hemisphere = hemisphere;
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    /// Enabled guilds whose local date is past `last_posted`. A guild that
    /// never posted is due immediately.
    pub async fn due_posts(&self, now: DateTime<Utc>) -> Result<Vec<DuePost>, CalendarError> {
        let mut due = Vec::new();
        for config in self.store.all_configs().await? {
            if !config.enabled || config.channel_id.is_none() {
                continue;
            }
            let local_date = match local_date(&config, now) {
                Ok(date) => date,
                Err(e) => {
                    tracing::warn!(guild_id = config.guild_id, "Skipping calendar: {}", e);
                    continue;
                }
            };
            if config.last_posted.map_or(true, |last| local_date > last) {
                due.push(DuePost { config, local_date });
            }
        }
        Ok(due)
    }

    pub async fn mark_posted(&self, guild_id: u64, date: NaiveDate) -> Result<(), CalendarError> {
        let mut config = self.config(guild_id).await?;
        config.last_posted = Some(date);
        self.store.save_config(config).await
    }

    /// Report for the guild's current local day.
    pub fn report_for<R: Rng>(
        &self,
        config: &CalendarConfig,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<DailyReport, CalendarError> {
        let date = local_date(config, now)?;
        Ok(daily_report(date, config.hemisphere, config.include_weather, rng))
    }
}
