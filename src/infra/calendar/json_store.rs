use crate::core::calendar::{CalendarConfig, CalendarError, CalendarStore};
use crate::infra::json_file::{GuildJsonFile, StoreError};
use async_trait::async_trait;
use std::path::PathBuf;

impl From<StoreError> for CalendarError {
    fn from(e: StoreError) -> Self {
        CalendarError::Storage(e.to_string())
    }
}

pub struct JsonCalendarStore {
    file: GuildJsonFile<CalendarConfig>,
}

impl JsonCalendarStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            file: GuildJsonFile::open(path)?,
        })
    }
}

#[async_trait]
impl CalendarStore for JsonCalendarStore {
    async fn get_config(&self, guild_id: u64) -> Result<Option<CalendarConfig>, CalendarError> {
        Ok(self.file.get(guild_id).await)
    }

    async fn save_config(&self, config: CalendarConfig) -> Result<(), CalendarError> {
        Ok(self.file.insert(config.guild_id, config).await?)
    }

    async fn all_configs(&self) -> Result<Vec<CalendarConfig>, CalendarError> {
        Ok(self.file.values().await)
    }
}
