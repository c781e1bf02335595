use crate::core::logging::{LogConfig, LogConfigStore, LogEventKind};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashSet;

pub struct SqliteLogStore {
    pool: Pool<Sqlite>,
}

fn encode_kinds(kinds: &HashSet<LogEventKind>) -> String {
    let mut keys: Vec<&str> = kinds.iter().map(|k| k.key()).collect();
    keys.sort_unstable();
    keys.join(",")
}

/// Unknown keys (from an older build) are dropped.
fn decode_kinds(raw: &str) -> HashSet<LogEventKind> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

impl SqliteLogStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS logging_config (
                guild_id INTEGER PRIMARY KEY,
                enabled BOOLEAN NOT NULL DEFAULT 0,
                channel_id INTEGER,
                disabled_events TEXT NOT NULL DEFAULT ''
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Databases created before per-event toggles lack the column.
        let columns = sqlx::query("PRAGMA table_info(logging_config)")
            .fetch_all(&self.pool)
            .await?;
        let has_disabled = columns
            .iter()
            .any(|row| row.get::<String, _>("name") == "disabled_events");
        if !has_disabled {
            sqlx::query(
                "ALTER TABLE logging_config ADD COLUMN disabled_events TEXT NOT NULL DEFAULT ''",
            )
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LogConfigStore for SqliteLogStore {
    async fn get_config(&self, guild_id: u64) -> Result<Option<LogConfig>> {
        let row = sqlx::query("SELECT * FROM logging_config WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            Ok(Some(LogConfig {
                guild_id,
                enabled: row.get("enabled"),
                channel_id: row.get::<Option<i64>, _>("channel_id").map(|id| id as u64),
                disabled_events: decode_kinds(&row.get::<String, _>("disabled_events")),
            }))
        } else {
            Ok(None)
        }
    }

    async fn save_config(&self, config: LogConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO logging_config (guild_id, enabled, channel_id, disabled_events)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                enabled = excluded.enabled,
                channel_id = excluded.channel_id,
                disabled_events = excluded.disabled_events
            "#,
        )
        .bind(config.guild_id as i64)
        .bind(config.enabled)
        .bind(config.channel_id.map(|id| id as i64))
        .bind(encode_kinds(&config.disabled_events))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteLogStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteLogStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn config_round_trip_with_toggles() {
        let store = store().await;
        assert!(store.get_config(1).await.unwrap().is_none());

        let mut config = LogConfig::new(1);
        config.enabled = true;
        config.channel_id = Some(77);
        config.disabled_events.insert(LogEventKind::VoiceMove);
        config.disabled_events.insert(LogEventKind::MessageEdit);
        store.save_config(config.clone()).await.unwrap();

        assert_eq!(store.get_config(1).await.unwrap(), Some(config));
    }

    #[tokio::test]
    async fn migrate_is_repeatable() {
        let store = store().await;
        store.migrate().await.unwrap();
    }

    #[test]
    fn kind_encoding() {
        let kinds: HashSet<_> = [LogEventKind::RoleChange, LogEventKind::MemberJoin].into();
        assert_eq!(encode_kinds(&kinds), "member_join,role_change");
        assert_eq!(decode_kinds("member_join,role_change,bogus"), kinds);
        assert!(decode_kinds("").is_empty());
    }
}
