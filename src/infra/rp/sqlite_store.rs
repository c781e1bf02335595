// SQLite implementation of the RpStore trait

use crate::core::rp::{Character, CharacterStats, NewRpEntry, RpEntry, RpError, RpSettings, RpStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

pub struct SqliteRpStore {
    pool: SqlitePool,
}

fn store_err(e: sqlx::Error) -> RpError {
    RpError::Storage(e.to_string())
}

fn to_text(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

impl SqliteRpStore {
    /// Create a new SQLite RP store with the given database path.
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        let connection_string = format!("sqlite://{}?mode=rwc", database_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rp_characters (
                guild_id INTEGER NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                owner_id INTEGER NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rp_active_characters (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                PRIMARY KEY (guild_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rp_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                character TEXT NOT NULL COLLATE NOCASE,
                words INTEGER NOT NULL,
                summary TEXT,
                logged_at TEXT NOT NULL,
                retired INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Older databases predate retiring entries along with their character.
        let columns = sqlx::query("PRAGMA table_info(rp_entries)")
            .fetch_all(&self.pool)
            .await?;
        if !columns
            .iter()
            .any(|row| row.get::<String, _>("name") == "retired")
        {
            sqlx::query("ALTER TABLE rp_entries ADD COLUMN retired INTEGER NOT NULL DEFAULT 0")
                .execute(&self.pool)
                .await?;
        }

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_rp_entries_guild_character
            ON rp_entries(guild_id, character)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rp_settings (
                guild_id INTEGER PRIMARY KEY,
                sheet_id TEXT,
                doc_id TEXT,
                tracked_channels TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn character_from_row(row: &SqliteRow) -> Character {
        Character {
            guild_id: row.get::<i64, _>("guild_id") as u64,
            owner_id: row.get::<i64, _>("owner_id") as u64,
            name: row.get("name"),
            description: row.get("description"),
            created_at: parse_time(&row.get::<String, _>("created_at")),
        }
    }

    fn entry_from_row(row: &SqliteRow) -> RpEntry {
        RpEntry {
            id: row.get("id"),
            guild_id: row.get::<i64, _>("guild_id") as u64,
            channel_id: row.get::<i64, _>("channel_id") as u64,
            author_id: row.get::<i64, _>("author_id") as u64,
            character: row.get("character"),
            words: row.get::<i64, _>("words") as u32,
            summary: row.get("summary"),
            logged_at: parse_time(&row.get::<String, _>("logged_at")),
        }
    }

    fn stats_from_row(row: &SqliteRow) -> CharacterStats {
        CharacterStats {
            character: row.get("name"),
            owner_id: row.get::<i64, _>("owner_id") as u64,
            posts: row.get::<i64, _>("posts") as u64,
            words: row.get::<i64, _>("words") as u64,
            last_active: row
                .get::<Option<String>, _>("last_active")
                .map(|t| parse_time(&t)),
        }
    }
}

const STATS_SELECT: &str = r#"
    SELECT c.name, c.owner_id,
           COUNT(e.id) AS posts,
           COALESCE(SUM(e.words), 0) AS words,
           MAX(e.logged_at) AS last_active
    FROM rp_characters c
    LEFT JOIN rp_entries e
           ON e.guild_id = c.guild_id AND e.character = c.name AND e.retired = 0
"#;

#[async_trait]
impl RpStore for SqliteRpStore {
    async fn insert_character(&self, character: &Character) -> Result<(), RpError> {
        sqlx::query(
            r#"
            INSERT INTO rp_characters (guild_id, name, owner_id, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(character.guild_id as i64)
        .bind(&character.name)
        .bind(character.owner_id as i64)
        .bind(&character.description)
        .bind(to_text(character.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                RpError::CharacterExists(character.name.clone())
            } else {
                store_err(e)
            }
        })?;
        Ok(())
    }

    async fn get_character(&self, guild_id: u64, name: &str) -> Result<Option<Character>, RpError> {
        let row = sqlx::query("SELECT * FROM rp_characters WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.as_ref().map(Self::character_from_row))
    }

    async fn delete_character(&self, guild_id: u64, name: &str) -> Result<bool, RpError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let deleted = sqlx::query("DELETE FROM rp_characters WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?
            .rows_affected();

        sqlx::query("DELETE FROM rp_active_characters WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        // History stays, but a later character with the same name starts fresh.
        sqlx::query(
            "UPDATE rp_entries SET retired = 1 WHERE guild_id = ? AND character = ? AND retired = 0",
        )
        .bind(guild_id as i64)
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(deleted > 0)
    }

    async fn list_characters(
        &self,
        guild_id: u64,
        owner_id: Option<u64>,
    ) -> Result<Vec<Character>, RpError> {
        let rows = match owner_id {
            Some(owner_id) => {
                sqlx::query(
                    "SELECT * FROM rp_characters WHERE guild_id = ? AND owner_id = ? ORDER BY name",
                )
                .bind(guild_id as i64)
                .bind(owner_id as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM rp_characters WHERE guild_id = ? ORDER BY name")
                    .bind(guild_id as i64)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(store_err)?;

        Ok(rows.iter().map(Self::character_from_row).collect())
    }

    async fn set_active_character(
        &self,
        guild_id: u64,
        user_id: u64,
        name: Option<&str>,
    ) -> Result<(), RpError> {
        match name {
            Some(name) => {
                sqlx::query(
                    r#"
                    INSERT INTO rp_active_characters (guild_id, user_id, name)
                    VALUES (?, ?, ?)
                    ON CONFLICT(guild_id, user_id) DO UPDATE SET name = excluded.name
                    "#,
                )
                .bind(guild_id as i64)
                .bind(user_id as i64)
                .bind(name)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query("DELETE FROM rp_active_characters WHERE guild_id = ? AND user_id = ?")
                    .bind(guild_id as i64)
                    .bind(user_id as i64)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_active_character(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<String>, RpError> {
        let row = sqlx::query(
            "SELECT name FROM rp_active_characters WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(|r| r.get("name")))
    }

    async fn insert_entry(&self, entry: NewRpEntry) -> Result<RpEntry, RpError> {
        let result = sqlx::query(
            r#"
            INSERT INTO rp_entries (guild_id, channel_id, author_id, character, words, summary, logged_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.guild_id as i64)
        .bind(entry.channel_id as i64)
        .bind(entry.author_id as i64)
        .bind(&entry.character)
        .bind(entry.words as i64)
        .bind(&entry.summary)
        .bind(to_text(entry.logged_at))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(RpEntry {
            id: result.last_insert_rowid(),
            guild_id: entry.guild_id,
            channel_id: entry.channel_id,
            author_id: entry.author_id,
            character: entry.character,
            words: entry.words,
            summary: entry.summary,
            logged_at: entry.logged_at,
        })
    }

    async fn character_stats(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<CharacterStats>, RpError> {
        let sql = format!("{} WHERE c.guild_id = ? AND c.name = ? GROUP BY c.name, c.owner_id", STATS_SELECT);
        let row = sqlx::query(&sql)
            .bind(guild_id as i64)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.as_ref().map(Self::stats_from_row))
    }

    async fn leaderboard(&self, guild_id: u64, limit: usize) -> Result<Vec<CharacterStats>, RpError> {
        let sql = format!(
            "{} WHERE c.guild_id = ? GROUP BY c.name, c.owner_id ORDER BY words DESC, posts DESC LIMIT ?",
            STATS_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(guild_id as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.iter().map(Self::stats_from_row).collect())
    }

    async fn recent_entries(
        &self,
        guild_id: u64,
        character: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RpEntry>, RpError> {
        let rows = match character {
            Some(character) => {
                sqlx::query(
                    "SELECT * FROM rp_entries WHERE guild_id = ? AND character = ? AND retired = 0 ORDER BY id DESC LIMIT ?",
                )
                .bind(guild_id as i64)
                .bind(character)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM rp_entries WHERE guild_id = ? ORDER BY id DESC LIMIT ?")
                    .bind(guild_id as i64)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(store_err)?;

        Ok(rows.iter().map(Self::entry_from_row).collect())
    }

    async fn get_settings(&self, guild_id: u64) -> Result<RpSettings, RpError> {
        let row = sqlx::query("SELECT * FROM rp_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        let Some(row) = row else {
            return Ok(RpSettings::new(guild_id));
        };

        let tracked: String = row.get("tracked_channels");
        let tracked_channels: Vec<u64> = serde_json::from_str(&tracked)
            .map_err(|e| RpError::Storage(format!("bad tracked_channels: {}", e)))?;

        Ok(RpSettings {
            guild_id,
            sheet_id: row.get("sheet_id"),
            doc_id: row.get("doc_id"),
            tracked_channels,
        })
    }

    async fn save_settings(&self, settings: &RpSettings) -> Result<(), RpError> {
        let tracked = serde_json::to_string(&settings.tracked_channels)
            .map_err(|e| RpError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO rp_settings (guild_id, sheet_id, doc_id, tracked_channels)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                sheet_id = excluded.sheet_id,
                doc_id = excluded.doc_id,
                tracked_channels = excluded.tracked_channels
            "#,
        )
        .bind(settings.guild_id as i64)
        .bind(&settings.sheet_id)
        .bind(&settings.doc_id)
        .bind(tracked)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> SqliteRpStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteRpStore::from_pool(pool).await.unwrap()
    }

    fn character(name: &str, owner_id: u64) -> Character {
        Character {
            guild_id: 1,
            owner_id,
            name: name.to_string(),
            description: Some("A wanderer".into()),
            created_at: Utc::now(),
        }
    }

    fn entry(character: &str, words: u32, at: DateTime<Utc>) -> NewRpEntry {
        NewRpEntry {
            guild_id: 1,
            channel_id: 2,
            author_id: 10,
            character: character.to_string(),
            words,
            summary: None,
            logged_at: at,
        }
    }

    #[tokio::test]
    async fn character_names_are_case_insensitive() {
        let store = store().await;
        store.insert_character(&character("Aria", 10)).await.unwrap();

        let found = store.get_character(1, "aRIA").await.unwrap().unwrap();
        assert_eq!(found.name, "Aria");
        assert_eq!(found.description.as_deref(), Some("A wanderer"));

        let err = store.insert_character(&character("ARIA", 11)).await.unwrap_err();
        assert!(matches!(err, RpError::CharacterExists(_)));
    }

    #[tokio::test]
    async fn deleting_clears_active_slot() {
        let store = store().await;
        store.insert_character(&character("Aria", 10)).await.unwrap();
        store.set_active_character(1, 10, Some("Aria")).await.unwrap();
        assert_eq!(store.get_active_character(1, 10).await.unwrap().as_deref(), Some("Aria"));

        assert!(store.delete_character(1, "aria").await.unwrap());
        assert!(!store.delete_character(1, "aria").await.unwrap());
        assert_eq!(store.get_active_character(1, 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stats_and_leaderboard() {
        let store = store().await;
        store.insert_character(&character("Aria", 10)).await.unwrap();
        store.insert_character(&character("Bram", 11)).await.unwrap();
        store.insert_character(&character("Cole", 12)).await.unwrap();

        let start = Utc::now() - Duration::hours(2);
        store.insert_entry(entry("Aria", 100, start)).await.unwrap();
        store
            .insert_entry(entry("Aria", 50, start + Duration::hours(1)))
            .await
            .unwrap();
        store.insert_entry(entry("Bram", 400, start)).await.unwrap();

        let aria = store.character_stats(1, "aria").await.unwrap().unwrap();
        assert_eq!(aria.posts, 2);
        assert_eq!(aria.words, 150);
        assert!(aria.last_active.is_some());

        let cole = store.character_stats(1, "Cole").await.unwrap().unwrap();
        assert_eq!(cole.posts, 0);
        assert_eq!(cole.last_active, None);
        assert!(store.character_stats(1, "Nobody").await.unwrap().is_none());

        let board = store.leaderboard(1, 2).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].character, "Bram");
        assert_eq!(board[1].character, "Aria");
    }

    #[tokio::test]
    async fn reused_name_does_not_inherit_retired_history() {
        let store = store().await;
        store.insert_character(&character("Aria", 10)).await.unwrap();
        store.insert_entry(entry("Aria", 5000, Utc::now())).await.unwrap();
        assert!(store.delete_character(1, "Aria").await.unwrap());

        store.insert_character(&character("aria", 99)).await.unwrap();
        let stats = store.character_stats(1, "aria").await.unwrap().unwrap();
        assert_eq!(stats.owner_id, 99);
        assert_eq!(stats.posts, 0);
        assert_eq!(stats.words, 0);

        let board = store.leaderboard(1, 10).await.unwrap();
        assert_eq!(board[0].words, 0);
        assert!(store.recent_entries(1, Some("aria"), 10).await.unwrap().is_empty());
        // Guild-wide history keeps the old posts.
        assert_eq!(store.recent_entries(1, None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_entries_newest_first() {
        let store = store().await;
        let now = Utc::now();
        for words in 1..=5 {
            store.insert_entry(entry("Aria", words, now)).await.unwrap();
        }
        store.insert_entry(entry("Bram", 9, now)).await.unwrap();

        let recent = store.recent_entries(1, Some("ARIA"), 3).await.unwrap();
        assert_eq!(recent.iter().map(|e| e.words).collect::<Vec<_>>(), vec![5, 4, 3]);
        assert_eq!(store.recent_entries(1, None, 10).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = store().await;
        assert_eq!(store.get_settings(1).await.unwrap(), RpSettings::new(1));

        let settings = RpSettings {
            guild_id: 1,
            sheet_id: Some("sheet".into()),
            doc_id: None,
            tracked_channels: vec![5, 6],
        };
        store.save_settings(&settings).await.unwrap();
        assert_eq!(store.get_settings(1).await.unwrap(), settings);
    }
}
