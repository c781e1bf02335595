// RP tracking: characters, logged activity and optional Google sync.
//
// The store is the source of truth. Google Sheets/Docs are mirrors we push to
// after a successful write; if Google is down the entry is still kept.

use super::rp_models::{
    count_words, extract_google_id, Character, CharacterStats, NewRpEntry, RpEntry, RpSettings,
    SyncReport, SyncTarget,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

const MAX_NAME_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 1000;
const MAX_SUMMARY_LEN: usize = 1500;
const MAX_LIST_LIMIT: usize = 25;
const RESYNC_BATCH: usize = 100;

#[derive(Debug, Error)]
pub enum RpError {
    #[error("Character names must be 1-64 characters")]
    InvalidName,

    #[error("Text is too long (max {0} characters)")]
    TooLong(usize),

    #[error("A character named `{0}` already exists")]
    CharacterExists(String),

    #[error("No character named `{0}`")]
    CharacterNotFound(String),

    #[error("That character belongs to someone else")]
    NotOwner,

    #[error("`{0}` is not a valid Google document link or ID")]
    InvalidDocumentId(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Sync error: {0}")]
    Sync(String),
}

// ============================================================================
// PORTS
// ============================================================================

#[async_trait]
pub trait RpStore: Send + Sync {
    async fn insert_character(&self, character: &Character) -> Result<(), RpError>;
    /// Lookup is case-insensitive.
    async fn get_character(&self, guild_id: u64, name: &str) -> Result<Option<Character>, RpError>;
    /// Also clears the character from anyone's active slot.
    async fn delete_character(&self, guild_id: u64, name: &str) -> Result<bool, RpError>;
    async fn list_characters(
        &self,
        guild_id: u64,
        owner_id: Option<u64>,
    ) -> Result<Vec<Character>, RpError>;

    async fn set_active_character(
        &self,
        guild_id: u64,
        user_id: u64,
        name: Option<&str>,
    ) -> Result<(), RpError>;
    async fn get_active_character(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<String>, RpError>;

    async fn insert_entry(&self, entry: NewRpEntry) -> Result<RpEntry, RpError>;
    async fn character_stats(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<CharacterStats>, RpError>;
    async fn leaderboard(&self, guild_id: u64, limit: usize) -> Result<Vec<CharacterStats>, RpError>;
    /// Newest first.
    async fn recent_entries(
        &self,
        guild_id: u64,
        character: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RpEntry>, RpError>;

    async fn get_settings(&self, guild_id: u64) -> Result<RpSettings, RpError>;
    async fn save_settings(&self, settings: &RpSettings) -> Result<(), RpError>;
}

/// Pushes entries to external documents.
#[async_trait]
pub trait RpSync: Send + Sync {
    async fn append_to_sheet(&self, sheet_id: &str, entries: &[RpEntry]) -> Result<(), RpError>;
    async fn append_to_doc(&self, doc_id: &str, entries: &[RpEntry]) -> Result<(), RpError>;
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct RpService<S: RpStore> {
    store: S,
    sync: Option<Arc<dyn RpSync>>,
}

impl<S: RpStore> RpService<S> {
    pub fn new(store: S, sync: Option<Arc<dyn RpSync>>) -> Self {
        Self { store, sync }
    }

    pub fn sync_available(&self) -> bool {
        self.sync.is_some()
    }

    pub async fn register_character(
        &self,
        guild_id: u64,
        owner_id: u64,
        name: &str,
        description: Option<String>,
    ) -> Result<Character, RpError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(RpError::InvalidName);
        }
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(d) = &description {
            if d.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(RpError::TooLong(MAX_DESCRIPTION_LEN));
            }
        }

        if self.store.get_character(guild_id, name).await?.is_some() {
            return Err(RpError::CharacterExists(name.to_string()));
        }

        let character = Character {
            guild_id,
            owner_id,
            name: name.to_string(),
            description,
            created_at: Utc::now(),
        };
        self.store.insert_character(&character).await?;
        tracing::info!(guild_id, owner_id, name, "Registered RP character");
        Ok(character)
    }

    /// Owners can retire their own characters; admins can retire anyone's.
    pub async fn retire_character(
        &self,
        guild_id: u64,
        requester_id: u64,
        name: &str,
        is_admin: bool,
    ) -> Result<Character, RpError> {
        let character = self.require_character(guild_id, name).await?;
        if character.owner_id != requester_id && !is_admin {
            return Err(RpError::NotOwner);
        }

        self.store.delete_character(guild_id, &character.name).await?;
        Ok(character)
    }

    pub async fn list_characters(
        &self,
        guild_id: u64,
        owner_id: Option<u64>,
    ) -> Result<Vec<Character>, RpError> {
        self.store.list_characters(guild_id, owner_id).await
    }

    /// Pick which character your messages in tracked channels count for.
    /// `None` stops automatic tracking for this user.
    pub async fn set_active_character(
        &self,
        guild_id: u64,
        user_id: u64,
        name: Option<&str>,
    ) -> Result<Option<Character>, RpError> {
        let Some(name) = name else {
            self.store.set_active_character(guild_id, user_id, None).await?;
            return Ok(None);
        };

        let character = self.require_character(guild_id, name).await?;
        if character.owner_id != user_id {
            return Err(RpError::NotOwner);
        }

        self.store
            .set_active_character(guild_id, user_id, Some(&character.name))
            .await?;
        Ok(Some(character))
    }

    pub async fn active_character(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<String>, RpError> {
        self.store.get_active_character(guild_id, user_id).await
    }

    /// Manually log a scene or session for one of your characters.
    pub async fn log_entry(
        &self,
        guild_id: u64,
        channel_id: u64,
        author_id: u64,
        character: &str,
        summary: Option<String>,
        words: Option<u32>,
    ) -> Result<(RpEntry, SyncReport), RpError> {
        let character = self.require_character(guild_id, character).await?;
        if character.owner_id != author_id {
            return Err(RpError::NotOwner);
        }

        let summary = summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(s) = &summary {
            if s.chars().count() > MAX_SUMMARY_LEN {
                return Err(RpError::TooLong(MAX_SUMMARY_LEN));
            }
        }
        let words = words.unwrap_or_else(|| summary.as_deref().map(count_words).unwrap_or(0));

        let entry = self
            .store
            .insert_entry(NewRpEntry {
                guild_id,
                channel_id,
                author_id,
                character: character.name,
                words,
                summary,
                logged_at: Utc::now(),
            })
            .await?;

        let settings = self.store.get_settings(guild_id).await?;
        let report = self.push(&settings, std::slice::from_ref(&entry), true).await;
        Ok((entry, report))
    }

    /// Automatic tracking: a message in a tracked channel from someone with an
    /// active character counts as a post. Returns `None` when it doesn't count.
    pub async fn record_message(
        &self,
        guild_id: u64,
        channel_id: u64,
        author_id: u64,
        content: &str,
    ) -> Result<Option<RpEntry>, RpError> {
        let settings = self.store.get_settings(guild_id).await?;
        if !settings.tracked_channels.contains(&channel_id) {
            return Ok(None);
        }

        let Some(active) = self.store.get_active_character(guild_id, author_id).await? else {
            return Ok(None);
        };

        let words = count_words(content);
        if words == 0 {
            return Ok(None);
        }

        let entry = self
            .store
            .insert_entry(NewRpEntry {
                guild_id,
                channel_id,
                author_id,
                character: active,
                words,
                summary: None,
                logged_at: Utc::now(),
            })
            .await?;

        // Docs get only manual summaries; per-post lines would flood them.
        self.push(&settings, std::slice::from_ref(&entry), false).await;
        Ok(Some(entry))
    }

    pub async fn character_stats(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<CharacterStats, RpError> {
        self.store
            .character_stats(guild_id, name)
            .await?
            .ok_or_else(|| RpError::CharacterNotFound(name.to_string()))
    }

    pub async fn leaderboard(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<CharacterStats>, RpError> {
        self.store
            .leaderboard(guild_id, limit.clamp(1, MAX_LIST_LIMIT))
            .await
    }

    pub async fn recent_entries(
        &self,
        guild_id: u64,
        character: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RpEntry>, RpError> {
        self.store
            .recent_entries(guild_id, character, limit.clamp(1, MAX_LIST_LIMIT))
            .await
    }

    pub async fn settings(&self, guild_id: u64) -> Result<RpSettings, RpError> {
        self.store.get_settings(guild_id).await
    }

    /// Returns `false` when the channel was already tracked.
    pub async fn track_channel(&self, guild_id: u64, channel_id: u64) -> Result<bool, RpError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        if settings.tracked_channels.contains(&channel_id) {
            return Ok(false);
        }
        settings.tracked_channels.push(channel_id);
        self.store.save_settings(&settings).await?;
        Ok(true)
    }

    /// Returns `false` when the channel wasn't tracked.
    pub async fn untrack_channel(&self, guild_id: u64, channel_id: u64) -> Result<bool, RpError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        let before = settings.tracked_channels.len();
        settings.tracked_channels.retain(|id| *id != channel_id);
        if settings.tracked_channels.len() == before {
            return Ok(false);
        }
        self.store.save_settings(&settings).await?;
        Ok(true)
    }

    /// Configure sync targets. Empty strings clear a target.
    pub async fn set_sync_targets(
        &self,
        guild_id: u64,
        sheet: Option<&str>,
        doc: Option<&str>,
    ) -> Result<RpSettings, RpError> {
        let mut settings = self.store.get_settings(guild_id).await?;

        if let Some(sheet) = sheet {
            settings.sheet_id = parse_target(sheet, "spreadsheets")?;
        }
        if let Some(doc) = doc {
            settings.doc_id = parse_target(doc, "document")?;
        }

        self.store.save_settings(&settings).await?;
        Ok(settings)
    }

    /// Push the latest entries to the spreadsheet again, oldest first.
    pub async fn resync_sheet(&self, guild_id: u64) -> Result<(usize, SyncReport), RpError> {
        let settings = self.store.get_settings(guild_id).await?;
        let mut entries = self
            .store
            .recent_entries(guild_id, None, RESYNC_BATCH)
            .await?;
        entries.reverse();

        let sheet_only = RpSettings {
            doc_id: None,
            ..settings
        };
        let report = self.push(&sheet_only, &entries, false).await;
        Ok((entries.len(), report))
    }

    async fn require_character(&self, guild_id: u64, name: &str) -> Result<Character, RpError> {
        self.store
            .get_character(guild_id, name.trim())
            .await?
            .ok_or_else(|| RpError::CharacterNotFound(name.trim().to_string()))
    }

    async fn push(&self, settings: &RpSettings, entries: &[RpEntry], include_doc: bool) -> SyncReport {
        let mut report = SyncReport::default();
        let Some(sync) = &self.sync else {
            return report;
        };
        if entries.is_empty() {
            return report;
        }

        if let Some(sheet_id) = &settings.sheet_id {
            match sync.append_to_sheet(sheet_id, entries).await {
                Ok(()) => report.pushed.push(SyncTarget::Sheet),
                Err(e) => {
                    tracing::warn!(guild_id = settings.guild_id, "Sheet sync failed: {}", e);
                    report.failures.push((SyncTarget::Sheet, e.to_string()));
                }
            }
        }

        if include_doc {
            if let Some(doc_id) = &settings.doc_id {
                match sync.append_to_doc(doc_id, entries).await {
                    Ok(()) => report.pushed.push(SyncTarget::Doc),
                    Err(e) => {
                        tracing::warn!(guild_id = settings.guild_id, "Doc sync failed: {}", e);
                        report.failures.push((SyncTarget::Doc, e.to_string()));
                    }
                }
            }
        }

        report
    }
}

fn parse_target(raw: &str, kind: &str) -> Result<Option<String>, RpError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    extract_google_id(raw, kind)
        .map(Some)
        .ok_or_else(|| RpError::InvalidDocumentId(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryRpStore {
        characters: Mutex<Vec<Character>>,
        active: Mutex<HashMap<(u64, u64), String>>,
        entries: Mutex<Vec<RpEntry>>,
        settings: Mutex<HashMap<u64, RpSettings>>,
    }

    #[async_trait]
    impl RpStore for InMemoryRpStore {
        async fn insert_character(&self, character: &Character) -> Result<(), RpError> {
            self.characters.lock().unwrap().push(character.clone());
            Ok(())
        }

        async fn get_character(&self, guild_id: u64, name: &str) -> Result<Option<Character>, RpError> {
            Ok(self
                .characters
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.guild_id == guild_id && c.name.eq_ignore_ascii_case(name))
                .cloned())
        }

        async fn delete_character(&self, guild_id: u64, name: &str) -> Result<bool, RpError> {
            let mut characters = self.characters.lock().unwrap();
            let before = characters.len();
            characters.retain(|c| !(c.guild_id == guild_id && c.name.eq_ignore_ascii_case(name)));
            self.active
                .lock()
                .unwrap()
                .retain(|(g, _), active| !(*g == guild_id && active.eq_ignore_ascii_case(name)));
            Ok(characters.len() != before)
        }

        async fn list_characters(&self, guild_id: u64, owner_id: Option<u64>) -> Result<Vec<Character>, RpError> {
            Ok(self
                .characters
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.guild_id == guild_id && owner_id.map_or(true, |o| c.owner_id == o))
                .cloned()
                .collect())
        }

        async fn set_active_character(&self, guild_id: u64, user_id: u64, name: Option<&str>) -> Result<(), RpError> {
            let mut active = self.active.lock().unwrap();
            match name {
                Some(name) => {
                    active.insert((guild_id, user_id), name.to_string());
                }
                None => {
                    active.remove(&(guild_id, user_id));
                }
            }
            Ok(())
        }

        async fn get_active_character(&self, guild_id: u64, user_id: u64) -> Result<Option<String>, RpError> {
            Ok(self.active.lock().unwrap().get(&(guild_id, user_id)).cloned())
        }

        async fn insert_entry(&self, entry: NewRpEntry) -> Result<RpEntry, RpError> {
            let mut entries = self.entries.lock().unwrap();
            let stored = RpEntry {
                id: entries.len() as i64 + 1,
                guild_id: entry.guild_id,
                channel_id: entry.channel_id,
                author_id: entry.author_id,
                character: entry.character,
                words: entry.words,
                summary: entry.summary,
                logged_at: entry.logged_at,
            };
            entries.push(stored.clone());
            Ok(stored)
        }

        async fn character_stats(&self, guild_id: u64, name: &str) -> Result<Option<CharacterStats>, RpError> {
            let Some(character) = self.get_character(guild_id, name).await? else {
                return Ok(None);
            };
            let entries = self.entries.lock().unwrap();
            let mine: Vec<&RpEntry> = entries
                .iter()
                .filter(|e| e.guild_id == guild_id && e.character == character.name)
                .collect();
            Ok(Some(CharacterStats {
                character: character.name.clone(),
                owner_id: character.owner_id,
                posts: mine.len() as u64,
                words: mine.iter().map(|e| e.words as u64).sum(),
                last_active: mine.iter().map(|e| e.logged_at).max(),
            }))
        }

        async fn leaderboard(&self, guild_id: u64, limit: usize) -> Result<Vec<CharacterStats>, RpError> {
            let names: Vec<String> = self
                .list_characters(guild_id, None)
                .await?
                .into_iter()
                .map(|c| c.name)
                .collect();
            let mut stats = Vec::new();
            for name in names {
                if let Some(s) = self.character_stats(guild_id, &name).await? {
                    stats.push(s);
                }
            }
            stats.sort_by(|a, b| b.words.cmp(&a.words));
            stats.truncate(limit);
            Ok(stats)
        }

        async fn recent_entries(&self, guild_id: u64, character: Option<&str>, limit: usize) -> Result<Vec<RpEntry>, RpError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|e| e.guild_id == guild_id)
                .filter(|e| character.map_or(true, |c| e.character.eq_ignore_ascii_case(c)))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn get_settings(&self, guild_id: u64) -> Result<RpSettings, RpError> {
            Ok(self
                .settings
                .lock()
                .unwrap()
                .get(&guild_id)
                .cloned()
                .unwrap_or_else(|| RpSettings::new(guild_id)))
        }

        async fn save_settings(&self, settings: &RpSettings) -> Result<(), RpError> {
            self.settings
                .lock()
                .unwrap()
                .insert(settings.guild_id, settings.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSync {
        fail_docs: AtomicBool,
        sheet_rows: Mutex<Vec<i64>>,
        doc_rows: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl RpSync for RecordingSync {
        async fn append_to_sheet(&self, _: &str, entries: &[RpEntry]) -> Result<(), RpError> {
            self.sheet_rows
                .lock()
                .unwrap()
                .extend(entries.iter().map(|e| e.id));
            Ok(())
        }

        async fn append_to_doc(&self, _: &str, entries: &[RpEntry]) -> Result<(), RpError> {
            if self.fail_docs.load(Ordering::SeqCst) {
                return Err(RpError::Sync("403 Forbidden".to_string()));
            }
            self.doc_rows
                .lock()
                .unwrap()
                .extend(entries.iter().map(|e| e.id));
            Ok(())
        }
    }

    const GUILD: u64 = 1;
    const ALICE: u64 = 10;
    const BOB: u64 = 20;

    fn service_with_sync() -> (RpService<InMemoryRpStore>, Arc<RecordingSync>) {
        let sync = Arc::new(RecordingSync::default());
        let service = RpService::new(InMemoryRpStore::default(), Some(sync.clone() as Arc<dyn RpSync>));
        (service, sync)
    }

    #[tokio::test]
    async fn character_names_are_unique_per_guild() {
        let service = RpService::new(InMemoryRpStore::default(), None);
        service
            .register_character(GUILD, ALICE, "Aria", None)
            .await
            .unwrap();

        let err = service
            .register_character(GUILD, BOB, "aria", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RpError::CharacterExists(_)));

        // Same name is fine in another guild.
        service
            .register_character(2, BOB, "Aria", None)
            .await
            .unwrap();

        assert!(matches!(
            service.register_character(GUILD, ALICE, "   ", None).await,
            Err(RpError::InvalidName)
        ));
    }

    #[tokio::test]
    async fn only_owner_or_admin_can_retire() {
        let service = RpService::new(InMemoryRpStore::default(), None);
        service
            .register_character(GUILD, ALICE, "Aria", None)
            .await
            .unwrap();

        assert!(matches!(
            service.retire_character(GUILD, BOB, "Aria", false).await,
            Err(RpError::NotOwner)
        ));
        let retired = service
            .retire_character(GUILD, BOB, "aria", true)
            .await
            .unwrap();
        assert_eq!(retired.name, "Aria");
        assert!(service.list_characters(GUILD, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_log_counts_words_and_syncs() {
        let (service, sync) = service_with_sync();
        service
            .register_character(GUILD, ALICE, "Aria", None)
            .await
            .unwrap();
        service
            .set_sync_targets(
                GUILD,
                Some("https://docs.google.com/spreadsheets/d/sheet1/edit"),
                Some("doc1"),
            )
            .await
            .unwrap();

        let (entry, report) = service
            .log_entry(GUILD, 5, ALICE, "aria", Some("Aria met the dragon.".into()), None)
            .await
            .unwrap();
        assert_eq!(entry.character, "Aria");
        assert_eq!(entry.words, 4);
        assert_eq!(report.pushed, vec![SyncTarget::Sheet, SyncTarget::Doc]);
        assert_eq!(*sync.sheet_rows.lock().unwrap(), vec![entry.id]);

        assert!(matches!(
            service.log_entry(GUILD, 5, BOB, "Aria", None, Some(10)).await,
            Err(RpError::NotOwner)
        ));
    }

    #[tokio::test]
    async fn sync_failure_keeps_the_entry() {
        let (service, sync) = service_with_sync();
        sync.fail_docs.store(true, Ordering::SeqCst);
        service
            .register_character(GUILD, ALICE, "Aria", None)
            .await
            .unwrap();
        service
            .set_sync_targets(GUILD, None, Some("doc1"))
            .await
            .unwrap();

        let (entry, report) = service
            .log_entry(GUILD, 5, ALICE, "Aria", None, Some(250))
            .await
            .unwrap();
        assert_eq!(entry.words, 250);
        assert!(report.pushed.is_empty());
        assert_eq!(report.failures.len(), 1);

        let stats = service.character_stats(GUILD, "Aria").await.unwrap();
        assert_eq!(stats.posts, 1);
        assert_eq!(stats.words, 250);
    }

    #[tokio::test]
    async fn automatic_tracking_needs_channel_and_active_character() {
        let service = RpService::new(InMemoryRpStore::default(), None);
        service
            .register_character(GUILD, ALICE, "Aria", None)
            .await
            .unwrap();

        // Untracked channel
        assert!(service
            .record_message(GUILD, 7, ALICE, "hello there")
            .await
            .unwrap()
            .is_none());

        assert!(service.track_channel(GUILD, 7).await.unwrap());
        assert!(!service.track_channel(GUILD, 7).await.unwrap());

        // No active character yet
        assert!(service
            .record_message(GUILD, 7, ALICE, "hello there")
            .await
            .unwrap()
            .is_none());

        assert!(matches!(
            service.set_active_character(GUILD, BOB, Some("Aria")).await,
            Err(RpError::NotOwner)
        ));
        service
            .set_active_character(GUILD, ALICE, Some("aria"))
            .await
            .unwrap();

        let entry = service
            .record_message(GUILD, 7, ALICE, "Aria draws her blade.")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.words, 4);

        // Punctuation-only messages don't count
        assert!(service
            .record_message(GUILD, 7, ALICE, "...")
            .await
            .unwrap()
            .is_none());

        assert!(service.untrack_channel(GUILD, 7).await.unwrap());
        assert!(!service.untrack_channel(GUILD, 7).await.unwrap());
    }

    #[tokio::test]
    async fn leaderboard_orders_by_words() {
        let service = RpService::new(InMemoryRpStore::default(), None);
        service.register_character(GUILD, ALICE, "Aria", None).await.unwrap();
        service.register_character(GUILD, BOB, "Bram", None).await.unwrap();

        service.log_entry(GUILD, 1, ALICE, "Aria", None, Some(100)).await.unwrap();
        service.log_entry(GUILD, 1, BOB, "Bram", None, Some(300)).await.unwrap();

        let board = service.leaderboard(GUILD, 10).await.unwrap();
        let names: Vec<&str> = board.iter().map(|s| s.character.as_str()).collect();
        assert_eq!(names, vec!["Bram", "Aria"]);

        let recent = service.recent_entries(GUILD, Some("aria"), 5).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn invalid_sync_target_is_rejected() {
        let service = RpService::new(InMemoryRpStore::default(), None);
        assert!(matches!(
            service.set_sync_targets(GUILD, Some("https://example.com/x y"), None).await,
            Err(RpError::InvalidDocumentId(_))
        ));

        let settings = service
            .set_sync_targets(GUILD, Some("abc"), None)
            .await
            .unwrap();
        assert_eq!(settings.sheet_id.as_deref(), Some("abc"));

        let settings = service.set_sync_targets(GUILD, Some(""), None).await.unwrap();
        assert_eq!(settings.sheet_id, None);
    }

    #[tokio::test]
    async fn resync_pushes_oldest_first_to_sheet_only() {
        let (service, sync) = service_with_sync();
        service.register_character(GUILD, ALICE, "Aria", None).await.unwrap();
        service.log_entry(GUILD, 1, ALICE, "Aria", None, Some(1)).await.unwrap();
        service.log_entry(GUILD, 1, ALICE, "Aria", None, Some(2)).await.unwrap();
        service
            .set_sync_targets(GUILD, Some("sheet"), Some("doc"))
            .await
            .unwrap();

        let (count, report) = service.resync_sheet(GUILD).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(report.pushed, vec![SyncTarget::Sheet]);
        assert_eq!(*sync.sheet_rows.lock().unwrap(), vec![1, 2]);
        assert!(sync.doc_rows.lock().unwrap().is_empty());
    }
}
