use super::logging_models::{
    LogConfig, LogEventKind, MemberChanges, TrackedMessage, VoiceTransition,
};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

// Cap how many messages we keep in memory for logging so we don't grow unbounded.
const MAX_TRACKED_MESSAGES: usize = 5_000;

#[async_trait]
pub trait LogConfigStore: Send + Sync {
    async fn get_config(&self, guild_id: u64) -> Result<Option<LogConfig>>;
    async fn save_config(&self, config: LogConfig) -> Result<()>;
}

pub struct LoggingService<S: LogConfigStore> {
    store: S,
    // Message ID -> Snapshot for logging edits/deletes even if Serenity's cache evicts them
    message_cache: DashMap<u64, TrackedMessage>,
    // Insertion order, oldest first
    message_order: Mutex<VecDeque<u64>>,
}

impl<S: LogConfigStore> LoggingService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            message_cache: DashMap::new(),
            message_order: Mutex::new(VecDeque::new()),
        }
    }

    /// Saved config, or a disabled default.
    pub async fn get_config(&self, guild_id: u64) -> Result<LogConfig> {
        Ok(self
            .store
            .get_config(guild_id)
            .await?
            .unwrap_or_else(|| LogConfig::new(guild_id)))
    }

    /// Where to send an event of this kind, or `None` when it shouldn't be logged.
    pub async fn target_channel(&self, guild_id: u64, kind: LogEventKind) -> Result<Option<u64>> {
        Ok(self.get_config(guild_id).await?.target_channel(kind))
    }

    /// Setting a channel also turns logging on.
    pub async fn set_log_channel(&self, guild_id: u64, channel_id: u64) -> Result<LogConfig> {
        let mut config = self.get_config(guild_id).await?;
        config.channel_id = Some(channel_id);
        config.enabled = true;
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    /// Returns false when enabling without a channel configured.
    pub async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<bool> {
        let mut config = self.get_config(guild_id).await?;
        if enabled && config.channel_id.is_none() {
            return Ok(false);
        }
        config.enabled = enabled;
        self.store.save_config(config).await?;
        Ok(true)
    }

    pub async fn set_event_enabled(&self, guild_id: u64, kind: LogEventKind, enabled: bool) -> Result<LogConfig> {
        let mut config = self.get_config(guild_id).await?;
        if enabled {
            config.disabled_events.remove(&kind);
        } else {
            config.disabled_events.insert(kind);
        }
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    /// Flip one event kind; returns whether it is now enabled.
    pub async fn toggle_event(&self, guild_id: u64, kind: LogEventKind) -> Result<bool> {
        let config = self.get_config(guild_id).await?;
        let now_enabled = !config.is_event_enabled(kind);
        self.set_event_enabled(guild_id, kind, now_enabled).await?;
        Ok(now_enabled)
    }

    /// Store a message snapshot so we can later log deletes/edits reliably.
    pub fn remember_message(&self, message: TrackedMessage) {
        let id = message.message_id;
        if self.message_cache.insert(id, message).is_some() {
            return;
        }

        let evicted = {
            let mut order = match self.message_order.lock() {
                Ok(order) => order,
                Err(poisoned) => poisoned.into_inner(),
            };
            order.push_back(id);
            let mut evicted = Vec::new();
            while order.len() > MAX_TRACKED_MESSAGES {
                if let Some(old) = order.pop_front() {
                    evicted.push(old);
                }
            }
            evicted
        };

        for old in evicted {
            self.message_cache.remove(&old);
        }
    }

    /// Get a tracked message without removing it (used for edits).
    pub fn get_tracked_message(&self, message_id: u64) -> Option<TrackedMessage> {
        self.message_cache.get(&message_id).map(|m| m.clone())
    }

    /// Replace the content of a tracked message after an edit, returning the old snapshot.
    pub fn update_tracked_content(&self, message_id: u64, content: String) -> Option<TrackedMessage> {
        let mut entry = self.message_cache.get_mut(&message_id)?;
        let before = entry.clone();
        entry.content = content;
        Some(before)
    }

    /// Remove a tracked message (used for deletions).
    pub fn take_tracked_message(&self, message_id: u64) -> Option<TrackedMessage> {
        self.message_cache.remove(&message_id).map(|(_, msg)| msg)
    }

    pub fn tracked_count(&self) -> usize {
        self.message_cache.len()
    }
}

/// Classify a voice state change. Mute/deafen updates keep the channel and yield `None`.
pub fn voice_transition(old_channel: Option<u64>, new_channel: Option<u64>) -> Option<VoiceTransition> {
    match (old_channel, new_channel) {
        (None, Some(channel_id)) => Some(VoiceTransition::Joined { channel_id }),
        (Some(channel_id), None) => Some(VoiceTransition::Left { channel_id }),
        (Some(from), Some(to)) if from != to => Some(VoiceTransition::Moved { from, to }),
        _ => None,
    }
}

/// Role and nickname differences between two member snapshots. Output role
/// lists keep the order they appear in `new_roles` / `old_roles`.
pub fn member_update_changes(
    old_roles: &[u64],
    new_roles: &[u64],
    old_nick: Option<&str>,
    new_nick: Option<&str>,
) -> MemberChanges {
    let old_set: HashSet<u64> = old_roles.iter().copied().collect();
    let new_set: HashSet<u64> = new_roles.iter().copied().collect();

    let added_roles = new_roles.iter().copied().filter(|r| !old_set.contains(r)).collect();
    let removed_roles = old_roles.iter().copied().filter(|r| !new_set.contains(r)).collect();

    let nickname = (old_nick != new_nick)
        .then(|| (old_nick.map(str::to_string), new_nick.map(str::to_string)));

    MemberChanges {
        added_roles,
        removed_roles,
        nickname,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct InMemoryLogStore {
        data: Mutex<HashMap<u64, LogConfig>>,
    }

    #[async_trait]
    impl LogConfigStore for InMemoryLogStore {
        async fn get_config(&self, guild_id: u64) -> Result<Option<LogConfig>> {
            Ok(self.data.lock().unwrap().get(&guild_id).cloned())
        }

        async fn save_config(&self, config: LogConfig) -> Result<()> {
            self.data.lock().unwrap().insert(config.guild_id, config);
            Ok(())
        }
    }

    fn tracked(id: u64) -> TrackedMessage {
        TrackedMessage {
            message_id: id,
            guild_id: 1,
            channel_id: 2,
            author_id: 3,
            author_name: "author".into(),
            content: format!("message {}", id),
            attachments: Vec::new(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn enabling_needs_a_channel() {
        let service = LoggingService::new(InMemoryLogStore::default());
        assert!(!service.set_enabled(1, true).await.unwrap());
        assert_eq!(service.target_channel(1, LogEventKind::MemberJoin).await.unwrap(), None);

        service.set_log_channel(1, 42).await.unwrap();
        assert_eq!(
            service.target_channel(1, LogEventKind::MemberJoin).await.unwrap(),
            Some(42)
        );

        assert!(service.set_enabled(1, false).await.unwrap());
        assert_eq!(service.target_channel(1, LogEventKind::MemberJoin).await.unwrap(), None);
    }

    #[tokio::test]
    async fn per_event_toggles() {
        let service = LoggingService::new(InMemoryLogStore::default());
        service.set_log_channel(1, 42).await.unwrap();

        assert!(!service.toggle_event(1, LogEventKind::VoiceMove).await.unwrap());
        assert_eq!(service.target_channel(1, LogEventKind::VoiceMove).await.unwrap(), None);
        assert_eq!(
            service.target_channel(1, LogEventKind::MessageEdit).await.unwrap(),
            Some(42)
        );

        assert!(service.toggle_event(1, LogEventKind::VoiceMove).await.unwrap());
        assert_eq!(
            service.target_channel(1, LogEventKind::VoiceMove).await.unwrap(),
            Some(42)
        );
    }

    #[test]
    fn event_kind_parsing() {
        assert_eq!("message_edit".parse::<LogEventKind>(), Ok(LogEventKind::MessageEdit));
        assert_eq!("Voice-Move".parse::<LogEventKind>(), Ok(LogEventKind::VoiceMove));
        assert!("bananas".parse::<LogEventKind>().is_err());
        for kind in LogEventKind::ALL {
            assert_eq!(kind.key().parse::<LogEventKind>(), Ok(kind));
        }
    }

    #[test]
    fn message_cache_evicts_oldest() {
        let service = LoggingService::new(InMemoryLogStore::default());
        for id in 0..(MAX_TRACKED_MESSAGES as u64 + 10) {
            service.remember_message(tracked(id));
        }
        assert_eq!(service.tracked_count(), MAX_TRACKED_MESSAGES);
        assert!(service.get_tracked_message(0).is_none());
        assert!(service.get_tracked_message(9).is_none());
        assert!(service.get_tracked_message(10).is_some());

        let before = service.update_tracked_content(10, "edited".into()).unwrap();
        assert_eq!(before.content, "message 10");
        assert_eq!(service.get_tracked_message(10).unwrap().content, "edited");

        assert!(service.take_tracked_message(10).is_some());
        assert!(service.take_tracked_message(10).is_none());
    }

    #[test]
    fn voice_transitions() {
        assert_eq!(voice_transition(None, Some(5)), Some(VoiceTransition::Joined { channel_id: 5 }));
        assert_eq!(voice_transition(Some(5), None), Some(VoiceTransition::Left { channel_id: 5 }));
        assert_eq!(
            voice_transition(Some(5), Some(6)),
            Some(VoiceTransition::Moved { from: 5, to: 6 })
        );
        assert_eq!(voice_transition(Some(5), Some(5)), None);
        assert_eq!(voice_transition(None, None), None);
    }

    #[test]
    fn member_changes() {
        let changes = member_update_changes(&[1, 2, 3], &[2, 3, 4, 5], Some("old"), Some("old"));
        assert_eq!(changes.added_roles, vec![4, 5]);
        assert_eq!(changes.removed_roles, vec![1]);
        assert!(changes.roles_changed());
        assert_eq!(changes.nickname, None);

        let changes = member_update_changes(&[1], &[1], None, Some("nick"));
        assert!(!changes.roles_changed());
        assert_eq!(changes.nickname, Some((None, Some("nick".to_string()))));
    }
}
