use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEventKind {
    MemberJoin,
    MemberLeave,
    MessageDelete,
    MessageEdit,
    VoiceMove,
    RoleChange,
    NicknameChange,
}

impl LogEventKind {
    pub const ALL: [LogEventKind; 7] = [
        LogEventKind::MemberJoin,
        LogEventKind::MemberLeave,
        LogEventKind::MessageDelete,
        LogEventKind::MessageEdit,
        LogEventKind::VoiceMove,
        LogEventKind::RoleChange,
        LogEventKind::NicknameChange,
    ];

    /// Stable key used in storage and commands.
    pub fn key(&self) -> &'static str {
        match self {
            LogEventKind::MemberJoin => "member_join",
            LogEventKind::MemberLeave => "member_leave",
            LogEventKind::MessageDelete => "message_delete",
            LogEventKind::MessageEdit => "message_edit",
            LogEventKind::VoiceMove => "voice_move",
            LogEventKind::RoleChange => "role_change",
            LogEventKind::NicknameChange => "nickname_change",
        }
    }
}

impl fmt::Display for LogEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LogEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        LogEventKind::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted)
            .ok_or_else(|| format!("Unknown log event `{}`", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub guild_id: u64,
    pub enabled: bool,
    pub channel_id: Option<u64>,
    /// Everything not in here is logged.
    pub disabled_events: HashSet<LogEventKind>,
}

impl LogConfig {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            enabled: false,
            channel_id: None,
            disabled_events: HashSet::new(),
        }
    }

    pub fn is_event_enabled(&self, kind: LogEventKind) -> bool {
        !self.disabled_events.contains(&kind)
    }

    /// Channel to post `kind` to, if logging is on for it.
    pub fn target_channel(&self, kind: LogEventKind) -> Option<u64> {
        if self.enabled && self.is_event_enabled(kind) {
            self.channel_id
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Joined { channel_id: u64 },
    Left { channel_id: u64 },
    Moved { from: u64, to: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberChanges {
    pub added_roles: Vec<u64>,
    pub removed_roles: Vec<u64>,
    /// `(before, after)` when the nickname changed.
    pub nickname: Option<(Option<String>, Option<String>)>,
}

impl MemberChanges {
    pub fn roles_changed(&self) -> bool {
        !self.added_roles.is_empty() || !self.removed_roles.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum LogEvent {
    MemberJoined {
        guild_id: u64,
        user_id: u64,
        user_mention: String,
        avatar_url: Option<String>,
        created_at: DateTime<Utc>,
    },
    MemberLeft {
        guild_id: u64,
        user_id: u64,
        user_mention: String,
        avatar_url: Option<String>,
        joined_at: Option<DateTime<Utc>>,
    },
    MessageDeleted {
        guild_id: u64,
        author_id: u64,
        author_name: String,
        channel_id: u64,
        content: String,
        attachments: Vec<String>,
        avatar_url: Option<String>,
    },
    MessageEdited {
        guild_id: u64,
        author_id: u64,
        author_name: String,
        channel_id: u64,
        before_content: String,
        after_content: String,
        avatar_url: Option<String>,
    },
    Voice {
        guild_id: u64,
        user_id: u64,
        user_name: String,
        transition: VoiceTransition,
    },
    RolesChanged {
        guild_id: u64,
        user_id: u64,
        user_name: String,
        added: Vec<u64>,
        removed: Vec<u64>,
    },
    NicknameChanged {
        guild_id: u64,
        user_id: u64,
        user_name: String,
        before: Option<String>,
        after: Option<String>,
    },
}

impl LogEvent {
    pub fn kind(&self) -> LogEventKind {
        match self {
            LogEvent::MemberJoined { .. } => LogEventKind::MemberJoin,
            LogEvent::MemberLeft { .. } => LogEventKind::MemberLeave,
            LogEvent::MessageDeleted { .. } => LogEventKind::MessageDelete,
            LogEvent::MessageEdited { .. } => LogEventKind::MessageEdit,
            LogEvent::Voice { .. } => LogEventKind::VoiceMove,
            LogEvent::RolesChanged { .. } => LogEventKind::RoleChange,
            LogEvent::NicknameChanged { .. } => LogEventKind::NicknameChange,
        }
    }

    pub fn guild_id(&self) -> u64 {
        match self {
            LogEvent::MemberJoined { guild_id, .. }
            | LogEvent::MemberLeft { guild_id, .. }
            | LogEvent::MessageDeleted { guild_id, .. }
            | LogEvent::MessageEdited { guild_id, .. }
            | LogEvent::Voice { guild_id, .. }
            | LogEvent::RolesChanged { guild_id, .. }
            | LogEvent::NicknameChanged { guild_id, .. } => *guild_id,
        }
    }
}

/// Minimal snapshot of a message that we keep in-memory so
/// deletions/edits can be logged even if Serenity's cache
/// has already evicted the original message.
#[derive(Debug, Clone)]
pub struct TrackedMessage {
    pub message_id: u64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub content: String,
    pub attachments: Vec<String>,
    pub avatar_url: Option<String>,
}
