use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A roleplay character registered in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub guild_id: u64,
    pub owner_id: u64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One logged piece of roleplay (a post, or a manual session summary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpEntry {
    pub id: i64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub character: String,
    pub words: u32,
    pub summary: Option<String>,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRpEntry {
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub character: String,
    pub words: u32,
    pub summary: Option<String>,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterStats {
    pub character: String,
    pub owner_id: u64,
    pub posts: u64,
    pub words: u64,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpSettings {
    pub guild_id: u64,
    pub sheet_id: Option<String>,
    pub doc_id: Option<String>,
    pub tracked_channels: Vec<u64>,
}

impl RpSettings {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            ..Default::default()
        }
    }

    pub fn has_sync_target(&self) -> bool {
        self.sheet_id.is_some() || self.doc_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    Sheet,
    Doc,
}

impl std::fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTarget::Sheet => write!(f, "spreadsheet"),
            SyncTarget::Doc => write!(f, "document"),
        }
    }
}

/// What happened when pushing entries to the configured Google targets.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub pushed: Vec<SyncTarget>,
    pub failures: Vec<(SyncTarget, String)>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.pushed.is_empty() && self.failures.is_empty()
    }

    /// One line for the command reply, or `None` when nothing was attempted.
    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut parts: Vec<String> = self
            .pushed
            .iter()
            .map(|target| format!("✅ synced to {}", target))
            .collect();
        parts.extend(
            self.failures
                .iter()
                .map(|(target, err)| format!("⚠️ {} sync failed: {}", target, err)),
        );
        Some(parts.join("\n"))
    }
}

/// Count words the way a writer would: tokens that contain at least one
/// letter or digit. Stray punctuation and emoji markup don't count.
pub fn count_words(text: &str) -> u32 {
    text.split_whitespace()
        .filter(|token| !token.starts_with("<:") && !token.starts_with("<a:"))
        .filter(|token| token.chars().any(|c| c.is_alphanumeric()))
        .count() as u32
}

/// Pull the document ID out of a Google Sheets/Docs URL, or accept a bare ID.
/// `kind` is the path segment before `/d/`, e.g. `spreadsheets` or `document`.
pub fn extract_google_id(url_or_id: &str, kind: &str) -> Option<String> {
    let url_or_id = url_or_id.trim();
    if url_or_id.contains("docs.google.com") {
        let marker = format!("/{}/d/", kind);
        let start = url_or_id.find(&marker)? + marker.len();
        let after = &url_or_id[start..];
        let end = after.find(['/', '?', '#']).unwrap_or(after.len());
        let id = &after[..end];
        (!id.is_empty()).then(|| id.to_string())
    } else if !url_or_id.is_empty() && !url_or_id.contains('/') && !url_or_id.contains(' ') {
        Some(url_or_id.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_ignores_punctuation_and_emoji() {
        assert_eq!(count_words("She drew her sword - slowly."), 5);
        assert_eq!(count_words("  "), 0);
        assert_eq!(count_words("*nods* <:smile:1> ok"), 2);
    }

    #[test]
    fn extracts_ids_from_urls() {
        assert_eq!(
            extract_google_id(
                "https://docs.google.com/spreadsheets/d/abc123/edit#gid=0",
                "spreadsheets"
            ),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_google_id("https://docs.google.com/document/d/xyz/edit", "document"),
            Some("xyz".to_string())
        );
        assert_eq!(
            extract_google_id("https://docs.google.com/document/d/xyz/edit", "spreadsheets"),
            None
        );
        assert_eq!(extract_google_id("plainId", "document"), Some("plainId".to_string()));
        assert_eq!(extract_google_id("not an id", "document"), None);
    }

    #[test]
    fn sync_report_summary() {
        assert!(SyncReport::default().summary().is_none());

        let report = SyncReport {
            pushed: vec![SyncTarget::Sheet],
            failures: vec![(SyncTarget::Doc, "403".to_string())],
        };
        let summary = report.summary().unwrap();
        assert!(summary.contains("synced to spreadsheet"));
        assert!(summary.contains("document sync failed: 403"));
    }
}
