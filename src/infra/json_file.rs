// Guild-keyed JSON file backing the small per-cog stores.
//
// The whole map lives in memory behind an RwLock and is rewritten on every
// change: { guild_id: value }

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct GuildJsonFile<V> {
    path: PathBuf,
    cache: RwLock<HashMap<u64, V>>,
}

impl<V> GuildJsonFile<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// A missing file starts empty. A corrupt one is moved to `<name>.bak`
    /// before starting empty, so the next write can't clobber it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let map = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            match serde_json::from_reader(reader) {
                Ok(map) => map,
                Err(e) => {
                    let backup = with_suffix(&path, ".bak");
                    std::fs::rename(&path, &backup)?;
                    tracing::warn!(
                        "Unreadable {} moved to {}: {}",
                        path.display(),
                        backup.display(),
                        e
                    );
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            cache: RwLock::new(map),
        })
    }

    pub async fn get(&self, guild_id: u64) -> Option<V> {
        self.cache.read().await.get(&guild_id).cloned()
    }

    pub async fn values(&self) -> Vec<V> {
        self.cache.read().await.values().cloned().collect()
    }

    /// The cache only changes once the new map is on disk.
    pub async fn insert(&self, guild_id: u64, value: V) -> Result<(), StoreError> {
        // Hold the write lock while writing so concurrent saves can't interleave
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.insert(guild_id, value);
        Self::persist(&self.path, &next)?;
        *cache = next;
        Ok(())
    }

    fn persist(path: &Path, map: &HashMap<u64, V>) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = with_suffix(path, ".tmp");
        let file = File::create(&tmp)?;
        serde_json::to_writer_pretty(file, map)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let file: GuildJsonFile<Vec<String>> = GuildJsonFile::open(&path).unwrap();
        assert!(file.get(1).await.is_none());
        file.insert(1, vec!["a".into(), "b".into()]).await.unwrap();

        let reopened: GuildJsonFile<Vec<String>> = GuildJsonFile::open(&path).unwrap();
        assert_eq!(reopened.get(1).await, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(reopened.values().await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_set_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let file: GuildJsonFile<u32> = GuildJsonFile::open(&path).unwrap();
        assert!(file.values().await.is_empty());

        let backup = dir.path().join("store.json.bak");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{ not json");

        file.insert(1, 5).await.unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the parent directory should be makes every write fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let file: GuildJsonFile<u32> = GuildJsonFile::open(blocker.join("store.json")).unwrap();
        assert!(file.insert(1, 5).await.is_err());
        assert_eq!(file.get(1).await, None);
        assert!(file.values().await.is_empty());
    }
}
