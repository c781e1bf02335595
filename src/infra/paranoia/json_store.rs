use crate::core::paranoia::{ParanoiaError, QuestionStore};
use crate::infra::json_file::{GuildJsonFile, StoreError};
use async_trait::async_trait;
use std::path::PathBuf;

impl From<StoreError> for ParanoiaError {
    fn from(e: StoreError) -> Self {
        ParanoiaError::Store(e.to_string())
    }
}

/// Custom Paranoia questions: { guild_id: [question, ...] }
pub struct JsonQuestionStore {
    file: GuildJsonFile<Vec<String>>,
}

impl JsonQuestionStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            file: GuildJsonFile::open(path)?,
        })
    }
}

#[async_trait]
impl QuestionStore for JsonQuestionStore {
    async fn get_questions(&self, guild_id: u64) -> Result<Vec<String>, ParanoiaError> {
        Ok(self.file.get(guild_id).await.unwrap_or_default())
    }

    async fn save_questions(&self, guild_id: u64, questions: Vec<String>) -> Result<(), ParanoiaError> {
        Ok(self.file.insert(guild_id, questions).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn questions_persist_per_guild() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paranoia_questions.json");

        let store = JsonQuestionStore::new(&path).unwrap();
        store
            .save_questions(1, vec!["Who here would survive a zombie outbreak?".into()])
            .await
            .unwrap();

        let store = JsonQuestionStore::new(&path).unwrap();
        assert_eq!(store.get_questions(1).await.unwrap().len(), 1);
        assert!(store.get_questions(2).await.unwrap().is_empty());
    }
}
