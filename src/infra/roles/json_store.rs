use crate::core::roles::{RoleConfig, RoleError, RoleStore};
use crate::infra::json_file::{GuildJsonFile, StoreError};
use async_trait::async_trait;
use std::path::PathBuf;

impl From<StoreError> for RoleError {
    fn from(e: StoreError) -> Self {
        RoleError::Storage(e.to_string())
    }
}

pub struct JsonRoleStore {
    file: GuildJsonFile<RoleConfig>,
}

impl JsonRoleStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            file: GuildJsonFile::open(path)?,
        })
    }
}

#[async_trait]
impl RoleStore for JsonRoleStore {
    async fn get_config(&self, guild_id: u64) -> Result<Option<RoleConfig>, RoleError> {
        Ok(self.file.get(guild_id).await)
    }

    async fn save_config(&self, config: RoleConfig) -> Result<(), RoleError> {
        Ok(self.file.insert(config.guild_id, config).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn role_lists_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.json");

        let store = JsonRoleStore::new(&path).unwrap();
        store
            .save_config(RoleConfig {
                guild_id: 3,
                self_assignable: vec![10, 11],
                join_roles: vec![12],
            })
            .await
            .unwrap();

        let store = JsonRoleStore::new(&path).unwrap();
        let config = store.get_config(3).await.unwrap().unwrap();
        assert_eq!(config.self_assignable, vec![10, 11]);
        assert_eq!(config.join_roles, vec![12]);
        assert!(store.get_config(4).await.unwrap().is_none());
    }
}
