// Self-assignable roles and roles handed out on join.
//
// The command layer resolves roles and the invoking member from Discord and
// hands the service plain `RoleInfo` / `Invoker` values to judge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub guild_id: u64,
    #[serde(default)]
    pub self_assignable: Vec<u64>,
    #[serde(default)]
    pub join_roles: Vec<u64>,
}

impl RoleConfig {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            ..Default::default()
        }
    }
}

/// What the command layer knows about a role before asking the service.
#[derive(Debug, Clone, Copy)]
pub struct RoleInfo {
    pub id: u64,
    pub guild_id: u64,
    /// Owned by an integration or bot; Discord refuses to assign these.
    pub managed: bool,
    pub position: u16,
    /// Carries Administrator, Manage Server or Manage Roles.
    pub elevated: bool,
}

/// The member running an admin command.
#[derive(Debug, Clone, Copy)]
pub struct Invoker {
    pub is_owner: bool,
    /// Position of the member's highest role; 0 with none.
    pub top_position: u16,
}

impl Invoker {
    pub fn outranks(&self, role: &RoleInfo) -> bool {
        self.is_owner || role.position < self.top_position
    }
}

impl RoleInfo {
    pub fn is_everyone(&self) -> bool {
        self.id == self.guild_id
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("@everyone can't be assigned")]
    Everyone,

    #[error("That role is managed by an integration and can't be assigned")]
    Managed,

    #[error("That role sits at or above your highest role")]
    AboveInvoker,

    #[error("Roles with Administrator, Manage Server or Manage Roles can't be handed out automatically")]
    Elevated,

    #[error("That role isn't self-assignable here")]
    NotSelfAssignable,

    #[error("That role is already on the list")]
    AlreadyListed,

    #[error("That role isn't on the list")]
    NotListed,

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get_config(&self, guild_id: u64) -> Result<Option<RoleConfig>, RoleError>;
    async fn save_config(&self, config: RoleConfig) -> Result<(), RoleError>;
}

pub struct RoleService<S: RoleStore> {
    store: S,
}

fn check_assignable(role: &RoleInfo) -> Result<(), RoleError> {
    if role.is_everyone() {
        return Err(RoleError::Everyone);
    }
    if role.managed {
        return Err(RoleError::Managed);
    }
    Ok(())
}

/// Roles that end up on a list anyone can trigger.
fn check_listable(role: &RoleInfo, invoker: &Invoker) -> Result<(), RoleError> {
    check_assignable(role)?;
    if role.elevated {
        return Err(RoleError::Elevated);
    }
    if !invoker.outranks(role) {
        return Err(RoleError::AboveInvoker);
    }
    Ok(())
}

impl<S: RoleStore> RoleService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn config(&self, guild_id: u64) -> Result<RoleConfig, RoleError> {
        Ok(self
            .store
            .get_config(guild_id)
            .await?
            .unwrap_or_else(|| RoleConfig::new(guild_id)))
    }

    pub async fn self_assignable(&self, guild_id: u64) -> Result<Vec<u64>, RoleError> {
        Ok(self.config(guild_id).await?.self_assignable)
    }

    pub async fn join_roles(&self, guild_id: u64) -> Result<Vec<u64>, RoleError> {
        Ok(self.config(guild_id).await?.join_roles)
    }

    /// Validates a user's `/role give` or `/role drop` request.
    pub async fn check_self_assign(&self, role: &RoleInfo) -> Result<(), RoleError> {
        check_assignable(role)?;
        // Permissions may have been added after the role was listed.
        if role.elevated {
            return Err(RoleError::Elevated);
        }
        let config = self.config(role.guild_id).await?;
        if !config.self_assignable.contains(&role.id) {
            return Err(RoleError::NotSelfAssignable);
        }
        Ok(())
    }

    /// Validates an admin grant/revoke: the role must sit below the invoker's
    /// highest role unless they own the guild.
    pub fn check_admin_assign(&self, role: &RoleInfo, invoker: &Invoker) -> Result<(), RoleError> {
        check_assignable(role)?;
        if !invoker.outranks(role) {
            return Err(RoleError::AboveInvoker);
        }
        Ok(())
    }

    pub async fn allow(&self, role: &RoleInfo, invoker: &Invoker) -> Result<(), RoleError> {
        check_listable(role, invoker)?;
        self.update(role.guild_id, |config| add_unique(&mut config.self_assignable, role.id))
            .await
    }

    pub async fn disallow(&self, guild_id: u64, role_id: u64) -> Result<(), RoleError> {
        self.update(guild_id, |config| remove_listed(&mut config.self_assignable, role_id))
            .await
    }

    pub async fn add_join_role(&self, role: &RoleInfo, invoker: &Invoker) -> Result<(), RoleError> {
        check_listable(role, invoker)?;
        self.update(role.guild_id, |config| add_unique(&mut config.join_roles, role.id))
            .await
    }

    pub async fn remove_join_role(&self, guild_id: u64, role_id: u64) -> Result<(), RoleError> {
        self.update(guild_id, |config| remove_listed(&mut config.join_roles, role_id))
            .await
    }

    /// Drop a role that no longer exists from both lists.
    pub async fn forget_role(&self, guild_id: u64, role_id: u64) -> Result<(), RoleError> {
        self.update(guild_id, |config| {
            config.self_assignable.retain(|id| *id != role_id);
            config.join_roles.retain(|id| *id != role_id);
            Ok(())
        })
        .await
    }

    async fn update<F>(&self, guild_id: u64, change: F) -> Result<(), RoleError>
    where
        F: FnOnce(&mut RoleConfig) -> Result<(), RoleError> + Send,
    {
        let mut config = self.config(guild_id).await?;
        change(&mut config)?;
        self.store.save_config(config).await
    }
}

fn add_unique(list: &mut Vec<u64>, role_id: u64) -> Result<(), RoleError> {
    if list.contains(&role_id) {
        return Err(RoleError::AlreadyListed);
    }
    list.push(role_id);
    Ok(())
}

fn remove_listed(list: &mut Vec<u64>, role_id: u64) -> Result<(), RoleError> {
    let before = list.len();
    list.retain(|id| *id != role_id);
    if list.len() == before {
        return Err(RoleError::NotListed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryRoleStore {
        data: Mutex<HashMap<u64, RoleConfig>>,
    }

    #[async_trait]
    impl RoleStore for InMemoryRoleStore {
        async fn get_config(&self, guild_id: u64) -> Result<Option<RoleConfig>, RoleError> {
            Ok(self.data.lock().unwrap().get(&guild_id).cloned())
        }

        async fn save_config(&self, config: RoleConfig) -> Result<(), RoleError> {
            self.data.lock().unwrap().insert(config.guild_id, config);
            Ok(())
        }
    }

    fn role(id: u64) -> RoleInfo {
        RoleInfo {
            id,
            guild_id: 1,
            managed: false,
            position: 1,
            elevated: false,
        }
    }

    const MOD: Invoker = Invoker {
        is_owner: false,
        top_position: 5,
    };

    #[tokio::test]
    async fn self_assign_requires_allow_list() {
        let service = RoleService::new(InMemoryRoleStore::default());
        assert_eq!(
            service.check_self_assign(&role(10)).await.unwrap_err(),
            RoleError::NotSelfAssignable
        );

        service.allow(&role(10), &MOD).await.unwrap();
        service.check_self_assign(&role(10)).await.unwrap();
        assert_eq!(service.allow(&role(10), &MOD).await.unwrap_err(), RoleError::AlreadyListed);

        service.disallow(1, 10).await.unwrap();
        assert_eq!(service.disallow(1, 10).await.unwrap_err(), RoleError::NotListed);
        assert!(service.self_assignable(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_everyone_and_managed() {
        let service = RoleService::new(InMemoryRoleStore::default());
        assert_eq!(service.allow(&role(1), &MOD).await.unwrap_err(), RoleError::Everyone);

        let managed = RoleInfo {
            managed: true,
            ..role(20)
        };
        assert_eq!(service.add_join_role(&managed, &MOD).await.unwrap_err(), RoleError::Managed);
        assert_eq!(service.check_admin_assign(&managed, &MOD).unwrap_err(), RoleError::Managed);
        service.check_admin_assign(&role(21), &MOD).unwrap();
    }

    #[tokio::test]
    async fn join_roles_and_forget() {
        let service = RoleService::new(InMemoryRoleStore::default());
        service.add_join_role(&role(10), &MOD).await.unwrap();
        service.add_join_role(&role(11), &MOD).await.unwrap();
        service.allow(&role(10), &MOD).await.unwrap();
        assert_eq!(service.join_roles(1).await.unwrap(), vec![10, 11]);

        service.forget_role(1, 10).await.unwrap();
        assert_eq!(service.join_roles(1).await.unwrap(), vec![11]);
        assert!(service.self_assignable(1).await.unwrap().is_empty());

        service.remove_join_role(1, 11).await.unwrap();
        assert!(service.join_roles(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cannot_hand_out_roles_at_or_above_own_rank() {
        let service = RoleService::new(InMemoryRoleStore::default());
        let admin = RoleInfo {
            position: 8,
            ..role(30)
        };
        let peer = RoleInfo {
            position: 5,
            ..role(31)
        };

        assert_eq!(service.check_admin_assign(&admin, &MOD).unwrap_err(), RoleError::AboveInvoker);
        assert_eq!(service.check_admin_assign(&peer, &MOD).unwrap_err(), RoleError::AboveInvoker);
        assert_eq!(service.allow(&admin, &MOD).await.unwrap_err(), RoleError::AboveInvoker);
        assert_eq!(service.add_join_role(&peer, &MOD).await.unwrap_err(), RoleError::AboveInvoker);

        let owner = Invoker {
            is_owner: true,
            top_position: 0,
        };
        service.check_admin_assign(&admin, &owner).unwrap();
    }

    #[tokio::test]
    async fn elevated_roles_never_listed() {
        let service = RoleService::new(InMemoryRoleStore::default());
        let owner = Invoker {
            is_owner: true,
            top_position: 0,
        };
        let staff = RoleInfo {
            elevated: true,
            ..role(40)
        };

        assert_eq!(service.allow(&staff, &owner).await.unwrap_err(), RoleError::Elevated);
        assert_eq!(service.add_join_role(&staff, &owner).await.unwrap_err(), RoleError::Elevated);
        // Direct grants stay possible for whoever outranks the role.
        service.check_admin_assign(&staff, &owner).unwrap();

        // A listed role that later gains Administrator stops being self-assignable.
        service.allow(&role(41), &owner).await.unwrap();
        let promoted = RoleInfo {
            elevated: true,
            ..role(41)
        };
        assert_eq!(service.check_self_assign(&promoted).await.unwrap_err(), RoleError::Elevated);
    }
}
