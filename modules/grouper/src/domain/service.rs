use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::contract::model::{
    Group, GroupId, GroupPatch, NewGroup, NewUser, User, UserId, UserPatch,
};
use crate::domain::error::DomainError;
use crate::domain::repo::DirectoryRepository;
use crate::domain::validation::Rules;

/// Domain service with the business rules of the membership directory.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn DirectoryRepository>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_name_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_name_length: 100,
        }
    }
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(repo: Arc<dyn DirectoryRepository>, config: ServiceConfig) -> Self {
        Self { repo, config }
    }

    fn rules(&self) -> Rules {
        Rules {
            max_name_length: self.config.max_name_length,
        }
    }

    // --- users ---

    #[instrument(name = "grouper.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Vec<User> {
        let users = self.repo.list_users().await;
        debug!("Listed {} users", users.len());
        users
    }

    #[instrument(name = "grouper.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        debug!("Getting user by id");
        self.repo
            .find_user(id)
            .await
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(
        name = "grouper.service.create_user",
        skip(self, new_user),
        fields(name = %new_user.name, groups = new_user.groups.len())
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");
        self.rules().validate_new_user(&new_user)?;

        let user = self.repo.insert_user(new_user).await?;
        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "grouper.service.update_user", skip(self, patch), fields(user_id = %id))]
    pub async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, DomainError> {
        info!("Updating user");
        // Unknown ids report NotFound ahead of any validation failure.
        self.get_user(id).await?;
        self.rules().validate_user_patch(&patch)?;

        let user = self.repo.update_user(id, patch).await?;
        info!("Successfully updated user");
        Ok(user)
    }

    #[instrument(name = "grouper.service.delete_user", skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), DomainError> {
        info!("Deleting user");
        if !self.repo.delete_user(id).await {
            return Err(DomainError::user_not_found(id));
        }
        info!("Successfully deleted user");
        Ok(())
    }

    // --- groups ---

    #[instrument(name = "grouper.service.list_groups", skip(self))]
    pub async fn list_groups(&self) -> Vec<Group> {
        let groups = self.repo.list_groups().await;
        debug!("Listed {} groups", groups.len());
        groups
    }

    #[instrument(name = "grouper.service.get_group", skip(self), fields(group_id = %id))]
    pub async fn get_group(&self, id: GroupId) -> Result<Group, DomainError> {
        debug!("Getting group by id");
        self.repo
            .find_group(id)
            .await
            .ok_or_else(|| DomainError::group_not_found(id))
    }

    #[instrument(
        name = "grouper.service.create_group",
        skip(self, new_group),
        fields(name = %new_group.name, users = new_group.users.len())
    )]
    pub async fn create_group(&self, new_group: NewGroup) -> Result<Group, DomainError> {
        info!("Creating new group");
        self.rules().validate_new_group(&new_group)?;

        let group = self.repo.insert_group(new_group).await?;
        info!("Successfully created group with id={}", group.id);
        Ok(group)
    }

    #[instrument(name = "grouper.service.update_group", skip(self, patch), fields(group_id = %id))]
    pub async fn update_group(
        &self,
        id: GroupId,
        patch: GroupPatch,
    ) -> Result<Group, DomainError> {
        info!("Updating group");
        self.get_group(id).await?;
        self.rules().validate_group_patch(&patch)?;

        let group = self.repo.update_group(id, patch).await?;
        info!("Successfully updated group");
        Ok(group)
    }

    #[instrument(name = "grouper.service.delete_group", skip(self), fields(group_id = %id))]
    pub async fn delete_group(&self, id: GroupId) -> Result<(), DomainError> {
        info!("Deleting group");
        if !self.repo.delete_group(id).await {
            return Err(DomainError::group_not_found(id));
        }
        info!("Successfully deleted group");
        Ok(())
    }
}
