use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::GrouperApi,
    error::GrouperError,
    model::{Group, GroupId, GroupPatch, NewGroup, NewUser, User, UserId, UserPatch},
};
use crate::domain::service::Service;

/// Local implementation of the GrouperApi trait that delegates to the domain service
pub struct GrouperLocalClient {
    service: Arc<Service>,
}

impl GrouperLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl GrouperApi for GrouperLocalClient {
    async fn list_users(&self) -> Result<Vec<User>, GrouperError> {
        Ok(self.service.list_users().await)
    }

    async fn get_user(&self, id: UserId) -> Result<User, GrouperError> {
        self.service.get_user(id).await.map_err(Into::into)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, GrouperError> {
        self.service.create_user(new_user).await.map_err(Into::into)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, GrouperError> {
        self.service
            .update_user(id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), GrouperError> {
        self.service.delete_user(id).await.map_err(Into::into)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, GrouperError> {
        Ok(self.service.list_groups().await)
    }

    async fn get_group(&self, id: GroupId) -> Result<Group, GrouperError> {
        self.service.get_group(id).await.map_err(Into::into)
    }

    async fn create_group(&self, new_group: NewGroup) -> Result<Group, GrouperError> {
        self.service
            .create_group(new_group)
            .await
            .map_err(Into::into)
    }

    async fn update_group(&self, id: GroupId, patch: GroupPatch) -> Result<Group, GrouperError> {
        self.service
            .update_group(id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), GrouperError> {
        self.service.delete_group(id).await.map_err(Into::into)
    }
}
