use async_trait::async_trait;

use crate::contract::{
    error::GrouperError,
    model::{Group, GroupId, GroupPatch, NewGroup, NewUser, User, UserId, UserPatch},
};

/// Public API trait for the grouper module that other modules can use
#[async_trait]
pub trait GrouperApi: Send + Sync {
    /// List all users in insertion order
    async fn list_users(&self) -> Result<Vec<User>, GrouperError>;

    /// Get a user by ID
    async fn get_user(&self, id: UserId) -> Result<User, GrouperError>;

    /// Create a new user and join it to the referenced groups
    async fn create_user(&self, new_user: NewUser) -> Result<User, GrouperError>;

    /// Update a user with partial data
    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, GrouperError>;

    /// Delete a user by ID, detaching it from its groups
    async fn delete_user(&self, id: UserId) -> Result<(), GrouperError>;

    /// List all groups in insertion order
    async fn list_groups(&self) -> Result<Vec<Group>, GrouperError>;

    /// Get a group by ID
    async fn get_group(&self, id: GroupId) -> Result<Group, GrouperError>;

    /// Create a new group with the referenced members
    async fn create_group(&self, new_group: NewGroup) -> Result<Group, GrouperError>;

    /// Update a group with partial data
    async fn update_group(&self, id: GroupId, patch: GroupPatch) -> Result<Group, GrouperError>;

    /// Delete a group by ID, detaching it from its members
    async fn delete_group(&self, id: GroupId) -> Result<(), GrouperError>;
}
