use async_trait::async_trait;
use thiserror::Error;

use crate::contract::model::{
    EntityKind, Group, GroupId, GroupPatch, NewGroup, NewUser, User, UserId, UserPatch,
};

/// Reasons a directory mutation is refused. Raised before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} does not exist")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("{kind} name '{name}' is taken")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("referenced {kind} ids do not exist: {ids:?}")]
    UnknownReference { kind: EntityKind, ids: Vec<u64> },
}

/// Port for the domain layer: the membership directory store.
///
/// Implementations own both collections and keep the membership relation
/// symmetric: every mutation validates all referenced ids and names first,
/// then applies both sides of the relation as one atomic step.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// All users, in insertion order.
    async fn list_users(&self) -> Vec<User>;
    /// All groups, in insertion order.
    async fn list_groups(&self) -> Vec<Group>;
    /// Load a user by id.
    async fn find_user(&self, id: UserId) -> Option<User>;
    /// Load a group by id.
    async fn find_group(&self, id: GroupId) -> Option<Group>;
    /// Insert a user, assigning its id and joining it to `new_user.groups`.
    async fn insert_user(&self, new_user: NewUser) -> Result<User, StoreError>;
    /// Insert a group, assigning its id and joining `new_group.users` to it.
    async fn insert_group(&self, new_group: NewGroup) -> Result<Group, StoreError>;
    /// Apply a partial update; a present `groups` replaces the membership set.
    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, StoreError>;
    /// Apply a partial update; a present `users` replaces the membership set.
    async fn update_group(&self, id: GroupId, patch: GroupPatch) -> Result<Group, StoreError>;
    /// Delete by id, detaching it from its groups. Returns true if a user was removed.
    async fn delete_user(&self, id: UserId) -> bool;
    /// Delete by id, detaching it from its users. Returns true if a group was removed.
    async fn delete_group(&self, id: GroupId) -> bool;
}
