//! Transport-agnostic models for the `grouper` module.
//!
//! These define the contract between the membership directory and its
//! consumers. Membership sets are ordered, so ids always come back ascending.

use std::collections::BTreeSet;
use std::fmt;

pub type UserId = u64;
pub type GroupId = u64;

/// The two kinds of records held by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("User"),
            Self::Group => f.write_str("Group"),
        }
    }
}

/// A user entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub groups: BTreeSet<GroupId>,
}

/// A group entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub users: BTreeSet<UserId>,
}

/// Data for creating a new user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub groups: BTreeSet<GroupId>,
}

/// Data for creating a new group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewGroup {
    pub name: String,
    pub users: BTreeSet<UserId>,
}

/// Partial update for a user. `groups`, when present, replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub groups: Option<BTreeSet<GroupId>>,
}

/// Partial update for a group. `users`, when present, replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub users: Option<BTreeSet<UserId>>,
}
