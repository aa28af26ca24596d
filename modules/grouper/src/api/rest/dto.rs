use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{
    Group, GroupId, GroupPatch, NewGroup, NewUser, User, UserId, UserPatch,
};
use crate::domain::validation::{FieldErrors, NOT_NULL};

/// REST DTO for user representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Ids of the groups the user belongs to, ascending.
    pub groups: Vec<GroupId>,
}

/// REST DTO for group representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupDto {
    pub id: GroupId,
    pub name: String,
    /// Ids of the member users, ascending.
    pub users: Vec<UserId>,
}

/// REST DTO for creating a new user.
///
/// Required fields are optional here so that absent values surface as
/// field-level validation errors instead of body decoding failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

/// REST DTO for updating a user (partial).
///
/// The outer `Option` is field presence, the inner one an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserReq {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    /// Replaces the whole membership set when present.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<u64>>)]
    pub groups: Option<Option<Vec<GroupId>>>,
}

/// REST DTO for creating a new group
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateGroupReq {
    pub name: Option<String>,
    #[serde(default)]
    pub users: Vec<UserId>,
}

/// REST DTO for updating a group (partial)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateGroupReq {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    /// Replaces the whole membership set when present.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<u64>>)]
    pub users: Option<Option<Vec<UserId>>>,
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None` via `default`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Unwraps a patch field, recording an explicit `null` as a field error.
fn non_null<T>(errors: &mut FieldErrors, field: &str, value: Option<Option<T>>) -> Option<T> {
    match value {
        Some(None) => {
            errors.add(field, NOT_NULL);
            None
        }
        other => other.flatten(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListDto {
    pub users: Vec<UserDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupListDto {
    pub groups: Vec<GroupDto>,
}

/// Single user, with a status message on mutations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserDto,
}

/// Single group, with a status message on mutations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub group: GroupDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDto {
    pub message: String,
}

/// Error body. `errors` carries per-field messages on 422 responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDto {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl UserEnvelope {
    pub fn plain(user: User) -> Self {
        Self {
            message: None,
            user: user.into(),
        }
    }

    pub fn with_message(message: impl Into<String>, user: User) -> Self {
        Self {
            message: Some(message.into()),
            user: user.into(),
        }
    }
}

impl GroupEnvelope {
    pub fn plain(group: Group) -> Self {
        Self {
            message: None,
            group: group.into(),
        }
    }

    pub fn with_message(message: impl Into<String>, group: Group) -> Self {
        Self {
            message: Some(message.into()),
            group: group.into(),
        }
    }
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            groups: user.groups.into_iter().collect(),
        }
    }
}

impl From<Group> for GroupDto {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            users: group.users.into_iter().collect(),
        }
    }
}

// Absent required fields become empty strings, which validation rejects
// with the same message as an explicit empty value.

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            name: req.name.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            groups: req.groups.into_iter().collect(),
        }
    }
}

impl TryFrom<UpdateUserReq> for UserPatch {
    type Error = FieldErrors;

    fn try_from(req: UpdateUserReq) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::new();
        let patch = Self {
            name: non_null(&mut errors, "name", req.name),
            email: non_null(&mut errors, "email", req.email),
            groups: non_null(&mut errors, "groups", req.groups)
                .map(|g| g.into_iter().collect()),
        };
        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(errors)
        }
    }
}

impl From<CreateGroupReq> for NewGroup {
    fn from(req: CreateGroupReq) -> Self {
        Self {
            name: req.name.unwrap_or_default(),
            users: req.users.into_iter().collect(),
        }
    }
}

impl TryFrom<UpdateGroupReq> for GroupPatch {
    type Error = FieldErrors;

    fn try_from(req: UpdateGroupReq) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::new();
        let patch = Self {
            name: non_null(&mut errors, "name", req.name),
            users: non_null(&mut errors, "users", req.users)
                .map(|u| u.into_iter().collect()),
        };
        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(errors)
        }
    }
}
