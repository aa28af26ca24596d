use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    Extension, Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::api::rest::dto::{
    CreateGroupReq, CreateUserReq, ErrorDto, GroupEnvelope, GroupListDto, MessageDto,
    UpdateGroupReq, UpdateUserReq, UserEnvelope, UserListDto,
};
use crate::api::rest::error::ApiError;
use crate::contract::model::{EntityKind, GroupPatch, UserPatch};
use crate::domain::service::Service;

/// Ids are positive and must fit a signed 64-bit column; anything else is
/// reported exactly like an id that does not exist.
pub fn parse_id(raw: &str, kind: EntityKind) -> Result<u64, ApiError> {
    match raw.parse::<u64>() {
        Ok(id) if (1..=i64::MAX as u64).contains(&id) => Ok(id),
        _ => Err(ApiError::NotFound(kind)),
    }
}

/// JSON "falsy" values carry no input: null, false, 0, "", [] and {}.
fn is_empty_input(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Decode a request body in two steps so a missing body (400) is told apart
/// from a body with wrongly-typed fields (422). Only JSON objects are decoded;
/// serde would otherwise map an array onto the fields by position.
pub fn parse_body<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = body?;
    if is_empty_input(&value) {
        return Err(ApiError::NoInput);
    }
    if !value.is_object() {
        return Err(ApiError::Malformed("Invalid input type.".to_string()));
    }
    serde_json::from_value(value).map_err(|e| ApiError::Malformed(e.to_string()))
}

// --- users ---

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    operation_id = "grouper.list_users",
    responses((status = 200, description = "All users", body = UserListDto))
)]
pub async fn list_users(Extension(svc): Extension<Arc<Service>>) -> Json<UserListDto> {
    info!("Listing users");
    let users = svc.list_users().await;
    Json(UserListDto {
        users: users.into_iter().map(Into::into).collect(),
    })
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    operation_id = "grouper.get_user",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserEnvelope),
        (status = 404, description = "Not Found", body = ErrorDto)
    )
)]
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let id = parse_id(&raw_id, EntityKind::User)?;
    info!("Getting user with id: {}", id);

    let user = svc.get_user(id).await?;
    Ok(Json(UserEnvelope::plain(user)))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    operation_id = "grouper.create_user",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "Created user", body = UserEnvelope),
        (status = 400, description = "No input data", body = ErrorDto),
        (status = 409, description = "Name already taken", body = ErrorDto),
        (status = 422, description = "Validation errors", body = ErrorDto)
    )
)]
pub async fn create_user(
    Extension(svc): Extension<Arc<Service>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let req: CreateUserReq = parse_body(body)?;
    info!("Creating user: {:?}", req);

    let user = svc.create_user(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope::with_message("User added.", user)),
    ))
}

/// Update an existing user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    operation_id = "grouper.update_user",
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateUserReq,
    responses(
        (status = 200, description = "Updated user", body = UserEnvelope),
        (status = 400, description = "No input data", body = ErrorDto),
        (status = 404, description = "Not Found", body = ErrorDto),
        (status = 409, description = "Name already taken", body = ErrorDto),
        (status = 422, description = "Validation errors", body = ErrorDto)
    )
)]
pub async fn update_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let id = parse_id(&raw_id, EntityKind::User)?;
    let req: UpdateUserReq = parse_body(body)?;
    info!("Updating user {} with: {:?}", id, req);

    // Unknown ids report NotFound ahead of any field error.
    svc.get_user(id).await?;
    let patch = UserPatch::try_from(req).map_err(ApiError::Validation)?;

    let user = svc.update_user(id, patch).await?;
    Ok(Json(UserEnvelope::with_message("User updated.", user)))
}

/// Delete a user by ID
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    operation_id = "grouper.delete_user",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageDto),
        (status = 404, description = "Not Found", body = ErrorDto)
    )
)]
pub async fn delete_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageDto>, ApiError> {
    let id = parse_id(&raw_id, EntityKind::User)?;
    info!("Deleting user: {}", id);

    svc.delete_user(id).await?;
    Ok(Json(MessageDto::new("User deleted.")))
}

// --- groups ---

/// List all groups
#[utoipa::path(
    get,
    path = "/groups",
    tag = "groups",
    operation_id = "grouper.list_groups",
    responses((status = 200, description = "All groups", body = GroupListDto))
)]
pub async fn list_groups(Extension(svc): Extension<Arc<Service>>) -> Json<GroupListDto> {
    info!("Listing groups");
    let groups = svc.list_groups().await;
    Json(GroupListDto {
        groups: groups.into_iter().map(Into::into).collect(),
    })
}

/// Get a specific group by ID
#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "groups",
    operation_id = "grouper.get_group",
    params(("id" = u64, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group found", body = GroupEnvelope),
        (status = 404, description = "Not Found", body = ErrorDto)
    )
)]
pub async fn get_group(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
) -> Result<Json<GroupEnvelope>, ApiError> {
    let id = parse_id(&raw_id, EntityKind::Group)?;
    info!("Getting group with id: {}", id);

    let group = svc.get_group(id).await?;
    Ok(Json(GroupEnvelope::plain(group)))
}

/// Create a new group
#[utoipa::path(
    post,
    path = "/groups",
    tag = "groups",
    operation_id = "grouper.create_group",
    request_body = CreateGroupReq,
    responses(
        (status = 201, description = "Created group", body = GroupEnvelope),
        (status = 400, description = "No input data", body = ErrorDto),
        (status = 409, description = "Name already taken", body = ErrorDto),
        (status = 422, description = "Validation errors", body = ErrorDto)
    )
)]
pub async fn create_group(
    Extension(svc): Extension<Arc<Service>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<GroupEnvelope>), ApiError> {
    let req: CreateGroupReq = parse_body(body)?;
    info!("Creating group: {:?}", req);

    let group = svc.create_group(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(GroupEnvelope::with_message("Group added.", group)),
    ))
}

/// Update an existing group
#[utoipa::path(
    put,
    path = "/groups/{id}",
    tag = "groups",
    operation_id = "grouper.update_group",
    params(("id" = u64, Path, description = "Group id")),
    request_body = UpdateGroupReq,
    responses(
        (status = 200, description = "Updated group", body = GroupEnvelope),
        (status = 400, description = "No input data", body = ErrorDto),
        (status = 404, description = "Not Found", body = ErrorDto),
        (status = 409, description = "Name already taken", body = ErrorDto),
        (status = 422, description = "Validation errors", body = ErrorDto)
    )
)]
pub async fn update_group(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GroupEnvelope>, ApiError> {
    let id = parse_id(&raw_id, EntityKind::Group)?;
    let req: UpdateGroupReq = parse_body(body)?;
    info!("Updating group {} with: {:?}", id, req);

    svc.get_group(id).await?;
    let patch = GroupPatch::try_from(req).map_err(ApiError::Validation)?;

    let group = svc.update_group(id, patch).await?;
    Ok(Json(GroupEnvelope::with_message("Group updated.", group)))
}

/// Delete a group by ID
#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "groups",
    operation_id = "grouper.delete_group",
    params(("id" = u64, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group deleted", body = MessageDto),
        (status = 404, description = "Not Found", body = ErrorDto)
    )
)]
pub async fn delete_group(
    Extension(svc): Extension<Arc<Service>>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageDto>, ApiError> {
    let id = parse_id(&raw_id, EntityKind::Group)?;
    info!("Deleting group: {}", id);

    svc.delete_group(id).await?;
    Ok(Json(MessageDto::new("Group deleted.")))
}
