use axum::{routing::get, Extension, Router};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_users,
        handlers::get_user,
        handlers::create_user,
        handlers::update_user,
        handlers::delete_user,
        handlers::list_groups,
        handlers::get_group,
        handlers::create_group,
        handlers::update_group,
        handlers::delete_group,
    ),
    components(schemas(
        dto::UserDto,
        dto::GroupDto,
        dto::CreateUserReq,
        dto::UpdateUserReq,
        dto::CreateGroupReq,
        dto::UpdateGroupReq,
        dto::UserListDto,
        dto::GroupListDto,
        dto::UserEnvelope,
        dto::GroupEnvelope,
        dto::MessageDto,
        dto::ErrorDto,
    )),
    tags(
        (name = "users", description = "Users and their group memberships"),
        (name = "groups", description = "Groups and their member users"),
    )
)]
pub struct GrouperApiDoc;

/// OpenAPI document for the grouper routes, with every path mounted under `prefix`.
pub fn openapi(prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = GrouperApiDoc::openapi();
    if !prefix.is_empty() {
        let paths = std::mem::take(&mut doc.paths.paths);
        doc.paths.paths = paths
            .into_iter()
            .map(|(path, item)| (format!("{prefix}{path}"), item))
            .collect();
    }
    doc
}

pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    prefix: &str,
) -> anyhow::Result<Router> {
    let api = Router::new()
        // GET /users - List all users
        // POST /users - Create a new user
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // GET|PUT|DELETE /users/{id}
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/groups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route(
            "/groups/{id}",
            get(handlers::get_group)
                .put(handlers::update_group)
                .delete(handlers::delete_group),
        )
        .layer(Extension(service));

    // axum refuses to nest at "/", so the root prefix merges instead
    let router = if prefix.is_empty() {
        router.merge(api)
    } else {
        anyhow::ensure!(
            prefix.starts_with('/') && !prefix.ends_with('/'),
            "invalid route prefix '{prefix}'"
        );
        router.nest(prefix, api)
    };

    tracing::debug!(prefix = %prefix, "grouper routes registered");
    Ok(router)
}
