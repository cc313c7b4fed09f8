// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        quota::{RequireQuota, UsersQuota},
        rbac::{PermUserCreate, PermUserDelete, PermUserRead, RequirePermission},
        tenancy::TenantContext,
    },
    models::auth::{RegisterUserPayload, User},
};

// POST /api/v1/users
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = User),
        (status = 403, description = "Sem permissão ou sem assinatura ativa"),
        (status = 404, description = "Cargo não encontrado no tenant"),
        (status = 409, description = "Usuário já existe"),
        (status = 429, description = "Cota de usuários esgotada")
    ),
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID do Tenant (opcional, deve ser o do token)")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserCreate>,
    _quota: RequireQuota<UsersQuota>,
    tenant: TenantContext,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state
        .auth_service
        .register_user(tenant.0, &payload.username, &payload.password, payload.role_id)
        .await?;

    Ok((StatusCode::CREATED, Json(response.user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    responses((status = 200, description = "Usuários do tenant (de origem e membros ativos)", body = [User])),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserRead>,
    tenant: TenantContext,
) -> Result<Json<Vec<User>>, AppError> {
    let users = app_state.user_service.list_users(tenant.0).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "Users",
    params(("user_id" = Uuid, Path, description = "ID do Usuário")),
    responses(
        (status = 200, description = "Usuário", body = User),
        (status = 404, description = "Usuário não encontrado no tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserRead>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = app_state.user_service.get_user(tenant.0, user_id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "Users",
    params(("user_id" = Uuid, Path, description = "ID do Usuário")),
    responses(
        (status = 204, description = "Usuário excluído com vínculos e atribuições"),
        (status = 404, description = "Usuário não encontrado no tenant"),
        (status = 409, description = "Usuário nasceu em outro tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserDelete>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.user_service.delete_user(tenant.0, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
