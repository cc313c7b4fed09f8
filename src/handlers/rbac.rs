// src/handlers/rbac.rs

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
        rbac::{
            PermAdminPermissionManage, PermRoleManage, PermRoleRead, PermUserRoleAssign,
            PermUserRoleRead, PermUserRoleRemove, RequirePermission,
        },
        tenancy::TenantContext,
    },
    models::rbac::{
        AssignPermissionsPayload, AssignRolesPayload, CreatePermissionPayload, CreateRolePayload,
        GrantPermissionPayload, Permission, RoleAssignment, RoleResponse,
    },
};

// ---
// Cargos (role.read para consultar, role.manage para alterar)
// ---

// POST /api/v1/roles
#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses((status = 201, description = "Cargo criado", body = RoleResponse)),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleManage>,
    tenant: TenantContext,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state.rbac_service.create_role(tenant.0, &payload.name).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "RBAC",
    responses((status = 200, description = "Cargos do tenant com suas permissões", body = [RoleResponse])),
    security(("api_jwt" = []))
)]
pub async fn list_roles(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleRead>,
    tenant: TenantContext,
) -> Result<Json<Vec<RoleResponse>>, AppError> {
    let roles = app_state.rbac_service.list_roles(tenant.0).await?;
    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{role_id}",
    tag = "RBAC",
    params(("role_id" = Uuid, Path, description = "ID do Cargo")),
    responses(
        (status = 200, description = "Cargo", body = RoleResponse),
        (status = 404, description = "Cargo não encontrado no tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleRead>,
    tenant: TenantContext,
    Path(role_id): Path<Uuid>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = app_state.rbac_service.get_role(tenant.0, role_id).await?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{role_id}",
    tag = "RBAC",
    params(("role_id" = Uuid, Path, description = "ID do Cargo")),
    responses(
        (status = 204, description = "Cargo excluído"),
        (status = 404, description = "Cargo não encontrado no tenant"),
        (status = 409, description = "Cargo principal de algum usuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleManage>,
    tenant: TenantContext,
    Path(role_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.rbac_service.delete_role(tenant.0, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/v1/roles/{role_id}/permissions (substitui o conjunto)
#[utoipa::path(
    post,
    path = "/api/v1/roles/{role_id}/permissions",
    tag = "RBAC",
    request_body = AssignPermissionsPayload,
    params(("role_id" = Uuid, Path, description = "ID do Cargo")),
    responses(
        (status = 200, description = "Permissões do cargo substituídas", body = RoleResponse),
        (status = 403, description = "Sem role.manage ou código de plataforma na lista"),
        (status = 404, description = "Cargo ou permissões inexistentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_permissions(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleManage>,
    tenant: TenantContext,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<AssignPermissionsPayload>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = app_state
        .rbac_service
        .assign_permissions(tenant.0, role_id, &payload.permission_ids)
        .await?;
    Ok(Json(role))
}

// POST /api/v1/permissions/assign (soma uma permissão, não substitui)
#[utoipa::path(
    post,
    path = "/api/v1/permissions/assign",
    tag = "RBAC",
    request_body = GrantPermissionPayload,
    responses(
        (status = 200, description = "Cargo com a permissão concedida", body = RoleResponse),
        (status = 403, description = "Sem role.manage ou código de plataforma"),
        (status = 404, description = "Cargo ou permissão inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn grant_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleManage>,
    tenant: TenantContext,
    Json(payload): Json<GrantPermissionPayload>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = app_state
        .rbac_service
        .grant_permission(tenant.0, payload.role_id, payload.permission_id)
        .await?;
    Ok(Json(role))
}

// ---
// Catálogo de permissões
// ---

#[utoipa::path(
    post,
    path = "/api/v1/permissions",
    tag = "RBAC",
    request_body = CreatePermissionPayload,
    responses(
        (status = 201, description = "Permissão criada", body = Permission),
        (status = 409, description = "Código já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminPermissionManage>,
    Json(payload): Json<CreatePermissionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let permission = app_state
        .rbac_service
        .create_permission(&payload.code, &payload.description)
        .await?;

    Ok((StatusCode::CREATED, Json(permission)))
}

// GET /api/v1/permissions (Para o frontend saber o que mostrar na tela de criação)
#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    tag = "RBAC",
    responses((status = 200, description = "Catálogo de permissões", body = [Permission])),
    security(("api_jwt" = []))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleRead>,
) -> Result<Json<Vec<Permission>>, AppError> {
    let permissions = app_state.rbac_service.list_permissions().await?;
    Ok(Json(permissions))
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions/{permission_id}",
    tag = "RBAC",
    params(("permission_id" = Uuid, Path, description = "ID da Permissão")),
    responses(
        (status = 200, description = "Permissão", body = Permission),
        (status = 404, description = "Permissão não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRoleRead>,
    Path(permission_id): Path<Uuid>,
) -> Result<Json<Permission>, AppError> {
    let permission = app_state.rbac_service.get_permission(permission_id).await?;
    Ok(Json(permission))
}

#[utoipa::path(
    delete,
    path = "/api/v1/permissions/{permission_id}",
    tag = "RBAC",
    params(("permission_id" = Uuid, Path, description = "ID da Permissão")),
    responses(
        (status = 204, description = "Permissão excluída"),
        (status = 409, description = "Permissão ainda concedida a algum cargo")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminPermissionManage>,
    Path(permission_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.rbac_service.delete_permission(permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Cargos de usuários
// ---

#[utoipa::path(
    post,
    path = "/api/v1/user-roles/{user_id}/roles",
    tag = "User Roles",
    request_body = AssignRolesPayload,
    params(("user_id" = Uuid, Path, description = "ID do Usuário")),
    responses(
        (status = 200, description = "Atribuições ativas após a troca", body = [RoleAssignment]),
        (status = 404, description = "Usuário ou cargos não encontrados no tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_roles(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserRoleAssign>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRolesPayload>,
) -> Result<Json<Vec<RoleAssignment>>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let assignments = app_state
        .rbac_service
        .assign_roles_to_user(tenant.0, user_id, &payload.role_ids)
        .await?;
    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-roles/{user_id}/roles",
    tag = "User Roles",
    params(("user_id" = Uuid, Path, description = "ID do Usuário")),
    responses((status = 200, description = "Cargos ativos do usuário", body = [RoleResponse])),
    security(("api_jwt" = []))
)]
pub async fn get_user_roles(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserRoleRead>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<RoleResponse>>, AppError> {
    let roles = app_state.rbac_service.get_user_roles(tenant.0, user_id).await?;
    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-roles/{user_id}/history",
    tag = "User Roles",
    params(("user_id" = Uuid, Path, description = "ID do Usuário")),
    responses((status = 200, description = "Histórico de atribuições", body = [RoleAssignment])),
    security(("api_jwt" = []))
)]
pub async fn get_user_role_history(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserRoleRead>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<RoleAssignment>>, AppError> {
    let history = app_state.rbac_service.assignment_history(tenant.0, user_id).await?;
    Ok(Json(history))
}

#[utoipa::path(
    delete,
    path = "/api/v1/user-roles/{user_id}/roles/{role_id}",
    tag = "User Roles",
    params(
        ("user_id" = Uuid, Path, description = "ID do Usuário"),
        ("role_id" = Uuid, Path, description = "ID do Cargo")
    ),
    responses(
        (status = 200, description = "Atribuição revogada", body = RoleAssignment),
        (status = 404, description = "Atribuição ativa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_user_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUserRoleRemove>,
    tenant: TenantContext,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RoleAssignment>, AppError> {
    let revoked = app_state.rbac_service.remove_role(tenant.0, user_id, role_id).await?;
    Ok(Json(revoked))
}
