// src/handlers/tenancy.rs

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
        rbac::{
            PermAdminTenantCreate, PermAdminTenantDelete, PermAdminTenantRead, PermMemberCreate,
            PermMemberRead, PermMemberRemove, RequirePermission,
        },
        tenancy::TenantContext,
    },
    models::tenancy::{AddMemberPayload, CreateTenantPayload, Tenant, TenantMember, TenantMembership},
};

// ---
// Administração de tenants
// ---

#[utoipa::path(
    post,
    path = "/api/v1/admin/tenants",
    tag = "Admin",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Tenant criado", body = Tenant),
        (status = 409, description = "Domínio já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminTenantCreate>,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let tenant = app_state.tenant_service.create_tenant(&payload.name, &payload.domain).await?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/tenants",
    tag = "Admin",
    responses((status = 200, description = "Todos os tenants", body = [Tenant])),
    security(("api_jwt" = []))
)]
pub async fn list_tenants(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminTenantRead>,
) -> Result<Json<Vec<Tenant>>, AppError> {
    let tenants = app_state.tenant_service.list_tenants().await?;
    Ok(Json(tenants))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/tenants/{tenant_id}",
    tag = "Admin",
    params(("tenant_id" = Uuid, Path, description = "ID do Tenant")),
    responses(
        (status = 200, description = "Tenant", body = Tenant),
        (status = 404, description = "Tenant não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_tenant(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminTenantRead>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    let tenant = app_state.tenant_service.get_tenant(tenant_id).await?;
    Ok(Json(tenant))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/tenants/{tenant_id}",
    tag = "Admin",
    params(("tenant_id" = Uuid, Path, description = "ID do Tenant")),
    responses(
        (status = 204, description = "Tenant excluído"),
        (status = 409, description = "Tenant ainda possui usuários, cargos ou chamadas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_tenant(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminTenantDelete>,
    Path(tenant_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.tenant_service.delete_tenant(tenant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Membros do tenant do chamador
// ---

#[utoipa::path(
    post,
    path = "/api/v1/members",
    tag = "Members",
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Vínculo ativo criado", body = TenantMembership),
        (status = 409, description = "Usuário já é membro ativo"),
        (status = 429, description = "Cota de usuários esgotada")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMemberCreate>,
    _quota: RequireQuota<UsersQuota>,
    tenant: TenantContext,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, AppError> {
    let membership = app_state.tenant_service.add_member(tenant.0, payload.user_id).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

#[utoipa::path(
    get,
    path = "/api/v1/members",
    tag = "Members",
    responses((status = 200, description = "Vínculos (ativos e encerrados)", body = [TenantMember])),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMemberRead>,
    tenant: TenantContext,
) -> Result<Json<Vec<TenantMember>>, AppError> {
    let members = app_state.tenant_service.list_members(tenant.0).await?;
    Ok(Json(members))
}

#[utoipa::path(
    delete,
    path = "/api/v1/members/{user_id}",
    tag = "Members",
    params(("user_id" = Uuid, Path, description = "ID do Usuário")),
    responses(
        (status = 200, description = "Vínculo desativado", body = TenantMembership),
        (status = 404, description = "Sem vínculo ativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMemberRemove>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TenantMembership>, AppError> {
    let membership = app_state.tenant_service.remove_member(tenant.0, user_id).await?;
    Ok(Json(membership))
}
