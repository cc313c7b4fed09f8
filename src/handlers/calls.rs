// src/handlers/calls.rs

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
        quota::{CallsQuota, RequireQuota},
        rbac::{PermCallCreate, PermCallDelete, PermCallRead, RequirePermission},
        tenancy::TenantContext,
    },
    models::calls::{Call, CreateCallPayload},
};

#[utoipa::path(
    post,
    path = "/api/v1/calls",
    tag = "Calls",
    request_body = CreateCallPayload,
    responses(
        (status = 201, description = "Chamada registrada", body = Call),
        (status = 403, description = "Sem permissão ou sem assinatura ativa"),
        (status = 429, description = "Cota de chamadas esgotada")
    ),
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID do Tenant (opcional, deve ser o do token)")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_call(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermCallCreate>,
    _quota: RequireQuota<CallsQuota>,
    tenant: TenantContext,
    Json(payload): Json<CreateCallPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let call = app_state.call_service.create_call(tenant.0, &payload).await?;

    Ok((StatusCode::CREATED, Json(call)))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls",
    tag = "Calls",
    responses((status = 200, description = "Chamadas do tenant", body = [Call])),
    security(("api_jwt" = []))
)]
pub async fn list_calls(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermCallRead>,
    tenant: TenantContext,
) -> Result<Json<Vec<Call>>, AppError> {
    let calls = app_state.call_service.list_calls(tenant.0).await?;
    Ok(Json(calls))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/{call_id}",
    tag = "Calls",
    params(("call_id" = Uuid, Path, description = "ID da Chamada")),
    responses(
        (status = 200, description = "Chamada", body = Call),
        (status = 404, description = "Chamada não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_call(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermCallRead>,
    tenant: TenantContext,
    Path(call_id): Path<Uuid>,
) -> Result<Json<Call>, AppError> {
    let call = app_state.call_service.get_call(tenant.0, call_id).await?;
    Ok(Json(call))
}

#[utoipa::path(
    delete,
    path = "/api/v1/calls/{call_id}",
    tag = "Calls",
    params(("call_id" = Uuid, Path, description = "ID da Chamada")),
    responses(
        (status = 204, description = "Chamada excluída"),
        (status = 404, description = "Chamada não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_call(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermCallDelete>,
    tenant: TenantContext,
    Path(call_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.call_service.delete_call(tenant.0, call_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
