// src/handlers/subscription.rs

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
            PermAdminPlanCreate, PermAdminPlanDelete, PermAdminPlanRead, PermAdminTenantSubscribe,
            PermSubscriptionRead, PermUsageRead, RequirePermission,
        },
        tenancy::TenantContext,
    },
    models::subscription::{
        ActiveSubscription, CreatePlanPayload, Plan, SubscribePayload, Subscription, UsageReport,
    },
};

// ---
// Planos (catálogo global)
// ---

#[utoipa::path(
    post,
    path = "/api/v1/admin/plans",
    tag = "Admin",
    request_body = CreatePlanPayload,
    responses((status = 201, description = "Plano criado", body = Plan)),
    security(("api_jwt" = []))
)]
pub async fn create_plan(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminPlanCreate>,
    Json(payload): Json<CreatePlanPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let plan = app_state
        .subscription_service
        .create_plan(&payload.name, payload.max_users, payload.max_calls, payload.price)
        .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/plans",
    tag = "Admin",
    responses((status = 200, description = "Planos", body = [Plan])),
    security(("api_jwt" = []))
)]
pub async fn list_plans(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminPlanRead>,
) -> Result<Json<Vec<Plan>>, AppError> {
    let plans = app_state.subscription_service.list_plans().await?;
    Ok(Json(plans))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/plans/{plan_id}",
    tag = "Admin",
    params(("plan_id" = Uuid, Path, description = "ID do Plano")),
    responses(
        (status = 200, description = "Plano", body = Plan),
        (status = 404, description = "Plano não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_plan(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminPlanRead>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Plan>, AppError> {
    let plan = app_state.subscription_service.get_plan(plan_id).await?;
    Ok(Json(plan))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/plans/{plan_id}",
    tag = "Admin",
    params(("plan_id" = Uuid, Path, description = "ID do Plano")),
    responses(
        (status = 204, description = "Plano excluído"),
        (status = 409, description = "Plano com assinaturas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_plan(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminPlanDelete>,
    Path(plan_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.subscription_service.delete_plan(plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Assinaturas
// ---

// POST /api/v1/admin/tenants/{tenant_id}/subscribe (troca atômica de plano)
#[utoipa::path(
    post,
    path = "/api/v1/admin/tenants/{tenant_id}/subscribe",
    tag = "Admin",
    request_body = SubscribePayload,
    params(("tenant_id" = Uuid, Path, description = "ID do Tenant")),
    responses(
        (status = 201, description = "Nova assinatura ativa", body = ActiveSubscription),
        (status = 404, description = "Tenant ou plano não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn subscribe_tenant(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAdminTenantSubscribe>,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<SubscribePayload>,
) -> Result<impl IntoResponse, AppError> {
    let active = app_state.subscription_service.subscribe(tenant_id, payload.plan_id).await?;
    Ok((StatusCode::CREATED, Json(active)))
}

#[utoipa::path(
    get,
    path = "/api/v1/subscription",
    tag = "Subscription",
    responses(
        (status = 200, description = "Assinatura ativa e plano", body = ActiveSubscription),
        (status = 404, description = "Sem assinatura ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSubscriptionRead>,
    tenant: TenantContext,
) -> Result<Json<ActiveSubscription>, AppError> {
    let active = app_state.subscription_service.get_active_subscription(tenant.0).await?;
    Ok(Json(active))
}

#[utoipa::path(
    get,
    path = "/api/v1/subscription/history",
    tag = "Subscription",
    responses((status = 200, description = "Todas as assinaturas do tenant", body = [Subscription])),
    security(("api_jwt" = []))
)]
pub async fn get_subscription_history(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSubscriptionRead>,
    tenant: TenantContext,
) -> Result<Json<Vec<Subscription>>, AppError> {
    let history = app_state.subscription_service.history(tenant.0).await?;
    Ok(Json(history))
}

#[utoipa::path(
    get,
    path = "/api/v1/usage",
    tag = "Subscription",
    responses(
        (status = 200, description = "Consumo atual e saldo das cotas", body = UsageReport),
        (status = 403, description = "Sem assinatura ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_usage(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsageRead>,
    tenant: TenantContext,
) -> Result<Json<UsageReport>, AppError> {
    let report = app_state.quota_service.usage_report(tenant.0).await?;
    Ok(Json(report))
}
