// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, Identity, LoginUserPayload, RegisterTenantPayload},
};

// Handler de registro de tenant (público): cria a organização e o seu admin
#[utoipa::path(
    post,
    path = "/api/v1/auth/register-tenant",
    tag = "Auth",
    request_body = RegisterTenantPayload,
    responses(
        (status = 201, description = "Tenant e administrador criados", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Domínio ou usuário já em uso")
    )
)]
pub async fn register_tenant(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state
        .auth_service
        .register_tenant(&payload.tenant_name, &payload.domain, &payload.username, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas"),
        (status = 403, description = "Usuário sem vínculo ativo com o tenant")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state.auth_service.login(&payload.username, &payload.password).await?;

    Ok(Json(response))
}

// Tokens não são revogáveis: o logout só confirma, o cliente descarta o token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout confirmado"))
)]
pub async fn logout() -> impl IntoResponse {
    Json(json!({ "message": "Logout realizado. Descarte o token no cliente." }))
}

// Handler da rota protegida /profile: devolve as claims verificadas
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    tag = "Auth",
    responses(
        (status = 200, description = "Identidade do token", body = Identity),
        (status = 401, description = "Token inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn profile(AuthenticatedUser(identity): AuthenticatedUser) -> Json<Identity> {
    Json(identity)
}
