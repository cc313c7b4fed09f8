// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{common::error::AppError, middleware::auth::AuthenticatedUser};

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// O tenant em que a requisição atua.
// Vem sempre do token; o cabeçalho X-Tenant-ID, se enviado, só pode confirmar o mesmo tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(identity) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if let Some(value) = parts.headers.get(TENANT_ID_HEADER) {
            let value_str = value.to_str().map_err(|_| {
                AppError::BadRequest("Cabeçalho X-Tenant-ID contém caracteres inválidos.".into())
            })?;

            let requested = Uuid::parse_str(value_str.trim()).map_err(|_| {
                AppError::BadRequest("Cabeçalho X-Tenant-ID inválido (não é um UUID).".into())
            })?;

            if requested != identity.tenant_id {
                tracing::warn!(
                    "⛔ Usuário {} tentou acessar o tenant {} com token do tenant {}",
                    identity.user_id,
                    requested,
                    identity.tenant_id
                );
                return Err(AppError::Forbidden("Acesso a outro tenant não permitido.".into()));
            }
        }

        Ok(TenantContext(identity.tenant_id))
    }
}
