// src/middleware/quota.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::subscription::ResourceKind,
};

/// Recurso contado pela cota do plano.
pub trait QuotaResource: Send + Sync + 'static {
    const KIND: ResourceKind;
}

pub struct UsersQuota;
impl QuotaResource for UsersQuota {
    const KIND: ResourceKind = ResourceKind::Users;
}

pub struct CallsQuota;
impl QuotaResource for CallsQuota {
    const KIND: ResourceKind = ResourceKind::Calls;
}

/// Pré-checagem de cota para rotas que criam recursos.
/// É só leitura: a criação em si reconta sob lock dentro da transação.
pub struct RequireQuota<K>(pub PhantomData<K>);

impl<K, S> FromRequestParts<S> for RequireQuota<K>
where
    K: QuotaResource,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let TenantContext(tenant_id) = TenantContext::from_request_parts(parts, state).await?;

        app_state.quota_service.enforce(tenant_id, K::KIND).await?;

        Ok(RequireQuota(PhantomData))
    }
}
