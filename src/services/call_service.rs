// src/services/call_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CallRepository,
    models::calls::{Call, CreateCallPayload},
    models::subscription::ResourceKind,
    services::quota_service::QuotaService,
};

#[derive(Clone)]
pub struct CallService {
    repo: CallRepository,
    quota_service: QuotaService,
    pool: PgPool,
}

impl CallService {
    pub fn new(repo: CallRepository, quota_service: QuotaService, pool: PgPool) -> Self {
        Self { repo, quota_service, pool }
    }

    pub async fn create_call(&self, tenant_id: Uuid, payload: &CreateCallPayload) -> Result<Call, AppError> {
        let mut tx = self.pool.begin().await?;

        // Conta e insere sob o mesmo lock
        self.quota_service
            .enforce_locked(&mut *tx, tenant_id, ResourceKind::Calls)
            .await?;

        let call = self
            .repo
            .create_call(
                &mut *tx,
                tenant_id,
                &payload.caller,
                &payload.callee,
                payload.billsec,
                payload.recording_url.as_deref(),
                payload.cost,
            )
            .await?;

        tx.commit().await?;
        Ok(call)
    }

    pub async fn list_calls(&self, tenant_id: Uuid) -> Result<Vec<Call>, AppError> {
        self.repo.list_calls(tenant_id).await
    }

    pub async fn get_call(&self, tenant_id: Uuid, call_id: Uuid) -> Result<Call, AppError> {
        self.repo
            .find_call(tenant_id, call_id)
            .await?
            .ok_or(AppError::CallNotFound)
    }

    pub async fn delete_call(&self, tenant_id: Uuid, call_id: Uuid) -> Result<(), AppError> {
        let affected = self.repo.soft_delete(tenant_id, call_id).await?;
        if affected == 0 {
            return Err(AppError::CallNotFound);
        }
        Ok(())
    }
}
