// src/services/tenancy_service.rs

use crate::{
    common::error::AppError,
    db::{CallRepository, RbacRepository, TenantRepository, UserRepository},
    models::subscription::ResourceKind,
    models::tenancy::{Tenant, TenantMember, TenantMembership},
    services::quota_service::QuotaService,
};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    rbac_repo: RbacRepository,
    call_repo: CallRepository,
    quota_service: QuotaService,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        rbac_repo: RbacRepository,
        call_repo: CallRepository,
        quota_service: QuotaService,
        pool: PgPool,
    ) -> Self {
        Self { tenant_repo, user_repo, rbac_repo, call_repo, quota_service, pool }
    }

    pub async fn create_tenant(&self, name: &str, domain: &str) -> Result<Tenant, AppError> {
        let tenant = self.tenant_repo.create_tenant(&self.pool, name, domain).await?;
        tracing::info!("🏢 Tenant '{}' criado ({})", tenant.name, tenant.id);
        Ok(tenant)
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        self.tenant_repo.list_tenants().await
    }

    pub async fn get_tenant(&self, tenant_id: Uuid) -> Result<Tenant, AppError> {
        self.tenant_repo
            .find_by_id(&self.pool, tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)
    }

    /// Só exclui tenant "vazio": sem usuários de origem, cargos ou chamadas vivas.
    /// Vínculos, atribuições, assinaturas e chamadas excluídas vão junto (CASCADE).
    pub async fn delete_tenant(&self, tenant_id: Uuid) -> Result<(), AppError> {
        // 1. Inicia a transação e trava o tenant
        let mut tx = self.pool.begin().await?;

        self.tenant_repo
            .lock_tenant(&mut *tx, tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        // 2. Pré-checagens de uso
        if self.user_repo.count_homed_in_tenant(&mut *tx, tenant_id).await? > 0 {
            return Err(AppError::TenantInUse("usuários"));
        }
        if self.rbac_repo.count_roles(&mut *tx, tenant_id).await? > 0 {
            return Err(AppError::TenantInUse("cargos"));
        }
        if self.call_repo.count_live_calls(&mut *tx, tenant_id).await? > 0 {
            return Err(AppError::TenantInUse("chamadas"));
        }

        // 3. Exclui e confirma
        self.tenant_repo.delete_tenant(&mut *tx, tenant_id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Tenant {} excluído", tenant_id);
        Ok(())
    }

    // ---
    // Membros
    // ---

    /// Vincula um usuário existente ao tenant, respeitando a cota de usuários.
    /// Usuário com vínculos antigos (inativos) ganha uma nova linha ativa.
    pub async fn add_member(&self, tenant_id: Uuid, user_id: Uuid) -> Result<TenantMembership, AppError> {
        self.get_tenant(tenant_id).await?;

        self.user_repo
            .find_by_id(&self.pool, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let mut tx = self.pool.begin().await?;

        // Vínculo duplicado tem precedência sobre cota cheia.
        // Corrida entre dois vínculos iguais cai no índice parcial (MembershipExists).
        if self
            .tenant_repo
            .find_active_membership(&mut *tx, user_id, tenant_id)
            .await?
            .is_some()
        {
            return Err(AppError::MembershipExists);
        }

        self.quota_service
            .enforce_locked(&mut *tx, tenant_id, ResourceKind::Users)
            .await?;

        let membership = self.tenant_repo.create_membership(&mut *tx, user_id, tenant_id).await?;
        tx.commit().await?;

        tracing::info!("🤝 Usuário {} vinculado ao tenant {}", user_id, tenant_id);
        Ok(membership)
    }

    pub async fn remove_member(&self, tenant_id: Uuid, user_id: Uuid) -> Result<TenantMembership, AppError> {
        let membership = self
            .tenant_repo
            .deactivate_membership(&self.pool, user_id, tenant_id)
            .await?
            .ok_or(AppError::MembershipNotFound)?;

        tracing::info!("👋 Vínculo do usuário {} com o tenant {} desativado", user_id, tenant_id);
        Ok(membership)
    }

    pub async fn list_members(&self, tenant_id: Uuid) -> Result<Vec<TenantMember>, AppError> {
        self.tenant_repo.list_members(tenant_id).await
    }
}
