// src/services/quota_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{db_utils::lock_tenant_quota, error::AppError},
    db::{CallRepository, SubscriptionRepository, TenantRepository},
    models::subscription::{ActiveSubscription, QuotaDecision, ResourceKind, UsageReport},
};

/// Ledger de cotas: compara o consumo atual do tenant com o plano ativo.
/// Nada fica em memória, toda decisão relê o banco.
#[derive(Clone)]
pub struct QuotaService {
    subscription_repo: SubscriptionRepository,
    tenant_repo: TenantRepository,
    call_repo: CallRepository,
    pool: PgPool,
}

impl QuotaService {
    pub fn new(
        subscription_repo: SubscriptionRepository,
        tenant_repo: TenantRepository,
        call_repo: CallRepository,
        pool: PgPool,
    ) -> Self {
        Self { subscription_repo, tenant_repo, call_repo, pool }
    }

    /// Pré-checagem somente leitura (usada pelo extrator `RequireQuota`).
    pub async fn check_quota(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<QuotaDecision, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.check_quota_in(&mut conn, tenant_id, kind).await
    }

    /// Mesma checagem, na conexão (ou transação) do chamador.
    pub async fn check_quota_in(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<QuotaDecision, AppError> {
        let Some(active) = self.active_in(conn, tenant_id).await? else {
            return Ok(QuotaDecision::NoSubscription);
        };

        let used = self.usage_of(conn, tenant_id, kind).await?;
        Ok(QuotaDecision::evaluate(used, active.plan.limit_for(kind)))
    }

    /// Checa e converte a decisão em erro (429 / 403).
    pub async fn enforce(&self, tenant_id: Uuid, kind: ResourceKind) -> Result<(), AppError> {
        let decision = self.check_quota(tenant_id, kind).await?;
        decision_to_result(tenant_id, kind, decision)
    }

    /// Para operações que criam o recurso: trava a cota do tenant até o fim da
    /// transação e só então conta, assim duas criações concorrentes não passam do teto.
    pub async fn enforce_locked(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<(), AppError> {
        lock_tenant_quota(conn, tenant_id).await?;
        let decision = self.check_quota_in(conn, tenant_id, kind).await?;
        decision_to_result(tenant_id, kind, decision)
    }

    pub async fn usage_report(&self, tenant_id: Uuid) -> Result<UsageReport, AppError> {
        let mut conn = self.pool.acquire().await?;

        let active = self
            .active_in(&mut conn, tenant_id)
            .await?
            .ok_or(AppError::NoActiveSubscription)?;

        let active_users = self.usage_of(&mut conn, tenant_id, ResourceKind::Users).await?;
        let total_calls = self.usage_of(&mut conn, tenant_id, ResourceKind::Calls).await?;

        Ok(UsageReport::new(tenant_id, &active.plan, active_users, total_calls))
    }

    async fn active_in(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
    ) -> Result<Option<ActiveSubscription>, AppError> {
        let Some(subscription) = self.subscription_repo.find_active(&mut *conn, tenant_id).await? else {
            return Ok(None);
        };

        let plan = self
            .subscription_repo
            .find_plan(&mut *conn, subscription.plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;

        Ok(Some(ActiveSubscription { subscription, plan }))
    }

    async fn usage_of(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<i64, AppError> {
        match kind {
            ResourceKind::Users => self.tenant_repo.count_active_memberships(&mut *conn, tenant_id).await,
            ResourceKind::Calls => self.call_repo.count_live_calls(&mut *conn, tenant_id).await,
        }
    }
}

fn decision_to_result(
    tenant_id: Uuid,
    kind: ResourceKind,
    decision: QuotaDecision,
) -> Result<(), AppError> {
    match decision {
        QuotaDecision::Allow { .. } => Ok(()),
        QuotaDecision::Deny { used, limit } => {
            tracing::warn!("⛔ Cota de {} esgotada no tenant {} ({}/{})", kind, tenant_id, used, limit);
            Err(AppError::QuotaExceeded(kind))
        }
        QuotaDecision::NoSubscription => {
            tracing::warn!("⛔ Tenant {} sem assinatura ativa", tenant_id);
            Err(AppError::NoActiveSubscription)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_becomes_quota_exceeded() {
        let tenant = Uuid::new_v4();
        let err = decision_to_result(
            tenant,
            ResourceKind::Users,
            QuotaDecision::Deny { used: 2, limit: 2 },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded(ResourceKind::Users)));
    }

    #[test]
    fn missing_subscription_is_its_own_error() {
        let err = decision_to_result(Uuid::new_v4(), ResourceKind::Calls, QuotaDecision::NoSubscription)
            .unwrap_err();
        assert!(matches!(err, AppError::NoActiveSubscription));
    }

    #[test]
    fn allow_passes() {
        assert!(decision_to_result(
            Uuid::new_v4(),
            ResourceKind::Calls,
            QuotaDecision::Allow { used: 0, limit: 1 },
        )
        .is_ok());
    }
}
