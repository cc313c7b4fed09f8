// src/services/subscription_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{SubscriptionRepository, TenantRepository};
use crate::models::subscription::{ActiveSubscription, Plan, Subscription};

#[derive(Clone)]
pub struct SubscriptionService {
    repo: SubscriptionRepository,
    tenant_repo: TenantRepository,
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(repo: SubscriptionRepository, tenant_repo: TenantRepository, pool: PgPool) -> Self {
        Self { repo, tenant_repo, pool }
    }

    // --- Planos ---

    pub async fn create_plan(
        &self,
        name: &str,
        max_users: i64,
        max_calls: i64,
        price: Decimal,
    ) -> Result<Plan, AppError> {
        self.repo.create_plan(&self.pool, name, max_users, max_calls, price).await
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.repo.list_plans().await
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Plan, AppError> {
        self.repo
            .find_plan(&self.pool, plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)
    }

    pub async fn delete_plan(&self, plan_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_plan(&mut *tx, plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;

        if self.repo.count_subscriptions_for_plan(&mut *tx, plan_id).await? > 0 {
            return Err(AppError::PlanInUse);
        }

        self.repo.delete_plan(&mut *tx, plan_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // --- Assinaturas ---

    /// Troca de plano atômica: a linha do tenant fica travada, a assinatura ativa é
    /// encerrada e a nova é criada na mesma transação.
    pub async fn subscribe(&self, tenant_id: Uuid, plan_id: Uuid) -> Result<ActiveSubscription, AppError> {
        // 1. Inicia Transação
        let mut tx = self.pool.begin().await?;

        // 2. Trava o tenant (serializa trocas concorrentes)
        self.tenant_repo
            .lock_tenant(&mut *tx, tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        // 3. O plano precisa existir
        let plan = self
            .repo
            .find_plan(&mut *tx, plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;

        // 4. Encerra a atual (se houver) e cria a nova
        let ended = self.repo.end_active(&mut *tx, tenant_id).await?;
        let subscription = self.repo.create_subscription(&mut *tx, tenant_id, plan_id).await?;

        // 5. Commit
        tx.commit().await?;

        match ended {
            Some(previous) => tracing::info!(
                "💳 Tenant {} trocou o plano {} pelo plano '{}'",
                tenant_id,
                previous.plan_id,
                plan.name
            ),
            None => tracing::info!("💳 Tenant {} assinou o plano '{}'", tenant_id, plan.name),
        }

        Ok(ActiveSubscription { subscription, plan })
    }

    pub async fn get_active_subscription(&self, tenant_id: Uuid) -> Result<ActiveSubscription, AppError> {
        let subscription = self
            .repo
            .find_active(&self.pool, tenant_id)
            .await?
            .ok_or(AppError::SubscriptionNotFound)?;

        let plan = self.get_plan(subscription.plan_id).await?;
        Ok(ActiveSubscription { subscription, plan })
    }

    pub async fn history(&self, tenant_id: Uuid) -> Result<Vec<Subscription>, AppError> {
        self.repo.list_for_tenant(tenant_id).await
    }
}
