// src/db/subscription_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::subscription::{Plan, Subscription};

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Planos
    // ---

    pub async fn create_plan<'e, E>(
        &self,
        executor: E,
        name: &str,
        max_users: i64,
        max_calls: i64,
        price: Decimal,
    ) -> Result<Plan, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (name, max_users, max_calls, price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(name)
            .bind(max_users)
            .bind(max_calls)
            .bind(price)
            .fetch_one(executor)
            .await?;
        Ok(plan)
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>("SELECT * FROM plans ORDER BY price, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(plans)
    }

    pub async fn find_plan<'e, E>(&self, executor: E, plan_id: Uuid) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(executor)
            .await?;
        Ok(plan)
    }

    /// Ativas e encerradas: qualquer assinatura prende o plano.
    pub async fn count_subscriptions_for_plan<'e, E>(
        &self,
        executor: E,
        plan_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscriptions WHERE plan_id = $1",
        )
            .bind(plan_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_plan<'e, E>(&self, executor: E, plan_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Assinaturas antigas (já encerradas) também prendem o plano pela FK
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(plan_id)
            .execute(executor)
            .await
            .map_err(|e| {
                let referenced = matches!(&e, sqlx::Error::Database(db) if db.is_foreign_key_violation());
                if referenced { AppError::PlanInUse } else { e.into() }
            })?;
        Ok(result.rows_affected())
    }

    // ---
    // Assinaturas
    // ---

    /// A única assinatura ativa do tenant (garantida pelo índice parcial).
    pub async fn find_active<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE tenant_id = $1 AND is_active",
        )
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(subscription)
    }

    /// Encerra a assinatura ativa (is_active = false, ended_at = agora), se houver.
    pub async fn end_active<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ended = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET is_active = FALSE, ended_at = NOW()
            WHERE tenant_id = $1 AND is_active
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(ended)
    }

    pub async fn create_subscription<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (tenant_id, plan_id, is_active, started_at)
            VALUES ($1, $2, TRUE, NOW())
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(plan_id)
            .fetch_one(executor)
            .await?;
        Ok(subscription)
    }

    pub async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Subscription>, AppError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE tenant_id = $1 ORDER BY started_at, id",
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(subscriptions)
    }
}
