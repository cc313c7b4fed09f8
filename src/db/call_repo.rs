// src/db/call_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::calls::Call;

#[derive(Clone)]
pub struct CallRepository {
    pool: PgPool,
}

impl CallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_call<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        caller: &str,
        callee: &str,
        billsec: i32,
        recording_url: Option<&str>,
        cost: Decimal,
    ) -> Result<Call, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let call = sqlx::query_as::<_, Call>(
            r#"
            INSERT INTO calls (tenant_id, caller, callee, billsec, recording_url, cost)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(caller)
            .bind(callee)
            .bind(billsec)
            .bind(recording_url)
            .bind(cost)
            .fetch_one(executor)
            .await?;
        Ok(call)
    }

    pub async fn list_calls(&self, tenant_id: Uuid) -> Result<Vec<Call>, AppError> {
        let calls = sqlx::query_as::<_, Call>(
            r#"
            SELECT * FROM calls
            WHERE tenant_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(calls)
    }

    pub async fn find_call(&self, tenant_id: Uuid, call_id: Uuid) -> Result<Option<Call>, AppError> {
        let call = sqlx::query_as::<_, Call>(
            "SELECT * FROM calls WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
            .bind(call_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(call)
    }

    /// Exclusão lógica: a chamada some das listagens e da cota.
    pub async fn soft_delete(&self, tenant_id: Uuid, call_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE calls SET deleted_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            "#,
        )
            .bind(call_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Contagem vitalícia (não é janela móvel) das chamadas não excluídas.
    pub async fn count_live_calls<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM calls WHERE tenant_id = $1 AND deleted_at IS NULL",
        )
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }
}
