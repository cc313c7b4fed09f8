// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::{map_unique_violation, AppError};
use crate::models::tenancy::{Tenant, TenantMember, TenantMembership};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria um novo tenant. Domínio repetido vira AppError::DomainTaken.
    pub async fn create_tenant<'e, E>(
        &self,
        executor: E, // Aceita um executor (pool ou transação)
        name: &str,
        domain: &str,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, domain)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
            .bind(name)
            .bind(domain)
            .fetch_one(executor)
            .await
            .map_err(map_unique_violation)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Tenant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(tenant)
    }

    /// Trava a linha do tenant até o fim da transação (SELECT ... FOR UPDATE).
    pub async fn lock_tenant<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Tenant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(tenant)
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(tenants)
    }

    pub async fn delete_tenant<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Vínculos (tenant_memberships)
    // ---

    /// Novo vínculo ativo. Se já houver um ativo, o índice parcial acusa MembershipExists.
    pub async fn create_membership<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<TenantMembership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TenantMembership>(
            r#"
            INSERT INTO tenant_memberships (user_id, tenant_id, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING *
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_one(executor)
            .await
            .map_err(map_unique_violation)
    }

    pub async fn find_active_membership<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<TenantMembership>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, TenantMembership>(
            r#"
            SELECT * FROM tenant_memberships
            WHERE user_id = $1 AND tenant_id = $2 AND is_active
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(membership)
    }

    /// Desativa o vínculo ativo (is_active = false, left_at = agora).
    pub async fn deactivate_membership<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<TenantMembership>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, TenantMembership>(
            r#"
            UPDATE tenant_memberships
            SET is_active = FALSE, left_at = NOW()
            WHERE user_id = $1 AND tenant_id = $2 AND is_active
            RETURNING *
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(membership)
    }

    pub async fn count_active_memberships<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tenant_memberships WHERE tenant_id = $1 AND is_active",
        )
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Histórico completo de vínculos do tenant (ativos e encerrados).
    pub async fn list_members(&self, tenant_id: Uuid) -> Result<Vec<TenantMember>, AppError> {
        let members = sqlx::query_as::<_, TenantMember>(
            r#"
            SELECT m.user_id, u.username, m.is_active, m.joined_at, m.left_at
            FROM tenant_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.tenant_id = $1
            ORDER BY m.joined_at
            "#,
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }
}
