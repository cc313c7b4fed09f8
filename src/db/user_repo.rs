// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::{map_unique_violation, AppError};
use crate::models::auth::User;

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu username (único globalmente)
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(maybe_user)
    }

    /// Usuário "pertence" ao tenant se nasceu nele ou tem vínculo ativo com ele.
    pub async fn find_in_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.*
            FROM users u
            WHERE u.id = $1
              AND (
                u.tenant_id = $2
                OR EXISTS (
                    SELECT 1 FROM tenant_memberships m
                    WHERE m.user_id = u.id AND m.tenant_id = $2 AND m.is_active
                )
              )
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(maybe_user)
    }

    /// Usuários nascidos no tenant ou com vínculo ativo com ele.
    pub async fn list_in_tenant(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.*
            FROM users u
            WHERE u.tenant_id = $1
               OR EXISTS (
                    SELECT 1 FROM tenant_memberships m
                    WHERE m.user_id = u.id AND m.tenant_id = $1 AND m.is_active
               )
            ORDER BY u.created_at, u.id
            "#,
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    // Cria um novo usuário no banco de dados
    // Username duplicado vira AppError::UsernameTaken.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        username: &str,
        password_hash: &str,
        role_id: Uuid,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (tenant_id, username, password_hash, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(username)
            .bind(password_hash)
            .bind(role_id)
            .fetch_one(executor)
            .await
            .map_err(map_unique_violation)
    }

    /// Quantos usuários do tenant têm este cargo como cargo principal.
    pub async fn count_with_primary_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND role_id = $2",
        )
            .bind(tenant_id)
            .bind(role_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn count_homed_in_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    // Exclusão definitiva; vínculos e atribuições saem junto (ON DELETE CASCADE)
    pub async fn delete_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
