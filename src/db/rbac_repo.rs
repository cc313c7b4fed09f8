// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::{map_unique_violation, AppError};
use crate::models::rbac::{Permission, Role, RoleAssignment, RoleResponse, PLATFORM_CODE_PREFIX};

// Cargo + códigos de permissão em uma única consulta (LEFT JOIN + array_agg)
const ROLE_WITH_PERMISSIONS: &str = r#"
    SELECT
        r.id, r.tenant_id, r.name, r.created_at, r.updated_at,
        COALESCE(
            array_agg(p.code ORDER BY p.code) FILTER (WHERE p.code IS NOT NULL),
            '{}'
        ) AS permissions
    FROM roles r
    LEFT JOIN role_permissions rp ON rp.role_id = r.id
    LEFT JOIN permissions p ON p.id = rp.permission_id
"#;

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Cargos
    // ---

    // 1. Criar o Cargo (nome repetido é permitido)
    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (tenant_id, name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(name)
            .fetch_one(executor)
            .await?;

        Ok(role)
    }

    // 2. Buscar o Cargo sempre escopado ao tenant
    pub async fn find_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1 AND tenant_id = $2")
            .bind(role_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(role)
    }

    // 3. Cargo + permissões atuais. Cargo de outro tenant nunca resolve.
    pub async fn find_role_with_permissions(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<RoleResponse>, AppError> {
        let sql = format!("{ROLE_WITH_PERMISSIONS} WHERE r.id = $1 AND r.tenant_id = $2 GROUP BY r.id");
        let role = sqlx::query_as::<_, RoleResponse>(&sql)
            .bind(role_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    pub async fn list_roles(&self, tenant_id: Uuid) -> Result<Vec<RoleResponse>, AppError> {
        let sql = format!(
            "{ROLE_WITH_PERMISSIONS} WHERE r.tenant_id = $1 GROUP BY r.id ORDER BY r.created_at"
        );
        let roles = sqlx::query_as::<_, RoleResponse>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    /// Dos ids pedidos, quais são cargos deste tenant.
    pub async fn find_role_ids_in_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM roles WHERE tenant_id = $1 AND id = ANY($2)",
        )
            .bind(tenant_id)
            .bind(role_ids)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }

    pub async fn count_roles<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1 AND tenant_id = $2")
            .bind(role_id)
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Vínculo Cargo <-> Permissão
    // ---

    pub async fn delete_grants<'e, E>(&self, executor: E, role_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove só as concessões de escopo do tenant; códigos de plataforma ficam.
    pub async fn delete_tenant_grants<'e, E>(&self, executor: E, role_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM role_permissions rp
            USING permissions p
            WHERE rp.permission_id = p.id
              AND rp.role_id = $1
              AND lower(p.code) NOT LIKE $2 || '%'
            "#,
        )
            .bind(role_id)
            .bind(PLATFORM_CODE_PREFIX)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Concede ao cargo as permissões cujos códigos estão na lista (ignora os ausentes do catálogo).
    pub async fn grant_codes<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        codes: &[String],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, id FROM permissions WHERE code = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
            .bind(role_id)
            .bind(codes)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Concede todos os códigos de plataforma do catálogo ao cargo.
    pub async fn grant_platform_codes<'e, E>(&self, executor: E, role_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, id FROM permissions WHERE lower(code) LIKE $2 || '%'
            ON CONFLICT DO NOTHING
            "#,
        )
            .bind(role_id)
            .bind(PLATFORM_CODE_PREFIX)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_grants<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Inserção em massa usando UNNEST para performance
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
            .bind(role_id)
            .bind(permission_ids)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn count_grants_for_permission<'e, E>(
        &self,
        executor: E,
        permission_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM role_permissions WHERE permission_id = $1",
        )
            .bind(permission_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    // ---
    // Catálogo de Permissões (global)
    // ---

    pub async fn create_permission<'e, E>(
        &self,
        executor: E,
        code: &str,
        description: &str,
    ) -> Result<Permission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (code, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
            .bind(code)
            .bind(description)
            .fetch_one(executor)
            .await
            .map_err(map_unique_violation)
    }

    /// Das permissões pedidas, as que existem no catálogo (com o código, para filtrar as de plataforma).
    pub async fn find_permissions<'e, E>(
        &self,
        executor: E,
        permission_ids: &[Uuid],
    ) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ANY($1)")
            .bind(permission_ids)
            .fetch_all(executor)
            .await?;
        Ok(permissions)
    }

    pub async fn find_permission_by_code(&self, code: &str) -> Result<Option<Permission>, AppError> {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(permission)
    }

    pub async fn find_permission<'e, E>(
        &self,
        executor: E,
        permission_id: Uuid,
    ) -> Result<Option<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(permission_id)
            .fetch_optional(executor)
            .await?;
        Ok(permission)
    }

    // Listar todas as permissões disponíveis (para o Frontend montar a tela)
    pub async fn list_all_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    pub async fn delete_permission<'e, E>(
        &self,
        executor: E,
        permission_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(permission_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Atribuições Usuário <-> Cargo (histórico, nunca apagadas)
    // ---

    /// Revoga todas as atribuições ativas do usuário no tenant.
    pub async fn revoke_active_assignments<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE role_assignments
            SET is_active = FALSE, revoked_at = NOW()
            WHERE user_id = $1 AND tenant_id = $2 AND is_active
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Revoga as atribuições ativas de um cargo (antes de excluí-lo).
    pub async fn revoke_assignments_of_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE role_assignments
            SET is_active = FALSE, revoked_at = NOW()
            WHERE tenant_id = $1 AND role_id = $2 AND is_active
            "#,
        )
            .bind(tenant_id)
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Uma linha ativa por cargo informado.
    pub async fn insert_assignments<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<Vec<RoleAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignments = sqlx::query_as::<_, RoleAssignment>(
            r#"
            INSERT INTO role_assignments (user_id, tenant_id, role_id, is_active)
            SELECT $1, $2, unnest($3::uuid[]), TRUE
            RETURNING *
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .bind(role_ids)
            .fetch_all(executor)
            .await?;
        Ok(assignments)
    }

    pub async fn revoke_assignment<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<RoleAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignment = sqlx::query_as::<_, RoleAssignment>(
            r#"
            UPDATE role_assignments
            SET is_active = FALSE, revoked_at = NOW()
            WHERE user_id = $1 AND tenant_id = $2 AND role_id = $3 AND is_active
            RETURNING *
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .bind(role_id)
            .fetch_optional(executor)
            .await?;
        Ok(assignment)
    }

    /// Cargos com atribuição ativa para o usuário no tenant.
    pub async fn active_roles_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RoleResponse>, AppError> {
        let sql = format!(
            r#"{ROLE_WITH_PERMISSIONS}
            JOIN role_assignments ra
              ON ra.role_id = r.id AND ra.tenant_id = r.tenant_id AND ra.is_active
            WHERE ra.user_id = $1 AND r.tenant_id = $2
            GROUP BY r.id
            ORDER BY r.name"#
        );
        let roles = sqlx::query_as::<_, RoleResponse>(&sql)
            .bind(user_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    /// Histórico completo (ativas e revogadas) do usuário no tenant.
    pub async fn assignment_history(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, AppError> {
        let assignments = sqlx::query_as::<_, RoleAssignment>(
            r#"
            SELECT * FROM role_assignments
            WHERE user_id = $1 AND tenant_id = $2
            ORDER BY assigned_at, id
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(assignments)
    }
}
