// src/services/rbac_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::db_utils::{distinct_ids, lock_user_roles, missing_ids};
use crate::common::error::AppError;
use crate::db::{RbacRepository, UserRepository};
use crate::models::rbac::{is_platform_code, Permission, RoleAssignment, RoleResponse};

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl RbacService {
    pub fn new(repo: RbacRepository, user_repo: UserRepository, pool: PgPool) -> Self {
        Self { repo, user_repo, pool }
    }

    // ---
    // Cargos
    // ---

    pub async fn create_role(&self, tenant_id: Uuid, name: &str) -> Result<RoleResponse, AppError> {
        let role = self.repo.create_role(&self.pool, tenant_id, name).await?;
        Ok(RoleResponse { role, permissions: Vec::new() })
    }

    pub async fn list_roles(&self, tenant_id: Uuid) -> Result<Vec<RoleResponse>, AppError> {
        self.repo.list_roles(tenant_id).await
    }

    pub async fn get_role(&self, tenant_id: Uuid, role_id: Uuid) -> Result<RoleResponse, AppError> {
        self.repo
            .find_role_with_permissions(tenant_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)
    }

    /// Bloqueado enquanto o cargo for o principal de algum usuário.
    /// Atribuições antigas ficam no histórico com o id do cargo excluído.
    pub async fn delete_role(&self, tenant_id: Uuid, role_id: Uuid) -> Result<(), AppError> {
        // 1. Inicia Transação
        let mut tx = self.pool.begin().await?;

        // 2. O cargo precisa existir neste tenant
        self.repo
            .find_role(&mut *tx, tenant_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        // 3. Ninguém pode tê-lo como cargo principal
        let holders = self.user_repo.count_with_primary_role(&mut *tx, tenant_id, role_id).await?;
        if holders > 0 {
            return Err(AppError::RoleInUse);
        }

        // 4. Revoga atribuições ativas, limpa o vínculo com permissões e exclui
        self.repo.revoke_assignments_of_role(&mut *tx, tenant_id, role_id).await?;
        self.repo.delete_grants(&mut *tx, role_id).await?;
        self.repo.delete_role(&mut *tx, tenant_id, role_id).await?;

        // 5. Commit
        tx.commit().await?;

        tracing::info!("🗑️ Cargo {} excluído do tenant {}", role_id, tenant_id);
        Ok(())
    }

    /// Substitui o conjunto de permissões do cargo. Repetir a mesma lista não muda nada.
    /// Códigos de plataforma (`admin.*`) nunca entram por aqui e os já concedidos ficam.
    pub async fn assign_permissions(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<RoleResponse, AppError> {
        self.repo
            .find_role(&self.pool, tenant_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        let requested = distinct_ids(permission_ids);
        self.grantable_permissions(&requested).await?;

        let mut tx = self.pool.begin().await?;
        self.repo.delete_tenant_grants(&mut *tx, role_id).await?;
        if !requested.is_empty() {
            self.repo.insert_grants(&mut *tx, role_id, &requested).await?;
        }
        tx.commit().await?;

        self.get_role(tenant_id, role_id).await
    }

    /// Concessão incremental: soma uma permissão ao cargo sem tocar nas demais.
    pub async fn grant_permission(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<RoleResponse, AppError> {
        self.repo
            .find_role(&self.pool, tenant_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        let permissions = self.grantable_permissions(&[permission_id]).await?;
        self.repo.insert_grants(&self.pool, role_id, &[permission_id]).await?;

        if let Some(permission) = permissions.first() {
            tracing::info!("➕ Permissão '{}' concedida ao cargo {}", permission.code, role_id);
        }

        self.get_role(tenant_id, role_id).await
    }

    /// Concede os códigos de plataforma ao cargo principal de `username`.
    /// Só é chamado na inicialização do servidor, fora de qualquer rota.
    pub async fn grant_platform_permissions(&self, username: &str) -> Result<u64, AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let granted = self.repo.grant_platform_codes(&self.pool, user.role_id).await?;
        tracing::info!(
            "🛡️ Cargo {} de '{}' recebeu {} permissões de plataforma",
            user.role_id,
            username,
            granted
        );
        Ok(granted)
    }

    // Os ids precisam existir no catálogo e nenhum pode ser de plataforma
    async fn grantable_permissions(&self, requested: &[Uuid]) -> Result<Vec<Permission>, AppError> {
        let permissions = self.repo.find_permissions(&self.pool, requested).await?;

        // Diferença de conjuntos sobre a entrada sem duplicados
        let found: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        let missing = missing_ids(requested, &found);
        if !missing.is_empty() {
            return Err(AppError::PermissionsNotFound(missing));
        }

        let platform: Vec<String> = permissions
            .iter()
            .filter(|p| is_platform_code(&p.code))
            .map(|p| p.code.clone())
            .collect();
        if !platform.is_empty() {
            tracing::warn!("⛔ Tentativa de conceder permissões de plataforma: {:?}", platform);
            return Err(AppError::PlatformPermissions(platform));
        }

        Ok(permissions)
    }

    // ---
    // Catálogo de permissões
    // ---

    pub async fn create_permission(&self, code: &str, description: &str) -> Result<Permission, AppError> {
        self.repo.create_permission(&self.pool, code, description).await
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo.list_all_permissions().await
    }

    pub async fn get_permission(&self, permission_id: Uuid) -> Result<Permission, AppError> {
        self.repo
            .find_permission(&self.pool, permission_id)
            .await?
            .ok_or(AppError::PermissionNotFound)
    }

    pub async fn find_permission_by_code(&self, code: &str) -> Result<Permission, AppError> {
        self.repo
            .find_permission_by_code(code)
            .await?
            .ok_or(AppError::PermissionNotFound)
    }

    pub async fn delete_permission(&self, permission_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_permission(&mut *tx, permission_id)
            .await?
            .ok_or(AppError::PermissionNotFound)?;

        if self.repo.count_grants_for_permission(&mut *tx, permission_id).await? > 0 {
            return Err(AppError::PermissionInUse);
        }

        self.repo.delete_permission(&mut *tx, permission_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // ---
    // Atribuições de cargos a usuários
    // ---

    /// Desativa todas as atribuições ativas do usuário no tenant e cria uma por cargo informado.
    pub async fn assign_roles_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<Vec<RoleAssignment>, AppError> {
        self.ensure_user_in_tenant(tenant_id, user_id).await?;

        let requested = distinct_ids(role_ids);
        let found = self.repo.find_role_ids_in_tenant(&self.pool, tenant_id, &requested).await?;
        let missing = missing_ids(&requested, &found);
        if !missing.is_empty() {
            return Err(AppError::RolesNotFound(missing));
        }

        // Duas redefinições simultâneas não podem deixar dois conjuntos ativos
        let mut tx = self.pool.begin().await?;
        lock_user_roles(&mut *tx, tenant_id, user_id).await?;
        let revoked = self.repo.revoke_active_assignments(&mut *tx, user_id, tenant_id).await?;
        let assignments = self
            .repo
            .insert_assignments(&mut *tx, user_id, tenant_id, &requested)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "🔁 Cargos do usuário {} no tenant {} redefinidos ({} revogados, {} atribuídos)",
            user_id,
            tenant_id,
            revoked,
            assignments.len()
        );

        Ok(assignments)
    }

    pub async fn get_user_roles(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Vec<RoleResponse>, AppError> {
        self.ensure_user_in_tenant(tenant_id, user_id).await?;
        self.repo.active_roles_for_user(tenant_id, user_id).await
    }

    pub async fn assignment_history(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, AppError> {
        self.ensure_user_in_tenant(tenant_id, user_id).await?;
        self.repo.assignment_history(tenant_id, user_id).await
    }

    pub async fn remove_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<RoleAssignment, AppError> {
        self.ensure_user_in_tenant(tenant_id, user_id).await?;

        self.repo
            .find_role(&self.pool, tenant_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        let mut tx = self.pool.begin().await?;
        lock_user_roles(&mut *tx, tenant_id, user_id).await?;
        let revoked = self
            .repo
            .revoke_assignment(&mut *tx, user_id, tenant_id, role_id)
            .await?
            .ok_or(AppError::AssignmentNotFound)?;
        tx.commit().await?;

        Ok(revoked)
    }

    // ---
    // Ponto de decisão
    // ---

    /// Allow (Ok) se o cargo, resolvido dentro do tenant, concede `required_code`.
    /// Cargo de outro tenant ou inexistente é sempre Forbidden, nunca NotFound.
    pub async fn authorize(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        required_code: &str,
    ) -> Result<(), AppError> {
        let Some(role) = self.repo.find_role_with_permissions(tenant_id, role_id).await? else {
            tracing::warn!("⛔ Cargo {} não pertence ao tenant {}", role_id, tenant_id);
            return Err(AppError::Forbidden("Cargo inválido para este tenant.".into()));
        };

        if !role.grants(required_code) {
            tracing::warn!(
                "⛔ Cargo '{}' ({}) sem a permissão '{}'",
                role.role.name,
                role_id,
                required_code
            );
            return Err(AppError::Forbidden(format!(
                "Você precisa da permissão '{}' para realizar esta ação.",
                required_code
            )));
        }

        Ok(())
    }

    async fn ensure_user_in_tenant(&self, tenant_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.user_repo
            .find_in_tenant(&self.pool, tenant_id, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        Ok(())
    }
}
