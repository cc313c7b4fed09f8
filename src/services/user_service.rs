// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::lock_tenant_quota, error::AppError},
    db::UserRepository,
    models::auth::User,
};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(user_repo: UserRepository, pool: PgPool) -> Self {
        Self { user_repo, pool }
    }

    pub async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError> {
        self.user_repo.list_in_tenant(tenant_id).await
    }

    pub async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_in_tenant(&self.pool, tenant_id, user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Exclusão definitiva de um usuário nascido neste tenant.
    /// Membro vindo de outro tenant não é apagado daqui: só o vínculo sai (DELETE /members).
    pub async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        // 1. Transação sob o lock de cota (a vaga liberada não pode ser contada pela metade)
        let mut tx = self.pool.begin().await?;
        lock_tenant_quota(&mut *tx, tenant_id).await?;

        // 2. Pré-checagens
        let user = self
            .user_repo
            .find_in_tenant(&mut *tx, tenant_id, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if user.tenant_id != tenant_id {
            return Err(AppError::ForeignUser);
        }

        // 3. Exclui; vínculos e atribuições vão junto
        self.user_repo.delete_user(&mut *tx, user_id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Usuário '{}' ({}) excluído do tenant {}", user.username, user_id, tenant_id);
        Ok(())
    }
}
