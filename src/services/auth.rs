// src/services/auth.rs

use std::sync::OnceLock;

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{RbacRepository, TenantRepository, UserRepository},
    models::auth::{AuthResponse, Claims, Identity, User},
    models::rbac::TENANT_ADMIN_CODES,
    models::subscription::ResourceKind,
    services::quota_service::QuotaService,
};

// Validade fixa do token
pub const TOKEN_TTL_HOURS: i64 = 24;

// Nome do cargo criado junto com cada tenant
const ADMIN_ROLE_NAME: &str = "Admin";

// Hash usado quando o username não existe, para o login custar o mesmo bcrypt
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Chaves HS256 derivadas do JWT_SECRET. Emite e verifica tokens sem tocar no banco.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, AppError> {
        let expires_at = now + Duration::hours(TOKEN_TTL_HOURS);

        let claims = Claims {
            sub: user.id,
            tenant_id: user.tenant_id,
            role_id: user.role_id,
            username: user.username.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Assinatura, estrutura e expiração (sem tolerância).
    /// Qualquer falha vira `InvalidToken`, sem distinguir o motivo.
    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let token_data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|_| AppError::InvalidToken)?;

        Ok(Identity::from(token_data.claims))
    }
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tenant_repo: TenantRepository,
    rbac_repo: RbacRepository,
    quota_service: QuotaService,
    keys: TokenKeys,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        tenant_repo: TenantRepository,
        rbac_repo: RbacRepository,
        quota_service: QuotaService,
        keys: TokenKeys,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, tenant_repo, rbac_repo, quota_service, keys, pool }
    }

    /// Cria tenant + cargo Admin + usuário + vínculo + atribuição, tudo ou nada.
    pub async fn register_tenant(
        &self,
        tenant_name: &str,
        domain: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, AppError> {
        // 1. Hashing fora da transação (não toca no banco)
        let hashed_password = hash_password(password).await?;

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // 2. Tenant
        let tenant = self.tenant_repo.create_tenant(&mut *tx, tenant_name, domain).await?;

        // 3. Cargo Admin com os códigos de gestão do próprio tenant (nenhum de plataforma)
        let admin_role = self.rbac_repo.create_role(&mut *tx, tenant.id, ADMIN_ROLE_NAME).await?;
        let admin_codes: Vec<String> = TENANT_ADMIN_CODES.iter().map(|c| c.to_string()).collect();
        self.rbac_repo.grant_codes(&mut *tx, admin_role.id, &admin_codes).await?;

        // 4. Usuário administrador (tenant de origem = o novo tenant)
        let user = self
            .user_repo
            .create_user(&mut *tx, tenant.id, username, &hashed_password, admin_role.id)
            .await?;

        // 5. Vínculo ativo + atribuição ativa
        self.tenant_repo.create_membership(&mut *tx, user.id, tenant.id).await?;
        self.rbac_repo
            .insert_assignments(&mut *tx, user.id, tenant.id, &[admin_role.id])
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!("🏢 Tenant '{}' registrado ({}) com o admin '{}'", tenant.name, tenant.id, user.username);

        let token = self.keys.issue(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Cadastra um usuário no tenant do chamador, respeitando a cota de usuários.
    pub async fn register_user(
        &self,
        tenant_id: Uuid,
        username: &str,
        password: &str,
        role_id: Uuid,
    ) -> Result<AuthResponse, AppError> {
        self.tenant_repo
            .find_by_id(&self.pool, tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        self.rbac_repo
            .find_role(&self.pool, tenant_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        let hashed_password = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        // Cota revalidada sob o lock do tenant
        self.quota_service
            .enforce_locked(&mut *tx, tenant_id, ResourceKind::Users)
            .await?;

        let user = self
            .user_repo
            .create_user(&mut *tx, tenant_id, username, &hashed_password, role_id)
            .await?;
        self.tenant_repo.create_membership(&mut *tx, user.id, tenant_id).await?;
        self.rbac_repo
            .insert_assignments(&mut *tx, user.id, tenant_id, &[role_id])
            .await?;

        tx.commit().await?;

        tracing::info!("👤 Usuário '{}' cadastrado no tenant {}", user.username, tenant_id);

        let token = self.keys.issue(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AppError> {
        let maybe_user = self.user_repo.find_by_username(username).await?;

        // Username desconhecido também paga o bcrypt
        let stored_hash = maybe_user.as_ref().map(|u| u.password_hash.clone());
        let is_password_valid = verify_password(password, stored_hash).await?;

        let user = match maybe_user {
            Some(user) if is_password_valid => user,
            _ => return Err(AppError::InvalidCredentials),
        };

        // Sem vínculo ativo com o tenant de origem não há login
        self.tenant_repo
            .find_active_membership(&self.pool, user.id, user.tenant_id)
            .await?
            .ok_or(AppError::InactiveMembership)?;

        let token = self.keys.issue(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub fn verify_token(&self, token: &str) -> Result<Identity, AppError> {
        self.keys.verify(token)
    }
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

/// Sem hash armazenado, verifica contra o hash fictício e responde `false`.
async fn verify_password(password: &str, stored_hash: Option<String>) -> Result<bool, AppError> {
    let password_clone = password.to_owned();

    // Executa a verificação em um thread separado
    let is_valid = tokio::task::spawn_blocking(move || -> Result<bool, BcryptError> {
        match stored_hash {
            Some(stored) => verify(&password_clone, &stored),
            None => {
                verify(&password_clone, dummy_hash()?)?;
                Ok(false)
            }
        }
    })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

    Ok(is_valid)
}

fn dummy_hash() -> Result<&'static str, BcryptError> {
    if let Some(cached) = DUMMY_HASH.get() {
        return Ok(cached);
    }
    let fresh = hash("tenant-gate-sem-usuario", DEFAULT_COST)?;
    Ok(DUMMY_HASH.get_or_init(|| fresh))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            username: "alice".into(),
            password_hash: String::new(),
            role_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies_to_the_same_identity() {
        let keys = TokenKeys::new("segredo-de-teste");
        let user = user();

        let token = keys.issue(&user).unwrap();
        let identity = keys.verify(&token).unwrap();

        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.tenant_id, user.tenant_id);
        assert_eq!(identity.role_id, user.role_id);
        assert_eq!(identity.username, "alice");
    }

    #[test]
    fn token_older_than_ttl_is_rejected() {
        let keys = TokenKeys::new("segredo-de-teste");
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS + 1);

        let token = keys.issue_at(&user(), issued).unwrap();

        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let forged = TokenKeys::new("outro-segredo").issue(&user()).unwrap();
        let keys = TokenKeys::new("segredo-de-teste");

        assert!(matches!(keys.verify(&forged), Err(AppError::InvalidToken)));
    }

    #[test]
    fn garbage_is_an_invalid_token() {
        let keys = TokenKeys::new("segredo-de-teste");

        for token in ["", "abc", "a.b.c", "Bearer x.y.z"] {
            assert!(matches!(keys.verify(token), Err(AppError::InvalidToken)), "{token}");
        }
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let keys = TokenKeys::new("segredo-de-teste");
        let token = keys.issue(&user()).unwrap();

        // Troca o payload por outro emitido com a mesma chave, mantendo a assinatura antiga
        let other = keys.issue(&user()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(keys.verify(&tampered), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn unknown_user_runs_bcrypt_and_never_matches() {
        assert!(!verify_password("qualquer-senha", None).await.unwrap());
        assert!(DUMMY_HASH.get().is_some_and(|h| h.starts_with("$2")));

        // O hash fictício é reaproveitado
        let first = dummy_hash().unwrap();
        assert_eq!(first, dummy_hash().unwrap());
    }

    #[tokio::test]
    async fn stored_hash_is_checked_against_the_password() {
        let stored = hash_password("senha-certa").await.unwrap();

        assert!(verify_password("senha-certa", Some(stored.clone())).await.unwrap());
        assert!(!verify_password("senha-errada", Some(stored)).await.unwrap());
    }
}
