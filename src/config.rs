// src/config.rs

use crate::{
    db::{CallRepository, RbacRepository, SubscriptionRepository, TenantRepository, UserRepository},
    services::{
        auth::{AuthService, TokenKeys},
        call_service::CallService,
        quota_service::QuotaService,
        rbac_service::RbacService,
        subscription_service::SubscriptionService,
        tenancy_service::TenantService,
        user_service::UserService,
    },
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

/// Configuração lida do ambiente (.env é carregado antes, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    // Usuário cujo cargo principal recebe os códigos admin.* na subida
    pub platform_admin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DB_MAX_CONNECTIONS inválido")?
            .unwrap_or(5);

        let acquire_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("DB_ACQUIRE_TIMEOUT_SECS inválido")?
            .unwrap_or(3);

        let platform_admin = env::var("PLATFORM_ADMIN_USERNAME").ok().filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url,
            jwt_secret,
            server_addr,
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(acquire_secs),
            platform_admin,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub rbac_service: RbacService,
    pub user_service: UserService,
    pub tenant_service: TenantService,
    pub subscription_service: SubscriptionService,
    pub quota_service: QuotaService,
    pub call_service: CallService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, &config.jwt_secret))
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn from_pool(db_pool: PgPool, jwt_secret: &str) -> Self {
        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let subscription_repo = SubscriptionRepository::new(db_pool.clone());
        let call_repo = CallRepository::new(db_pool.clone());

        // --- Serviços ---
        let quota_service = QuotaService::new(
            subscription_repo.clone(),
            tenant_repo.clone(),
            call_repo.clone(),
            db_pool.clone(),
        );
        let auth_service = AuthService::new(
            user_repo.clone(),
            tenant_repo.clone(),
            rbac_repo.clone(),
            quota_service.clone(),
            TokenKeys::new(jwt_secret),
            db_pool.clone(),
        );
        let rbac_service = RbacService::new(rbac_repo.clone(), user_repo.clone(), db_pool.clone());
        let user_service = UserService::new(user_repo.clone(), db_pool.clone());
        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            user_repo,
            rbac_repo,
            call_repo.clone(),
            quota_service.clone(),
            db_pool.clone(),
        );
        let subscription_service =
            SubscriptionService::new(subscription_repo, tenant_repo, db_pool.clone());
        let call_service = CallService::new(call_repo, quota_service.clone(), db_pool.clone());

        Self {
            db_pool,
            auth_service,
            rbac_service,
            user_service,
            tenant_service,
            subscription_service,
            quota_service,
            call_service,
        }
    }
}
