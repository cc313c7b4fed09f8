// tests/common/mod.rs

#![allow(dead_code)]

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use tenant_gate::{config::AppState, db, models::auth::AuthResponse, models::subscription::Plan};

pub const JWT_SECRET: &str = "segredo-de-teste";
pub const PASSWORD: &str = "s3nha-forte";

/// Estado ligado ao banco de `DATABASE_URL`, com as migrações aplicadas.
/// Sem a variável os testes de banco são pulados.
pub async fn setup() -> Option<AppState> {
    dotenvy::dotenv().ok();

    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL não definida: pulando teste de banco");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("falha ao conectar no banco de teste");

    db::run_migrations(&pool).await.expect("falha nas migrações");

    Some(AppState::from_pool(pool, JWT_SECRET))
}

/// Sufixo único para domínios e usernames (testes compartilham o banco).
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Registra um tenant novo e devolve a resposta do admin.
pub async fn register_tenant(state: &AppState, name: &str) -> AuthResponse {
    state
        .auth_service
        .register_tenant(name, &unique(&name.to_lowercase()), &unique("admin"), PASSWORD)
        .await
        .expect("registro do tenant")
}

pub async fn create_plan(state: &AppState, max_users: i64, max_calls: i64) -> Plan {
    state
        .subscription_service
        .create_plan(&unique("plano"), max_users, max_calls, Decimal::new(9990, 2))
        .await
        .expect("criação do plano")
}

/// Concede ao cargo os códigos informados (substituindo os atuais).
pub async fn grant(state: &AppState, tenant_id: Uuid, role_id: Uuid, codes: &[&str]) {
    let mut ids = Vec::new();
    for code in codes {
        let permission = state
            .rbac_service
            .find_permission_by_code(code)
            .await
            .expect("permissão semeada");
        ids.push(permission.id);
    }
    state
        .rbac_service
        .assign_permissions(tenant_id, role_id, &ids)
        .await
        .expect("atribuição de permissões");
}
