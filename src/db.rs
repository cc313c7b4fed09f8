pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod subscription_repo;
pub use subscription_repo::SubscriptionRepository;
pub mod call_repo;
pub use call_repo::CallRepository;

use sqlx::{migrate::Migrator, PgPool};

use crate::common::error::AppError;

// Migrações embutidas no binário (pasta ./migrations)
pub static MIGRATOR: Migrator = sqlx::migrate!();

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}
