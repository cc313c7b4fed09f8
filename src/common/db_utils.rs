// src/common/db_utils.rs

use std::collections::HashSet;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helpers de Lock: serializam "ler e escrever" por chave
// ---
/// Advisory lock transacional sobre `chave`.
/// É liberado sozinho no COMMIT/ROLLBACK, por isso exige uma conexão dentro de transação.
async fn advisory_xact_lock(conn: &mut PgConnection, key: String) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(key)
        .execute(conn)
        .await?;

    Ok(())
}

/// Contagem de cota + inserção do recurso, por tenant.
pub(crate) async fn lock_tenant_quota(
    conn: &mut PgConnection,
    tenant_id: Uuid,
) -> Result<(), AppError> {
    advisory_xact_lock(conn, format!("quota:{tenant_id}")).await
}

/// Troca de cargos de um usuário dentro de um tenant.
pub(crate) async fn lock_user_roles(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    advisory_xact_lock(conn, format!("roles:{user_id}:{tenant_id}")).await
}

/// Remove duplicados preservando a ordem de entrada.
pub(crate) fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Diferença de conjuntos: quais ids pedidos não foram encontrados.
pub(crate) fn missing_ids(requested: &[Uuid], found: &[Uuid]) -> Vec<Uuid> {
    let found: HashSet<&Uuid> = found.iter().collect();
    distinct_ids(requested)
        .into_iter()
        .filter(|id| !found.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicated_input_does_not_count_as_missing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(missing_ids(&[a, a, b], &[a, b]).is_empty());
        assert_eq!(distinct_ids(&[a, a, b, a]), vec![a, b]);
    }

    #[test]
    fn reports_exactly_the_absent_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert_eq!(missing_ids(&[a, b, c, c], &[b]), vec![a, c]);
        assert!(missing_ids(&[], &[a]).is_empty());
    }
}
