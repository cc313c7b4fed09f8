// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::subscription::ResourceKind;

// Um único tipo de erro para toda a aplicação.
// Cada variante corresponde a uma falha nomeada que a camada HTTP sabe mapear.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    // --- Autenticação ---
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Usuário sem vínculo ativo com o tenant")]
    InactiveMembership,

    // Malformado, expirado ou forjado: sempre a mesma variante.
    #[error("Token inválido")]
    InvalidToken,

    // --- Autorização ---
    #[error("Acesso negado: {0}")]
    Forbidden(String),

    // Códigos `admin.*` só são concedidos fora das rotas de tenant
    #[error("Permissões de plataforma não podem ser concedidas por um tenant")]
    PlatformPermissions(Vec<String>),

    // --- Não encontrado ---
    #[error("Tenant não encontrado")]
    TenantNotFound,

    #[error("Cargo não encontrado")]
    RoleNotFound,

    #[error("Um ou mais cargos não existem neste tenant")]
    RolesNotFound(Vec<Uuid>),

    #[error("Permissão não encontrada")]
    PermissionNotFound,

    #[error("Uma ou mais permissões não existem")]
    PermissionsNotFound(Vec<Uuid>),

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Assinatura não encontrada")]
    SubscriptionNotFound,

    #[error("Plano não encontrado")]
    PlanNotFound,

    #[error("Atribuição de cargo não encontrada")]
    AssignmentNotFound,

    #[error("Vínculo com o tenant não encontrado")]
    MembershipNotFound,

    #[error("Chamada não encontrada")]
    CallNotFound,

    // --- Conflitos ---
    #[error("Domínio já está em uso")]
    DomainTaken,

    #[error("Nome de usuário já existe")]
    UsernameTaken,

    #[error("Código de permissão já existe")]
    PermissionCodeTaken,

    #[error("Cargo ainda atribuído a usuários")]
    RoleInUse,

    #[error("Permissão ainda atribuída a cargos")]
    PermissionInUse,

    #[error("Plano possui assinaturas (ativas ou encerradas)")]
    PlanInUse,

    #[error("Tenant ainda possui {0}")]
    TenantInUse(&'static str),

    #[error("Usuário já possui vínculo ativo com o tenant")]
    MembershipExists,

    #[error("Usuário pertence a outro tenant; remova apenas o vínculo")]
    ForeignUser,

    // --- Cotas ---
    #[error("Cota excedida: {0}")]
    QuotaExceeded(ResourceKind),

    #[error("Tenant sem assinatura ativa")]
    NoActiveSubscription,

    // --- Infraestrutura ---
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de migração: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Código estável, legível por máquina, enviado junto da mensagem.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => "bad_request",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InactiveMembership => "inactive_membership",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden(_) | AppError::PlatformPermissions(_) => "forbidden",
            AppError::TenantNotFound
            | AppError::RoleNotFound
            | AppError::RolesNotFound(_)
            | AppError::PermissionNotFound
            | AppError::PermissionsNotFound(_)
            | AppError::UserNotFound
            | AppError::SubscriptionNotFound
            | AppError::PlanNotFound
            | AppError::AssignmentNotFound
            | AppError::MembershipNotFound
            | AppError::CallNotFound => "not_found",
            AppError::DomainTaken
            | AppError::UsernameTaken
            | AppError::PermissionCodeTaken
            | AppError::RoleInUse
            | AppError::PermissionInUse
            | AppError::PlanInUse
            | AppError::TenantInUse(_)
            | AppError::MembershipExists
            | AppError::ForeignUser => "conflict",
            AppError::QuotaExceeded(_) => "quota_exceeded",
            AppError::NoActiveSubscription => "no_active_subscription",
            AppError::DatabaseError(_)
            | AppError::MigrationError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            "bad_request" => StatusCode::BAD_REQUEST,
            "invalid_credentials" | "invalid_token" => StatusCode::UNAUTHORIZED,
            "inactive_membership" | "forbidden" | "no_active_subscription" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "quota_exceeded" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::RolesNotFound(missing) | AppError::PermissionsNotFound(missing) => {
                Some(json!({ "missing": missing }))
            }
            AppError::PlatformPermissions(codes) => Some(json!({ "codes": codes })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Erros de infraestrutura: loga o detalhe, devolve mensagem genérica.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "error": message,
            "code": self.kind(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

/// Traduz violação de UNIQUE (pelo nome da constraint) no conflito correspondente.
pub(crate) fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if let Some(constraint) = db_err.constraint() {
                return match constraint {
                    "tenants_domain_key" => AppError::DomainTaken,
                    "users_username_key" => AppError::UsernameTaken,
                    "permissions_code_key" => AppError::PermissionCodeTaken,
                    "tenant_memberships_one_active" => AppError::MembershipExists,
                    _ => AppError::DatabaseError(e),
                };
            }
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_401_and_403() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InactiveMembership.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn quota_and_subscription_failures() {
        assert_eq!(
            AppError::QuotaExceeded(ResourceKind::Calls).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(AppError::NoActiveSubscription.kind(), "no_active_subscription");
        assert_eq!(AppError::NoActiveSubscription.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn in_use_deletions_are_conflicts() {
        for err in [
            AppError::RoleInUse,
            AppError::PermissionInUse,
            AppError::PlanInUse,
            AppError::TenantInUse("usuários"),
            AppError::DomainTaken,
            AppError::ForeignUser,
        ] {
            assert_eq!(err.status(), StatusCode::CONFLICT, "{err}");
        }
    }

    #[test]
    fn missing_ids_are_reported_in_details() {
        let id = Uuid::new_v4();
        let err = AppError::PermissionsNotFound(vec![id]);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let details = err.details().unwrap_or_default();
        assert_eq!(details["missing"][0], json!(id));
    }

    #[test]
    fn platform_grant_refusal_is_forbidden_and_names_the_codes() {
        let err = AppError::PlatformPermissions(vec!["admin.plan.create".into()]);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.kind(), "forbidden");
        let details = err.details().unwrap_or_default();
        assert_eq!(details["codes"][0], "admin.plan.create");
    }
}
