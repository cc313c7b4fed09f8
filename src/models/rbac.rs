// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// O que sai do banco (Tabela Roles)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[schema(example = "Admin")]
    pub name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Prefixo dos códigos de plataforma: valem para todos os tenants,
// por isso nunca são concedidos pelas rotas de um tenant.
pub const PLATFORM_CODE_PREFIX: &str = "admin.";

// Concedidos ao cargo Admin de todo tenant recém-registrado
pub const TENANT_ADMIN_CODES: &[&str] = &[
    "role.read",
    "role.manage",
    "user.create",
    "user.read",
    "user.delete",
    "userrole.assign",
    "userrole.read",
    "userrole.remove",
    "member.create",
    "member.read",
    "member.remove",
    "call.create",
    "call.read",
    "call.delete",
    "subscription.read",
    "usage.read",
];

pub fn is_platform_code(code: &str) -> bool {
    code.get(..PLATFORM_CODE_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(PLATFORM_CODE_PREFIX))
}

// O que sai do banco (Tabela Permissions) - catálogo global
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,

    #[schema(example = "call.create")]
    pub code: String,

    #[schema(example = "Registrar chamadas")]
    pub description: String,

    pub created_at: DateTime<Utc>,
}

// Histórico de atribuição usuário <-> cargo dentro de um tenant
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub tenant_id: Uuid,
    pub is_active: bool,
    pub assigned_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

// Resposta completa (Cargo + Lista de códigos de permissão)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub role: Role,

    #[schema(example = json!(["call.create", "call.read"]))]
    pub permissions: Vec<String>,
}

impl RoleResponse {
    /// O cargo concede `code`? Comparação sem diferenciar maiúsculas.
    pub fn grants(&self, code: &str) -> bool {
        self.permissions
            .iter()
            .any(|granted| granted.eq_ignore_ascii_case(code))
    }
}

// O Payload para criar um cargo
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(length(min = 1, message = "O nome do cargo é obrigatório."))]
    #[schema(example = "Atendente")]
    pub name: String,
}

// Substitui o conjunto inteiro de permissões do cargo
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissionsPayload {
    pub permission_ids: Vec<Uuid>,
}

// Concessão avulsa: soma uma permissão ao cargo sem mexer nas demais
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionPayload {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionPayload {
    #[validate(length(min = 1, message = "O código da permissão é obrigatório."))]
    #[schema(example = "report.export")]
    pub code: String,

    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolesPayload {
    #[validate(length(min = 1, message = "Informe ao menos um cargo."))]
    pub role_ids: Vec<Uuid>,
}
