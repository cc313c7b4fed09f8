// src/models/subscription.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// Catálogo de planos (global, sem tenant)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    #[schema(example = "Pro")]
    pub name: String,
    // Tetos inclusivos: com `max_users` ativos, o próximo é negado
    pub max_users: i64,
    pub max_calls: i64,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn limit_for(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Users => self.max_users,
            ResourceKind::Calls => self.max_calls,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

// Assinatura ativa junto do plano que define as cotas
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSubscription {
    pub subscription: Subscription,
    pub plan: Plan,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanPayload {
    #[validate(length(min = 1, message = "O nome do plano é obrigatório."))]
    pub name: String,
    #[validate(range(min = 0, message = "O limite de usuários não pode ser negativo."))]
    pub max_users: i64,
    #[validate(range(min = 0, message = "O limite de chamadas não pode ser negativo."))]
    pub max_calls: i64,
    #[validate(custom(function = "validate_not_negative"))]
    pub price: Decimal,
}

// Preço e custo nunca negativos
pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub plan_id: Uuid,
}

/// Recursos contáveis limitados pelo plano.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Users,
    Calls,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Users => f.write_str("users"),
            ResourceKind::Calls => f.write_str("calls"),
        }
    }
}

/// Resposta do ledger para "mais uma unidade" de um recurso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allow { used: i64, limit: i64 },
    Deny { used: i64, limit: i64 },
    NoSubscription,
}

impl QuotaDecision {
    pub fn evaluate(used: i64, limit: i64) -> Self {
        if used >= limit {
            QuotaDecision::Deny { used, limit }
        } else {
            QuotaDecision::Allow { used, limit }
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allow { .. })
    }
}

// Relatório de consumo do tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub tenant_id: Uuid,
    pub active_users: i64,
    pub total_calls: i64,
    pub max_users: i64,
    pub max_calls: i64,
    pub users_remaining: i64,
    pub calls_remaining: i64,
}

impl UsageReport {
    pub fn new(tenant_id: Uuid, plan: &Plan, active_users: i64, total_calls: i64) -> Self {
        Self {
            tenant_id,
            active_users,
            total_calls,
            max_users: plan.max_users,
            max_calls: plan.max_calls,
            users_remaining: (plan.max_users - active_users).max(0),
            calls_remaining: (plan.max_calls - total_calls).max(0),
        }
    }
}
