// src/models/calls.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// O recurso medido pela cota de chamadas
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "+5511999990000")]
    pub caller: String,
    #[schema(example = "+5511888880000")]
    pub callee: String,
    // Segundos faturáveis
    pub billsec: i32,
    pub recording_url: Option<String>,
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallPayload {
    #[validate(length(min = 1, message = "O campo 'caller' é obrigatório."))]
    pub caller: String,

    #[validate(length(min = 1, message = "O campo 'callee' é obrigatório."))]
    pub callee: String,

    #[validate(range(min = 0, message = "A duração não pode ser negativa."))]
    #[serde(default)]
    pub billsec: i32,

    #[validate(url(message = "URL de gravação inválida."))]
    pub recording_url: Option<String>,

    #[validate(custom(function = "crate::models::subscription::validate_not_negative"))]
    #[serde(default)]
    pub cost: Decimal,
}
