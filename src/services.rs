pub mod auth;
pub mod call_service;
pub mod quota_service;
pub mod rbac_service;
pub mod subscription_service;
pub mod tenancy_service;
pub mod user_service;
