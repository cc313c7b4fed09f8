pub mod auth;
pub mod quota;
pub mod rbac;
pub mod tenancy;
