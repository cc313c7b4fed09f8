pub mod auth;
pub mod calls;
pub mod rbac;
pub mod subscription;
pub mod tenancy;
