// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn code() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
// Identidade -> tenant -> decisão, nessa ordem; o primeiro que falhar encerra.
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // A. Extrai Usuário
        let AuthenticatedUser(identity) = AuthenticatedUser::from_request_parts(parts, state).await?;

        // B. Extrai Tenant
        let TenantContext(tenant_id) = TenantContext::from_request_parts(parts, state).await?;

        // C. Decide com o cargo principal do token
        app_state
            .rbac_service
            .authorize(tenant_id, identity.role_id, T::code())
            .await?;

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermCallCreate;
impl PermissionDef for PermCallCreate {
    fn code() -> &'static str { "call.create" }
}

pub struct PermCallRead;
impl PermissionDef for PermCallRead {
    fn code() -> &'static str { "call.read" }
}

pub struct PermCallDelete;
impl PermissionDef for PermCallDelete {
    fn code() -> &'static str { "call.delete" }
}

pub struct PermRoleRead;
impl PermissionDef for PermRoleRead {
    fn code() -> &'static str { "role.read" }
}

pub struct PermRoleManage;
impl PermissionDef for PermRoleManage {
    fn code() -> &'static str { "role.manage" }
}

pub struct PermUserCreate;
impl PermissionDef for PermUserCreate {
    fn code() -> &'static str { "user.create" }
}

pub struct PermUserRead;
impl PermissionDef for PermUserRead {
    fn code() -> &'static str { "user.read" }
}

pub struct PermUserDelete;
impl PermissionDef for PermUserDelete {
    fn code() -> &'static str { "user.delete" }
}

pub struct PermUserRoleAssign;
impl PermissionDef for PermUserRoleAssign {
    fn code() -> &'static str { "userrole.assign" }
}

pub struct PermUserRoleRead;
impl PermissionDef for PermUserRoleRead {
    fn code() -> &'static str { "userrole.read" }
}

pub struct PermUserRoleRemove;
impl PermissionDef for PermUserRoleRemove {
    fn code() -> &'static str { "userrole.remove" }
}

pub struct PermMemberCreate;
impl PermissionDef for PermMemberCreate {
    fn code() -> &'static str { "member.create" }
}

pub struct PermMemberRead;
impl PermissionDef for PermMemberRead {
    fn code() -> &'static str { "member.read" }
}

pub struct PermMemberRemove;
impl PermissionDef for PermMemberRemove {
    fn code() -> &'static str { "member.remove" }
}

pub struct PermSubscriptionRead;
impl PermissionDef for PermSubscriptionRead {
    fn code() -> &'static str { "subscription.read" }
}

pub struct PermUsageRead;
impl PermissionDef for PermUsageRead {
    fn code() -> &'static str { "usage.read" }
}

// --- Administração da plataforma ---

pub struct PermAdminPermissionManage;
impl PermissionDef for PermAdminPermissionManage {
    fn code() -> &'static str { "admin.permission.manage" }
}

pub struct PermAdminTenantCreate;
impl PermissionDef for PermAdminTenantCreate {
    fn code() -> &'static str { "admin.tenant.create" }
}

pub struct PermAdminTenantRead;
impl PermissionDef for PermAdminTenantRead {
    fn code() -> &'static str { "admin.tenant.read" }
}

pub struct PermAdminTenantDelete;
impl PermissionDef for PermAdminTenantDelete {
    fn code() -> &'static str { "admin.tenant.delete" }
}

pub struct PermAdminTenantSubscribe;
impl PermissionDef for PermAdminTenantSubscribe {
    fn code() -> &'static str { "admin.tenant.subscribe" }
}

pub struct PermAdminPlanCreate;
impl PermissionDef for PermAdminPlanCreate {
    fn code() -> &'static str { "admin.plan.create" }
}

pub struct PermAdminPlanRead;
impl PermissionDef for PermAdminPlanRead {
    fn code() -> &'static str { "admin.plan.read" }
}

pub struct PermAdminPlanDelete;
impl PermissionDef for PermAdminPlanDelete {
    fn code() -> &'static str { "admin.plan.delete" }
}
