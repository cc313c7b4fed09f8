// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register_tenant,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::profile,

        // --- Users ---
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::delete_user,

        // --- RBAC ---
        handlers::rbac::create_role,
        handlers::rbac::list_roles,
        handlers::rbac::get_role,
        handlers::rbac::delete_role,
        handlers::rbac::assign_permissions,
        handlers::rbac::grant_permission,
        handlers::rbac::create_permission,
        handlers::rbac::list_permissions,
        handlers::rbac::get_permission,
        handlers::rbac::delete_permission,

        // --- User Roles ---
        handlers::rbac::assign_roles,
        handlers::rbac::get_user_roles,
        handlers::rbac::get_user_role_history,
        handlers::rbac::remove_user_role,

        // --- Members ---
        handlers::tenancy::add_member,
        handlers::tenancy::list_members,
        handlers::tenancy::remove_member,

        // --- Calls ---
        handlers::calls::create_call,
        handlers::calls::list_calls,
        handlers::calls::get_call,
        handlers::calls::delete_call,

        // --- Subscription ---
        handlers::subscription::get_subscription,
        handlers::subscription::get_subscription_history,
        handlers::subscription::get_usage,

        // --- Admin ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_tenants,
        handlers::tenancy::get_tenant,
        handlers::tenancy::delete_tenant,
        handlers::subscription::subscribe_tenant,
        handlers::subscription::create_plan,
        handlers::subscription::list_plans,
        handlers::subscription::get_plan,
        handlers::subscription::delete_plan,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::Identity,
            models::auth::RegisterTenantPayload,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Permission,
            models::rbac::RoleResponse,
            models::rbac::RoleAssignment,
            models::rbac::CreateRolePayload,
            models::rbac::AssignPermissionsPayload,
            models::rbac::GrantPermissionPayload,
            models::rbac::CreatePermissionPayload,
            models::rbac::AssignRolesPayload,

            // --- TENANCY ---
            models::tenancy::Tenant,
            models::tenancy::TenantMembership,
            models::tenancy::TenantMember,
            models::tenancy::CreateTenantPayload,
            models::tenancy::AddMemberPayload,

            // --- SUBSCRIPTION ---
            models::subscription::Plan,
            models::subscription::Subscription,
            models::subscription::ActiveSubscription,
            models::subscription::CreatePlanPayload,
            models::subscription::SubscribePayload,
            models::subscription::ResourceKind,
            models::subscription::UsageReport,

            // --- CALLS ---
            models::calls::Call,
            models::calls::CreateCallPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Usuários do Tenant"),
        (name = "RBAC", description = "Controle de Acesso (Cargos e Permissões)"),
        (name = "User Roles", description = "Atribuição de Cargos a Usuários"),
        (name = "Members", description = "Vínculos de Usuários com o Tenant"),
        (name = "Calls", description = "Chamadas (recurso medido pela cota)"),
        (name = "Subscription", description = "Assinatura, Plano e Consumo do Tenant"),
        (name = "Admin", description = "Administração da Plataforma (Tenants e Planos)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
